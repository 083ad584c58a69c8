//! MemeFE: fit an image into a fixed canvas, draw an outlined auto-sized
//! caption over it, and export the result as PNG.
#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]

pub mod logger;

pub mod canvas;
pub mod captions;
pub mod cli;
pub mod io;
pub mod ops;
pub mod session;
pub mod settings;
pub mod templates;
