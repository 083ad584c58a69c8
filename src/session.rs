// ============================================================================
// SESSION — one meme being built: image slot, caption picks, output surface
// ============================================================================
//
// Redraws are explicit: a handler is registered per trigger and the session
// calls it synchronously when that trigger fires. Nothing is drawn until an
// image has finished decoding.

use std::collections::HashMap;
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, TryRecvError};

use uuid::Uuid;

use crate::canvas::{CanvasSurface, SourceImage};
use crate::captions::{CaptionError, CaptionList, CaptionSupplier};
use crate::io::{ExportError, ExportSink, ImageSource, LoadError};
use crate::ops::compositor::{ComposeError, Compositor, RenderReport};
use crate::ops::text::CaptionFace;

/// Events that require the surface to be repainted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Trigger {
    /// A new source image finished decoding.
    ImageDecoded,
    /// The active caption changed (selected, cleared, or replaced).
    CaptionChanged,
}

/// Repaints the surface for the current image and active caption.
pub type RedrawHandler =
    Box<dyn FnMut(&mut CanvasSurface, &SourceImage, Option<&str>) -> Result<RenderReport, ComposeError>>;

#[derive(Debug)]
pub enum SessionError {
    Load(LoadError),
    Caption(CaptionError),
    Compose(ComposeError),
    Export(ExportError),
    NoImage,
    DecodeInterrupted,
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::Load(e) => write!(f, "{}", e),
            SessionError::Caption(e) => write!(f, "{}", e),
            SessionError::Compose(e) => write!(f, "{}", e),
            SessionError::Export(e) => write!(f, "{}", e),
            SessionError::NoImage => write!(f, "please choose an image first"),
            SessionError::DecodeInterrupted => write!(f, "image decoding stopped before finishing"),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<LoadError> for SessionError {
    fn from(e: LoadError) -> Self {
        SessionError::Load(e)
    }
}

impl From<CaptionError> for SessionError {
    fn from(e: CaptionError) -> Self {
        SessionError::Caption(e)
    }
}

impl From<ComposeError> for SessionError {
    fn from(e: ComposeError) -> Self {
        SessionError::Compose(e)
    }
}

impl From<ExportError> for SessionError {
    fn from(e: ExportError) -> Self {
        SessionError::Export(e)
    }
}

struct PendingDecode {
    origin: String,
    receiver: Receiver<Result<SourceImage, LoadError>>,
}

/// State of a single meme workflow.
pub struct MemeSession {
    pub id: Uuid,
    surface: CanvasSurface,
    image: Option<SourceImage>,
    captions: CaptionList,
    pending: Option<PendingDecode>,
    handlers: HashMap<Trigger, RedrawHandler>,
    last_report: Option<RenderReport>,
}

impl MemeSession {
    pub fn new(width: u32, height: u32) -> Self {
        let id = Uuid::new_v4();
        crate::log_info!("session {} created ({}x{})", id, width, height);
        Self {
            id,
            surface: CanvasSurface::new(width, height),
            image: None,
            captions: CaptionList::default(),
            pending: None,
            handlers: HashMap::new(),
            last_report: None,
        }
    }

    /// Register the handler for `trigger`, replacing any previous one.
    pub fn on(&mut self, trigger: Trigger, handler: RedrawHandler) {
        self.handlers.insert(trigger, handler);
    }

    /// Register `compositor` as the redraw handler for every trigger.
    pub fn attach_compositor<F: CaptionFace + 'static>(&mut self, compositor: Rc<Compositor<F>>) {
        for trigger in [Trigger::ImageDecoded, Trigger::CaptionChanged] {
            let compositor = Rc::clone(&compositor);
            self.on(
                trigger,
                Box::new(move |surface: &mut CanvasSurface, image: &SourceImage, caption: Option<&str>| {
                    compositor.render(surface, image, caption)
                }),
            );
        }
    }

    // -- Image --------------------------------------------------------------

    /// Install an already-decoded image. Clears any previous captions.
    pub fn set_image(&mut self, image: SourceImage) -> Result<(), SessionError> {
        self.clear_state();
        if image.natural_width() == 0 || image.natural_height() == 0 {
            crate::log_err!(
                "rejected {}x{} image",
                image.natural_width(),
                image.natural_height()
            );
            return Err(LoadError::ZeroSized.into());
        }
        crate::log_info!(
            "image ready: {}x{} ({:?})",
            image.natural_width(),
            image.natural_height(),
            image.format()
        );
        self.image = Some(image);
        if let Err(e) = self.fire(Trigger::ImageDecoded) {
            self.clear_state();
            return Err(e);
        }
        Ok(())
    }

    /// Start decoding `source` on a worker thread. The previous image and
    /// captions are dropped immediately; nothing is drawn until the decode
    /// completes and is picked up by [`poll_decode`](Self::poll_decode) or
    /// [`wait_for_decode`](Self::wait_for_decode).
    pub fn begin_decode(&mut self, source: Box<dyn ImageSource>) {
        self.clear_state();
        let origin = source.describe();
        crate::log_info!("decoding {}", origin);

        let (tx, rx) = mpsc::channel();
        rayon::spawn(move || {
            let _ = tx.send(source.load());
        });
        self.pending = Some(PendingDecode { origin, receiver: rx });
    }

    pub fn is_decoding(&self) -> bool {
        self.pending.is_some()
    }

    /// Non-blocking check for decode completion. `None` while still decoding
    /// (or when nothing is pending).
    pub fn poll_decode(&mut self) -> Option<Result<(), SessionError>> {
        let pending = self.pending.as_ref()?;
        let result = match pending.receiver.try_recv() {
            Ok(result) => Ok(result),
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => Err(SessionError::DecodeInterrupted),
        };
        Some(self.finish_decode(result))
    }

    /// Block until the pending decode completes.
    pub fn wait_for_decode(&mut self) -> Result<(), SessionError> {
        let Some(pending) = self.pending.as_ref() else {
            return if self.image.is_some() { Ok(()) } else { Err(SessionError::NoImage) };
        };
        let result = pending.receiver.recv().map_err(|_| SessionError::DecodeInterrupted);
        self.finish_decode(result)
    }

    fn finish_decode(
        &mut self,
        result: Result<Result<SourceImage, LoadError>, SessionError>,
    ) -> Result<(), SessionError> {
        let origin = self.pending.take().map(|p| p.origin).unwrap_or_default();
        match result {
            Ok(Ok(image)) => self.set_image(image),
            Ok(Err(e)) => {
                crate::log_err!("failed to load {}: {}", origin, e);
                Err(e.into())
            }
            Err(e) => {
                crate::log_err!("failed to load {}: {}", origin, e);
                Err(e)
            }
        }
    }

    pub fn image(&self) -> Option<&SourceImage> {
        self.image.as_ref()
    }

    // -- Captions -----------------------------------------------------------

    /// Ask `supplier` for suggestions for the current image. Replaces any
    /// previous suggestions and clears the active caption.
    pub fn load_captions(&mut self, supplier: &dyn CaptionSupplier) -> Result<usize, SessionError> {
        let image = self.image.as_ref().ok_or(SessionError::NoImage)?;
        let items = match supplier.captions(image) {
            Ok(items) => items,
            Err(e) => {
                crate::log_err!("caption supplier failed: {}", e);
                return Err(e.into());
            }
        };
        let had_active = self.captions.active().is_some();
        self.captions = CaptionList::new(items);
        crate::log_info!("{} caption(s) loaded", self.captions.len());
        if had_active {
            self.fire(Trigger::CaptionChanged)?;
        }
        Ok(self.captions.len())
    }

    /// Make caption `index` (0-based) the active one and repaint.
    pub fn select_caption(&mut self, index: usize) -> Result<(), SessionError> {
        let chosen = self.captions.select(index)?;
        crate::log_info!("caption #{} selected: {:?}", index + 1, chosen);
        self.fire(Trigger::CaptionChanged)
    }

    pub fn captions(&self) -> &CaptionList {
        &self.captions
    }

    pub fn active_caption(&self) -> Option<&str> {
        self.captions.active()
    }

    // -- Output -------------------------------------------------------------

    pub fn surface(&self) -> &CanvasSurface {
        &self.surface
    }

    pub fn last_report(&self) -> Option<&RenderReport> {
        self.last_report.as_ref()
    }

    /// Hand the current surface to `sink`. Requires a decoded image.
    pub fn export(&self, sink: &mut dyn ExportSink) -> Result<(), SessionError> {
        if self.image.is_none() {
            return Err(SessionError::NoImage);
        }
        sink.export(&self.surface).map_err(|e| {
            crate::log_err!("export to {} failed: {}", sink.destination(), e);
            SessionError::from(e)
        })
    }

    /// Drop the image, captions, and any pending decode; blank the surface.
    pub fn reset(&mut self) {
        self.clear_state();
        crate::log_info!("session {} reset", self.id);
    }

    fn clear_state(&mut self) {
        self.image = None;
        self.captions.clear();
        self.pending = None;
        self.last_report = None;
        self.surface.clear();
    }

    fn fire(&mut self, trigger: Trigger) -> Result<(), SessionError> {
        let Some(image) = self.image.as_ref() else { return Ok(()) };
        let Some(handler) = self.handlers.get_mut(&trigger) else { return Ok(()) };
        let report = handler(&mut self.surface, image, self.captions.active())?;
        self.last_report = Some(report);
        Ok(())
    }
}
