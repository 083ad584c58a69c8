use image::codecs::png::PngEncoder;
use image::{ImageEncoder, ImageError, ImageFormat, RgbaImage};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::canvas::{CanvasSurface, SourceImage};

/// Conventional download name for a rendered meme.
pub const DEFAULT_EXPORT_NAME: &str = "meme.png";

/// Raster formats the image source accepts. Everything else is rejected
/// before the compositor ever sees it.
pub const ACCEPTED_FORMATS: &[ImageFormat] = &[ImageFormat::Png, ImageFormat::Jpeg, ImageFormat::WebP];

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug)]
pub enum LoadError {
    Io(std::io::Error),
    UnsupportedFormat(String),
    Decode(ImageError),
    ZeroSized,
    Clipboard(String),
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::Io(e) => write!(f, "I/O error: {}", e),
            LoadError::UnsupportedFormat(what) => {
                write!(f, "unsupported image format: {} (expected PNG, JPEG or WEBP)", what)
            }
            LoadError::Decode(e) => write!(f, "image decode failed: {}", e),
            LoadError::ZeroSized => write!(f, "image has a zero dimension"),
            LoadError::Clipboard(e) => write!(f, "clipboard: {}", e),
        }
    }
}

impl std::error::Error for LoadError {}

impl From<std::io::Error> for LoadError {
    fn from(e: std::io::Error) -> Self {
        LoadError::Io(e)
    }
}

impl From<ImageError> for LoadError {
    fn from(e: ImageError) -> Self {
        LoadError::Decode(e)
    }
}

#[derive(Debug)]
pub enum ExportError {
    Io(std::io::Error),
    Encode(ImageError),
    Clipboard(String),
}

impl std::fmt::Display for ExportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportError::Io(e) => write!(f, "I/O error: {}", e),
            ExportError::Encode(e) => write!(f, "PNG encode failed: {}", e),
            ExportError::Clipboard(e) => write!(f, "clipboard: {}", e),
        }
    }
}

impl std::error::Error for ExportError {}

impl From<std::io::Error> for ExportError {
    fn from(e: std::io::Error) -> Self {
        ExportError::Io(e)
    }
}

impl From<ImageError> for ExportError {
    fn from(e: ImageError) -> Self {
        ExportError::Encode(e)
    }
}

// ============================================================================
// IMAGE SOURCES
// ============================================================================

/// Supplies a fully decoded image. Implementations may be called from a
/// background worker, hence `Send`.
pub trait ImageSource: Send {
    fn load(&self) -> Result<SourceImage, LoadError>;

    /// Human-readable origin for logs and messages.
    fn describe(&self) -> String;
}

/// Decode an in-memory PNG / JPEG / WEBP. The container is sniffed from the
/// bytes, not trusted from a file extension.
pub fn decode_bytes(bytes: &[u8]) -> Result<SourceImage, LoadError> {
    let format = image::guess_format(bytes)
        .map_err(|_| LoadError::UnsupportedFormat("unrecognised data".to_string()))?;
    if !ACCEPTED_FORMATS.contains(&format) {
        return Err(LoadError::UnsupportedFormat(format!("{:?}", format)));
    }

    let img = image::load_from_memory_with_format(bytes, format)?.to_rgba8();
    if img.width() == 0 || img.height() == 0 {
        return Err(LoadError::ZeroSized);
    }
    Ok(SourceImage::with_format(img, format))
}

/// Image picked from disk.
pub struct FileImageSource {
    pub path: PathBuf,
}

impl FileImageSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ImageSource for FileImageSource {
    fn load(&self) -> Result<SourceImage, LoadError> {
        let bytes = std::fs::read(&self.path)?;
        decode_bytes(&bytes)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Encoded image bytes already in memory (e.g. a fetched template).
pub struct MemoryImageSource {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl ImageSource for MemoryImageSource {
    fn load(&self) -> Result<SourceImage, LoadError> {
        decode_bytes(&self.bytes)
    }

    fn describe(&self) -> String {
        format!("{} ({} bytes)", self.name, self.bytes.len())
    }
}

/// Image currently on the system clipboard.
pub struct ClipboardImageSource;

impl ImageSource for ClipboardImageSource {
    fn load(&self) -> Result<SourceImage, LoadError> {
        // arboard hands back ImageData { width, height, bytes: Cow<[u8]> } in RGBA order.
        let mut clip = arboard::Clipboard::new().map_err(|e| LoadError::Clipboard(e.to_string()))?;
        let data = clip.get_image().map_err(|e| LoadError::Clipboard(e.to_string()))?;
        if data.width == 0 || data.height == 0 {
            return Err(LoadError::ZeroSized);
        }
        let img = RgbaImage::from_raw(data.width as u32, data.height as u32, data.bytes.into_owned())
            .ok_or_else(|| LoadError::Clipboard("pixel buffer does not match reported size".to_string()))?;
        Ok(SourceImage::new(img))
    }

    fn describe(&self) -> String {
        "clipboard".to_string()
    }
}

// ============================================================================
// EXPORT SINKS
// ============================================================================

/// Encode an RGBA image as PNG bytes.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, ExportError> {
    let mut buf = Vec::new();
    let encoder = PngEncoder::new(&mut buf);
    encoder.write_image(
        image.as_raw(),
        image.width(),
        image.height(),
        image::ColorType::Rgba8,
    )?;
    Ok(buf)
}

/// Consumes a rendered surface.
pub trait ExportSink {
    fn export(&mut self, surface: &CanvasSurface) -> Result<(), ExportError>;

    fn destination(&self) -> String;
}

/// Writes the surface as a PNG file.
pub struct PngFileSink {
    pub path: PathBuf,
}

impl PngFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `meme.png` inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(DEFAULT_EXPORT_NAME))
    }
}

impl ExportSink for PngFileSink {
    fn export(&mut self, surface: &CanvasSurface) -> Result<(), ExportError> {
        let bytes = encode_png(surface.pixels())?;
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(File::create(&self.path)?);
        writer.write_all(&bytes)?;
        writer.flush()?;
        crate::log_info!("exported {} bytes to {}", bytes.len(), self.path.display());
        Ok(())
    }

    fn destination(&self) -> String {
        self.path.display().to_string()
    }
}

/// Places the surface on the system clipboard.
pub struct ClipboardSink;

impl ExportSink for ClipboardSink {
    fn export(&mut self, surface: &CanvasSurface) -> Result<(), ExportError> {
        let img = surface.pixels();
        let mut clip = arboard::Clipboard::new().map_err(|e| ExportError::Clipboard(e.to_string()))?;
        let data = arboard::ImageData {
            width: img.width() as usize,
            height: img.height() as usize,
            bytes: std::borrow::Cow::Borrowed(img.as_raw()),
        };
        clip.set_image(data).map_err(|e| ExportError::Clipboard(e.to_string()))?;
        crate::log_info!("copied {}x{} meme to clipboard", img.width(), img.height());
        Ok(())
    }

    fn destination(&self) -> String {
        "clipboard".to_string()
    }
}
