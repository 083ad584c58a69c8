// ============================================================================
// MEME COMPOSITOR — fit the source image, auto-size and draw the caption
// ============================================================================
//
// Render pipeline (one call = one full repaint):
//   1. validate surface + source sizes (reject before touching any pixel)
//   2. clear the surface
//   3. scale-to-fit + centre the image
//   4. if a caption is active: shrink the font until it fits 90% of the
//      fitted width (or the floor is hit), then stroke + fill it at the top

use crate::canvas::{CanvasSurface, SourceImage};
use crate::ops::text::{CaptionFace, TextMeasure, dilate};
use crate::ops::transform::{FitBox, Interpolation, resample};

/// Fraction of the fit-box width a caption may occupy.
pub const CAPTION_WIDTH_BUDGET: f32 = 0.9;
/// Initial font size is the fit-box width divided by this.
pub const INITIAL_SIZE_DIVISOR: f32 = 10.0;
/// Widest caption outline accepted from settings or the command line.
pub const MAX_STROKE_WIDTH: f32 = 64.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposeError {
    InvalidSurface { width: u32, height: u32 },
    InvalidSource { width: u32, height: u32 },
}

impl std::fmt::Display for ComposeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComposeError::InvalidSurface { width, height } => {
                write!(f, "invalid surface size {}x{}", width, height)
            }
            ComposeError::InvalidSource { width, height } => {
                write!(f, "invalid source image size {}x{} (corrupt or undecoded)", width, height)
            }
        }
    }
}

impl std::error::Error for ComposeError {}

/// Caption appearance. Defaults reproduce classic white-on-black meme text.
#[derive(Clone, Debug, PartialEq)]
pub struct CaptionStyle {
    pub fill_color: [u8; 4],
    pub stroke_color: [u8; 4],
    /// Full outline width; half of it lies outside the glyph edge.
    pub stroke_width: f32,
    /// Floor for the shrink loop.
    pub min_font_size: u32,
    /// Distance from the top of the fit box to the top of the caption.
    pub top_inset: f32,
}

impl Default for CaptionStyle {
    fn default() -> Self {
        Self {
            fill_color: [255, 255, 255, 255],
            stroke_color: [0, 0, 0, 255],
            stroke_width: 4.0,
            min_font_size: 10,
            top_inset: 10.0,
        }
    }
}

/// What a render actually did, for logging and inspection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderReport {
    pub fit: FitBox,
    /// `None` when no caption was drawn.
    pub font_size: Option<u32>,
}

/// Largest font size not above `floor(box_width / 10)` whose measured width
/// stays under 90% of `box_width`, stopping at `min_size`.
///
/// Sizes that already start at or below the floor are used as-is; at the
/// floor an overflowing caption is accepted.
pub fn fit_font_size<M>(caption: &str, box_width: f32, measure: &M, min_size: u32) -> u32
where
    M: TextMeasure + ?Sized,
{
    let limit = box_width * CAPTION_WIDTH_BUDGET;
    let mut size = (box_width / INITIAL_SIZE_DIVISOR).floor().max(0.0) as u32;
    while size > min_size && measure.measure(caption, size as f32) >= limit {
        size -= 1;
    }
    size
}

/// Renders memes onto a [`CanvasSurface`] with a fixed face and style.
pub struct Compositor<F> {
    face: F,
    style: CaptionStyle,
    interpolation: Interpolation,
}

impl<F: CaptionFace> Compositor<F> {
    pub fn new(face: F) -> Self {
        Self {
            face,
            style: CaptionStyle::default(),
            interpolation: Interpolation::default(),
        }
    }

    pub fn with_style(mut self, style: CaptionStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    /// Repaint `surface` with `source` fitted and `caption` (if non-empty) on top.
    ///
    /// Deterministic: the same inputs always produce the same pixels.
    pub fn render(
        &self,
        surface: &mut CanvasSurface,
        source: &SourceImage,
        caption: Option<&str>,
    ) -> Result<RenderReport, ComposeError> {
        let (sw, sh) = (surface.width(), surface.height());
        if sw == 0 || sh == 0 {
            return Err(ComposeError::InvalidSurface { width: sw, height: sh });
        }
        let (iw, ih) = (source.natural_width(), source.natural_height());
        if iw == 0 || ih == 0 {
            return Err(ComposeError::InvalidSource { width: iw, height: ih });
        }

        surface.clear();

        let fit = FitBox::compute(sw, sh, iw, ih);
        let (x, y, w, h) = fit.pixel_rect();
        let scaled = resample(source.pixels(), w, h, self.interpolation);
        surface.draw_image(&scaled, x, y);

        let font_size = match caption {
            Some(text) if !text.is_empty() => Some(self.draw_caption(surface, &fit, text)),
            _ => None,
        };

        crate::log_info!(
            "render {}x{} -> fit ({:.1}, {:.1}, {:.1}x{:.1}) scale {:.4} font {:?}",
            iw, ih, fit.x, fit.y, fit.w, fit.h, fit.scale, font_size
        );

        Ok(RenderReport { fit, font_size })
    }

    fn draw_caption(&self, surface: &mut CanvasSurface, fit: &FitBox, text: &str) -> u32 {
        let size = fit_font_size(text, fit.w, &self.face, self.style.min_font_size);
        if size == 0 {
            return size;
        }

        let center_x = surface.width() as f32 / 2.0;
        let top_y = fit.y + self.style.top_inset;
        let fill = self.face.coverage(text, size as f32, center_x, top_y);
        if fill.is_empty() {
            return size;
        }

        // Outline first so the fill sits on top.
        let stroke = self.style.stroke_width.clamp(0.0, MAX_STROKE_WIDTH);
        let outline = dilate(&fill, stroke / 2.0);
        surface.fill_mask(&outline, self.style.stroke_color);
        surface.fill_mask(&fill, self.style.fill_color);
        size
    }
}
