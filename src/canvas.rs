// ============================================================================
// CANVAS — fixed-size output surface and the decoded source image
// ============================================================================

use image::{ImageFormat, Rgba, RgbaImage};

use crate::ops::text::CoverageMask;

/// Default output surface size (16:9).
pub const DEFAULT_CANVAS_WIDTH: u32 = 800;
pub const DEFAULT_CANVAS_HEIGHT: u32 = 450;

/// Fixed-dimension RGBA drawing surface.
///
/// The surface never changes size after construction. Every render clears it
/// first, so content never accumulates across renders.
#[derive(Clone, Debug, PartialEq)]
pub struct CanvasSurface {
    pixels: RgbaImage,
}

impl CanvasSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: RgbaImage::new(width, height),
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Reset every pixel to fully transparent.
    pub fn clear(&mut self) {
        for px in self.pixels.pixels_mut() {
            *px = Rgba([0, 0, 0, 0]);
        }
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Source-over composite `image` with its top-left corner at `(x, y)`.
    /// Parts falling outside the surface are clipped.
    pub fn draw_image(&mut self, image: &RgbaImage, x: i64, y: i64) {
        let (sw, sh) = (self.width() as i64, self.height() as i64);
        for (ix, iy, src) in image.enumerate_pixels() {
            let cx = x + ix as i64;
            let cy = y + iy as i64;
            if cx < 0 || cy < 0 || cx >= sw || cy >= sh {
                continue;
            }
            let dst = self.pixels.get_pixel_mut(cx as u32, cy as u32);
            *dst = blend_over(*dst, src.0, 1.0);
        }
    }

    /// Paint `color` through a coverage mask (source-over, coverage scales alpha).
    pub fn fill_mask(&mut self, mask: &CoverageMask, color: [u8; 4]) {
        let (sw, sh) = (self.width() as i32, self.height() as i32);
        for my in 0..mask.height {
            let cy = mask.off_y + my as i32;
            if cy < 0 || cy >= sh {
                continue;
            }
            for mx in 0..mask.width {
                let cx = mask.off_x + mx as i32;
                if cx < 0 || cx >= sw {
                    continue;
                }
                let cov = mask.get(mx, my);
                if cov <= 0.001 {
                    continue;
                }
                let dst = self.pixels.get_pixel_mut(cx as u32, cy as u32);
                *dst = blend_over(*dst, color, cov);
            }
        }
    }
}

/// Straight-alpha source-over of a solid colour at the given coverage.
fn blend_over(dst: Rgba<u8>, color: [u8; 4], coverage: f32) -> Rgba<u8> {
    let sa = (color[3] as f32 / 255.0) * coverage.clamp(0.0, 1.0);
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }
    let mut out = [0u8; 4];
    for c in 0..3 {
        let v = (color[c] as f32 * sa + dst[c] as f32 * da * (1.0 - sa)) / out_a;
        out[c] = v.round().clamp(0.0, 255.0) as u8;
    }
    out[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgba(out)
}

/// Immutable decoded raster handed to the compositor.
///
/// A value of this type only exists once decoding has finished, which is
/// what lets the compositor read its natural size without waiting.
#[derive(Clone, Debug)]
pub struct SourceImage {
    pixels: RgbaImage,
    format: Option<ImageFormat>,
}

impl SourceImage {
    pub fn new(pixels: RgbaImage) -> Self {
        Self { pixels, format: None }
    }

    pub fn with_format(pixels: RgbaImage, format: ImageFormat) -> Self {
        Self {
            pixels,
            format: Some(format),
        }
    }

    pub fn natural_width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn natural_height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Container format the image was decoded from (`None` for clipboard / raw input).
    pub fn format(&self) -> Option<ImageFormat> {
        self.format
    }
}
