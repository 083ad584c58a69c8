// ============================================================================
// TRANSFORM OPERATIONS — scale-to-fit placement and resampling
// ============================================================================

use image::{RgbaImage, imageops};

/// Interpolation method for resize operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Interpolation {
    Nearest,
    #[default]
    Bilinear,
    Bicubic,
    Lanczos3,
}

impl Interpolation {
    pub fn all() -> &'static [Interpolation] {
        &[
            Interpolation::Nearest,
            Interpolation::Bilinear,
            Interpolation::Bicubic,
            Interpolation::Lanczos3,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Interpolation::Nearest  => "nearest",
            Interpolation::Bilinear => "bilinear",
            Interpolation::Bicubic  => "bicubic",
            Interpolation::Lanczos3 => "lanczos3",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::all().iter().copied().find(|i| i.name() == name.to_lowercase())
    }

    pub fn to_filter(&self) -> imageops::FilterType {
        match self {
            Interpolation::Nearest  => imageops::FilterType::Nearest,
            Interpolation::Bilinear => imageops::FilterType::Triangle,
            Interpolation::Bicubic  => imageops::FilterType::CatmullRom,
            Interpolation::Lanczos3 => imageops::FilterType::Lanczos3,
        }
    }
}

/// Where a source image lands inside a fixed surface: uniformly scaled so
/// it is fully visible, then centred.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FitBox {
    pub scale: f32,
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl FitBox {
    /// Scale-to-fit (never scale-to-fill). Callers guarantee all four sizes are > 0.
    pub fn compute(surface_w: u32, surface_h: u32, image_w: u32, image_h: u32) -> Self {
        let (sw, sh) = (surface_w as f32, surface_h as f32);
        let (iw, ih) = (image_w as f32, image_h as f32);
        let scale = (sw / iw).min(sh / ih);
        let w = iw * scale;
        let h = ih * scale;
        Self {
            scale,
            x: (sw - w) / 2.0,
            y: (sh - h) / 2.0,
            w,
            h,
        }
    }

    /// Pixel-snapped rectangle `(x, y, width, height)`: edges are rounded
    /// independently so adjacent letterbox bars stay symmetric.
    pub fn pixel_rect(&self) -> (i64, i64, u32, u32) {
        let x0 = self.x.round() as i64;
        let y0 = self.y.round() as i64;
        let x1 = (self.x + self.w).round() as i64;
        let y1 = (self.y + self.h).round() as i64;
        (x0, y0, (x1 - x0).max(1) as u32, (y1 - y0).max(1) as u32)
    }
}

/// Resample `image` to exactly `width` × `height`.
pub fn resample(image: &RgbaImage, width: u32, height: u32, interp: Interpolation) -> RgbaImage {
    if image.width() == width && image.height() == height {
        return image.clone();
    }
    imageops::resize(image, width, height, interp.to_filter())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-3;

    #[test]
    fn wide_image_exactly_fills_surface() {
        let fit = FitBox::compute(800, 450, 1600, 900);
        assert_eq!(fit.scale, 0.5);
        assert_eq!((fit.x, fit.y, fit.w, fit.h), (0.0, 0.0, 800.0, 450.0));
        assert_eq!(fit.pixel_rect(), (0, 0, 800, 450));
    }

    #[test]
    fn tall_image_is_letterboxed_with_side_bars() {
        let fit = FitBox::compute(800, 450, 900, 1600);
        assert!((fit.scale - 0.28125).abs() < EPS);
        assert!((fit.w - 253.125).abs() < EPS);
        assert!((fit.h - 450.0).abs() < EPS);
        assert!((fit.x - 273.4375).abs() < EPS);
        assert_eq!(fit.y, 0.0);
        let (x, y, w, h) = fit.pixel_rect();
        assert_eq!((x, y, h), (273, 0, 450));
        assert!(w == 253 || w == 254);
    }

    #[test]
    fn fit_is_tight_and_in_bounds() {
        let cases = [
            (800, 450, 1, 1),
            (800, 450, 4000, 3),
            (800, 450, 3, 4000),
            (800, 450, 799, 451),
            (17, 1000, 640, 480),
            (1, 1, 1920, 1080),
        ];
        for (sw, sh, iw, ih) in cases {
            let fit = FitBox::compute(sw, sh, iw, ih);
            let w = fit.scale * iw as f32;
            let h = fit.scale * ih as f32;
            let tol = sw.max(sh) as f32 * 1e-5;
            assert!(w <= sw as f32 + tol && h <= sh as f32 + tol, "{:?}", (sw, sh, iw, ih));
            let tight = (w - sw as f32).abs() <= tol || (h - sh as f32).abs() <= tol;
            assert!(tight, "not tight for {:?}", (sw, sh, iw, ih));
            assert!((fit.w / fit.h - iw as f32 / ih as f32).abs() < 1e-3 * (iw as f32 / ih as f32).max(1.0));
        }
    }

    #[test]
    fn small_images_are_upscaled_to_fit() {
        let fit = FitBox::compute(800, 450, 160, 90);
        assert_eq!(fit.scale, 5.0);
        assert_eq!(fit.pixel_rect(), (0, 0, 800, 450));
    }

    #[test]
    fn interpolation_names_round_trip() {
        for interp in Interpolation::all() {
            assert_eq!(Interpolation::from_name(interp.name()), Some(*interp));
        }
        assert_eq!(Interpolation::from_name("LANCZOS3"), Some(Interpolation::Lanczos3));
        assert_eq!(Interpolation::from_name("box"), None);
    }

    #[test]
    fn resample_hits_requested_size() {
        let img = RgbaImage::new(10, 20);
        let out = resample(&img, 3, 7, Interpolation::Bilinear);
        assert_eq!(out.dimensions(), (3, 7));
    }
}
