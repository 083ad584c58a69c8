//! Caption layout through a real TrueType face (DejaVu Sans fixture).

use std::path::PathBuf;

use image::{Rgba, RgbaImage};
use memefe::canvas::{CanvasSurface, SourceImage};
use memefe::ops::compositor::{CAPTION_WIDTH_BUDGET, Compositor};
use memefe::ops::text::{CaptionFace, FontFace, TextMeasure, load_font_file};

const MEME: &str = "WHEN THE CODE FINALLY WORKS";
const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

fn dejavu() -> FontFace {
    let path: PathBuf = [env!("CARGO_MANIFEST_DIR"), "tests", "fixtures", "DejaVuSans.ttf"]
        .iter()
        .collect();
    FontFace::new(load_font_file(&path).unwrap())
}

/// `(x0, y0, x1, y1)` of every pixel matching `color`.
fn bounds_of(img: &RgbaImage, color: Rgba<u8>) -> Option<(u32, u32, u32, u32)> {
    let mut b: Option<(u32, u32, u32, u32)> = None;
    for (x, y, p) in img.enumerate_pixels() {
        if *p != color {
            continue;
        }
        b = Some(match b {
            None => (x, y, x + 1, y + 1),
            Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x + 1), y1.max(y + 1)),
        });
    }
    b
}

#[test]
fn measurement_scales_with_font_size() {
    let face = dejavu();
    let small = face.measure(MEME, 20.0);
    let large = face.measure(MEME, 40.0);
    assert!(small > 0.0);
    assert!((large - 2.0 * small).abs() < 1.0, "{} vs {}", large, small);
    assert_eq!(face.measure("", 40.0), 0.0);
}

#[test]
fn faux_bold_adds_one_pixel() {
    let plain = dejavu();
    let bold = dejavu().with_faux_bold(true);
    let diff = bold.measure("MEME", 32.0) - plain.measure("MEME", 32.0);
    assert!((diff - 1.0).abs() < 1e-4);
}

#[test]
fn coverage_is_centred_and_hangs_from_top() {
    let face = dejavu();
    let mask = face.coverage("HELLO", 40.0, 400.0, 10.0);
    let (x0, y0, x1, y1) = mask.ink_bounds().unwrap();

    let centre = (x0 + x1) as f32 / 2.0;
    assert!((centre - 400.0).abs() <= 4.0, "ink centred at {}", centre);
    assert!(y0 >= 10, "ink starts above the caption top: {}", y0);
    assert!(y1 <= 10 + 40, "ink runs past one em: {}", y1);
    // Ink never exceeds the advance width by more than a side bearing.
    assert!(((x1 - x0) as f32) <= face.measure("HELLO", 40.0) + 2.0);
}

#[test]
fn empty_text_has_no_coverage() {
    assert!(dejavu().coverage("", 40.0, 400.0, 10.0).is_empty());
    assert!(dejavu().coverage("   ", 40.0, 400.0, 10.0).ink_bounds().is_none());
}

#[test]
fn rendered_caption_fits_and_sits_at_the_top() {
    let face = dejavu();
    let compositor = Compositor::new(dejavu());
    let source = SourceImage::new(RgbaImage::from_pixel(1600, 900, Rgba([128, 128, 128, 255])));
    let mut surface = CanvasSurface::new(800, 450);

    let report = compositor.render(&mut surface, &source, Some(MEME)).unwrap();
    let size = report.font_size.unwrap();
    let budget = 800.0 * CAPTION_WIDTH_BUDGET;
    assert!(size <= 80);
    assert!(face.measure(MEME, size as f32) < budget);
    if size < 80 {
        assert!(face.measure(MEME, (size + 1) as f32) >= budget);
    }

    let (x0, y0, x1, y1) = bounds_of(surface.pixels(), WHITE).unwrap();
    let centre = (x0 + x1) as f32 / 2.0;
    assert!((centre - 400.0).abs() <= 4.0, "fill centred at {}", centre);
    assert!(y0 >= 10);
    assert!(y1 <= 10 + size + 2);

    // The outline wraps the fill.
    let (ox0, oy0, ox1, _) = bounds_of(surface.pixels(), Rgba([0, 0, 0, 255])).unwrap();
    assert!(ox0 < x0 && ox1 > x1 && oy0 < y0);
}
