use ab_glyph::{point, Font, FontArc, GlyphId, PxScale, ScaleFont};
use std::path::Path;

/// Errors raised while locating or parsing a caption font.
#[derive(Debug)]
pub enum FontError {
    NotFound(String),
    Invalid(String),
}

impl std::fmt::Display for FontError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FontError::NotFound(what) => write!(f, "font not found: {}", what),
            FontError::Invalid(e) => write!(f, "font could not be parsed: {}", e),
        }
    }
}

impl std::error::Error for FontError {}

/// Single-channel coverage buffer placed on the canvas at `(off_x, off_y)`.
/// Values are in `0.0..=1.0`.
#[derive(Clone, Debug, PartialEq)]
pub struct CoverageMask {
    pub width: u32,
    pub height: u32,
    pub off_x: i32,
    pub off_y: i32,
    pub data: Vec<f32>,
}

impl CoverageMask {
    pub fn empty() -> Self {
        Self { width: 0, height: 0, off_x: 0, off_y: 0, data: Vec::new() }
    }

    pub fn new(width: u32, height: u32, off_x: i32, off_y: i32) -> Self {
        Self {
            width,
            height,
            off_x,
            off_y,
            data: vec![0.0; width as usize * height as usize],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.data[y as usize * self.width as usize + x as usize]
    }

    /// Max-accumulate coverage at a mask-local coordinate; out-of-range writes are dropped.
    pub fn accumulate(&mut self, x: i32, y: i32, cov: f32) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let idx = y as usize * self.width as usize + x as usize;
        self.data[idx] = self.data[idx].max(cov.clamp(0.0, 1.0));
    }

    /// Canvas-space bounding box `(x0, y0, x1, y1)` of every pixel with visible coverage.
    pub fn ink_bounds(&self) -> Option<(i32, i32, i32, i32)> {
        let mut bounds: Option<(i32, i32, i32, i32)> = None;
        for y in 0..self.height {
            for x in 0..self.width {
                if self.get(x, y) <= 0.001 {
                    continue;
                }
                let (cx, cy) = (self.off_x + x as i32, self.off_y + y as i32);
                bounds = Some(match bounds {
                    None => (cx, cy, cx + 1, cy + 1),
                    Some((x0, y0, x1, y1)) => (x0.min(cx), y0.min(cy), x1.max(cx + 1), y1.max(cy + 1)),
                });
            }
        }
        bounds
    }
}

/// Width of a single line of text at a CSS-style font size (em size in pixels).
pub trait TextMeasure {
    fn measure(&self, text: &str, font_size: f32) -> f32;
}

impl<F> TextMeasure for F
where
    F: Fn(&str, f32) -> f32,
{
    fn measure(&self, text: &str, font_size: f32) -> f32 {
        self(text, font_size)
    }
}

/// A face that can both measure and rasterize a caption line.
pub trait CaptionFace: TextMeasure {
    /// Rasterize `text` centred on `center_x` with the top of its em box at `top_y`.
    fn coverage(&self, text: &str, font_size: f32, center_x: f32, top_y: f32) -> CoverageMask;
}

/// Caption face backed by a TrueType / OpenType font.
#[derive(Clone)]
pub struct FontFace {
    font: FontArc,
    /// Smear coverage one pixel right to fake a bold weight the font lacks.
    faux_bold: bool,
}

impl FontFace {
    pub fn new(font: FontArc) -> Self {
        Self { font, faux_bold: false }
    }

    pub fn with_faux_bold(mut self, faux_bold: bool) -> Self {
        self.faux_bold = faux_bold;
        self
    }

    /// ab_glyph scales by ascent-descent height; canvas font sizes are em sizes.
    fn em_scale(&self, font_size: f32) -> PxScale {
        let upem = self.font.units_per_em().unwrap_or(1000.0);
        let height = self.font.height_unscaled();
        PxScale::from(font_size * height / upem)
    }

    /// Lay out a single line starting at x=0 with the baseline at y=0.
    /// Returns `(glyphs, total_advance, ascent)`.
    fn layout_line(&self, text: &str, font_size: f32) -> (Vec<(GlyphId, f32)>, f32, f32) {
        let scale = self.em_scale(font_size);
        let scaled = self.font.as_scaled(scale);

        let mut glyphs = Vec::new();
        let mut cursor_x = 0.0f32;
        let mut last_glyph: Option<GlyphId> = None;

        for ch in text.chars() {
            let glyph_id = self.font.glyph_id(ch);
            if let Some(prev) = last_glyph {
                cursor_x += scaled.kern(prev, glyph_id);
            }
            glyphs.push((glyph_id, cursor_x));
            cursor_x += scaled.h_advance(glyph_id);
            last_glyph = Some(glyph_id);
        }

        (glyphs, cursor_x, scaled.ascent())
    }
}

impl TextMeasure for FontFace {
    fn measure(&self, text: &str, font_size: f32) -> f32 {
        let (_, width, _) = self.layout_line(text, font_size);
        if self.faux_bold && !text.is_empty() { width + 1.0 } else { width }
    }
}

impl CaptionFace for FontFace {
    fn coverage(&self, text: &str, font_size: f32, center_x: f32, top_y: f32) -> CoverageMask {
        if text.is_empty() || font_size <= 0.0 {
            return CoverageMask::empty();
        }
        let scale = self.em_scale(font_size);
        let (glyphs, total_width, ascent) = self.layout_line(text, font_size);
        let origin_x = center_x - total_width * 0.5;
        let baseline_y = top_y + ascent;

        let outlined: Vec<_> = glyphs
            .iter()
            .filter_map(|&(id, gx)| {
                let glyph = id.with_scale_and_position(scale, point(origin_x + gx, baseline_y));
                self.font.outline_glyph(glyph)
            })
            .collect();

        if outlined.is_empty() {
            return CoverageMask::empty();
        }

        let mut min_x = f32::MAX;
        let mut min_y = f32::MAX;
        let mut max_x = f32::MIN;
        let mut max_y = f32::MIN;
        for g in &outlined {
            let b = g.px_bounds();
            min_x = min_x.min(b.min.x);
            min_y = min_y.min(b.min.y);
            max_x = max_x.max(b.max.x);
            max_y = max_y.max(b.max.y);
        }

        let pad = if self.faux_bold { 1 } else { 0 };
        let x0 = min_x.floor() as i32;
        let y0 = min_y.floor() as i32;
        let w = (max_x.ceil() as i32 - x0 + pad).max(0) as u32;
        let h = (max_y.ceil() as i32 - y0).max(0) as u32;
        let mut mask = CoverageMask::new(w, h, x0, y0);

        for g in &outlined {
            let b = g.px_bounds();
            let gx = b.min.x as i32 - x0;
            let gy = b.min.y as i32 - y0;
            g.draw(|px, py, cov| {
                let mx = gx + px as i32;
                let my = gy + py as i32;
                mask.accumulate(mx, my, cov);
                if self.faux_bold {
                    mask.accumulate(mx + 1, my, cov);
                }
            });
        }

        mask
    }
}

/// Grow a coverage mask by a disc of `radius` pixels (max filter).
///
/// Used to build the outline pass: a stroke of width `2 * radius` centred on
/// the glyph edges covers exactly the dilated glyph, and the fill drawn on top
/// hides the interior.
pub fn dilate(mask: &CoverageMask, radius: f32) -> CoverageMask {
    if mask.is_empty() || radius.is_nan() || radius <= 0.0 {
        return mask.clone();
    }
    let r = radius.ceil() as i32;
    let r2 = radius * radius;
    let offsets: Vec<(i32, i32)> = (-r..=r)
        .flat_map(|dy| (-r..=r).map(move |dx| (dx, dy)))
        .filter(|&(dx, dy)| (dx * dx + dy * dy) as f32 <= r2)
        .collect();

    let mut out = CoverageMask::new(
        mask.width + 2 * r as u32,
        mask.height + 2 * r as u32,
        mask.off_x - r,
        mask.off_y - r,
    );

    for y in 0..mask.height {
        for x in 0..mask.width {
            let cov = mask.get(x, y);
            if cov <= 0.0 {
                continue;
            }
            for &(dx, dy) in &offsets {
                out.accumulate(x as i32 + r + dx, y as i32 + r + dy, cov);
            }
        }
    }

    out
}

/// Load a font by family name, weight, and style from the system.
/// `weight` is a CSS-style weight value (100=Thin, 400=Regular, 700=Bold, etc.)
/// Returns the font and the weight actually matched.
pub fn load_system_font(family: &str, weight: u16) -> Result<(FontArc, u16), FontError> {
    use font_kit::family_name::FamilyName;
    use font_kit::properties::{Properties, Weight};
    use font_kit::source::SystemSource;

    let mut props = Properties::new();
    props.weight = Weight(weight as f32);

    let names = match family.to_lowercase().as_str() {
        "sans-serif" => vec![FamilyName::SansSerif],
        "serif" => vec![FamilyName::Serif],
        "monospace" => vec![FamilyName::Monospace],
        _ => vec![FamilyName::Title(family.to_string())],
    };

    let source = SystemSource::new();
    let handle = source
        .select_best_match(&names, &props)
        .map_err(|_| FontError::NotFound(family.to_string()))?;

    let font_data = handle
        .load()
        .map_err(|e| FontError::Invalid(format!("{}: {:?}", family, e)))?;
    let matched = font_data.properties().weight.0 as u16;
    let bytes = font_data
        .copy_font_data()
        .ok_or_else(|| FontError::Invalid(format!("{}: no font data", family)))?;
    let font = FontArc::try_from_vec((*bytes).clone())
        .map_err(|e| FontError::Invalid(format!("{}: {}", family, e)))?;
    Ok((font, matched))
}

/// Load a TTF / OTF file from disk.
pub fn load_font_file(path: &Path) -> Result<FontArc, FontError> {
    let bytes = std::fs::read(path)
        .map_err(|e| FontError::NotFound(format!("{}: {}", path.display(), e)))?;
    FontArc::try_from_vec(bytes).map_err(|e| FontError::Invalid(format!("{}: {}", path.display(), e)))
}

/// Resolve the caption face: explicit file first, then the requested family,
/// then the system sans-serif. Bold is faked when the matched face is lighter
/// than requested.
pub fn resolve_face(family: &str, weight: u16, font_path: Option<&Path>) -> Result<FontFace, FontError> {
    if let Some(path) = font_path {
        return Ok(FontFace::new(load_font_file(path)?));
    }

    let (font, matched) = match load_system_font(family, weight) {
        Ok(found) => found,
        Err(e) => {
            crate::log_warn!("{}; falling back to sans-serif", e);
            load_system_font("sans-serif", weight)?
        }
    };
    Ok(FontFace::new(font).with_faux_bold(weight >= 600 && matched < 600))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dot() -> CoverageMask {
        let mut m = CoverageMask::new(1, 1, 10, 20);
        m.accumulate(0, 0, 1.0);
        m
    }

    #[test]
    fn dilate_grows_by_radius_on_every_side() {
        let out = dilate(&dot(), 2.0);
        assert_eq!((out.width, out.height), (5, 5));
        assert_eq!((out.off_x, out.off_y), (8, 18));
        assert_eq!(out.ink_bounds(), Some((8, 18, 13, 23)));
    }

    #[test]
    fn dilate_uses_a_disc_not_a_square() {
        let out = dilate(&dot(), 2.0);
        assert_eq!(out.get(2, 0), 1.0);
        assert_eq!(out.get(0, 2), 1.0);
        assert_eq!(out.get(0, 0), 0.0);
        assert_eq!(out.get(4, 4), 0.0);
    }

    #[test]
    fn dilate_zero_radius_is_identity() {
        let m = dot();
        assert_eq!(dilate(&m, 0.0), m);
    }

    #[test]
    fn dilate_nan_radius_is_identity() {
        let m = dot();
        assert_eq!(dilate(&m, f32::NAN), m);
    }

    #[test]
    fn accumulate_keeps_maximum_and_ignores_out_of_range() {
        let mut m = CoverageMask::new(2, 2, 0, 0);
        m.accumulate(1, 1, 0.7);
        m.accumulate(1, 1, 0.3);
        m.accumulate(5, 5, 1.0);
        m.accumulate(-1, 0, 1.0);
        assert_eq!(m.get(1, 1), 0.7);
        assert_eq!(m.data.iter().filter(|&&c| c > 0.0).count(), 1);
    }

    #[test]
    fn empty_mask_has_no_ink() {
        assert_eq!(CoverageMask::empty().ink_bounds(), None);
        assert!(CoverageMask::new(3, 0, 0, 0).is_empty());
    }

    #[test]
    fn closures_measure_text() {
        let k = 0.5;
        let measure = move |s: &str, size: f32| size * s.chars().count() as f32 * k;
        assert_eq!(measure.measure("abcd", 10.0), 20.0);
    }

    #[test]
    fn missing_font_file_is_not_found() {
        let err = load_font_file(Path::new("/definitely/not/here.ttf")).err();
        assert!(matches!(err, Some(FontError::NotFound(_))));
    }
}
