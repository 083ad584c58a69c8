use std::path::{Path, PathBuf};

use crate::canvas::{DEFAULT_CANVAS_HEIGHT, DEFAULT_CANVAS_WIDTH};
use crate::io::DEFAULT_EXPORT_NAME;
use crate::ops::compositor::{CaptionStyle, MAX_STROKE_WIDTH};
use crate::ops::transform::Interpolation;

const SETTINGS_FILE: &str = "memefe_settings.cfg";

/// Persistent defaults, stored as `key=value` lines.
#[derive(Clone, Debug, PartialEq)]
pub struct MemeSettings {
    pub canvas_width: u32,
    pub canvas_height: u32,
    /// Preferred caption family; falls back to the system sans-serif.
    pub font_family: String,
    /// CSS-style weight (400 regular, 700 bold).
    pub font_weight: u16,
    /// TTF / OTF file that overrides the family lookup. Empty = unset.
    pub font_path: String,
    pub min_font_size: u32,
    pub stroke_width: f32,
    pub fill_color: [u8; 4],
    pub stroke_color: [u8; 4],
    pub top_inset: f32,
    pub output_name: String,
    pub interpolation: Interpolation,
}

impl Default for MemeSettings {
    fn default() -> Self {
        let style = CaptionStyle::default();
        Self {
            canvas_width: DEFAULT_CANVAS_WIDTH,
            canvas_height: DEFAULT_CANVAS_HEIGHT,
            font_family: "Impact".to_string(),
            font_weight: 700,
            font_path: String::new(),
            min_font_size: style.min_font_size,
            stroke_width: style.stroke_width,
            fill_color: style.fill_color,
            stroke_color: style.stroke_color,
            top_inset: style.top_inset,
            output_name: DEFAULT_EXPORT_NAME.to_string(),
            interpolation: Interpolation::default(),
        }
    }
}

impl MemeSettings {
    /// Path to the settings file.
    /// On Linux:   ~/.config/memefe/memefe_settings.cfg  (XDG_CONFIG_HOME respected)
    /// On Windows: %APPDATA%\MemeFE\memefe_settings.cfg
    /// On macOS:   ~/Library/Application Support/MemeFE/memefe_settings.cfg
    /// Fallback:   same directory as the executable.
    pub fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "linux")]
        {
            let config_dir = std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
                    PathBuf::from(home).join(".config")
                })
                .join("memefe");
            return Some(config_dir.join(SETTINGS_FILE));
        }
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA").or_else(|_| std::env::var("USERPROFILE")).ok()?;
            return Some(PathBuf::from(appdata).join("MemeFE").join(SETTINGS_FILE));
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
            return Some(
                PathBuf::from(home)
                    .join("Library")
                    .join("Application Support")
                    .join("MemeFE")
                    .join(SETTINGS_FILE),
            );
        }
        #[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
        {
            std::env::current_exe().ok().and_then(|p| p.parent().map(|d| d.join(SETTINGS_FILE)))
        }
    }

    /// Serialize a colour as "r,g,b,a"
    fn color_to_str(c: [u8; 4]) -> String {
        format!("{},{},{},{}", c[0], c[1], c[2], c[3])
    }

    /// Parse a colour from "r,g,b,a" (alpha optional, defaults to 255)
    pub fn str_to_color(s: &str) -> Option<[u8; 4]> {
        let parts: Vec<&str> = s.split(',').collect();
        if parts.len() != 3 && parts.len() != 4 {
            return None;
        }
        let r = parts[0].trim().parse::<u8>().ok()?;
        let g = parts[1].trim().parse::<u8>().ok()?;
        let b = parts[2].trim().parse::<u8>().ok()?;
        let a = match parts.get(3) {
            Some(p) => p.trim().parse::<u8>().ok()?,
            None => 255,
        };
        Some([r, g, b, a])
    }

    pub fn font_path(&self) -> Option<&Path> {
        if self.font_path.is_empty() { None } else { Some(Path::new(&self.font_path)) }
    }

    pub fn caption_style(&self) -> CaptionStyle {
        CaptionStyle {
            fill_color: self.fill_color,
            stroke_color: self.stroke_color,
            stroke_width: self.stroke_width,
            min_font_size: self.min_font_size,
            top_inset: self.top_inset,
        }
    }

    pub fn to_config_string(&self) -> String {
        format!(
            "canvas_width={}\n\
             canvas_height={}\n\
             font_family={}\n\
             font_weight={}\n\
             font_path={}\n\
             min_font_size={}\n\
             stroke_width={}\n\
             fill_color={}\n\
             stroke_color={}\n\
             top_inset={}\n\
             output_name={}\n\
             interpolation={}\n",
            self.canvas_width,
            self.canvas_height,
            self.font_family,
            self.font_weight,
            self.font_path,
            self.min_font_size,
            self.stroke_width,
            Self::color_to_str(self.fill_color),
            Self::color_to_str(self.stroke_color),
            self.top_inset,
            self.output_name,
            self.interpolation.name(),
        )
    }

    /// Parse `key=value` lines on top of the defaults. Unknown keys and
    /// unparsable values are ignored.
    pub fn parse(content: &str) -> Self {
        let mut s = Self::default();
        for line in content.lines() {
            let Some((key, val)) = line.split_once('=') else { continue };
            let val = val.trim();
            match key.trim() {
                "canvas_width" => {
                    if let Ok(v) = val.parse::<u32>() && v > 0 { s.canvas_width = v; }
                }
                "canvas_height" => {
                    if let Ok(v) = val.parse::<u32>() && v > 0 { s.canvas_height = v; }
                }
                "font_family" => {
                    if !val.is_empty() { s.font_family = val.to_string(); }
                }
                "font_weight" => {
                    s.font_weight = val.parse().unwrap_or(s.font_weight);
                }
                "font_path" => {
                    s.font_path = val.to_string();
                }
                "min_font_size" => {
                    s.min_font_size = val.parse().unwrap_or(s.min_font_size);
                }
                "stroke_width" => {
                    if let Ok(v) = val.parse::<f32>() && (0.0..=MAX_STROKE_WIDTH).contains(&v) {
                        s.stroke_width = v;
                    }
                }
                "fill_color" => {
                    if let Some(c) = Self::str_to_color(val) { s.fill_color = c; }
                }
                "stroke_color" => {
                    if let Some(c) = Self::str_to_color(val) { s.stroke_color = c; }
                }
                "top_inset" => {
                    s.top_inset = val.parse().unwrap_or(s.top_inset);
                }
                "output_name" => {
                    if !val.is_empty() { s.output_name = val.to_string(); }
                }
                "interpolation" => {
                    if let Some(i) = Interpolation::from_name(val) { s.interpolation = i; }
                }
                _ => {}
            }
        }
        s
    }

    /// Load settings from disk (returns default if file missing or corrupt)
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else { return Self::default() };
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(_) => Self::default(),
        }
    }

    /// Save settings to disk, returning where they went.
    pub fn save(&self) -> std::io::Result<PathBuf> {
        let path = Self::settings_path()
            .ok_or_else(|| std::io::Error::other("no settings directory available"))?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_config_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_classic_meme_look() {
        let s = MemeSettings::default();
        assert_eq!((s.canvas_width, s.canvas_height), (800, 450));
        assert_eq!(s.output_name, "meme.png");
        assert_eq!(s.caption_style(), CaptionStyle::default());
        assert_eq!(s.font_path(), None);
    }

    #[test]
    fn parse_overrides_known_keys_and_ignores_junk() {
        let s = MemeSettings::parse(
            "canvas_width=1024\n\
             canvas_height=0\n\
             fill_color=255, 255, 0\n\
             stroke_color=1,2,3,4,5\n\
             stroke_width=-3\n\
             interpolation=Lanczos3\n\
             font_path=/fonts/anton.ttf\n\
             garbage line\n\
             unknown=1\n",
        );
        assert_eq!(s.canvas_width, 1024);
        assert_eq!(s.canvas_height, 450);
        assert_eq!(s.fill_color, [255, 255, 0, 255]);
        assert_eq!(s.stroke_color, [0, 0, 0, 255]);
        assert_eq!(s.stroke_width, 4.0);
        assert_eq!(s.interpolation, Interpolation::Lanczos3);
        assert_eq!(s.font_path(), Some(Path::new("/fonts/anton.ttf")));
    }

    #[test]
    fn absurd_stroke_width_is_ignored() {
        let s = MemeSettings::parse("stroke_width=1e9\n");
        assert_eq!(s.stroke_width, 4.0);
        let s = MemeSettings::parse("stroke_width=NaN\n");
        assert_eq!(s.stroke_width, 4.0);
        let s = MemeSettings::parse("stroke_width=64\n");
        assert_eq!(s.stroke_width, MAX_STROKE_WIDTH);
    }

    #[test]
    fn save_then_load_preserves_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg").join(SETTINGS_FILE);
        let mut s = MemeSettings::default();
        s.font_family = "Anton".into();
        s.min_font_size = 14;
        s.top_inset = 12.5;
        s.interpolation = Interpolation::Nearest;
        s.save_to(&path).unwrap();
        assert_eq!(MemeSettings::load_from(&path), s);
    }

    #[test]
    fn missing_file_yields_defaults() {
        assert_eq!(MemeSettings::load_from(Path::new("/nope/memefe.cfg")), MemeSettings::default());
    }
}
