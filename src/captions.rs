// ============================================================================
// CAPTIONS — caption suppliers and the user's pick among their suggestions
// ============================================================================

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::canvas::SourceImage;

/// How many suggestions the remote caption generator is asked for.
pub const EXPECTED_CAPTION_COUNT: usize = 5;

#[derive(Debug)]
pub enum CaptionError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Empty,
    OutOfRange { index: usize, len: usize },
}

impl std::fmt::Display for CaptionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptionError::Io(e) => write!(f, "could not read captions: {}", e),
            CaptionError::Parse(e) => write!(f, "caption response is not valid JSON: {}", e),
            CaptionError::Empty => write!(f, "caption response contained no captions"),
            CaptionError::OutOfRange { index, len } => {
                write!(f, "caption #{} does not exist ({} available)", index + 1, len)
            }
        }
    }
}

impl std::error::Error for CaptionError {}

impl From<std::io::Error> for CaptionError {
    fn from(e: std::io::Error) -> Self {
        CaptionError::Io(e)
    }
}

impl From<serde_json::Error> for CaptionError {
    fn from(e: serde_json::Error) -> Self {
        CaptionError::Parse(e)
    }
}

/// Wire shape of a caption-generation response: `{"captions": ["..", ..]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionResponse {
    pub captions: Vec<String>,
}

/// Parse and validate a caption-generation response body.
pub fn parse_caption_response(json: &str) -> Result<Vec<String>, CaptionError> {
    let response: CaptionResponse = serde_json::from_str(json)?;
    if response.captions.is_empty() {
        return Err(CaptionError::Empty);
    }
    if response.captions.len() != EXPECTED_CAPTION_COUNT {
        crate::log_warn!(
            "caption response has {} entries (expected {})",
            response.captions.len(),
            EXPECTED_CAPTION_COUNT
        );
    }
    Ok(response.captions)
}

/// Produces candidate captions for an image.
pub trait CaptionSupplier {
    fn captions(&self, image: &SourceImage) -> Result<Vec<String>, CaptionError>;
}

/// Captions given up front (e.g. on the command line).
pub struct StaticCaptions(pub Vec<String>);

impl CaptionSupplier for StaticCaptions {
    fn captions(&self, _image: &SourceImage) -> Result<Vec<String>, CaptionError> {
        if self.0.is_empty() {
            return Err(CaptionError::Empty);
        }
        Ok(self.0.clone())
    }
}

/// A saved caption-generation response on disk.
pub struct JsonCaptionFile {
    pub path: PathBuf,
}

impl JsonCaptionFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CaptionSupplier for JsonCaptionFile {
    fn captions(&self, _image: &SourceImage) -> Result<Vec<String>, CaptionError> {
        let text = std::fs::read_to_string(&self.path)?;
        parse_caption_response(&text)
    }
}

/// Ordered suggestions (generation order) plus at most one active pick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaptionList {
    items: Vec<String>,
    selected: Option<usize>,
}

impl CaptionList {
    pub fn new(items: Vec<String>) -> Self {
        Self { items, selected: None }
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Make the caption at `index` (0-based) the active one.
    pub fn select(&mut self, index: usize) -> Result<&str, CaptionError> {
        if index >= self.items.len() {
            return Err(CaptionError::OutOfRange { index, len: self.items.len() });
        }
        self.selected = Some(index);
        Ok(&self.items[index])
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    pub fn active(&self) -> Option<&str> {
        self.selected.map(|i| self.items[i].as_str())
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.selected = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;
    use std::io::Write;

    fn any_image() -> SourceImage {
        SourceImage::new(RgbaImage::new(1, 1))
    }

    #[test]
    fn parses_the_caption_response_schema() {
        let json = r#"{"captions": ["a", "b", "c", "d", "e"]}"#;
        let caps = parse_caption_response(json).unwrap();
        assert_eq!(caps, vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn accepts_counts_other_than_five() {
        assert_eq!(parse_caption_response(r#"{"captions": ["only"]}"#).unwrap().len(), 1);
    }

    #[test]
    fn rejects_empty_or_malformed_responses() {
        assert!(matches!(parse_caption_response(r#"{"captions": []}"#), Err(CaptionError::Empty)));
        assert!(matches!(parse_caption_response(r#"{"lines": ["a"]}"#), Err(CaptionError::Parse(_))));
        assert!(matches!(parse_caption_response(r#"{"captions": "a"}"#), Err(CaptionError::Parse(_))));
        assert!(matches!(parse_caption_response("nope"), Err(CaptionError::Parse(_))));
    }

    #[test]
    fn json_file_supplier_reads_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"captions": ["one", "two"]}}"#).unwrap();
        let supplier = JsonCaptionFile::new(file.path());
        assert_eq!(supplier.captions(&any_image()).unwrap(), vec!["one", "two"]);
    }

    #[test]
    fn static_supplier_requires_at_least_one_caption() {
        assert!(matches!(StaticCaptions(vec![]).captions(&any_image()), Err(CaptionError::Empty)));
        let caps = StaticCaptions(vec!["x".into()]).captions(&any_image()).unwrap();
        assert_eq!(caps, vec!["x"]);
    }

    #[test]
    fn selection_is_exclusive_and_bounded() {
        let mut list = CaptionList::new(vec!["first".into(), "second".into()]);
        assert_eq!(list.active(), None);
        assert_eq!(list.select(1).unwrap(), "second");
        assert_eq!(list.select(0).unwrap(), "first");
        assert_eq!(list.active(), Some("first"));
        assert!(matches!(list.select(2), Err(CaptionError::OutOfRange { index: 2, len: 2 })));
        assert_eq!(list.selected_index(), Some(0));
        list.clear();
        assert!(list.is_empty());
        assert_eq!(list.active(), None);
    }
}
