use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod config_file;
pub mod source;

pub use source::{FragmentSource, SourceError};

/// Axis-aligned bounding box `(x1, y1, x2, y2)` in page coordinates.
///
/// Serialized as a 4-element array to match the layout emitted by
/// document extractors.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BBox {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }
}

impl From<[f64; 4]> for BBox {
    fn from(v: [f64; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BBox> for [f64; 4] {
    fn from(b: BBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

/// Font metadata of the first span of a fragment.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FontInfo {
    #[serde(default)]
    pub font_name: String,
    #[serde(default)]
    pub font_size: f64,
    #[serde(default)]
    pub is_bold: bool,
}

impl FontInfo {
    pub fn new(font_name: impl Into<String>, font_size: f64, is_bold: bool) -> Self {
        Self {
            font_name: font_name.into(),
            font_size,
            is_bold,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FragmentError {
    #[error("page numbers are 1-based, got {0}")]
    InvalidPage(u32),
    #[error("font size must be a finite non-negative number, got {0}")]
    InvalidFontSize(f64),
}

/// A positioned, formatted unit of extracted document text.
///
/// Fragments are validated on construction and on deserialization, so every
/// `TextFragment` that reaches the matcher has a 1-based page and a usable
/// font size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FragmentRecord")]
pub struct TextFragment {
    pub text: String,
    pub page: u32,
    pub bbox: BBox,
    #[serde(flatten)]
    pub font: FontInfo,
}

impl TextFragment {
    pub fn new(
        text: impl Into<String>,
        page: u32,
        bbox: BBox,
        font: FontInfo,
    ) -> Result<Self, FragmentError> {
        if page == 0 {
            return Err(FragmentError::InvalidPage(page));
        }
        if !font.font_size.is_finite() || font.font_size < 0.0 {
            return Err(FragmentError::InvalidFontSize(font.font_size));
        }
        Ok(Self {
            text: text.into(),
            page,
            bbox,
            font,
        })
    }
}

/// Unvalidated wire shape of a [`TextFragment`], as written by extractors.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FragmentRecord {
    pub text: String,
    pub page: u32,
    #[serde(default)]
    pub bbox: BBox,
    #[serde(flatten)]
    pub font: FontInfo,
}

impl TryFrom<FragmentRecord> for TextFragment {
    type Error = FragmentError;

    fn try_from(raw: FragmentRecord) -> Result<Self, Self::Error> {
        TextFragment::new(raw.text, raw.page, raw.bbox, raw.font)
    }
}

/// Kind of a detected caption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptionType {
    Figure,
    Table,
    Chart,
}

impl CaptionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Figure => "figure",
            Self::Table => "table",
            Self::Chart => "chart",
        }
    }

    /// Whether a reference of type `reference` names the same kind of caption.
    pub fn agrees_with(&self, reference: ReferenceType) -> bool {
        matches!(
            (self, reference),
            (Self::Figure, ReferenceType::Figure) | (Self::Table, ReferenceType::Table)
        )
    }
}

impl fmt::Display for CaptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of caption an in-body reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceType {
    Figure,
    Table,
    General,
}

impl ReferenceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Figure => "figure",
            Self::Table => "table",
            Self::General => "general",
        }
    }
}

impl fmt::Display for ReferenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable identifier of a caption: its position in the final caption list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CaptionId(pub usize);

/// A detected figure/table/chart caption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionCandidate {
    /// Trimmed caption body, without the "Figure 3:" prefix.
    pub title: String,
    pub page: u32,
    pub bbox: BBox,
    pub caption_type: CaptionType,
    /// Caption number, e.g. `"3"` or `"2.1"`.
    pub number: String,
    pub confidence: f64,
    pub font: FontInfo,
}

/// An in-body phrase that names a caption by number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceMatch {
    /// The matched phrase, e.g. `"如圖 1"` or `"see Figure 2"`.
    pub text: String,
    pub page: u32,
    pub reference_type: ReferenceType,
    pub reference_number: String,
    /// Text surrounding the match, trimmed.
    pub context_window: String,
    pub bbox: BBox,
    pub confidence: f64,
}

/// One caption together with every reference that plausibly mentions it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionContextPair {
    pub caption_id: CaptionId,
    pub caption: CaptionCandidate,
    /// References in discovery order.
    pub contexts: Vec<ReferenceMatch>,
    /// Caption title plus rendered contexts, used as prompt material.
    pub combined_text: String,
    pub pairing_confidence: f64,
}
