use std::fmt;

use capref_core::{CaptionContextPair, CaptionType};
use serde::Serialize;

/// Contexts forwarded to the provider per caption.
pub const MAX_CONTEXTS: usize = 3;

/// The label a prompt uses for a caption: `圖` for figures and charts,
/// `表` for tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TypeLabel {
    #[serde(rename = "圖")]
    Figure,
    #[serde(rename = "表")]
    Table,
}

impl TypeLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Figure => "圖",
            Self::Table => "表",
        }
    }
}

impl From<CaptionType> for TypeLabel {
    fn from(t: CaptionType) -> Self {
        match t {
            CaptionType::Table => Self::Table,
            CaptionType::Figure | CaptionType::Chart => Self::Figure,
        }
    }
}

impl fmt::Display for TypeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the provider needs to describe one caption.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DescriptionRequest {
    pub caption_text: String,
    pub type_label: TypeLabel,
    pub caption_number: String,
    pub related_context: Vec<String>,
    pub page: u32,
}

impl DescriptionRequest {
    /// Build a request from a matched pair, keeping the context windows of at
    /// most the first [`MAX_CONTEXTS`] references.
    pub fn from_pair(pair: &CaptionContextPair) -> Self {
        Self {
            caption_text: pair.caption.title.clone(),
            type_label: pair.caption.caption_type.into(),
            caption_number: pair.caption.number.clone(),
            related_context: pair
                .contexts
                .iter()
                .take(MAX_CONTEXTS)
                .map(|r| r.context_window.clone())
                .collect(),
            page: pair.caption.page,
        }
    }
}
