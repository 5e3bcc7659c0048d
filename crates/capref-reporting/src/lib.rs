//! Export of caption-reference pairs for one or more documents.

mod export;
mod types;

pub use export::{export_document, export_documents, export_to_path};
pub use types::{DocumentReport, ExportFormat};
