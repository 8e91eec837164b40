//! Template parsing entry point.
//!
//! Dispatches an uploaded file to the right parser by extension and runs
//! the full pipeline: parse into the flat element stream, then shape it
//! with the structure manager. Parsing is all-or-nothing per document.

use std::sync::Arc;

use log::info;
use serde_json::Value;

use docstruct_core::{DocStructError, Result};
use docstruct_structure::StructureManager;

use crate::docx::DocxParser;
use crate::storage::FileStorage;

/// Parses uploaded template documents into structured element trees.
pub struct ParserService {
    storage: Arc<dyn FileStorage>,
}

impl ParserService {
    /// Create a service persisting extracted media through `storage`
    #[must_use]
    pub fn new(storage: Arc<dyn FileStorage>) -> Self {
        Self { storage }
    }

    /// Parse a document into structured nodes.
    ///
    /// The parser is chosen by the lowercased file extension; only
    /// `docx` is supported. Extracted media lands under `media_dir`.
    ///
    /// # Errors
    ///
    /// Fails on unsupported extensions, malformed archives or an invalid
    /// structure specification.
    pub fn parse_template(
        &self,
        file_name: &str,
        bytes: &[u8],
        structure: &Value,
        media_dir: &str,
    ) -> Result<Vec<Value>> {
        let extension = file_extension(file_name);
        match extension.as_str() {
            "docx" => {
                info!("parsing template {file_name} ({} bytes)", bytes.len());
                let parser = DocxParser::new(bytes, Arc::clone(&self.storage), media_dir)?;
                let elements = parser.parse()?;
                let manager = StructureManager::new(structure)?;
                Ok(manager.apply(elements))
            }
            other => Err(DocStructError::Format(other.to_string())),
        }
    }
}

fn file_extension(file_name: &str) -> String {
    file_name
        .rsplit_once('.')
        .map(|(_, extension)| extension.to_ascii_lowercase())
        .unwrap_or_default()
}
