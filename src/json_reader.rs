//! JSON Reader
//!
//! Reads schema (`entities`/`relationships`) or graph (`nodes`/`edges`)
//! documents from JSON files.

use std::fs;
use std::path::Path;

use crate::io::{IoResult, Reader};
use crate::parser::{self, DocumentShape, TextFormat};

/// Reader for JSON documents
pub struct JsonReader;

impl JsonReader {
    /// Create a new JSON reader
    pub fn new() -> Self {
        Self
    }
}

impl Default for JsonReader {
    fn default() -> Self {
        Self::new()
    }
}

impl Reader for JsonReader {
    fn read(&self, input: &Path) -> IoResult<DocumentShape> {
        let content = fs::read_to_string(input)?;
        Ok(parser::parse_with(&content, TextFormat::Json)?)
    }

    fn supported_extensions(&self) -> &[&str] {
        &["json"]
    }
}
