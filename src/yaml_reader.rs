//! YAML Reader
//!
//! Reads schema or graph documents written in YAML.

use std::fs;
use std::path::Path;

use crate::io::{IoResult, Reader};
use crate::parser::{self, DocumentShape, TextFormat};

/// Reader for YAML documents
pub struct YamlReader;

impl YamlReader {
    /// Create a new YAML reader
    pub fn new() -> Self {
        Self
    }
}

impl Default for YamlReader {
    fn default() -> Self {
        Self::new()
    }
}

impl Reader for YamlReader {
    fn read(&self, input: &Path) -> IoResult<DocumentShape> {
        let content = fs::read_to_string(input)?;
        Ok(parser::parse_with(&content, TextFormat::Yaml)?)
    }

    fn supported_extensions(&self) -> &[&str] {
        &["yaml", "yml"]
    }
}
