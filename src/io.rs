//! Reader/Writer traits and format dispatch
//!
//! Readers turn a file into a [`DocumentShape`]; writers turn the live
//! [`GraphDocument`] into an output file. The CLI picks a reader from the
//! input file's extension and a writer from the `--format` flag.

use std::path::Path;

use thiserror::Error;

use crate::graph_writer::{GraphJsonWriter, SchemaJsonWriter};
use crate::html_writer::HtmlWriter;
use crate::json_reader::JsonReader;
use crate::parser::{DocumentShape, SchemaError};
use crate::projection::GraphDocument;
use crate::yaml_reader::YamlReader;

/// Errors that can occur during reading or writing
#[derive(Error, Debug)]
pub enum IoError {
    /// The file format is not supported
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The file extension could not be determined
    #[error("could not determine file format from path: {0}")]
    UnknownExtension(String),

    /// An I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file contents are not a document
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// A rendering/writing error occurred
    #[error("write error: {0}")]
    Write(String),
}

/// Result type for reader/writer operations
pub type IoResult<T> = Result<T, IoError>;

/// A reader parses an input file into a document of either shape
pub trait Reader {
    /// Parse the input file
    fn read(&self, input: &Path) -> IoResult<DocumentShape>;

    /// File extensions this reader can handle (e.g., ["yaml", "yml"])
    fn supported_extensions(&self) -> &[&str];

    /// Check if this reader can handle the given file extension
    fn supports_extension(&self, ext: &str) -> bool {
        self.supported_extensions()
            .iter()
            .any(|e| e.eq_ignore_ascii_case(ext))
    }
}

/// A writer outputs the live graph in a specific format
pub trait Writer {
    /// Write the graph to the output path
    fn write(&self, graph: &GraphDocument, output: &Path) -> IoResult<()>;

    /// Identifier for this output format (e.g., "graph", "json", "html")
    fn format_id(&self) -> &str;
}

/// Registry of available readers and writers
pub struct FormatRegistry {
    readers: Vec<Box<dyn Reader>>,
    writers: Vec<Box<dyn Writer>>,
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            readers: Vec::new(),
            writers: Vec::new(),
        }
    }

    /// Create a registry with all default readers and writers registered
    ///
    /// Currently registers:
    /// - Readers: `JsonReader` (json), `YamlReader` (yaml, yml)
    /// - Writers: `GraphJsonWriter` (graph), `SchemaJsonWriter` (json),
    ///   `HtmlWriter` (html)
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register_reader(Box::new(JsonReader::new()));
        registry.register_reader(Box::new(YamlReader::new()));
        registry.register_writer(Box::new(GraphJsonWriter::new()));
        registry.register_writer(Box::new(SchemaJsonWriter::new()));
        registry.register_writer(Box::new(HtmlWriter::new()));
        registry
    }

    /// Register a reader
    pub fn register_reader(&mut self, reader: Box<dyn Reader>) {
        self.readers.push(reader);
    }

    /// Register a writer
    pub fn register_writer(&mut self, writer: Box<dyn Writer>) {
        self.writers.push(writer);
    }

    /// Find a reader for the given file extension
    pub fn reader_for_extension(&self, ext: &str) -> Option<&dyn Reader> {
        self.readers
            .iter()
            .find(|r| r.supports_extension(ext))
            .map(|r| r.as_ref())
    }

    /// Find a writer by format ID
    pub fn writer_for_format(&self, format_id: &str) -> Option<&dyn Writer> {
        self.writers
            .iter()
            .find(|w| w.format_id().eq_ignore_ascii_case(format_id))
            .map(|w| w.as_ref())
    }

    /// Get file extension from a path
    pub fn extension_from_path(path: &Path) -> Option<&str> {
        path.extension().and_then(|e| e.to_str())
    }

    /// Find a reader for the given path based on its extension
    pub fn reader_for_path(&self, path: &Path) -> IoResult<&dyn Reader> {
        let ext = Self::extension_from_path(path)
            .ok_or_else(|| IoError::UnknownExtension(path.display().to_string()))?;

        self.reader_for_extension(ext)
            .ok_or_else(|| IoError::UnsupportedFormat(ext.to_string()))
    }

    /// Find a writer for the format ID or fail with `UnsupportedFormat`
    pub fn require_writer(&self, format_id: &str) -> IoResult<&dyn Writer> {
        self.writer_for_format(format_id)
            .ok_or_else(|| IoError::UnsupportedFormat(format_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SchemaDocument;
    use std::path::PathBuf;

    // Mock reader for testing
    struct MockReader {
        extensions: Vec<&'static str>,
    }

    impl Reader for MockReader {
        fn read(&self, _input: &Path) -> IoResult<DocumentShape> {
            Ok(DocumentShape::Schema(SchemaDocument::default()))
        }

        fn supported_extensions(&self) -> &[&str] {
            &self.extensions
        }
    }

    // Mock writer for testing
    struct MockWriter {
        format: &'static str,
    }

    impl Writer for MockWriter {
        fn write(&self, _graph: &GraphDocument, _output: &Path) -> IoResult<()> {
            Ok(())
        }

        fn format_id(&self) -> &str {
            self.format
        }
    }

    #[test]
    fn reader_supports_extension_case_insensitive() {
        let reader = MockReader {
            extensions: vec!["json"],
        };
        assert!(reader.supports_extension("json"));
        assert!(reader.supports_extension("JSON"));
        assert!(!reader.supports_extension("yaml"));
    }

    #[test]
    fn registry_finds_writer_by_format() {
        let mut registry = FormatRegistry::new();
        registry.register_writer(Box::new(MockWriter { format: "html" }));

        assert!(registry.writer_for_format("html").is_some());
        assert!(registry.writer_for_format("HTML").is_some()); // case insensitive
        assert!(registry.writer_for_format("graph").is_none());
    }

    #[test]
    fn registry_reader_for_path_extracts_extension() {
        let mut registry = FormatRegistry::new();
        registry.register_reader(Box::new(MockReader {
            extensions: vec!["json"],
        }));

        let path = PathBuf::from("/some/path/schema.json");
        assert!(registry.reader_for_path(&path).is_ok());

        let unknown_path = PathBuf::from("/some/path/schema.sql");
        assert!(matches!(
            registry.reader_for_path(&unknown_path),
            Err(IoError::UnsupportedFormat(_))
        ));

        let no_extension = PathBuf::from("/some/path/schema");
        assert!(matches!(
            registry.reader_for_path(&no_extension),
            Err(IoError::UnknownExtension(_))
        ));
    }

    #[test]
    fn mock_writer_succeeds() {
        let writer = MockWriter { format: "html" };
        let result = writer.write(&GraphDocument::default(), Path::new("output"));
        assert!(result.is_ok());
    }

    #[test]
    fn io_error_display() {
        let err = IoError::UnsupportedFormat("sql".to_string());
        assert_eq!(err.to_string(), "unsupported format: sql");

        let err = IoError::from(SchemaError::Parse("EOF while parsing".to_string()));
        assert_eq!(err.to_string(), "parse error: EOF while parsing");
    }

    #[test]
    fn with_defaults_registers_readers() {
        let registry = FormatRegistry::with_defaults();

        assert!(registry.reader_for_extension("json").is_some());
        assert!(registry.reader_for_extension("yaml").is_some());
        assert!(registry.reader_for_extension("yml").is_some());
        assert!(registry.reader_for_extension("ttl").is_none());
    }

    #[test]
    fn with_defaults_registers_writers() {
        let registry = FormatRegistry::with_defaults();

        assert!(registry.writer_for_format("graph").is_some());
        assert!(registry.writer_for_format("json").is_some());
        assert!(registry.writer_for_format("HTML").is_some());
        assert!(matches!(
            registry.require_writer("svg"),
            Err(IoError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn with_defaults_reader_can_read_fixture() {
        let registry = FormatRegistry::with_defaults();
        let path = PathBuf::from("tests/fixtures/blog.yaml");

        let reader = registry
            .reader_for_path(&path)
            .expect("Should find YAML reader");
        let shape = reader.read(&path).expect("Should parse YAML fixture");
        assert_eq!(shape.kind(), "schema");
    }
}
