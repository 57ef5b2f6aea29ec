//! JSON writers for the live graph
//!
//! `GraphJsonWriter` emits the graph-native `{ nodes, edges }` shape with
//! positions and styles. `SchemaJsonWriter` emits the `{ entities,
//! relationships }` shape recovered from the graph, suitable for pasting
//! back into the document text surface.

use std::path::Path;

use serde::Serialize;

use crate::io::{IoError, IoResult, Writer};
use crate::projection::GraphDocument;

fn write_pretty<T: Serialize>(value: &T, output: &Path) -> IoResult<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| IoError::Write(format!("JSON serialization failed: {}", e)))?;

    std::fs::write(output, json).map_err(IoError::Io)?;

    Ok(())
}

/// Writer for the graph-native shape
pub struct GraphJsonWriter;

impl GraphJsonWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GraphJsonWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl Writer for GraphJsonWriter {
    fn write(&self, graph: &GraphDocument, output: &Path) -> IoResult<()> {
        write_pretty(graph, output)
    }

    fn format_id(&self) -> &str {
        "graph"
    }
}

/// Writer for the schema document shape
pub struct SchemaJsonWriter;

impl SchemaJsonWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SchemaJsonWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl Writer for SchemaJsonWriter {
    fn write(&self, graph: &GraphDocument, output: &Path) -> IoResult<()> {
        write_pretty(&graph.to_document(), output)
    }

    fn format_id(&self) -> &str {
        "json"
    }
}
