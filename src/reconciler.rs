//! Live graph state
//!
//! The [`Reconciler`] is the single owner of the diagram's nodes and edges.
//! Every input (rendered text, a generated document, an attribute edit, a
//! connection gesture, a renderer change event) arrives as one of the
//! operations below or as a [`Message`], and each completes before the next
//! begins.
//!
//! Applying a document always replaces the whole graph. Positions and edits
//! of entities that exist in both the old and new document are not carried
//! over.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::editor::AttributeEdit;
use crate::model::{Issue, SchemaDocument};
use crate::parser::{self, DocumentShape, SchemaError, TextFormat};
use crate::projection::{self, EdgeStyle, GraphDocument, GraphEdge, GraphNode, Position};

/// Errors raised by graph mutations that name a missing node
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("unknown node: {0}")]
    UnknownNode(String),
}

/// Where a document being applied came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ApplyMode {
    /// Explicit render of the document text surface
    ReplaceAll,
    /// Result of the ingestion pipeline
    FromIngestion,
}

/// Summary of a successful [`Reconciler::apply_document`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyReport {
    pub mode: ApplyMode,
    pub node_count: usize,
    pub edge_count: usize,
    /// Ids of edges dropped because an endpoint did not resolve
    pub dropped_edges: Vec<String>,
    /// Soft invariant violations found in a schema-shaped document
    pub issues: Vec<Issue>,
}

/// Extra data supplied by the renderer when the user draws a connection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionMetadata {
    #[serde(default)]
    pub source_handle: Option<String>,
    #[serde(default)]
    pub target_handle: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
}

/// A node change reported by the renderer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NodeChange {
    /// Node dragged; `position` is absent while a drag is settling
    Position {
        id: String,
        #[serde(default)]
        position: Option<Position>,
    },
    Select {
        id: String,
        selected: bool,
    },
    Remove {
        id: String,
    },
    /// Measurement and bookkeeping events (`dimensions`, `add`, `reset`)
    #[serde(other)]
    Other,
}

/// An edge change reported by the renderer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EdgeChange {
    Select {
        id: String,
        selected: bool,
    },
    Remove {
        id: String,
    },
    /// Events with no counterpart in the graph (`add`, `reset`)
    #[serde(other)]
    Other,
}

/// A delta dispatched to the reconciler
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    ApplyDocument {
        shape: DocumentShape,
        mode: ApplyMode,
    },
    EditAttributes(AttributeEdit),
    Connect {
        source: String,
        target: String,
        metadata: ConnectionMetadata,
    },
    NodesChanged(Vec<NodeChange>),
    EdgesChanged(Vec<EdgeChange>),
}

/// Result of dispatching a [`Message`]
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Applied(ApplyReport),
    /// Whether an attribute edit changed anything
    AttributesEdited(bool),
    /// Id of the new edge
    Connected(String),
    /// Number of changes that matched a node or edge
    ChangesApplied(usize),
}

/// Owner of the live node and edge lists
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    graph: GraphDocument,
}

impl Reconciler {
    /// An empty diagram
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing graph
    pub fn from_graph(graph: GraphDocument) -> Self {
        Self { graph }
    }

    /// Start from the built-in User/Post diagram
    pub fn with_initial_graph() -> Self {
        Self::from_graph(projection::initial_graph())
    }

    pub fn graph(&self) -> &GraphDocument {
        &self.graph
    }

    pub fn nodes(&self) -> &[Arc<GraphNode>] {
        &self.graph.nodes
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.graph.edges
    }

    pub fn node(&self, id: &str) -> Option<&Arc<GraphNode>> {
        self.graph.node(id)
    }

    /// First node with `id`, the same one [`GraphDocument::node`] finds
    fn node_mut(&mut self, id: &str) -> Option<&mut Arc<GraphNode>> {
        self.graph.nodes.iter_mut().find(|n| n.id == id)
    }

    /// The live graph expressed as a schema document
    pub fn to_document(&self) -> SchemaDocument {
        self.graph.to_document()
    }

    /// Replace the whole graph with the projection of `shape`.
    ///
    /// Edges whose source or target does not name a projected node are
    /// dropped and listed in the report.
    pub fn apply_document(&mut self, shape: DocumentShape, mode: ApplyMode) -> ApplyReport {
        let issues = match &shape {
            DocumentShape::Schema(doc) => doc.validate(),
            DocumentShape::Graph(_) => Vec::new(),
        };
        for issue in &issues {
            tracing::warn!(?mode, "{issue}");
        }

        let kind = shape.kind();
        let mut graph = projection::project(shape);

        let node_ids: HashSet<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
        let (edges, dropped): (Vec<_>, Vec<_>) = std::mem::take(&mut graph.edges)
            .into_iter()
            .partition(|e| node_ids.contains(e.source.as_str()) && node_ids.contains(e.target.as_str()));
        graph.edges = edges;

        let dropped_edges: Vec<String> = dropped.into_iter().map(|e| e.id).collect();
        if !dropped_edges.is_empty() {
            tracing::warn!(edges = ?dropped_edges, "dropping edges with unresolved endpoints");
        }

        let report = ApplyReport {
            mode,
            node_count: graph.nodes.len(),
            edge_count: graph.edges.len(),
            dropped_edges,
            issues,
        };
        tracing::info!(
            ?mode,
            shape = kind,
            nodes = report.node_count,
            edges = report.edge_count,
            "replaced diagram"
        );

        self.graph = graph;
        report
    }

    /// Parse `raw` and apply it. On any parse failure the graph is left
    /// exactly as it was.
    pub fn apply_text(
        &mut self,
        raw: &str,
        format: TextFormat,
        mode: ApplyMode,
    ) -> Result<ApplyReport, SchemaError> {
        let shape = parser::parse_with(raw, format)?;
        Ok(self.apply_document(shape, mode))
    }

    /// Replace one node's attribute list, leaving its position and every
    /// other node untouched.
    ///
    /// Returns `Ok(false)` when the list is already identical, so repeated
    /// delivery of the same edit is a no-op.
    pub fn apply_attribute_edit(&mut self, edit: &AttributeEdit) -> Result<bool, ReconcileError> {
        let node = self
            .node_mut(&edit.entity_id)
            .ok_or_else(|| ReconcileError::UnknownNode(edit.entity_id.clone()))?;

        let changed = node.data.attributes != edit.new_attributes;
        if changed {
            *node = Arc::new(node.with_attributes(edit.new_attributes.clone()));
            tracing::debug!(
                node = %edit.entity_id,
                attributes = edit.new_attributes.len(),
                "attributes edited"
            );
        }
        Ok(changed)
    }

    /// Append an edge between two existing nodes. The pair may already be
    /// connected; parallel edges are kept.
    pub fn connect(
        &mut self,
        source: &str,
        target: &str,
        metadata: ConnectionMetadata,
    ) -> Result<&GraphEdge, ReconcileError> {
        for endpoint in [source, target] {
            if !self.graph.contains_node(endpoint) {
                return Err(ReconcileError::UnknownNode(endpoint.to_string()));
            }
        }

        let id = self.next_edge_id(source, target);
        tracing::debug!(edge = %id, %source, %target, "connected");
        let index = self.graph.edges.len();
        self.graph.edges.push(GraphEdge {
            label: metadata.label,
            style: Some(EdgeStyle::default()),
            source_handle: metadata.source_handle,
            target_handle: metadata.target_handle,
            ..GraphEdge::new(id, source, target)
        });
        Ok(&self.graph.edges[index])
    }

    /// Apply node changes from the renderer. Changes naming unknown nodes
    /// and change kinds the graph does not track are skipped. Removing a
    /// node removes every node with that id along with its edges.
    pub fn apply_node_changes(&mut self, changes: Vec<NodeChange>) -> usize {
        let mut applied = 0;
        for change in changes {
            match change {
                NodeChange::Position { id, position } => {
                    let Some(position) = position else {
                        continue;
                    };
                    if let Some(node) = self.node_mut(&id) {
                        Arc::make_mut(node).position = position;
                        applied += 1;
                    }
                }
                NodeChange::Select { id, selected } => {
                    if let Some(node) = self.node_mut(&id) {
                        if node.selected != Some(selected) {
                            Arc::make_mut(node).selected = Some(selected);
                        }
                        applied += 1;
                    }
                }
                NodeChange::Remove { id } => {
                    let before = self.graph.nodes.len();
                    self.graph.nodes.retain(|n| n.id != id);
                    if self.graph.nodes.len() != before {
                        self.graph.edges.retain(|e| !e.touches(&id));
                        tracing::debug!(node = %id, "node removed");
                        applied += 1;
                    }
                }
                NodeChange::Other => {}
            }
        }
        applied
    }

    /// Apply edge changes from the renderer. Unknown edge ids and change
    /// kinds the graph does not track are skipped.
    pub fn apply_edge_changes(&mut self, changes: Vec<EdgeChange>) -> usize {
        let mut applied = 0;
        for change in changes {
            match change {
                EdgeChange::Select { id, selected } => {
                    if let Some(edge) = self.graph.edges.iter_mut().find(|e| e.id == id) {
                        edge.selected = Some(selected);
                        applied += 1;
                    }
                }
                EdgeChange::Remove { id } => {
                    let before = self.graph.edges.len();
                    self.graph.edges.retain(|e| e.id != id);
                    if self.graph.edges.len() != before {
                        tracing::debug!(edge = %id, "edge removed");
                        applied += 1;
                    }
                }
                EdgeChange::Other => {}
            }
        }
        applied
    }

    /// Single entry point for any delta
    pub fn dispatch(&mut self, message: Message) -> Result<Outcome, ReconcileError> {
        match message {
            Message::ApplyDocument { shape, mode } => {
                Ok(Outcome::Applied(self.apply_document(shape, mode)))
            }
            Message::EditAttributes(edit) => self
                .apply_attribute_edit(&edit)
                .map(Outcome::AttributesEdited),
            Message::Connect {
                source,
                target,
                metadata,
            } => self
                .connect(&source, &target, metadata)
                .map(|edge| Outcome::Connected(edge.id.clone())),
            Message::NodesChanged(changes) => {
                Ok(Outcome::ChangesApplied(self.apply_node_changes(changes)))
            }
            Message::EdgesChanged(changes) => {
                Ok(Outcome::ChangesApplied(self.apply_edge_changes(changes)))
            }
        }
    }

    fn next_edge_id(&self, source: &str, target: &str) -> String {
        let base = format!("e{source}-{target}");
        if self.graph.edge(&base).is_none() {
            return base;
        }
        (1..)
            .map(|n| format!("{base}-{n}"))
            .find(|candidate| self.graph.edge(candidate).is_none())
            .unwrap_or(base)
    }
}
