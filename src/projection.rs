//! Graph projection
//!
//! Converts a [`SchemaDocument`] into the positioned node/edge form consumed by
//! the diagram renderer, and back. Nodes carry their entity's name and
//! attributes by value; the live copy is owned by the
//! [`Reconciler`](crate::reconciler::Reconciler).
//!
//! Positions follow a diagonal cascade: entity `i` sits at `(150·i, 150·i)`.
//! This never overlaps for a handful of entities but is not a layout
//! algorithm; large documents will run off the visible area.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::model::{Entity, Relationship, SchemaDocument};
use crate::parser::DocumentShape;

/// Renderer node type registered for entity cards
pub const ENTITY_NODE_TYPE: &str = "entityNode";

/// Offset between consecutive entities along both axes
pub const CASCADE_STEP: f64 = 150.0;

/// Stroke color applied to every relationship edge
pub const EDGE_STROKE: &str = "#555";

fn entity_node_type() -> String {
    ENTITY_NODE_TYPE.to_string()
}

/// Canvas coordinates of a node's top-left corner
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Position of the `index`-th entity in the cascade
    pub fn cascade(index: usize) -> Self {
        let offset = CASCADE_STEP * index as f64;
        Self::new(offset, offset)
    }
}

/// Data rendered inside an entity card
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub attributes: Vec<String>,

    /// Renderer-specific keys, carried through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NodeData {
    pub fn new(name: impl Into<String>, attributes: Vec<String>) -> Self {
        Self {
            name: name.into(),
            attributes,
            extra: Map::new(),
        }
    }
}

/// A positioned entity card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Same as the entity id
    pub id: String,

    /// Renderer node type, `entityNode` for projected entities
    #[serde(rename = "type", default = "entity_node_type")]
    pub kind: String,

    #[serde(default)]
    pub data: NodeData,

    #[serde(default)]
    pub position: Position,

    /// Selection state reported by the renderer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected: Option<bool>,

    /// Any other renderer fields (`style`, `width`, ...), carried through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GraphNode {
    /// An entity card with no renderer extras
    pub fn new(id: impl Into<String>, data: NodeData, position: Position) -> Self {
        Self {
            id: id.into(),
            kind: entity_node_type(),
            data,
            position,
            selected: None,
            extra: Map::new(),
        }
    }

    /// Copy of this node with a different attribute list
    pub fn with_attributes(&self, attributes: Vec<String>) -> Self {
        let mut node = self.clone();
        node.data.attributes = attributes;
        node
    }
}

impl AsRef<GraphNode> for GraphNode {
    fn as_ref(&self) -> &GraphNode {
        self
    }
}

/// Stroke style of an edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeStyle {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub stroke: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for EdgeStyle {
    fn default() -> Self {
        Self {
            stroke: EDGE_STROKE.to_string(),
            extra: Map::new(),
        }
    }
}

/// Text style of an edge label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelStyle {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub font_weight: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self {
            font_weight: "bold".to_string(),
            extra: Map::new(),
        }
    }
}

/// A connection between two nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    pub id: String,

    /// Source node id
    pub source: String,

    /// Target node id
    pub target: String,

    /// Cardinality token shown on the edge
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<EdgeStyle>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_style: Option<LabelStyle>,

    /// Handle on the source node the connection was drawn from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,

    /// Handle on the target node the connection was drawn to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,

    /// Selection state reported by the renderer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected: Option<bool>,

    /// Any other renderer fields (`type`, `animated`, ...), carried through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GraphEdge {
    /// An unstyled edge with no renderer extras
    pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            label: None,
            style: None,
            label_style: None,
            source_handle: None,
            target_handle: None,
            selected: None,
            extra: Map::new(),
        }
    }

    /// Whether this edge touches the given node
    pub fn touches(&self, node_id: &str) -> bool {
        self.source == node_id || self.target == node_id
    }
}

/// The graph-native document shape: `{ nodes, edges }`
///
/// Nodes are reference counted so that an edit to one node leaves every
/// other node's allocation shared with the previous state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    pub nodes: Vec<Arc<GraphNode>>,
    #[serde(default)]
    pub edges: Vec<GraphEdge>,
}

impl GraphDocument {
    /// Create a graph from owned nodes and edges
    pub fn new(nodes: Vec<GraphNode>, edges: Vec<GraphEdge>) -> Self {
        Self {
            nodes: nodes.into_iter().map(Arc::new).collect(),
            edges,
        }
    }

    /// Look up a node by id (first match when ids are duplicated)
    pub fn node(&self, id: &str) -> Option<&Arc<GraphNode>> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Look up an edge by id
    pub fn edge(&self, id: &str) -> Option<&GraphEdge> {
        self.edges.iter().find(|e| e.id == id)
    }

    /// Whether a node with the given id exists
    pub fn contains_node(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    /// Recover the schema document this graph represents
    pub fn to_document(&self) -> SchemaDocument {
        graph_to_document_shape(&self.nodes, &self.edges)
    }
}

/// Project entities into nodes on the diagonal cascade
pub fn entities_to_nodes(entities: &[Entity]) -> Vec<GraphNode> {
    entities
        .iter()
        .enumerate()
        .map(|(index, entity)| {
            GraphNode::new(
                entity.id.clone(),
                NodeData::new(entity.name.clone(), entity.attributes.clone()),
                Position::cascade(index),
            )
        })
        .collect()
}

/// Project relationships into styled edges, one per relationship
pub fn relationships_to_edges(relationships: &[Relationship]) -> Vec<GraphEdge> {
    relationships
        .iter()
        .map(|rel| GraphEdge {
            label: Some(rel.label.clone()),
            style: Some(EdgeStyle::default()),
            label_style: Some(LabelStyle::default()),
            ..GraphEdge::new(rel.id.clone(), rel.source.clone(), rel.target.clone())
        })
        .collect()
}

/// Inverse projection: drop positions and styles, keep ids, names,
/// attributes and labels
pub fn graph_to_document_shape<N: AsRef<GraphNode>>(
    nodes: &[N],
    edges: &[GraphEdge],
) -> SchemaDocument {
    let entities = nodes
        .iter()
        .map(|node| {
            let node = node.as_ref();
            Entity {
                id: node.id.clone(),
                name: node.data.name.clone(),
                attributes: node.data.attributes.clone(),
            }
        })
        .collect();

    let relationships = edges
        .iter()
        .map(|edge| Relationship {
            id: edge.id.clone(),
            source: edge.source.clone(),
            target: edge.target.clone(),
            label: edge.label.clone().unwrap_or_default(),
        })
        .collect();

    SchemaDocument::new(entities, relationships)
}

/// Project a parsed document of either shape into a graph.
///
/// Graph-native input is taken as is.
pub fn project(shape: DocumentShape) -> GraphDocument {
    match shape {
        DocumentShape::Schema(doc) => GraphDocument::new(
            entities_to_nodes(&doc.entities),
            relationships_to_edges(&doc.relationships),
        ),
        DocumentShape::Graph(graph) => graph,
    }
}

/// The diagram shown before anything has been rendered: User and Post
/// joined by a one-to-many edge
pub fn initial_graph() -> GraphDocument {
    let nodes = entities_to_nodes(&[
        Entity::new("1", "User", ["id (PK)", "username", "email", "created_at"]),
        Entity::new(
            "2",
            "Post",
            ["id (PK)", "title", "content", "user_id (FK)", "created_at"],
        ),
    ]);
    let edges = vec![GraphEdge {
        label: Some("1:N".to_string()),
        style: Some(EdgeStyle::default()),
        ..GraphEdge::new("e1-2", "1", "2")
    }];
    GraphDocument::new(nodes, edges)
}
