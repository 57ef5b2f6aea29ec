//! HTML Writer
//!
//! Renders the diagram surface as a standalone HTML page: one card per
//! entity, laid out at its node position, plus a relationship table.

use std::fs;
use std::path::Path;

use askama::Template;

use crate::export::Surface;
use crate::io::{IoError, IoResult, Writer};
use crate::model::{classify_attribute, field_name};
use crate::projection::{GraphDocument, GraphNode};

/// Card width used to size the canvas
const CARD_WIDTH: f64 = 220.0;

/// Header height plus per-field row height, used to size the canvas
const CARD_HEADER: f64 = 40.0;
const FIELD_ROW: f64 = 24.0;

const CANVAS_MARGIN: f64 = 40.0;

/// One attribute line on an entity card
#[derive(Debug, Clone)]
pub struct FieldRow {
    pub class: &'static str,
    /// Attribute name without key markers; roles render as badges
    pub text: String,
    pub is_primary_key: bool,
    pub is_foreign_key: bool,
}

/// An entity card positioned on the canvas
#[derive(Debug, Clone)]
pub struct NodeCard {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub name: String,
    pub fields: Vec<FieldRow>,
}

/// A relationship row, endpoints shown by entity name
#[derive(Debug, Clone)]
pub struct EdgeRow {
    pub id: String,
    pub source: String,
    pub label: String,
    pub target: String,
}

#[derive(Template)]
#[template(path = "diagram.html")]
struct DiagramTemplate<'a> {
    title: &'a str,
    width: f64,
    height: f64,
    nodes: &'a [NodeCard],
    edges: &'a [EdgeRow],
    controls_visible: bool,
}

/// Writer for HTML diagram output
pub struct HtmlWriter {
    pub title: String,
}

impl HtmlWriter {
    pub fn new() -> Self {
        Self::with_title("ER Diagram")
    }

    pub fn with_title(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }

    /// Render the surface, honoring its control visibility
    pub fn render(&self, surface: &Surface) -> Result<String, askama::Error> {
        let graph = surface.graph();
        let nodes: Vec<NodeCard> = graph.nodes.iter().map(|n| node_card(n)).collect();
        let edges = edge_rows(graph);
        let (width, height) = canvas_size(&nodes);

        DiagramTemplate {
            title: &self.title,
            width,
            height,
            nodes: &nodes,
            edges: &edges,
            controls_visible: surface.controls_visible(),
        }
        .render()
    }
}

impl Default for HtmlWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn node_card(node: &GraphNode) -> NodeCard {
    let fields = node
        .data
        .attributes
        .iter()
        .map(|attr| {
            let role = classify_attribute(attr);
            let class = if role.is_primary_key {
                "field-pk"
            } else if role.is_foreign_key {
                "field-fk"
            } else {
                "field"
            };
            FieldRow {
                class,
                text: field_name(attr).to_string(),
                is_primary_key: role.is_primary_key,
                is_foreign_key: role.is_foreign_key,
            }
        })
        .collect();

    NodeCard {
        id: node.id.clone(),
        x: node.position.x,
        y: node.position.y,
        name: node.data.name.clone(),
        fields,
    }
}

fn edge_rows(graph: &GraphDocument) -> Vec<EdgeRow> {
    let name_of = |id: &str| {
        graph
            .node(id)
            .map(|n| n.data.name.clone())
            .unwrap_or_else(|| id.to_string())
    };

    graph
        .edges
        .iter()
        .map(|edge| EdgeRow {
            id: edge.id.clone(),
            source: name_of(&edge.source),
            label: edge.label.clone().unwrap_or_default(),
            target: name_of(&edge.target),
        })
        .collect()
}

fn canvas_size(nodes: &[NodeCard]) -> (f64, f64) {
    let width = nodes
        .iter()
        .map(|n| n.x + CARD_WIDTH)
        .fold(0.0, f64::max);
    let height = nodes
        .iter()
        .map(|n| n.y + CARD_HEADER + FIELD_ROW * n.fields.len() as f64)
        .fold(0.0, f64::max);
    (width + CANVAS_MARGIN, height + CANVAS_MARGIN)
}

impl Writer for HtmlWriter {
    /// Static pages are exports, so interactive controls are left out
    fn write(&self, graph: &GraphDocument, output: &Path) -> IoResult<()> {
        let mut surface = Surface::new(graph.clone());
        let html = {
            let hidden = surface.hide_controls();
            self.render(&hidden)
                .map_err(|e| IoError::Write(e.to_string()))?
        };

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(output, html)?;
        Ok(())
    }

    fn format_id(&self) -> &str {
        "html"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::{initial_graph, project};
    use crate::parser::DocumentShape;
    use crate::model::default_document;

    #[test]
    fn html_writer_format_id() {
        let writer = HtmlWriter::new();
        assert_eq!(writer.format_id(), "html");
    }

    #[test]
    fn render_includes_every_entity_and_field() {
        let html = HtmlWriter::new()
            .render(&Surface::new(initial_graph()))
            .expect("Should render");

        assert!(html.contains("<title>ER Diagram</title>"));
        assert!(html.contains("id=\"node-1\""));
        assert!(html.contains(">User</div>"));
        assert!(html.contains(">Post</div>"));
        assert!(html.contains(
            "<li class=\"field-fk\">user_id <span class=\"badge\" title=\"Foreign key\">FK</span></li>"
        ));
        assert!(html.contains("<li class=\"field\">username</li>"));
    }

    #[test]
    fn key_markers_render_as_badges() {
        let card = node_card(&crate::projection::entities_to_nodes(&[
            crate::model::Entity::new("m", "Membership", ["tenant_id (PK) (FK)", "note"]),
        ])[0]);

        assert_eq!(card.fields[0].text, "tenant_id");
        assert_eq!(card.fields[0].class, "field-pk");
        assert!(card.fields[0].is_primary_key && card.fields[0].is_foreign_key);
        assert_eq!(card.fields[1].text, "note");

        let html = HtmlWriter::new()
            .render(&Surface::new(GraphDocument::new(
                crate::projection::entities_to_nodes(&[crate::model::Entity::new(
                    "m",
                    "Membership",
                    ["tenant_id (PK) (FK)"],
                )]),
                vec![],
            )))
            .expect("Should render");
        assert!(!html.contains("(PK)"));
        assert!(html.contains("title=\"Primary key\">PK</span> <span class=\"badge\" title=\"Foreign key\">FK</span>"));
    }

    #[test]
    fn render_positions_cards_on_cascade() {
        let graph = project(DocumentShape::Schema(default_document()));
        let html = HtmlWriter::new()
            .render(&Surface::new(graph))
            .expect("Should render");

        assert!(html.contains("left: 0px; top: 0px;"));
        assert!(html.contains("left: 150px; top: 150px;"));
        assert!(html.contains("left: 300px; top: 300px;"));
    }

    #[test]
    fn render_shows_relationships_by_name() {
        let html = HtmlWriter::new()
            .render(&Surface::new(initial_graph()))
            .expect("Should render");
        assert!(html.contains("<td>User</td><td>1:N</td><td>Post</td>"));
    }

    #[test]
    fn render_escapes_markup_in_names() {
        let graph = GraphDocument::new(
            crate::projection::entities_to_nodes(&[crate::model::Entity::new(
                "x",
                "<script>",
                ["a & b"],
            )]),
            vec![],
        );
        let html = HtmlWriter::new()
            .render(&Surface::new(graph))
            .expect("Should render");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn add_field_button_follows_control_visibility() {
        let mut surface = Surface::new(initial_graph());
        let writer = HtmlWriter::new();

        let shown = writer.render(&surface).unwrap();
        assert_eq!(shown.matches("add-field-btn\"").count(), 2);

        surface.set_controls_visible(false);
        let hidden = writer.render(&surface).unwrap();
        assert!(!hidden.contains("+ Add Field"));
    }

    #[test]
    fn canvas_grows_with_positions() {
        let graph = project(DocumentShape::Schema(default_document()));
        let cards: Vec<NodeCard> = graph.nodes.iter().map(|n| node_card(n)).collect();
        let (width, height) = canvas_size(&cards);
        assert_eq!(width, 300.0 + CARD_WIDTH + CANVAS_MARGIN);
        assert_eq!(height, 300.0 + CARD_HEADER + FIELD_ROW * 5.0 + CANVAS_MARGIN);
        assert_eq!(canvas_size(&[]), (CANVAS_MARGIN, CANVAS_MARGIN));
    }

    #[test]
    fn write_produces_file_without_controls() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out").join("diagram.html");

        HtmlWriter::new()
            .write(&initial_graph(), &output)
            .expect("Write should succeed");

        let content = fs::read_to_string(&output).unwrap();
        assert!(content.starts_with("<!DOCTYPE html>"));
        assert!(!content.contains("add-field-btn\""));
    }
}
