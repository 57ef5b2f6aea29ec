//! Document parsing
//!
//! Turns raw text into a [`DocumentShape`]. The shape is decided once, here,
//! from the keys of the top-level object:
//!
//! - `entities` (array) selects the schema shape; a missing `relationships`
//!   key means no relationships.
//! - otherwise `nodes` (array) selects the graph-native shape; a missing
//!   `edges` key means no edges.
//!
//! Id uniqueness is not checked here; see [`SchemaDocument::validate`].

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::model::SchemaDocument;
use crate::projection::GraphDocument;

/// Errors that can occur while turning text into a document
#[derive(Error, Debug)]
pub enum SchemaError {
    /// The text is not well-formed structured data
    #[error("parse error: {0}")]
    Parse(String),

    /// Well-formed, but neither recognized shape (or a recognized shape with
    /// values of the wrong type)
    #[error("shape error: {0}")]
    Shape(String),
}

/// Structured text syntaxes accepted for documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextFormat {
    #[default]
    Json,
    Yaml,
}

/// A parsed document in one of the two accepted shapes
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentShape {
    /// `{ entities, relationships }`
    Schema(SchemaDocument),
    /// `{ nodes, edges }`, used as is
    Graph(GraphDocument),
}

impl DocumentShape {
    /// Short name of the shape, for logging
    pub fn kind(&self) -> &'static str {
        match self {
            DocumentShape::Schema(_) => "schema",
            DocumentShape::Graph(_) => "graph",
        }
    }
}

/// Parse JSON text into a document
pub fn parse(raw: &str) -> Result<DocumentShape, SchemaError> {
    parse_with(raw, TextFormat::Json)
}

/// Parse text in the given syntax into a document
pub fn parse_with(raw: &str, format: TextFormat) -> Result<DocumentShape, SchemaError> {
    let value: Value = match format {
        TextFormat::Json => {
            serde_json::from_str(raw).map_err(|e| SchemaError::Parse(e.to_string()))?
        }
        TextFormat::Yaml => {
            serde_yaml::from_str(raw).map_err(|e| SchemaError::Parse(e.to_string()))?
        }
    };
    from_value(value)
}

/// Resolve the shape of an already parsed value
pub fn from_value(value: Value) -> Result<DocumentShape, SchemaError> {
    let Value::Object(map) = value else {
        return Err(SchemaError::Shape(
            "expected an object at the top level".to_string(),
        ));
    };

    let has_array = |key: &str| map.get(key).is_some_and(Value::is_array);

    if has_array("entities") {
        let doc: SchemaDocument = serde_json::from_value(Value::Object(map))
            .map_err(|e| SchemaError::Shape(e.to_string()))?;
        Ok(DocumentShape::Schema(doc))
    } else if has_array("nodes") {
        let graph: GraphDocument = serde_json::from_value(Value::Object(map))
            .map_err(|e| SchemaError::Shape(e.to_string()))?;
        Ok(DocumentShape::Graph(graph))
    } else {
        Err(SchemaError::Shape(
            "expected an `entities` or `nodes` array".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Entity, Relationship};

    #[test]
    fn parses_schema_shape() {
        let shape = parse(
            r#"{"entities":[{"id":"1","name":"User","attributes":["id (PK)","name"]}],"relationships":[]}"#,
        )
        .unwrap();
        match shape {
            DocumentShape::Schema(doc) => {
                assert_eq!(
                    doc.entities,
                    vec![Entity::new("1", "User", ["id (PK)", "name"])]
                );
                assert!(doc.relationships.is_empty());
            }
            other => panic!("Expected schema shape, got {}", other.kind()),
        }
    }

    #[test]
    fn parses_graph_shape() {
        let shape = parse(
            r#"{"nodes":[{"id":"1","type":"entityNode","data":{"name":"User","attributes":[]},"position":{"x":5,"y":7}}],"edges":[{"id":"e1","source":"1","target":"1"}]}"#,
        )
        .unwrap();
        match shape {
            DocumentShape::Graph(graph) => {
                assert_eq!(graph.nodes.len(), 1);
                assert_eq!(graph.nodes[0].position.x, 5.0);
                assert_eq!(graph.edges.len(), 1);
                assert!(graph.edges[0].label.is_none());
            }
            other => panic!("Expected graph shape, got {}", other.kind()),
        }
    }

    #[test]
    fn schema_shape_wins_when_both_present() {
        let shape = parse(r#"{"entities":[],"nodes":[]}"#).unwrap();
        assert_eq!(shape.kind(), "schema");
    }

    #[test]
    fn missing_relationships_mean_none() {
        let shape = parse(r#"{"entities":[{"id":"1","name":"User"}]}"#).unwrap();
        let DocumentShape::Schema(doc) = shape else {
            panic!("Expected schema shape");
        };
        assert!(doc.relationships.is_empty());
    }

    #[test]
    fn malformed_text_is_parse_error() {
        let result = parse(r#"{"entities": [ "#);
        assert!(matches!(result, Err(SchemaError::Parse(_))));
    }

    #[test]
    fn unrecognized_object_is_shape_error() {
        let result = parse(r#"{"tables": []}"#);
        assert!(matches!(result, Err(SchemaError::Shape(_))));
    }

    #[test]
    fn non_object_is_shape_error() {
        assert!(matches!(parse("[1, 2]"), Err(SchemaError::Shape(_))));
        assert!(matches!(parse("42"), Err(SchemaError::Shape(_))));
    }

    #[test]
    fn entities_not_an_array_is_shape_error() {
        assert!(matches!(
            parse(r#"{"entities": {"id": "1"}}"#),
            Err(SchemaError::Shape(_))
        ));
    }

    #[test]
    fn wrongly_typed_entity_is_shape_error() {
        let result = parse(r#"{"entities":[{"id":1,"name":"User"}]}"#);
        assert!(matches!(result, Err(SchemaError::Shape(_))));
    }

    #[test]
    fn duplicate_ids_are_not_rejected() {
        let shape = parse(
            r#"{"entities":[{"id":"1","name":"A"},{"id":"1","name":"B"}],"relationships":[]}"#,
        );
        assert!(shape.is_ok());
    }

    #[test]
    fn yaml_matches_json() {
        let yaml = r#"
entities:
  - id: "1"
    name: User
    attributes: ["id (PK)", "email"]
  - id: "2"
    name: Post
    attributes: ["id (PK)", "user_id (FK)"]
relationships:
  - id: r1
    source: "1"
    target: "2"
    label: "1:N"
"#;
        let json = r#"{"entities":[{"id":"1","name":"User","attributes":["id (PK)","email"]},{"id":"2","name":"Post","attributes":["id (PK)","user_id (FK)"]}],"relationships":[{"id":"r1","source":"1","target":"2","label":"1:N"}]}"#;

        let from_yaml = parse_with(yaml, TextFormat::Yaml).unwrap();
        let from_json = parse_with(json, TextFormat::Json).unwrap();
        assert_eq!(from_yaml, from_json);

        let DocumentShape::Schema(doc) = from_yaml else {
            panic!("Expected schema shape");
        };
        assert_eq!(
            doc.relationships,
            vec![Relationship::new("r1", "1", "2", "1:N")]
        );
    }

    #[test]
    fn invalid_yaml_is_parse_error() {
        let result = parse_with("entities: [unclosed", TextFormat::Yaml);
        assert!(matches!(result, Err(SchemaError::Parse(_))));
    }

    #[test]
    fn schema_error_display() {
        let err = SchemaError::Shape("expected an `entities` or `nodes` array".to_string());
        assert_eq!(
            err.to_string(),
            "shape error: expected an `entities` or `nodes` array"
        );
    }
}
