//! Schema document model
//!
//! The canonical in-memory representation of a relational schema: entities
//! with an ordered list of attributes, and labelled relationships between
//! entities. A document is never retained after it has been projected into
//! the live graph (see [`crate::reconciler`]).

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Marker embedded in an attribute string to flag a primary key
pub const PRIMARY_KEY_MARKER: &str = "(PK)";

/// Marker embedded in an attribute string to flag a foreign key
pub const FOREIGN_KEY_MARKER: &str = "(FK)";

/// Cardinality tokens understood by the diagram and requested from the generator
pub const CARDINALITIES: [&str; 4] = ["1:N", "N:1", "M:N", "1:1"];

/// A schema table: a stable id, a display name and ordered attribute strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Unique, stable identifier (also the graph node id)
    pub id: String,
    /// Display name (e.g., "User")
    pub name: String,
    /// Attribute strings in display order, e.g. `"id (PK)"`, `"user_id (FK)"`
    #[serde(default)]
    pub attributes: Vec<String>,
}

impl Entity {
    /// Create an entity from its id, name and attributes
    pub fn new<I, S>(id: impl Into<String>, name: impl Into<String>, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            name: name.into(),
            attributes: attributes.into_iter().map(Into::into).collect(),
        }
    }
}

/// A directed, labelled association between two entities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    /// Unique identifier (also the graph edge id)
    pub id: String,
    /// Source entity id
    pub source: String,
    /// Target entity id
    pub target: String,
    /// Cardinality token such as "1:N"
    #[serde(default)]
    pub label: String,
}

impl Relationship {
    /// Create a relationship between two entity ids
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            label: label.into(),
        }
    }
}

/// Root container: entities plus the relationships between them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDocument {
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

/// A violation of one of the document's soft invariants
///
/// Issues are reported and logged; they never make a document unparseable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Issue {
    DuplicateEntityId(String),
    DuplicateRelationshipId(String),
    /// Relationship id and the unresolved source entity id
    DanglingSource { relationship: String, entity: String },
    /// Relationship id and the unresolved target entity id
    DanglingTarget { relationship: String, entity: String },
}

impl std::fmt::Display for Issue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Issue::DuplicateEntityId(id) => write!(f, "duplicate entity id '{id}'"),
            Issue::DuplicateRelationshipId(id) => write!(f, "duplicate relationship id '{id}'"),
            Issue::DanglingSource {
                relationship,
                entity,
            } => write!(
                f,
                "relationship '{relationship}' references unknown source entity '{entity}'"
            ),
            Issue::DanglingTarget {
                relationship,
                entity,
            } => write!(
                f,
                "relationship '{relationship}' references unknown target entity '{entity}'"
            ),
        }
    }
}

impl SchemaDocument {
    /// Create a document from entities and relationships
    pub fn new(entities: Vec<Entity>, relationships: Vec<Relationship>) -> Self {
        Self {
            entities,
            relationships,
        }
    }

    /// Look up an entity by id (first match when ids are duplicated)
    pub fn entity(&self, id: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == id)
    }

    /// Check the soft invariants: unique ids and resolvable relationship endpoints
    pub fn validate(&self) -> Vec<Issue> {
        let mut issues = Vec::new();

        let mut entity_ids = HashSet::new();
        for entity in &self.entities {
            if !entity_ids.insert(entity.id.as_str()) {
                issues.push(Issue::DuplicateEntityId(entity.id.clone()));
            }
        }

        let mut relationship_ids = HashSet::new();
        for rel in &self.relationships {
            if !relationship_ids.insert(rel.id.as_str()) {
                issues.push(Issue::DuplicateRelationshipId(rel.id.clone()));
            }
            if !entity_ids.contains(rel.source.as_str()) {
                issues.push(Issue::DanglingSource {
                    relationship: rel.id.clone(),
                    entity: rel.source.clone(),
                });
            }
            if !entity_ids.contains(rel.target.as_str()) {
                issues.push(Issue::DanglingTarget {
                    relationship: rel.id.clone(),
                    entity: rel.target.clone(),
                });
            }
        }

        issues
    }
}

/// Key role of an attribute, derived from its embedded marker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeRole {
    pub is_primary_key: bool,
    pub is_foreign_key: bool,
}

/// Classify an attribute string by its `(PK)` / `(FK)` marker.
///
/// Used for rendering only; markers carry no referential meaning.
pub fn classify_attribute(attr: &str) -> AttributeRole {
    AttributeRole {
        is_primary_key: attr.contains(PRIMARY_KEY_MARKER),
        is_foreign_key: attr.contains(FOREIGN_KEY_MARKER),
    }
}

/// Attribute text with key markers removed, for display next to a badge
pub fn field_name(attr: &str) -> &str {
    let end = [PRIMARY_KEY_MARKER, FOREIGN_KEY_MARKER]
        .iter()
        .filter_map(|marker| attr.find(marker))
        .min()
        .unwrap_or(attr.len());
    attr[..end].trim()
}

/// Text seeded into the document text surface on startup
pub const DEFAULT_DOCUMENT_TEXT: &str = r#"{
  "entities": [
    {
      "id": "1",
      "name": "User",
      "attributes": ["id (PK)", "username", "email", "created_at"]
    },
    {
      "id": "2",
      "name": "Post",
      "attributes": ["id (PK)", "title", "content", "user_id (FK)", "created_at"]
    },
    {
      "id": "3",
      "name": "Comment",
      "attributes": ["id (PK)", "content", "user_id (FK)", "post_id (FK)", "created_at"]
    }
  ],
  "relationships": [
    { "id": "r1", "source": "1", "target": "2", "label": "1:N" },
    { "id": "r2", "source": "1", "target": "3", "label": "1:N" },
    { "id": "r3", "source": "2", "target": "3", "label": "1:N" }
  ]
}"#;

/// The built-in blog schema (User, Post, Comment)
pub fn default_document() -> SchemaDocument {
    SchemaDocument::new(
        vec![
            Entity::new("1", "User", ["id (PK)", "username", "email", "created_at"]),
            Entity::new(
                "2",
                "Post",
                ["id (PK)", "title", "content", "user_id (FK)", "created_at"],
            ),
            Entity::new(
                "3",
                "Comment",
                [
                    "id (PK)",
                    "content",
                    "user_id (FK)",
                    "post_id (FK)",
                    "created_at",
                ],
            ),
        ],
        vec![
            Relationship::new("r1", "1", "2", "1:N"),
            Relationship::new("r2", "1", "3", "1:N"),
            Relationship::new("r3", "2", "3", "1:N"),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_detects_primary_key() {
        let role = classify_attribute("id (PK)");
        assert!(role.is_primary_key);
        assert!(!role.is_foreign_key);
    }

    #[test]
    fn classify_detects_foreign_key() {
        let role = classify_attribute("user_id (FK)");
        assert!(!role.is_primary_key);
        assert!(role.is_foreign_key);
    }

    #[test]
    fn classify_plain_field_has_no_role() {
        assert_eq!(classify_attribute("email"), AttributeRole::default());
        // Markers are case sensitive
        assert_eq!(classify_attribute("id (pk)"), AttributeRole::default());
    }

    #[test]
    fn classify_allows_both_markers() {
        let role = classify_attribute("tenant_id (PK) (FK)");
        assert!(role.is_primary_key);
        assert!(role.is_foreign_key);
    }

    #[test]
    fn field_name_strips_markers() {
        assert_eq!(field_name("id (PK)"), "id");
        assert_eq!(field_name("user_id (FK)"), "user_id");
        assert_eq!(field_name("tenant_id (PK) (FK)"), "tenant_id");
        assert_eq!(field_name("email"), "email");
    }

    #[test]
    fn default_document_is_valid() {
        let doc = default_document();
        assert_eq!(doc.entities.len(), 3);
        assert_eq!(doc.relationships.len(), 3);
        assert!(doc.validate().is_empty());
    }

    #[test]
    fn default_text_matches_default_document() {
        let doc: SchemaDocument = serde_json::from_str(DEFAULT_DOCUMENT_TEXT).unwrap();
        assert_eq!(doc, default_document());
    }

    #[test]
    fn validate_reports_duplicate_ids() {
        let doc = SchemaDocument::new(
            vec![Entity::new("1", "A", ["id"]), Entity::new("1", "B", ["id"])],
            vec![
                Relationship::new("r1", "1", "1", "1:1"),
                Relationship::new("r1", "1", "1", "1:1"),
            ],
        );
        let issues = doc.validate();
        assert!(issues.contains(&Issue::DuplicateEntityId("1".to_string())));
        assert!(issues.contains(&Issue::DuplicateRelationshipId("r1".to_string())));
        assert_eq!(issues.len(), 2);
    }

    #[test]
    fn validate_reports_dangling_endpoints() {
        let doc = SchemaDocument::new(
            vec![Entity::new("1", "User", ["id (PK)"])],
            vec![Relationship::new("r1", "1", "9", "1:N")],
        );
        assert_eq!(
            doc.validate(),
            vec![Issue::DanglingTarget {
                relationship: "r1".to_string(),
                entity: "9".to_string(),
            }]
        );
    }

    #[test]
    fn issue_display() {
        let issue = Issue::DanglingSource {
            relationship: "r2".to_string(),
            entity: "7".to_string(),
        };
        assert_eq!(
            issue.to_string(),
            "relationship 'r2' references unknown source entity '7'"
        );
    }

    #[test]
    fn entity_lookup_returns_first_match() {
        let doc = default_document();
        assert_eq!(doc.entity("2").map(|e| e.name.as_str()), Some("Post"));
        assert!(doc.entity("42").is_none());
    }

    #[test]
    fn missing_optional_fields_default() {
        let doc: SchemaDocument =
            serde_json::from_str(r#"{"entities":[{"id":"1","name":"Tag"}]}"#).unwrap();
        assert!(doc.entities[0].attributes.is_empty());
        assert!(doc.relationships.is_empty());
    }
}
