//! System instruction sent with every generation request
//!
//! The instruction is versioned; bump [`SYSTEM_INSTRUCTION_VERSION`] whenever
//! the template under `templates/system_instruction.txt` changes meaning.

use askama::Template;

use crate::model::{CARDINALITIES, FOREIGN_KEY_MARKER, PRIMARY_KEY_MARKER};

pub const SYSTEM_INSTRUCTION_VERSION: &str = "1";

const EXAMPLE_OUTPUT: &str = r#"{
  "entities": [
    {
      "id": "1",
      "name": "EntityName",
      "attributes": ["id (PK)", "attribute1", "attribute2", "foreign_key_id (FK)"]
    }
  ],
  "relationships": [
    { "id": "r1", "source": "1", "target": "2", "label": "1:N" }
  ]
}"#;

#[derive(Template)]
#[template(path = "system_instruction.txt")]
struct SystemInstructionTemplate<'a> {
    pk_marker: &'a str,
    fk_marker: &'a str,
    cardinalities: String,
    example: &'a str,
}

/// Render the current system instruction
pub fn system_instruction() -> Result<String, askama::Error> {
    SystemInstructionTemplate {
        pk_marker: PRIMARY_KEY_MARKER,
        fk_marker: FOREIGN_KEY_MARKER,
        cardinalities: CARDINALITIES.join(" | "),
        example: EXAMPLE_OUTPUT,
    }
    .render()
}
