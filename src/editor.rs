//! In-place attribute editing for a single entity card
//!
//! The editor never owns the attribute list. Every operation reads the
//! node's current attributes and, when the list changes, returns an
//! [`AttributeEdit`] carrying the complete new list for the
//! [`Reconciler`](crate::reconciler::Reconciler) to apply.

use serde::{Deserialize, Serialize};

/// Name given to a freshly added field
pub const DEFAULT_FIELD_NAME: &str = "new_field";

/// Replacement attribute list for one entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeEdit {
    pub entity_id: String,
    pub new_attributes: Vec<String>,
}

/// Editing state of one card's field list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EditState {
    #[default]
    Viewing,
    EditingField { index: usize, buffer: String },
}

/// Field list editor for the entity card with id `entity_id`
#[derive(Debug, Clone)]
pub struct AttributeEditor {
    entity_id: String,
    state: EditState,
}

impl AttributeEditor {
    pub fn new(entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            state: EditState::Viewing,
        }
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn state(&self) -> &EditState {
        &self.state
    }

    /// Index of the field being edited, if any
    pub fn editing_index(&self) -> Option<usize> {
        match self.state {
            EditState::EditingField { index, .. } => Some(index),
            EditState::Viewing => None,
        }
    }

    /// Current contents of the edit buffer, if editing
    pub fn buffer(&self) -> Option<&str> {
        match &self.state {
            EditState::EditingField { buffer, .. } => Some(buffer),
            EditState::Viewing => None,
        }
    }

    /// Start editing field `index`, seeding the buffer with its text.
    ///
    /// Selecting a different field while one is open commits the open one
    /// first, as leaving an input does; that commit is returned.
    pub fn select(&mut self, index: usize, attributes: &[String]) -> Option<AttributeEdit> {
        if self.editing_index() == Some(index) {
            return None;
        }
        let committed = self.commit(attributes);
        if let Some(current) = attributes.get(index) {
            self.state = EditState::EditingField {
                index,
                buffer: current.clone(),
            };
        }
        committed
    }

    /// Replace the edit buffer contents (a keystroke in the open field)
    pub fn input(&mut self, text: impl Into<String>) {
        if let EditState::EditingField { buffer, .. } = &mut self.state {
            *buffer = text.into();
        }
    }

    /// Leave the open field (blur or Enter), writing the buffer back.
    ///
    /// Returns `None` when nothing was open, or when the open index no
    /// longer exists in `attributes` (the edit is abandoned).
    pub fn commit(&mut self, attributes: &[String]) -> Option<AttributeEdit> {
        let EditState::EditingField { index, buffer } = std::mem::take(&mut self.state) else {
            return None;
        };
        if index >= attributes.len() {
            tracing::debug!(entity = %self.entity_id, index, "abandoning edit of missing field");
            return None;
        }
        let mut new_attributes = attributes.to_vec();
        new_attributes[index] = buffer;
        Some(self.edit(new_attributes))
    }

    /// Leave the open field without writing anything back
    pub fn cancel(&mut self) {
        self.state = EditState::Viewing;
    }

    /// Append a field named [`DEFAULT_FIELD_NAME`] and open it for editing.
    ///
    /// An open edit is folded into the returned list before the append.
    pub fn add_field(&mut self, attributes: &[String]) -> AttributeEdit {
        let mut new_attributes = match self.commit(attributes) {
            Some(edit) => edit.new_attributes,
            None => attributes.to_vec(),
        };
        new_attributes.push(DEFAULT_FIELD_NAME.to_string());
        self.state = EditState::EditingField {
            index: new_attributes.len() - 1,
            buffer: DEFAULT_FIELD_NAME.to_string(),
        };
        self.edit(new_attributes)
    }

    /// Remove field `index` without confirmation.
    ///
    /// An open edit of the removed field is abandoned; an open edit of a
    /// later field follows it down by one. Returns `None` if `index` is out
    /// of range.
    pub fn delete_field(&mut self, index: usize, attributes: &[String]) -> Option<AttributeEdit> {
        if index >= attributes.len() {
            return None;
        }
        let mut new_attributes = attributes.to_vec();
        new_attributes.remove(index);

        let abandon = match &mut self.state {
            EditState::EditingField { index: open, .. } if *open == index => true,
            EditState::EditingField { index: open, .. } => {
                if *open > index {
                    *open -= 1;
                }
                *open >= new_attributes.len()
            }
            EditState::Viewing => false,
        };
        if abandon {
            self.state = EditState::Viewing;
        }

        Some(self.edit(new_attributes))
    }

    fn edit(&self, new_attributes: Vec<String>) -> AttributeEdit {
        AttributeEdit {
            entity_id: self.entity_id.clone(),
            new_attributes,
        }
    }
}
