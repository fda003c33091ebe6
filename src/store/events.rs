// file: src/store/events.rs
// description: change notifications emitted by store mutations

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

/// A committed change the indexer must react to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub entity_type: String,
    pub id: String,
}

impl ChangeEvent {
    pub fn created(entity_type: &str, id: impl ToString) -> Self {
        Self::new(ChangeKind::Created, entity_type, id)
    }

    pub fn updated(entity_type: &str, id: impl ToString) -> Self {
        Self::new(ChangeKind::Updated, entity_type, id)
    }

    pub fn deleted(entity_type: &str, id: impl ToString) -> Self {
        Self::new(ChangeKind::Deleted, entity_type, id)
    }

    fn new(kind: ChangeKind, entity_type: &str, id: impl ToString) -> Self {
        Self {
            kind,
            entity_type: entity_type.to_string(),
            id: id.to_string(),
        }
    }
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {}:{}", self.kind, self.entity_type, self.id)
    }
}
