// file: src/store/mod.rs
// description: relational store collaborator interface and catalog implementation
// reference: internal module structure

pub mod catalog;
pub mod events;

pub use catalog::{CatalogData, CatalogStore};
pub use events::{ChangeEvent, ChangeKind};

use crate::error::StoreError;
use crate::models::{Cardinality, Entity, EntityType, Related, RelationDef};
use std::sync::Arc;

pub type EntityRef = Arc<dyn Entity>;

/// Read side of the system of record.
pub trait RelationalStore: Send + Sync {
    /// All persisted entities of a type, ordered by primary key.
    fn fetch(&self, entity_type: &EntityType) -> Result<Vec<EntityRef>, StoreError>;

    fn get(&self, entity_type: &EntityType, id: &str) -> Result<Option<EntityRef>, StoreError>;

    /// Records reached from `entity` through `relation`.
    ///
    /// Forward relations follow the entity's foreign keys; dangling keys are
    /// treated as absent. Reverse relations scan the target type for records
    /// whose inverse relation references `entity`.
    fn related(&self, entity: &dyn Entity, relation: &RelationDef) -> Result<Related<EntityRef>, StoreError> {
        let records = match relation.inverse {
            Some(inverse) => {
                let id = entity.id();
                self.fetch(relation.target)?
                    .into_iter()
                    .filter(|candidate| candidate.references(inverse).contains(&id))
                    .collect()
            }
            None => {
                let mut records = Vec::new();
                for id in entity.references(relation.name) {
                    if let Some(record) = self.get(relation.target, &id)? {
                        records.push(record);
                    }
                }
                records
            }
        };

        Ok(match relation.cardinality {
            Cardinality::One => Related::One(records.into_iter().next()),
            Cardinality::Many => Related::Many(records),
        })
    }
}
