// file: src/models/mod.rs
// description: data models module exports
// reference: internal module structure

pub mod catalog;
pub mod document;
pub mod entity;
pub mod search_result;

pub use catalog::{Category, Product, Tag, Vendor};
pub use document::{DocValue, Document, document_key};
pub use entity::{Cardinality, Entity, EntityType, Related, RelationDef};
pub use search_result::SearchResult;
