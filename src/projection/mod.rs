// file: src/projection/mod.rs
// description: model-to-document projection layer exports
// reference: internal module structure

pub mod catalog;
pub mod registry;
pub mod schema;

pub use catalog::catalog_registry;
pub use registry::{SchemaRegistry, SchemaRegistryBuilder};
pub use schema::{DocumentSchema, FieldSpec, RelatedModel, RelationSpec, SchemaBuilder};
