// file: src/lib.rs
// description: library entry point and public api exports
// reference: rust library patterns
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/readme.md"))]

pub mod config;
pub mod error;
pub mod exporter;
pub mod index;
pub mod models;
pub mod pipeline;
pub mod projection;
pub mod store;
pub mod utils;

pub use config::{Config, IndexConfig, PipelineConfig, StalePolicy, StoreConfig};
pub use error::{
    ConfigurationError, IndexError, ProjectionError, Result, StoreError, TransformError,
};
pub use exporter::{ExportManifest, JsonExporter};
pub use index::{DocumentIndex, IndexRecord, LanceDbIndex, MemoryIndex, SearchQuery};
pub use models::{DocValue, Document, Entity, EntityType, SearchResult};
pub use pipeline::{Indexer, Outcome, PipelineStats, ProgressTracker};
pub use projection::{DocumentSchema, SchemaBuilder, SchemaRegistry, catalog_registry};
pub use store::{CatalogStore, ChangeEvent, ChangeKind, RelationalStore};
pub use utils::Validator;
