// file: src/exporter/mod.rs
// description: document export module exports

pub mod json;

pub use json::{ExportManifest, JsonExporter};
