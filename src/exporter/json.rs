// file: src/exporter/json.rs
// description: json export of projected documents with a manifest
// reference: one file per document plus manifest.json

use crate::error::{IndexError, Result};
use crate::models::Document;
use crate::projection::SchemaRegistry;
use crate::store::RelationalStore;
use crate::utils::Validator;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone)]
pub struct JsonExporter {
    output_dir: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct ExportManifest {
    pub exported_at: DateTime<Utc>,
    pub total_documents: usize,
    pub files: Vec<String>,
}

impl JsonExporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir).map_err(|source| IndexError::FileOperation {
            path: output_dir.clone(),
            source,
        })?;
        Ok(Self { output_dir })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Projects every selected root entity and writes it to disk.
    pub fn export_all(
        &self,
        registry: &SchemaRegistry,
        store: &dyn RelationalStore,
        pretty: bool,
    ) -> Result<ExportManifest> {
        info!("Starting JSON export to {:?}", self.output_dir);

        let mut files = Vec::new();
        for schema in registry.roots() {
            for entity in registry.select(store, schema)? {
                if let Some(document) = registry.project(store, schema, entity.as_ref())? {
                    files.push(self.export_document(&document, pretty)?);
                }
            }
        }

        let manifest = ExportManifest {
            exported_at: Utc::now(),
            total_documents: files.len(),
            files,
        };
        self.write_json(MANIFEST_FILE, &serde_json::to_string_pretty(&manifest)?)?;

        info!(
            "Export complete: {} documents exported",
            manifest.total_documents
        );
        Ok(manifest)
    }

    /// Writes one document as `<key>.json` and returns the file name.
    pub fn export_document(&self, document: &Document, pretty: bool) -> Result<String> {
        let file_name = format!("{}.json", Validator::sanitize_key(&document.key()));
        let body = if pretty {
            serde_json::to_string_pretty(document)?
        } else {
            document.to_json()?
        };
        self.write_json(&file_name, &body)?;
        debug!("Exported {}", file_name);
        Ok(file_name)
    }

    fn write_json(&self, file_name: &str, body: &str) -> Result<()> {
        let path = self.output_dir.join(file_name);
        fs::write(&path, body).map_err(|source| IndexError::FileOperation { path, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::catalog_registry;
    use crate::store::catalog::fixtures;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn test_exporter_creation() {
        let dir = tempdir().unwrap();
        let exporter = JsonExporter::new(dir.path().join("nested"));
        assert!(exporter.is_ok());
        assert!(dir.path().join("nested").is_dir());
    }

    #[test]
    fn test_export_all_writes_selected_documents() {
        let dir = tempdir().unwrap();
        let exporter = JsonExporter::new(dir.path()).unwrap();
        let registry = catalog_registry().unwrap();
        let store = fixtures::store();

        let manifest = exporter.export_all(&registry, &store, true).unwrap();

        assert_eq!(manifest.total_documents, 2);
        assert_eq!(manifest.files, vec!["product_1.json", "product_3.json"]);
        assert!(!dir.path().join("product_2.json").exists());

        let body = fs::read_to_string(dir.path().join("product_1.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["name"], "WIDGET");
        assert_eq!(value["category"]["custom_field"], "CUSTOM FIELD VALUE");

        let manifest_body = fs::read_to_string(dir.path().join(MANIFEST_FILE)).unwrap();
        let manifest_value: serde_json::Value = serde_json::from_str(&manifest_body).unwrap();
        assert_eq!(manifest_value["total_documents"], 2);
    }

    #[test]
    fn test_compact_export_matches_document_json() {
        let dir = tempdir().unwrap();
        let exporter = JsonExporter::new(dir.path()).unwrap();
        let registry = catalog_registry().unwrap();
        let store = fixtures::store();
        let schema = registry.schema("product").unwrap();
        let entity = store.get(schema.entity_type(), "3").unwrap().unwrap();
        let document = registry
            .project(&store, schema, entity.as_ref())
            .unwrap()
            .unwrap();

        let file_name = exporter.export_document(&document, false).unwrap();
        let body = fs::read_to_string(dir.path().join(file_name)).unwrap();
        assert_eq!(body, document.to_json().unwrap());
    }
}
