// file: src/config.rs
// description: application configuration management with toml support
// reference: https://docs.rs/config

use crate::error::{IndexError, Result};
use crate::utils::Validator;
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub store: StoreConfig,
    pub index: IndexConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    pub catalog_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexConfig {
    pub uri: String,
    pub table_name: String,
}

/// What to do with an indexed document whose entity no longer passes its
/// schema's selection filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StalePolicy {
    #[default]
    Remove,
    Keep,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    pub parallel_workers: usize,
    #[serde(default)]
    pub stale_documents: StalePolicy,
    #[serde(default)]
    pub fail_fast: bool,
    /// Skip writes when the stored fingerprint matches
    #[serde(default = "default_true")]
    pub skip_unchanged: bool,
}

fn default_true() -> bool {
    true
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenv().ok();

        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        } else {
            builder = builder.add_source(config::File::from(Path::new("config/default.toml")));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("CATALOG_INDEX")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .map_err(|e| IndexError::Config(e.to_string()))?;

        let config: Config = settings
            .try_deserialize()
            .map_err(|e| IndexError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn default_config() -> Self {
        Self {
            store: StoreConfig {
                catalog_path: PathBuf::from("data/catalog.json"),
            },
            index: IndexConfig {
                uri: "data/lancedb".to_string(),
                table_name: "products".to_string(),
            },
            pipeline: PipelineConfig {
                parallel_workers: 4,
                stale_documents: StalePolicy::Remove,
                fail_fast: false,
                skip_unchanged: true,
            },
        }
    }

    fn validate(&self) -> Result<()> {
        if self.pipeline.parallel_workers == 0 {
            return Err(IndexError::Config(
                "parallel_workers must be greater than 0".to_string(),
            ));
        }

        if !Validator::is_valid_name(&self.index.table_name) {
            return Err(IndexError::Config(format!(
                "invalid table_name '{}'",
                self.index.table_name
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[store]
catalog_path = "fixtures/catalog.json"

[index]
uri = "memory://test"
table_name = "products"

[pipeline]
parallel_workers = 2
stale_documents = "keep"
"#,
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.pipeline.parallel_workers, 2);
        assert_eq!(config.pipeline.stale_documents, StalePolicy::Keep);
        assert!(config.pipeline.skip_unchanged);
        assert!(!config.pipeline.fail_fast);
    }

    #[test]
    fn test_zero_workers_rejected() {
        let mut config = Config::default_config();
        config.pipeline.parallel_workers = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default_config().validate().is_ok());
    }
}
