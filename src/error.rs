// file: src/error.rs
// description: Custom error types and result type aliases
// reference: https://docs.rs/thiserror

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexError>;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Schema(#[from] ConfigurationError),

    #[error(transparent)]
    Projection(#[from] ProjectionError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("File operation failed for {path}: {source}")]
    FileOperation {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Schema misconfiguration detected while registering document schemas.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("schema '{schema}': entity type '{entity}' has no field '{field}'")]
    UnknownField {
        schema: String,
        entity: String,
        field: String,
    },

    #[error("schema '{schema}': entity type '{entity}' has no relation '{relation}'")]
    UnknownRelation {
        schema: String,
        entity: String,
        relation: String,
    },

    #[error("schema '{schema}': relation '{relation}' is declared {declared} but the model says {actual}")]
    CardinalityMismatch {
        schema: String,
        relation: String,
        declared: String,
        actual: String,
    },

    #[error("schema '{schema}': relation '{relation}' targets unknown schema '{target}'")]
    UnknownTargetSchema {
        schema: String,
        relation: String,
        target: String,
    },

    #[error("schema '{schema}': relation '{relation}' expects entity type '{expected}' but schema '{target}' maps '{actual}'")]
    TargetTypeMismatch {
        schema: String,
        relation: String,
        target: String,
        expected: String,
        actual: String,
    },

    #[error("schema '{schema}': synthesized field '{field}' has no transform")]
    MissingTransform { schema: String, field: String },

    #[error("schema '{schema}': field '{field}' declared more than once")]
    DuplicateField { schema: String, field: String },

    #[error("schema '{0}' registered more than once")]
    DuplicateSchema(String),

    #[error("schema '{schema}': related model '{entity}' has no reverse relation '{relation}' to '{root}'")]
    InvalidRelatedModel {
        schema: String,
        entity: String,
        relation: String,
        root: String,
    },

    #[error("schema '{schema}': relations form a cycle ({cycle})")]
    CyclicSchema { schema: String, cycle: String },

    #[error("invalid name '{0}'")]
    InvalidName(String),
}

/// Failure raised by a field transform override.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct TransformError(pub String);

impl TransformError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("projection of {schema} '{entity_id}' failed on field '{field}': {source}")]
pub struct ProjectionError {
    pub schema: String,
    pub entity_id: String,
    pub field: String,
    pub source: TransformError,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("unknown entity type '{0}'")]
    UnknownEntityType(String),

    #[error("{entity} '{id}' not found")]
    NotFound { entity: String, id: String },

    #[error("store lock poisoned")]
    Poisoned,

    #[error("catalog file {path}: {source}")]
    File {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("catalog decode error: {0}")]
    Decode(#[from] serde_json::Error),
}
