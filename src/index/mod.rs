// file: src/index/mod.rs
// description: search index collaborator interface and implementations
// reference: internal module structure

pub mod lance;
pub mod memory;
pub mod record;

pub use lance::LanceDbIndex;
pub use memory::MemoryIndex;
pub use record::IndexRecord;

use crate::error::Result;
use crate::models::SearchResult;
use std::future::Future;

/// Full-text terms plus structured equality filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    pub text: Option<String>,
    /// `(dotted path, value)` pairs; all must match
    pub filters: Vec<(String, String)>,
    pub limit: usize,
}

impl SearchQuery {
    pub fn new(limit: usize) -> Self {
        Self {
            text: None,
            filters: Vec::new(),
            limit,
        }
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn filter(mut self, path: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push((path.into(), value.into()));
        self
    }

    /// Lowercased whitespace-separated query terms.
    pub fn terms(&self) -> Vec<String> {
        self.text
            .as_deref()
            .unwrap_or_default()
            .split_whitespace()
            .map(str::to_lowercase)
            .collect()
    }
}

/// Store of projected documents keyed by `<entity_type>:<id>`.
///
/// Writes to the same key are last-write-wins.
pub trait DocumentIndex: Send + Sync {
    fn upsert(&self, record: IndexRecord) -> impl Future<Output = Result<()>> + Send;

    /// Returns whether a document was present.
    fn delete(&self, key: &str) -> impl Future<Output = Result<bool>> + Send;

    /// Fingerprint of the stored document, if any.
    fn fingerprint(&self, key: &str) -> impl Future<Output = Result<Option<String>>> + Send;

    fn count(&self) -> impl Future<Output = Result<u64>> + Send;

    fn search(&self, query: &SearchQuery) -> impl Future<Output = Result<Vec<SearchResult>>> + Send;

    fn clear(&self) -> impl Future<Output = Result<()>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_terms() {
        let query = SearchQuery::new(5).text("  Red  WIDGET ").filter("tags.name", "sale");
        assert_eq!(query.terms(), vec!["red", "widget"]);
        assert_eq!(query.filters.len(), 1);
        assert!(SearchQuery::new(5).terms().is_empty());
    }
}
