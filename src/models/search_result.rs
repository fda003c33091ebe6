// file: src/models/search_result.rs
// description: Search result model with relevance scores
// reference: Used for full-text and filtered index queries

use crate::utils::Validator;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Index key, `<entity_type>:<id>`
    pub key: String,

    /// Entity type of the source record
    pub entity_type: String,

    /// Relevance score (number of matched term occurrences, 0 for filter-only queries)
    pub score: f32,

    /// Projected document body
    pub document: Value,
}

impl SearchResult {
    pub fn new(key: String, entity_type: String, score: f32, document: Value) -> Self {
        Self {
            key,
            entity_type,
            score,
            document,
        }
    }

    /// Format as a summary string for display
    pub fn format_summary(&self, max_content_len: usize) -> String {
        let preview = Validator::truncate_text(&self.document.to_string(), max_content_len);

        format!("Score: {:.2} | {}\n{}\n", self.score, self.key, preview)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_summary() {
        let result = SearchResult::new(
            "product:1".to_string(),
            "product".to_string(),
            2.0,
            json!({"name": "This is a very long product name that will be truncated"}),
        );

        let summary = result.format_summary(20);
        assert!(summary.contains("2.00"));
        assert!(summary.contains("product:1"));
        assert!(summary.contains("..."));
    }
}
