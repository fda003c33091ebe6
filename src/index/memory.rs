// file: src/index/memory.rs
// description: in-process document index used by tests and dry runs

use crate::error::{IndexError, Result};
use crate::index::{DocumentIndex, IndexRecord, SearchQuery};
use crate::models::SearchResult;
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
pub struct MemoryIndex {
    records: RwLock<BTreeMap<String, IndexRecord>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Result<Option<IndexRecord>> {
        Ok(self.read()?.get(key).cloned())
    }

    pub fn keys(&self) -> Result<Vec<String>> {
        Ok(self.read()?.keys().cloned().collect())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<String, IndexRecord>>> {
        self.records
            .read()
            .map_err(|_| IndexError::Database("memory index lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<String, IndexRecord>>> {
        self.records
            .write()
            .map_err(|_| IndexError::Database("memory index lock poisoned".to_string()))
    }
}

/// Occurrences of `terms` in `text`, or `None` if any term is missing.
pub(crate) fn score_terms(text: &str, terms: &[String]) -> Option<f32> {
    let mut score = 0usize;
    for term in terms {
        let hits = text.matches(term.as_str()).count();
        if hits == 0 {
            return None;
        }
        score += hits;
    }
    Some(score as f32)
}

impl DocumentIndex for MemoryIndex {
    async fn upsert(&self, record: IndexRecord) -> Result<()> {
        self.write()?.insert(record.key.clone(), record);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.write()?.remove(key).is_some())
    }

    async fn fingerprint(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read()?.get(key).map(|record| record.fingerprint.clone()))
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.read()?.len() as u64)
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResult>> {
        let terms = query.terms();
        let records = self.read()?;

        let mut results = Vec::new();
        for record in records.values() {
            if !query
                .filters
                .iter()
                .all(|(path, value)| record.has_facet(path, value))
            {
                continue;
            }
            let Some(score) = score_terms(&record.search_text, &terms) else {
                continue;
            };
            results.push(SearchResult::new(
                record.key.clone(),
                record.entity_type.clone(),
                score,
                record.body_value()?,
            ));
        }

        // stable sort keeps key order among equal scores
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(query.limit);
        Ok(results)
    }

    async fn clear(&self) -> Result<()> {
        self.write()?.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DocValue, Document};
    use serde_json::json;

    fn record(id: &str, name: &str, slug: Option<&str>) -> IndexRecord {
        let mut doc = Document::new("product", "product", id);
        doc.insert("name", DocValue::Scalar(json!(name)));
        let category = slug.map(|slug| {
            let mut category = Document::new("category", "category", "1");
            category.insert("slug", DocValue::Scalar(json!(slug)));
            Box::new(category)
        });
        doc.insert("category", DocValue::One(category));
        IndexRecord::from_document(&doc, &["name".to_string()]).unwrap()
    }

    #[tokio::test]
    async fn test_upsert_is_last_write_wins() {
        let index = MemoryIndex::new();
        index.upsert(record("1", "old", None)).await.unwrap();
        index.upsert(record("1", "new", None)).await.unwrap();

        assert_eq!(index.count().await.unwrap(), 1);
        let stored = index.get("product:1").unwrap().unwrap();
        assert_eq!(stored.search_text, "new");
    }

    #[tokio::test]
    async fn test_full_text_and_filters() {
        let index = MemoryIndex::new();
        index.upsert(record("1", "Red Widget", Some("tools"))).await.unwrap();
        index.upsert(record("2", "Red Gadget", None)).await.unwrap();

        let hits = index.search(&SearchQuery::new(10).text("red")).await.unwrap();
        assert_eq!(hits.len(), 2);

        let hits = index
            .search(&SearchQuery::new(10).text("red widget"))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].key, "product:1");

        let hits = index
            .search(&SearchQuery::new(10).filter("category.slug", "tools"))
            .await
            .unwrap();
        let keys: Vec<&str> = hits.iter().map(|h| h.key.as_str()).collect();
        assert_eq!(keys, vec!["product:1"]);
    }

    #[test]
    fn test_delete_and_clear() {
        tokio_test::block_on(async {
            let index = MemoryIndex::new();
            index.upsert(record("1", "a", None)).await.unwrap();
            index.upsert(record("2", "b", None)).await.unwrap();

            assert!(index.delete("product:1").await.unwrap());
            assert!(!index.delete("product:1").await.unwrap());
            assert_eq!(index.keys().unwrap(), vec!["product:2"]);

            index.clear().await.unwrap();
            assert_eq!(index.count().await.unwrap(), 0);
        });
    }

    #[test]
    fn test_score_terms() {
        let terms = vec!["red".to_string()];
        assert_eq!(score_terms("red red blue", &terms), Some(2.0));
        assert_eq!(score_terms("blue", &terms), None);
        assert_eq!(score_terms("anything", &[]), Some(0.0));
    }
}
