// file: src/index/lance.rs
// description: LanceDB-backed document index with text and facet prefiltering
// reference: https://docs.rs/lancedb

use crate::config::IndexConfig;
use crate::error::{IndexError, Result};
use crate::index::memory::score_terms;
use crate::index::record::{facet, split_facet_column};
use crate::index::{DocumentIndex, IndexRecord, SearchQuery};
use crate::models::SearchResult;
use arrow_array::{RecordBatch, RecordBatchIterator, StringArray};
use arrow_schema::{DataType, Field, Schema};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, Table, connect};
use std::sync::Arc;
use tracing::{debug, info, warn};

const COLUMNS: [&str; 6] = ["key", "entity_type", "body", "fingerprint", "search_text", "facets"];

#[derive(Clone)]
pub struct LanceDbIndex {
    connection: Connection,
    config: IndexConfig,
}

impl LanceDbIndex {
    pub async fn new(config: IndexConfig) -> Result<Self> {
        info!("Connecting to LanceDB at {}", config.uri);

        let connection = connect(&config.uri)
            .execute()
            .await
            .map_err(|e| IndexError::Database(format!("Failed to connect to LanceDB: {}", e)))?;

        Ok(Self { connection, config })
    }

    pub async fn ping(&self) -> Result<bool> {
        debug!("Checking LanceDB connection");

        match self.connection.table_names().execute().await {
            Ok(_) => Ok(true),
            Err(e) => Err(IndexError::Database(format!(
                "LanceDB connection failed: {}",
                e
            ))),
        }
    }

    pub fn table_name(&self) -> &str {
        &self.config.table_name
    }

    pub async fn table_exists(&self) -> Result<bool> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| IndexError::Database(format!("Failed to list tables: {}", e)))?;

        Ok(table_names.iter().any(|name| name == self.table_name()))
    }

    /// Opens the documents table, creating it empty when missing. Losing a
    /// creation race to another writer is not an error.
    pub async fn ensure_table(&self) -> Result<Table> {
        if let Some(table) = self.open_table().await? {
            return Ok(table);
        }

        match self
            .connection
            .create_empty_table(self.table_name(), Self::documents_schema())
            .execute()
            .await
        {
            Ok(table) => {
                info!("Created new table: {}", self.table_name());
                Ok(table)
            }
            Err(e) => {
                let reason = e.to_string();
                self.open_table().await?.ok_or_else(|| {
                    IndexError::Database(format!(
                        "Failed to create table {}: {}",
                        self.table_name(),
                        reason
                    ))
                })
            }
        }
    }

    async fn open_table(&self) -> Result<Option<Table>> {
        if !self.table_exists().await? {
            return Ok(None);
        }

        self.connection
            .open_table(self.table_name())
            .execute()
            .await
            .map(Some)
            .map_err(|e| {
                IndexError::Database(format!("Failed to open table {}: {}", self.table_name(), e))
            })
    }

    pub fn documents_schema() -> Arc<Schema> {
        Arc::new(Schema::new(
            COLUMNS
                .iter()
                .map(|name| Field::new(*name, DataType::Utf8, false))
                .collect::<Vec<_>>(),
        ))
    }

    fn create_record_batch(records: &[IndexRecord]) -> Result<RecordBatch> {
        RecordBatch::try_new(
            Self::documents_schema(),
            vec![
                Arc::new(string_column(records, |r| r.key.clone())),
                Arc::new(string_column(records, |r| r.entity_type.clone())),
                Arc::new(string_column(records, |r| r.body.clone())),
                Arc::new(string_column(records, |r| r.fingerprint.clone())),
                Arc::new(string_column(records, |r| r.search_text.clone())),
                Arc::new(string_column(records, IndexRecord::facet_column)),
            ],
        )
        .map_err(|e| IndexError::Database(format!("Failed to create record batch: {}", e)))
    }

    fn read_records(batch: &RecordBatch) -> Result<Vec<IndexRecord>> {
        let columns = COLUMNS
            .iter()
            .map(|name| {
                batch
                    .column_by_name(name)
                    .ok_or_else(|| IndexError::Database(format!("Missing '{}' column", name)))?
                    .as_any()
                    .downcast_ref::<StringArray>()
                    .ok_or_else(|| IndexError::Database(format!("Invalid '{}' column type", name)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok((0..batch.num_rows())
            .map(|i| IndexRecord {
                key: columns[0].value(i).to_string(),
                entity_type: columns[1].value(i).to_string(),
                body: columns[2].value(i).to_string(),
                fingerprint: columns[3].value(i).to_string(),
                search_text: columns[4].value(i).to_string(),
                facets: split_facet_column(columns[5].value(i)),
            })
            .collect())
    }

    async fn query_records(&self, table: &Table, predicate: Option<String>) -> Result<Vec<IndexRecord>> {
        let mut query = table.query();
        if let Some(predicate) = predicate {
            debug!("Applied filter: {}", predicate);
            query = query.only_if(predicate);
        }

        let batches: Vec<RecordBatch> = query
            .execute()
            .await
            .map_err(|e| IndexError::Database(format!("Query failed: {}", e)))?
            .try_collect()
            .await
            .map_err(|e| IndexError::Database(format!("Failed to read result batch: {}", e)))?;

        let mut records = Vec::new();
        for batch in &batches {
            records.extend(Self::read_records(batch)?);
        }
        Ok(records)
    }
}

fn string_column(records: &[IndexRecord], f: impl Fn(&IndexRecord) -> String) -> StringArray {
    records.iter().map(|record| Some(f(record))).collect()
}

fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn key_predicate(key: &str) -> String {
    format!("key = {}", quote(key))
}

/// SQL prefilter; results are re-checked exactly after loading. Patterns
/// holding `\` are left to the exact check since LIKE treats it as an escape.
fn search_predicate(query: &SearchQuery) -> Option<String> {
    let like = |column: &str, pattern: String| {
        (!pattern.contains('\\')).then(|| format!("{} LIKE {}", column, quote(&pattern)))
    };

    let mut clauses: Vec<String> = query
        .terms()
        .iter()
        .filter_map(|term| like("search_text", format!("%{}%", term)))
        .collect();
    clauses.extend(
        query
            .filters
            .iter()
            .filter_map(|(path, value)| like("facets", format!("%|{}|%", facet(path, value)))),
    );

    if clauses.is_empty() {
        None
    } else {
        Some(clauses.join(" AND "))
    }
}

impl DocumentIndex for LanceDbIndex {
    async fn upsert(&self, record: IndexRecord) -> Result<()> {
        let batch = Self::create_record_batch(std::slice::from_ref(&record))?;
        let table = self.ensure_table().await?;

        table.delete(&key_predicate(&record.key)).await.map_err(|e| {
            IndexError::Database(format!("Failed to replace {}: {}", record.key, e))
        })?;
        table
            .add(RecordBatchIterator::new(vec![Ok(batch)], Self::documents_schema()))
            .execute()
            .await
            .map_err(|e| IndexError::Database(format!("Failed to insert {}: {}", record.key, e)))?;

        debug!("Indexed document: {}", record.key);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let Some(table) = self.open_table().await? else {
            return Ok(false);
        };

        let predicate = key_predicate(key);
        let existing = table
            .count_rows(Some(predicate.clone()))
            .await
            .map_err(|e| IndexError::Database(format!("Failed to count rows: {}", e)))?;
        if existing == 0 {
            return Ok(false);
        }

        table
            .delete(&predicate)
            .await
            .map_err(|e| IndexError::Database(format!("Failed to delete {}: {}", key, e)))?;
        debug!("Deleted document: {}", key);
        Ok(true)
    }

    async fn fingerprint(&self, key: &str) -> Result<Option<String>> {
        let Some(table) = self.open_table().await? else {
            return Ok(None);
        };
        let records = self.query_records(&table, Some(key_predicate(key))).await?;
        Ok(records.into_iter().next().map(|record| record.fingerprint))
    }

    async fn count(&self) -> Result<u64> {
        let Some(table) = self.open_table().await? else {
            return Ok(0);
        };
        let count = table
            .count_rows(None)
            .await
            .map_err(|e| IndexError::Database(format!("Failed to count rows: {}", e)))?;
        Ok(count as u64)
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResult>> {
        let Some(table) = self.open_table().await? else {
            warn!("Table does not exist, returning empty results");
            return Ok(Vec::new());
        };

        let terms = query.terms();
        let candidates = self.query_records(&table, search_predicate(query)).await?;

        let mut results = Vec::new();
        for record in candidates {
            if !query.filters.iter().all(|(path, value)| record.has_facet(path, value)) {
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

        results.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.key.cmp(&b.key)));
        results.truncate(query.limit);
        info!("Search returned {} results", results.len());
        Ok(results)
    }

    async fn clear(&self) -> Result<()> {
        if !self.table_exists().await? {
            return Ok(());
        }

        warn!("Dropping table {}", self.table_name());
        self.connection
            .drop_table(self.table_name())
            .await
            .map_err(|e| {
                IndexError::Database(format!("Failed to drop table {}: {}", self.table_name(), e))
            })?;
        Ok(())
    }
}
