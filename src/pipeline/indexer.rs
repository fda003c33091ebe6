// file: src/pipeline/indexer.rs
// description: keeps the search index in step with the relational store
// reference: drives projection per entity, per change event, and in bulk

use crate::config::{PipelineConfig, StalePolicy};
use crate::error::Result;
use crate::index::{DocumentIndex, IndexRecord};
use crate::models::{Entity, EntityType, document_key};
use crate::pipeline::progress::{Outcome, PipelineStats, ProgressTracker};
use crate::projection::{DocumentSchema, SchemaRegistry};
use crate::store::{ChangeEvent, ChangeKind, RelationalStore};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct Indexer<S, I> {
    registry: Arc<SchemaRegistry>,
    store: Arc<S>,
    index: Arc<I>,
    config: PipelineConfig,
    show_progress: bool,
}

impl<S, I> Indexer<S, I>
where
    S: RelationalStore,
    I: DocumentIndex,
{
    pub fn new(registry: Arc<SchemaRegistry>, store: Arc<S>, index: Arc<I>, config: PipelineConfig) -> Self {
        Self {
            registry,
            store,
            index,
            config,
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn index(&self) -> &I {
        &self.index
    }

    /// Re-projects one entity and writes or removes its document.
    pub async fn reindex(&self, entity: &dyn Entity) -> Result<Outcome> {
        match self.registry.root_for(entity.entity_type()) {
            Some(schema) => self.reindex_with(schema, entity, false).await,
            None => {
                debug!("No root schema for {}", entity.entity_type().name);
                Ok(Outcome::Skipped)
            }
        }
    }

    pub async fn remove_from_index(&self, entity_type: &EntityType, id: &str) -> Result<bool> {
        let key = document_key(entity_type.name, id);
        let removed = self.index.delete(&key).await?;
        if removed {
            info!("Removed {} from index", key);
        }
        Ok(removed)
    }

    async fn reindex_with(&self, schema: &DocumentSchema, entity: &dyn Entity, force: bool) -> Result<Outcome> {
        let key = document_key(schema.entity_type().name, &entity.id());

        let Some(document) = self.registry.project(&*self.store, schema, entity)? else {
            return match self.config.stale_documents {
                StalePolicy::Remove if self.index.delete(&key).await? => {
                    debug!("Removed stale document {}", key);
                    Ok(Outcome::Removed)
                }
                _ => Ok(Outcome::Skipped),
            };
        };

        let record = IndexRecord::from_document(&document, &self.registry.searchable_paths(schema))?;

        if self.config.skip_unchanged && !force {
            let stored = self.index.fingerprint(&key).await?;
            if stored.as_deref() == Some(record.fingerprint.as_str()) {
                debug!("Document {} unchanged", key);
                return Ok(Outcome::Unchanged);
            }
        }

        self.index.upsert(record).await?;
        debug!("Indexed {}", key);
        Ok(Outcome::Indexed)
    }

    /// Applies one committed change: roots are re-indexed or removed, and
    /// changes to related models re-index every root that embeds them. A root
    /// that fails to project is reported as `Outcome::Failed`.
    pub async fn handle(&self, event: &ChangeEvent) -> Result<Vec<(String, Outcome)>> {
        let Some(entity_type) = self.registry.entity_type(&event.entity_type) else {
            debug!("Ignoring event for unmapped type: {}", event);
            return Ok(Vec::new());
        };

        let mut outcomes = Vec::new();
        let entity = match event.kind {
            ChangeKind::Deleted => None,
            ChangeKind::Created | ChangeKind::Updated => self.store.get(entity_type, &event.id)?,
        };

        if let Some(schema) = self.registry.root_for(entity_type) {
            let key = document_key(entity_type.name, &event.id);
            let outcome = match &entity {
                Some(entity) => {
                    let result = self.reindex_with(schema, entity.as_ref(), false).await;
                    self.settle(&key, result)?
                }
                // deleted, or gone before the event was delivered
                None if self.index.delete(&key).await? => Outcome::Removed,
                None => Outcome::Skipped,
            };
            outcomes.push((key, outcome));
        }

        // Deleting a related record surfaces as separate events for the roots it touched.
        let Some(entity) = entity else {
            return Ok(outcomes);
        };

        for (schema, reverse) in self.registry.dependents(entity_type) {
            let Some(relation) = entity_type.relation(reverse) else {
                continue;
            };
            for root in self.store.related(entity.as_ref(), relation)?.into_vec() {
                let key = document_key(schema.entity_type().name, &root.id());
                let result = self.reindex_with(schema, root.as_ref(), false).await;
                let outcome = self.settle(&key, result)?;
                outcomes.push((key, outcome));
            }
        }

        info!("{} -> {} documents touched", event, outcomes.len());
        Ok(outcomes)
    }

    /// Turns a per-entity failure into `Outcome::Failed` unless `fail_fast`.
    fn settle(&self, key: &str, result: Result<Outcome>) -> Result<Outcome> {
        match result {
            Ok(outcome) => Ok(outcome),
            Err(e) if self.config.fail_fast => Err(e),
            Err(e) => {
                warn!("Failed to index {}: {}", key, e);
                Ok(Outcome::Failed)
            }
        }
    }

    pub async fn handle_all(&self, events: &[ChangeEvent]) -> Result<Vec<(String, Outcome)>> {
        let mut outcomes = Vec::new();
        for event in events {
            outcomes.extend(self.handle(event).await?);
        }
        Ok(outcomes)
    }

    /// Projects every root entity. Failures are logged and counted; with
    /// `fail_fast` the first failure aborts the pass.
    pub async fn rebuild(&self, force: bool) -> Result<PipelineStats> {
        let mut work = Vec::new();
        for schema in self.registry.roots() {
            for entity in self.store.fetch(schema.entity_type())? {
                work.push((schema, entity));
            }
        }

        info!(
            "Rebuilding {} documents with {} workers",
            work.len(),
            self.config.parallel_workers
        );

        let progress = if self.show_progress {
            ProgressTracker::new(work.len())
        } else {
            ProgressTracker::hidden(work.len())
        };
        progress.set_message(if force { "Projecting (forced)" } else { "Projecting" }.to_string());

        let mut results = stream::iter(work.into_iter().map(|(schema, entity)| async move {
            let key = document_key(schema.entity_type().name, &entity.id());
            let result = self.reindex_with(schema, entity.as_ref(), force).await;
            (key, result)
        }))
        .buffer_unordered(self.config.parallel_workers.max(1));

        while let Some((key, result)) = results.next().await {
            progress.record(self.settle(&key, result)?);
        }

        let stats = progress.get_stats();
        progress.finish();
        info!("Rebuild complete: {}", stats.summary());
        Ok(stats)
    }
}
