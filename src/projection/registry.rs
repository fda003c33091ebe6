// file: src/projection/registry.rs
// description: validated schema registry and the recursive projection of entities into documents
// reference: internal module structure

use crate::error::{ConfigurationError, ProjectionError, Result};
use crate::models::{Cardinality, DocValue, Document, Entity, EntityType, Related};
use crate::projection::schema::{DocumentSchema, SchemaBuilder};
use crate::store::{EntityRef, RelationalStore};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info};

#[derive(Debug, Default)]
pub struct SchemaRegistryBuilder {
    schemas: BTreeMap<String, DocumentSchema>,
}

impl SchemaRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a schema, failing on any field or relation the entity type
    /// does not have.
    pub fn define_schema(
        &mut self,
        builder: SchemaBuilder,
    ) -> std::result::Result<&mut Self, ConfigurationError> {
        if self.schemas.contains_key(builder.name()) {
            return Err(ConfigurationError::DuplicateSchema(builder.name().to_string()));
        }
        let schema = builder.finish()?;
        debug!(
            "Registered schema '{}' for {} ({} fields, {} relations)",
            schema.name,
            schema.entity_type.name,
            schema.fields.len(),
            schema.relations.len()
        );
        self.schemas.insert(schema.name.clone(), schema);
        Ok(self)
    }

    /// Resolves relation targets and freezes the registry.
    pub fn build(self) -> std::result::Result<SchemaRegistry, ConfigurationError> {
        for schema in self.schemas.values() {
            for relation in &schema.relations {
                let Some(target) = self.schemas.get(&relation.target_schema) else {
                    return Err(ConfigurationError::UnknownTargetSchema {
                        schema: schema.name.clone(),
                        relation: relation.name.clone(),
                        target: relation.target_schema.clone(),
                    });
                };
                // define_schema already proved the relation exists
                let expected = schema
                    .entity_type
                    .relation(&relation.name)
                    .map(|def| def.target.name)
                    .unwrap_or_default();
                if target.entity_type.name != expected {
                    return Err(ConfigurationError::TargetTypeMismatch {
                        schema: schema.name.clone(),
                        relation: relation.name.clone(),
                        target: target.name.clone(),
                        expected: expected.to_string(),
                        actual: target.entity_type.name.to_string(),
                    });
                }
            }
        }

        for name in self.schemas.keys() {
            check_acyclic(&self.schemas, name, &mut Vec::new())?;
        }

        info!("Schema registry built with {} schemas", self.schemas.len());
        Ok(SchemaRegistry {
            schemas: self.schemas,
        })
    }
}

/// Fails when following relations from `name` leads back to a schema already
/// on `path`.
fn check_acyclic<'a>(
    schemas: &'a BTreeMap<String, DocumentSchema>,
    name: &'a str,
    path: &mut Vec<&'a str>,
) -> std::result::Result<(), ConfigurationError> {
    if let Some(start) = path.iter().position(|visited| *visited == name) {
        let mut cycle = path[start..].to_vec();
        cycle.push(name);
        return Err(ConfigurationError::CyclicSchema {
            schema: name.to_string(),
            cycle: cycle.join(" -> "),
        });
    }
    let Some(schema) = schemas.get(name) else {
        return Ok(());
    };

    path.push(name);
    for relation in &schema.relations {
        check_acyclic(schemas, &relation.target_schema, path)?;
    }
    path.pop();
    Ok(())
}

/// Immutable, validated set of schemas.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    schemas: BTreeMap<String, DocumentSchema>,
}

impl SchemaRegistry {
    pub fn builder() -> SchemaRegistryBuilder {
        SchemaRegistryBuilder::new()
    }

    pub fn schema(&self, name: &str) -> Option<&DocumentSchema> {
        self.schemas.get(name)
    }

    pub fn schemas(&self) -> impl Iterator<Item = &DocumentSchema> {
        self.schemas.values()
    }

    /// Schemas whose documents are indexed on their own.
    pub fn roots(&self) -> impl Iterator<Item = &DocumentSchema> {
        self.schemas.values().filter(|schema| !schema.embedded)
    }

    pub fn root_for(&self, entity_type: &EntityType) -> Option<&DocumentSchema> {
        self.roots().find(|schema| schema.entity_type.is(entity_type))
    }

    /// Entities of the schema's type that pass its selection filter.
    pub fn select(
        &self,
        store: &dyn RelationalStore,
        schema: &DocumentSchema,
    ) -> Result<Vec<EntityRef>> {
        let entities = store.fetch(schema.entity_type)?;
        Ok(entities
            .into_iter()
            .filter(|entity| schema.selects(entity.as_ref()))
            .collect())
    }

    /// Projects `entity` with `schema`, or `None` when the schema's filter
    /// excludes it.
    pub fn project(
        &self,
        store: &dyn RelationalStore,
        schema: &DocumentSchema,
        entity: &dyn Entity,
    ) -> Result<Option<Document>> {
        if !schema.selects(entity) {
            debug!("{} '{}' excluded by schema '{}'", entity.entity_type().name, entity.id(), schema.name);
            return Ok(None);
        }
        self.project_tree(store, schema, entity).map(Some)
    }

    // Embedded documents do not apply their own schema's filter.
    fn project_tree(
        &self,
        store: &dyn RelationalStore,
        schema: &DocumentSchema,
        entity: &dyn Entity,
    ) -> Result<Document> {
        let mut document = Document::new(&schema.name, schema.entity_type.name, entity.id());

        for field in &schema.fields {
            let value = schema
                .transform_field(entity, &field.name)
                .map_err(|source| ProjectionError {
                    schema: schema.name.clone(),
                    entity_id: entity.id(),
                    field: field.name.clone(),
                    source,
                })?;
            document.insert(field.name.clone(), DocValue::Scalar(value));
        }

        for relation in &schema.relations {
            let (Some(target), Some(def)) = (
                self.schemas.get(&relation.target_schema),
                schema.entity_type.relation(&relation.name),
            ) else {
                continue;
            };

            let value = match store.related(entity, def)? {
                Related::One(None) => DocValue::One(None),
                Related::One(Some(related)) => {
                    let child = self.project_tree(store, target, related.as_ref())?;
                    DocValue::One(Some(Box::new(child)))
                }
                Related::Many(related) => {
                    let mut children = Vec::with_capacity(related.len());
                    for record in &related {
                        children.push(self.project_tree(store, target, record.as_ref())?);
                    }
                    DocValue::Many(children)
                }
            };
            debug_assert!(
                matches!(
                    (&value, relation.cardinality),
                    (DocValue::One(_), Cardinality::One) | (DocValue::Many(_), Cardinality::Many)
                ),
                "relation shape follows declared cardinality"
            );
            document.insert(relation.name.clone(), value);
        }

        Ok(document)
    }

    /// Looks up the root schema for the entity's type and projects it.
    pub fn project_entity(
        &self,
        store: &dyn RelationalStore,
        entity: &dyn Entity,
    ) -> Result<Option<Document>> {
        match self.root_for(entity.entity_type()) {
            Some(schema) => self.project(store, schema, entity),
            None => Ok(None),
        }
    }

    /// Single-field transform, as stored in the document.
    pub fn transform_field(
        &self,
        schema: &DocumentSchema,
        entity: &dyn Entity,
        field_name: &str,
    ) -> Result<Value> {
        schema.transform_field(entity, field_name).map_err(|source| {
            ProjectionError {
                schema: schema.name.clone(),
                entity_id: entity.id(),
                field: field_name.to_string(),
                source,
            }
            .into()
        })
    }

    /// Dotted paths of every searchable field reachable from `schema`.
    pub fn searchable_paths(&self, schema: &DocumentSchema) -> Vec<String> {
        let mut paths = Vec::new();
        self.collect_searchable(schema, "", &mut Vec::new(), &mut paths);
        paths
    }

    fn collect_searchable<'a>(
        &'a self,
        schema: &'a DocumentSchema,
        prefix: &str,
        visiting: &mut Vec<&'a str>,
        paths: &mut Vec<String>,
    ) {
        if visiting.contains(&schema.name.as_str()) {
            return;
        }
        visiting.push(&schema.name);

        for field in schema.fields.iter().filter(|field| field.searchable) {
            paths.push(format!("{}{}", prefix, field.name));
        }
        for relation in &schema.relations {
            if let Some(target) = self.schemas.get(&relation.target_schema) {
                let prefix = format!("{}{}.", prefix, relation.name);
                self.collect_searchable(target, &prefix, visiting, paths);
            }
        }

        visiting.pop();
    }

    /// Root schemas that must be re-projected when an entity of
    /// `entity_type` changes, with the reverse relation leading to the roots.
    pub fn dependents(&self, entity_type: &EntityType) -> Vec<(&DocumentSchema, &str)> {
        self.roots()
            .flat_map(|schema| {
                schema
                    .related_models
                    .iter()
                    .filter(|related| related.entity_type.is(entity_type))
                    .map(move |related| (schema, related.reverse.as_str()))
            })
            .collect()
    }

    /// Entity type by name, among those any schema maps or watches.
    pub fn entity_type(&self, name: &str) -> Option<&'static EntityType> {
        self.schemas.values().find_map(|schema| {
            if schema.entity_type.name == name {
                return Some(schema.entity_type);
            }
            schema
                .related_models
                .iter()
                .find(|related| related.entity_type.name == name)
                .map(|related| related.entity_type)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{IndexError, TransformError};
    use crate::models::catalog::{PRODUCT, TAG, VENDOR};
    use crate::store::catalog::fixtures;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn registry() -> SchemaRegistry {
        let mut builder = SchemaRegistry::builder();
        builder
            .define_schema(SchemaBuilder::new("tag", &TAG).fields(["name"]).embedded())
            .unwrap()
            .define_schema(
                SchemaBuilder::new("product", &PRODUCT)
                    .fields(["name"])
                    .searchable(["name"])
                    .relation("tags", "tag", Cardinality::Many)
                    .related_model(&TAG, "products"),
            )
            .unwrap();
        builder.build().unwrap()
    }

    #[test]
    fn test_duplicate_schema_rejected() {
        let mut builder = SchemaRegistry::builder();
        builder.define_schema(SchemaBuilder::new("tag", &TAG)).unwrap();
        let err = builder.define_schema(SchemaBuilder::new("tag", &TAG)).unwrap_err();
        assert_eq!(err, ConfigurationError::DuplicateSchema("tag".to_string()));
    }

    #[test]
    fn test_unknown_target_schema_rejected_at_build() {
        let mut builder = SchemaRegistry::builder();
        builder
            .define_schema(
                SchemaBuilder::new("product", &PRODUCT).relation("vendor", "vendor", Cardinality::One),
            )
            .unwrap();
        assert!(matches!(
            builder.build(),
            Err(ConfigurationError::UnknownTargetSchema { .. })
        ));
    }

    #[test]
    fn test_target_type_mismatch_rejected_at_build() {
        let mut builder = SchemaRegistry::builder();
        builder
            .define_schema(SchemaBuilder::new("tag", &TAG).fields(["name"]))
            .unwrap()
            .define_schema(
                SchemaBuilder::new("product", &PRODUCT).relation("vendor", "tag", Cardinality::One),
            )
            .unwrap();
        assert!(matches!(
            builder.build(),
            Err(ConfigurationError::TargetTypeMismatch { .. })
        ));
    }

    #[test]
    fn test_cyclic_schemas_rejected_at_build() {
        let mut builder = SchemaRegistry::builder();
        builder
            .define_schema(
                SchemaBuilder::new("vendor", &VENDOR)
                    .fields(["name"])
                    .relation("products", "product", Cardinality::Many)
                    .embedded(),
            )
            .unwrap()
            .define_schema(
                SchemaBuilder::new("product", &PRODUCT)
                    .fields(["name"])
                    .relation("vendor", "vendor", Cardinality::One),
            )
            .unwrap();

        assert_eq!(
            builder.build().unwrap_err(),
            ConfigurationError::CyclicSchema {
                schema: "product".to_string(),
                cycle: "product -> vendor -> product".to_string(),
            }
        );
    }

    #[test]
    fn test_shared_target_is_not_a_cycle() {
        let mut builder = SchemaRegistry::builder();
        builder
            .define_schema(SchemaBuilder::new("vendor", &VENDOR).fields(["name"]).embedded())
            .unwrap()
            .define_schema(SchemaBuilder::new("tag", &TAG).fields(["name"]).embedded())
            .unwrap()
            .define_schema(
                SchemaBuilder::new("product", &PRODUCT)
                    .relation("vendor", "vendor", Cardinality::One)
                    .relation("tags", "tag", Cardinality::Many),
            )
            .unwrap();
        assert!(builder.build().is_ok());
    }

    #[test]
    fn test_project_contains_exactly_declared_keys() {
        let registry = registry();
        let store = fixtures::store();
        let widget = store.get(&PRODUCT, "1").unwrap().unwrap();
        let schema = registry.schema("product").unwrap();

        let doc = registry.project(&store, schema, widget.as_ref()).unwrap().unwrap();
        assert_eq!(doc.field_names(), vec!["name", "tags"]);
        assert_eq!(
            doc.to_value().unwrap(),
            json!({"name": "widget", "tags": [{"name": "red"}, {"name": "sale"}]})
        );
    }

    #[test]
    fn test_transform_error_is_tagged() {
        let mut builder = SchemaRegistry::builder();
        builder
            .define_schema(
                SchemaBuilder::new("product", &PRODUCT)
                    .fields(["name"])
                    .prepare("name", |_| Err(TransformError::new("boom"))),
            )
            .unwrap();
        let registry = builder.build().unwrap();
        let store = fixtures::store();
        let widget = store.get(&PRODUCT, "1").unwrap().unwrap();

        let err = registry
            .project_entity(&store, widget.as_ref())
            .unwrap_err();
        match err {
            IndexError::Projection(err) => {
                assert_eq!(err.entity_id, "1");
                assert_eq!(err.field, "name");
                assert_eq!(err.source, TransformError::new("boom"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_searchable_paths_and_dependents() {
        let registry = registry();
        let schema = registry.schema("product").unwrap();
        assert_eq!(registry.searchable_paths(schema), vec!["name"]);

        let dependents = registry.dependents(&TAG);
        assert_eq!(dependents.len(), 1);
        assert_eq!(dependents[0].0.name(), "product");
        assert_eq!(dependents[0].1, "products");
        assert!(registry.dependents(&VENDOR).is_empty());
    }

    #[test]
    fn test_entity_type_lookup() {
        let registry = registry();
        assert!(registry.entity_type("tag").unwrap().is(&TAG));
        assert!(registry.entity_type("product").unwrap().is(&PRODUCT));
        assert!(registry.entity_type("vendor").is_none());
    }

    #[test]
    fn test_embedded_schema_is_not_a_root() {
        let registry = registry();
        let roots: Vec<&str> = registry.roots().map(|s| s.name()).collect();
        assert_eq!(roots, vec!["product"]);
        assert!(registry.root_for(&TAG).is_none());
    }
}
