// file: src/projection/schema.rs
// description: declarative document schemas with per-field transforms and selection filters
// reference: https://docs.rs/serde_json

use crate::error::{ConfigurationError, TransformError};
use crate::models::{Cardinality, Entity, EntityType};
use crate::utils::Validator;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

pub type TransformFn = Arc<dyn Fn(&dyn Entity) -> Result<Value, TransformError> + Send + Sync>;
pub type SelectFn = Arc<dyn Fn(&dyn Entity) -> bool + Send + Sync>;

#[derive(Clone)]
pub struct FieldSpec {
    pub name: String,
    pub transform: Option<TransformFn>,
    pub synthesized: bool,
    pub searchable: bool,
}

impl fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("name", &self.name)
            .field("transform", &self.transform.is_some())
            .field("synthesized", &self.synthesized)
            .field("searchable", &self.searchable)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationSpec {
    pub name: String,
    pub target_schema: String,
    pub cardinality: Cardinality,
}

/// Related entity type whose changes re-index this schema's roots, found
/// through `reverse` (a relation on the related type).
#[derive(Debug, Clone)]
pub struct RelatedModel {
    pub entity_type: &'static EntityType,
    pub reverse: String,
}

/// Immutable mapping from one entity type to a document shape.
#[derive(Clone)]
pub struct DocumentSchema {
    pub(crate) name: String,
    pub(crate) entity_type: &'static EntityType,
    pub(crate) fields: Vec<FieldSpec>,
    pub(crate) relations: Vec<RelationSpec>,
    pub(crate) filter: Option<SelectFn>,
    pub(crate) related_models: Vec<RelatedModel>,
    pub(crate) embedded: bool,
}

impl fmt::Debug for DocumentSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentSchema")
            .field("name", &self.name)
            .field("entity_type", &self.entity_type.name)
            .field("fields", &self.fields)
            .field("relations", &self.relations)
            .field("filter", &self.filter.is_some())
            .field("related_models", &self.related_models.len())
            .field("embedded", &self.embedded)
            .finish()
    }
}

impl DocumentSchema {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entity_type(&self) -> &'static EntityType {
        self.entity_type
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn relations(&self) -> &[RelationSpec] {
        &self.relations
    }

    pub fn related_models(&self) -> &[RelatedModel] {
        &self.related_models
    }

    /// Embedded schemas only appear inside other documents and are never
    /// indexed on their own.
    pub fn is_embedded(&self) -> bool {
        self.embedded
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Selection predicate; schemas without a filter select everything.
    pub fn selects(&self, entity: &dyn Entity) -> bool {
        self.filter.as_ref().is_none_or(|filter| filter(entity))
    }

    /// Value stored for `field_name`: the override's result when one is
    /// registered, otherwise the entity attribute (null if unset).
    pub fn transform_field(
        &self,
        entity: &dyn Entity,
        field_name: &str,
    ) -> Result<Value, TransformError> {
        match self.field(field_name).and_then(|field| field.transform.as_ref()) {
            Some(transform) => transform(entity),
            None => Ok(entity.field(field_name).unwrap_or(Value::Null)),
        }
    }
}

/// Builder used to declare a schema before registration.
pub struct SchemaBuilder {
    schema: DocumentSchema,
    prepares: Vec<(String, TransformFn)>,
    searchable: Vec<String>,
}

impl SchemaBuilder {
    pub fn new(name: impl Into<String>, entity_type: &'static EntityType) -> Self {
        Self {
            schema: DocumentSchema {
                name: name.into(),
                entity_type,
                fields: Vec::new(),
                relations: Vec::new(),
                filter: None,
                related_models: Vec::new(),
                embedded: false,
            },
            prepares: Vec::new(),
            searchable: Vec::new(),
        }
    }

    /// Fields copied from the entity.
    pub fn fields<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            self.schema.fields.push(FieldSpec {
                name: name.into(),
                transform: None,
                synthesized: false,
                searchable: false,
            });
        }
        self
    }

    /// Field with no stored counterpart, produced entirely by `transform`.
    pub fn synthesized<F>(mut self, name: impl Into<String>, transform: F) -> Self
    where
        F: Fn(&dyn Entity) -> Result<Value, TransformError> + Send + Sync + 'static,
    {
        self.schema.fields.push(FieldSpec {
            name: name.into(),
            transform: Some(Arc::new(transform)),
            synthesized: true,
            searchable: false,
        });
        self
    }

    /// Override for a declared field.
    pub fn prepare<F>(mut self, name: impl Into<String>, transform: F) -> Self
    where
        F: Fn(&dyn Entity) -> Result<Value, TransformError> + Send + Sync + 'static,
    {
        self.prepares.push((name.into(), Arc::new(transform)));
        self
    }

    pub fn searchable<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.searchable.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn relation(
        mut self,
        name: impl Into<String>,
        target_schema: impl Into<String>,
        cardinality: Cardinality,
    ) -> Self {
        self.schema.relations.push(RelationSpec {
            name: name.into(),
            target_schema: target_schema.into(),
            cardinality,
        });
        self
    }

    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&dyn Entity) -> bool + Send + Sync + 'static,
    {
        self.schema.filter = Some(Arc::new(predicate));
        self
    }

    pub fn related_model(mut self, entity_type: &'static EntityType, reverse: impl Into<String>) -> Self {
        self.schema.related_models.push(RelatedModel {
            entity_type,
            reverse: reverse.into(),
        });
        self
    }

    pub fn embedded(mut self) -> Self {
        self.schema.embedded = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.schema.name
    }

    /// Checks everything that can be verified against the entity type alone.
    /// Cross-schema checks happen when the registry is built.
    pub(crate) fn finish(self) -> Result<DocumentSchema, ConfigurationError> {
        let SchemaBuilder {
            mut schema,
            prepares,
            searchable,
        } = self;
        let entity = schema.entity_type;

        if !Validator::is_valid_name(&schema.name) {
            return Err(ConfigurationError::InvalidName(schema.name));
        }

        let unknown_field = |field: &str| ConfigurationError::UnknownField {
            schema: schema.name.clone(),
            entity: entity.name.to_string(),
            field: field.to_string(),
        };

        for (index, field) in schema.fields.iter().enumerate() {
            if !Validator::is_valid_name(&field.name) {
                return Err(ConfigurationError::InvalidName(field.name.clone()));
            }
            if schema.fields[..index].iter().any(|f| f.name == field.name)
                || schema.relations.iter().any(|r| r.name == field.name)
            {
                return Err(ConfigurationError::DuplicateField {
                    schema: schema.name.clone(),
                    field: field.name.clone(),
                });
            }
            if field.synthesized {
                if field.transform.is_none() {
                    return Err(ConfigurationError::MissingTransform {
                        schema: schema.name.clone(),
                        field: field.name.clone(),
                    });
                }
            } else if !entity.has_field(&field.name) {
                return Err(unknown_field(&field.name));
            }
        }

        for (name, transform) in prepares {
            let Some(field) = schema.fields.iter_mut().find(|f| f.name == name) else {
                return Err(unknown_field(&name));
            };
            field.transform = Some(transform);
        }

        for name in searchable {
            let Some(field) = schema.fields.iter_mut().find(|f| f.name == name) else {
                return Err(unknown_field(&name));
            };
            field.searchable = true;
        }

        for (index, relation) in schema.relations.iter().enumerate() {
            if schema.relations[..index].iter().any(|r| r.name == relation.name) {
                return Err(ConfigurationError::DuplicateField {
                    schema: schema.name.clone(),
                    field: relation.name.clone(),
                });
            }
            let Some(def) = entity.relation(&relation.name) else {
                return Err(ConfigurationError::UnknownRelation {
                    schema: schema.name.clone(),
                    entity: entity.name.to_string(),
                    relation: relation.name.clone(),
                });
            };
            if def.cardinality != relation.cardinality {
                return Err(ConfigurationError::CardinalityMismatch {
                    schema: schema.name.clone(),
                    relation: relation.name.clone(),
                    declared: relation.cardinality.to_string(),
                    actual: def.cardinality.to_string(),
                });
            }
        }

        for related in &schema.related_models {
            let points_back = related
                .entity_type
                .relation(&related.reverse)
                .is_some_and(|def| def.target.is(entity));
            if !points_back {
                return Err(ConfigurationError::InvalidRelatedModel {
                    schema: schema.name.clone(),
                    entity: related.entity_type.name.to_string(),
                    relation: related.reverse.clone(),
                    root: entity.name.to_string(),
                });
            }
        }

        Ok(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::catalog::{CATEGORY, PRODUCT, TAG, Tag};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_unknown_field_rejected() {
        let err = SchemaBuilder::new("tag", &TAG)
            .fields(["name", "colour"])
            .finish()
            .unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::UnknownField {
                schema: "tag".to_string(),
                entity: "tag".to_string(),
                field: "colour".to_string(),
            }
        );
    }

    #[test]
    fn test_prepare_on_undeclared_field_rejected() {
        let err = SchemaBuilder::new("tag", &TAG)
            .fields(["name"])
            .prepare("slug", |_| Ok(json!("x")))
            .finish()
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::UnknownField { field, .. } if field == "slug"));
    }

    #[test]
    fn test_unknown_relation_rejected() {
        let err = SchemaBuilder::new("product", &PRODUCT)
            .fields(["name"])
            .relation("owner", "vendor", Cardinality::One)
            .finish()
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::UnknownRelation { relation, .. } if relation == "owner"));
    }

    #[test]
    fn test_cardinality_mismatch_rejected() {
        let err = SchemaBuilder::new("product", &PRODUCT)
            .relation("tags", "tag", Cardinality::One)
            .finish()
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::CardinalityMismatch { .. }));
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let err = SchemaBuilder::new("tag", &TAG)
            .fields(["name", "name"])
            .finish()
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::DuplicateField { .. }));
    }

    #[test]
    fn test_related_model_must_point_back() {
        let err = SchemaBuilder::new("category", &CATEGORY)
            .fields(["name"])
            .related_model(&TAG, "products")
            .finish()
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidRelatedModel { .. }));
    }

    #[test]
    fn test_transform_field_default_and_override() {
        let schema = SchemaBuilder::new("tag", &TAG)
            .fields(["id", "name"])
            .prepare("name", |entity| {
                let name = entity.field("name").unwrap_or(Value::Null);
                Ok(json!(name.as_str().unwrap_or_default().to_uppercase()))
            })
            .synthesized("kind", |_| Ok(json!("label")))
            .finish()
            .unwrap();
        let tag = Tag {
            id: 3,
            name: "widget".to_string(),
        };

        assert_eq!(schema.transform_field(&tag, "id").unwrap(), json!(3));
        assert_eq!(schema.transform_field(&tag, "name").unwrap(), json!("WIDGET"));
        assert_eq!(schema.transform_field(&tag, "kind").unwrap(), json!("label"));
    }

    #[test]
    fn test_default_filter_selects_all() {
        let schema = SchemaBuilder::new("tag", &TAG).fields(["name"]).finish().unwrap();
        let tag = Tag {
            id: 1,
            name: "a".to_string(),
        };
        assert!(schema.selects(&tag));
    }
}
