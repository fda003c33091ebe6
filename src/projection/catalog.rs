// file: src/projection/catalog.rs
// description: document schemas for the product catalog
// reference: internal module structure

use crate::error::{ConfigurationError, TransformError};
use crate::models::catalog::{CATEGORY, PRODUCT, TAG, VENDOR};
use crate::models::{Cardinality, Entity};
use crate::projection::registry::SchemaRegistry;
use crate::projection::schema::SchemaBuilder;
use serde_json::{Value, json};

pub const CATEGORY_CUSTOM_FIELD: &str = "CUSTOM FIELD VALUE";

/// Registers the category, tag, vendor and product schemas.
///
/// Products are the only indexed root. A product is indexed only while it is
/// available, its name is stored uppercased, and changes to its vendor,
/// category or tags re-index it.
pub fn catalog_registry() -> Result<SchemaRegistry, ConfigurationError> {
    let mut builder = SchemaRegistry::builder();

    builder
        .define_schema(
            SchemaBuilder::new("category", &CATEGORY)
                .fields(["name", "slug"])
                .synthesized("custom_field", |_| Ok(json!(CATEGORY_CUSTOM_FIELD)))
                .searchable(["custom_field"])
                .embedded(),
        )?
        .define_schema(SchemaBuilder::new("tag", &TAG).fields(["name"]).embedded())?
        .define_schema(
            SchemaBuilder::new("vendor", &VENDOR)
                .fields(["identifier", "name", "email", "establishment_date"])
                .embedded(),
        )?
        .define_schema(
            SchemaBuilder::new("product", &PRODUCT)
                .fields([
                    "name",
                    "description",
                    "price",
                    "created_at",
                    "quantity",
                    "available",
                ])
                .prepare("name", uppercase_name)
                .searchable(["name", "description"])
                .relation("vendor", "vendor", Cardinality::One)
                .relation("category", "category", Cardinality::One)
                .relation("tags", "tag", Cardinality::Many)
                .filter(is_available)
                .related_model(&VENDOR, "products")
                .related_model(&CATEGORY, "products")
                .related_model(&TAG, "products"),
        )?;

    builder.build()
}

fn is_available(entity: &dyn Entity) -> bool {
    entity.field("available") == Some(Value::Bool(true))
}

fn uppercase_name(entity: &dyn Entity) -> Result<Value, TransformError> {
    match entity.field("name") {
        Some(Value::String(name)) => Ok(Value::String(name.to_uppercase())),
        Some(Value::Null) | None => Ok(Value::Null),
        Some(other) => Err(TransformError::new(format!(
            "expected a string name, found {}",
            other
        ))),
    }
}
