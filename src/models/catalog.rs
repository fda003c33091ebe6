// file: src/models/catalog.rs
// description: catalog records (vendor, category, tag, product) and their relational metadata
// reference: internal data structures

use crate::models::entity::{Cardinality, Entity, EntityType, RelationDef};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

pub static VENDOR: EntityType = EntityType {
    name: "vendor",
    fields: &["id", "identifier", "name", "email", "establishment_date"],
    relations: &[RelationDef {
        name: "products",
        target: &PRODUCT,
        cardinality: Cardinality::Many,
        inverse: Some("vendor"),
    }],
};

pub static CATEGORY: EntityType = EntityType {
    name: "category",
    fields: &["id", "name", "slug"],
    relations: &[RelationDef {
        name: "products",
        target: &PRODUCT,
        cardinality: Cardinality::Many,
        inverse: Some("category"),
    }],
};

pub static TAG: EntityType = EntityType {
    name: "tag",
    fields: &["id", "name"],
    relations: &[RelationDef {
        name: "products",
        target: &PRODUCT,
        cardinality: Cardinality::Many,
        inverse: Some("tags"),
    }],
};

pub static PRODUCT: EntityType = EntityType {
    name: "product",
    fields: &[
        "id",
        "name",
        "description",
        "price",
        "created_at",
        "quantity",
        "available",
    ],
    relations: &[
        RelationDef {
            name: "vendor",
            target: &VENDOR,
            cardinality: Cardinality::One,
            inverse: None,
        },
        RelationDef {
            name: "category",
            target: &CATEGORY,
            cardinality: Cardinality::One,
            inverse: None,
        },
        RelationDef {
            name: "tags",
            target: &TAG,
            cardinality: Cardinality::Many,
            inverse: None,
        },
    ],
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vendor {
    pub id: u64,
    pub identifier: Uuid,
    pub name: String,
    pub email: String,
    pub establishment_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: u64,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    pub created_at: DateTime<Utc>,
    pub quantity: i64,
    pub available: bool,
    pub vendor_id: u64,
    #[serde(default)]
    pub category_id: Option<u64>,
    #[serde(default)]
    pub tag_ids: Vec<u64>,
}

impl Entity for Vendor {
    fn entity_type(&self) -> &'static EntityType {
        &VENDOR
    }

    fn id(&self) -> String {
        self.id.to_string()
    }

    fn field(&self, name: &str) -> Option<Value> {
        let value = match name {
            "id" => json!(self.id),
            "identifier" => json!(self.identifier),
            "name" => json!(self.name),
            "email" => json!(self.email),
            "establishment_date" => json!(self.establishment_date),
            _ => return None,
        };
        Some(value)
    }

    fn references(&self, _relation: &str) -> Vec<String> {
        Vec::new()
    }
}

impl Entity for Category {
    fn entity_type(&self) -> &'static EntityType {
        &CATEGORY
    }

    fn id(&self) -> String {
        self.id.to_string()
    }

    fn field(&self, name: &str) -> Option<Value> {
        let value = match name {
            "id" => json!(self.id),
            "name" => json!(self.name),
            "slug" => json!(self.slug),
            _ => return None,
        };
        Some(value)
    }

    fn references(&self, _relation: &str) -> Vec<String> {
        Vec::new()
    }
}

impl Entity for Tag {
    fn entity_type(&self) -> &'static EntityType {
        &TAG
    }

    fn id(&self) -> String {
        self.id.to_string()
    }

    fn field(&self, name: &str) -> Option<Value> {
        match name {
            "id" => Some(json!(self.id)),
            "name" => Some(json!(self.name)),
            _ => None,
        }
    }

    fn references(&self, _relation: &str) -> Vec<String> {
        Vec::new()
    }
}

impl Entity for Product {
    fn entity_type(&self) -> &'static EntityType {
        &PRODUCT
    }

    fn id(&self) -> String {
        self.id.to_string()
    }

    fn field(&self, name: &str) -> Option<Value> {
        let value = match name {
            "id" => json!(self.id),
            "name" => json!(self.name),
            "description" => json!(self.description),
            "price" => json!(self.price),
            "created_at" => json!(self.created_at),
            "quantity" => json!(self.quantity),
            "available" => json!(self.available),
            _ => return None,
        };
        Some(value)
    }

    fn references(&self, relation: &str) -> Vec<String> {
        match relation {
            "vendor" => vec![self.vendor_id.to_string()],
            "category" => self.category_id.iter().map(u64::to_string).collect(),
            "tags" => self.tag_ids.iter().map(u64::to_string).collect(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn product() -> Product {
        Product {
            id: 7,
            name: "widget".to_string(),
            description: "A small widget".to_string(),
            price: 9.5,
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            quantity: 3,
            available: true,
            vendor_id: 1,
            category_id: None,
            tag_ids: vec![2, 4],
        }
    }

    #[test]
    fn test_every_declared_field_is_readable() {
        let product = product();
        for field in PRODUCT.fields {
            assert!(product.field(field).is_some(), "missing {}", field);
        }
        assert!(product.field("vendor_id").is_none());
    }

    #[test]
    fn test_product_references() {
        let product = product();
        assert_eq!(product.references("vendor"), vec!["1"]);
        assert!(product.references("category").is_empty());
        assert_eq!(product.references("tags"), vec!["2", "4"]);
    }

    #[test]
    fn test_date_fields_serialize_as_iso_strings() {
        let vendor = Vendor {
            id: 1,
            identifier: Uuid::nil(),
            name: "Acme".to_string(),
            email: "sales@acme.test".to_string(),
            establishment_date: NaiveDate::from_ymd_opt(1999, 12, 31).unwrap(),
        };
        assert_eq!(vendor.field("establishment_date"), Some(json!("1999-12-31")));
        assert_eq!(
            product().field("created_at"),
            Some(json!("2024-03-01T12:00:00Z"))
        );
    }
}
