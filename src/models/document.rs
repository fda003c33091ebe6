// file: src/models/document.rs
// description: projected document tree with deterministic serialization and hashing
// reference: internal data structures

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Denormalized search document derived from one entity.
///
/// Fields are kept in a `BTreeMap` so serialization order never depends on
/// declaration or insertion order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    #[serde(skip)]
    pub schema: String,
    #[serde(skip)]
    pub entity_type: &'static str,
    #[serde(skip)]
    pub id: String,
    #[serde(flatten)]
    pub fields: BTreeMap<String, DocValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DocValue {
    Scalar(Value),
    One(Option<Box<Document>>),
    Many(Vec<Document>),
}

impl Document {
    pub fn new(schema: impl Into<String>, entity_type: &'static str, id: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            entity_type,
            id: id.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Index key, `<entity_type>:<id>`.
    pub fn key(&self) -> String {
        document_key(self.entity_type, &self.id)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: DocValue) {
        self.fields.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&DocValue> {
        self.fields.get(name)
    }

    pub fn scalar(&self, name: &str) -> Option<&Value> {
        match self.fields.get(name) {
            Some(DocValue::Scalar(value)) => Some(value),
            _ => None,
        }
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.keys().map(String::as_str).collect()
    }

    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn fingerprint(&self) -> serde_json::Result<String> {
        Ok(compute_hash(&self.to_json()?))
    }

    /// Values reachable at a dotted path. Sequences contribute one value per
    /// element; absent sub-documents and nulls contribute nothing.
    pub fn values_at(&self, path: &str) -> Vec<&Value> {
        let mut out = Vec::new();
        self.collect_values(path, &mut out);
        out
    }

    fn collect_values<'a>(&'a self, path: &str, out: &mut Vec<&'a Value>) {
        let (head, rest) = match path.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };

        match (self.fields.get(head), rest) {
            (Some(DocValue::Scalar(value)), None) if !value.is_null() => out.push(value),
            (Some(DocValue::One(Some(child))), Some(rest)) => child.collect_values(rest, out),
            (Some(DocValue::Many(children)), Some(rest)) => {
                for child in children {
                    child.collect_values(rest, out);
                }
            }
            _ => {}
        }
    }
}

pub fn document_key(entity_type: &str, id: &str) -> String {
    format!("{}:{}", entity_type, id)
}

pub(crate) fn compute_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn tag(name: &str) -> Document {
        let mut doc = Document::new("tag", "tag", name);
        doc.insert("name", DocValue::Scalar(json!(name)));
        doc
    }

    fn product() -> Document {
        let mut doc = Document::new("product", "product", "1");
        doc.insert("name", DocValue::Scalar(json!("WIDGET")));
        doc.insert("category", DocValue::One(None));
        doc.insert("tags", DocValue::Many(vec![tag("red"), tag("blue")]));
        doc
    }

    #[test]
    fn test_serializes_nested_tree() {
        let value = product().to_value().unwrap();
        assert_eq!(
            value,
            json!({
                "category": null,
                "name": "WIDGET",
                "tags": [{"name": "red"}, {"name": "blue"}],
            })
        );
    }

    #[test]
    fn test_hash_consistency() {
        let content = "Test content";
        let hash1 = compute_hash(content);
        let hash2 = compute_hash(content);
        assert_eq!(hash1, hash2);
        assert_eq!(
            product().fingerprint().unwrap(),
            product().fingerprint().unwrap()
        );
    }

    #[test]
    fn test_values_at_paths() {
        let doc = product();
        assert_eq!(doc.values_at("name"), vec![&json!("WIDGET")]);
        assert_eq!(
            doc.values_at("tags.name"),
            vec![&json!("red"), &json!("blue")]
        );
        assert!(doc.values_at("category.slug").is_empty());
        assert!(doc.values_at("missing").is_empty());
    }

    #[test]
    fn test_key() {
        assert_eq!(product().key(), "product:1");
    }
}
