// file: src/index/record.rs
// description: flattened index record derived from a projected document
// reference: internal data structures

use crate::models::document::compute_hash;
use crate::models::{DocValue, Document};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What the index stores for one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRecord {
    pub key: String,
    pub entity_type: String,
    /// Serialized document tree
    pub body: String,
    pub fingerprint: String,
    /// Lowercased text of every searchable path, space separated
    pub search_text: String,
    /// Escaped `path=value` for each non-null scalar reachable in the document
    pub facets: Vec<String>,
}

impl IndexRecord {
    pub fn from_document(document: &Document, searchable_paths: &[String]) -> serde_json::Result<Self> {
        let body = document.to_json()?;
        let fingerprint = compute_hash(&body);

        let search_text = searchable_paths
            .iter()
            .flat_map(|path| document.values_at(path))
            .map(facet_value)
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();

        let mut facets = Vec::new();
        collect_facets(document, "", &mut facets);
        facets.sort();
        facets.dedup();

        Ok(Self {
            key: document.key(),
            entity_type: document.entity_type.to_string(),
            body,
            fingerprint,
            search_text,
            facets,
        })
    }

    pub fn body_value(&self) -> serde_json::Result<Value> {
        serde_json::from_str(&self.body)
    }

    pub fn has_facet(&self, path: &str, value: &str) -> bool {
        let wanted = facet(path, value);
        self.facets.iter().any(|candidate| *candidate == wanted)
    }

    /// Facets joined as `|a=b|c=d|` so a single column can be matched with LIKE.
    pub fn facet_column(&self) -> String {
        format!("|{}|", self.facets.join("|"))
    }
}

/// `path=value` with `\` and `|` escaped, so facets can share one
/// `|`-delimited column.
pub fn facet(path: &str, value: &str) -> String {
    format!("{}={}", escape_facet(path), escape_facet(value))
}

fn escape_facet(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('|', "\\|")
}

/// Inverse of [`IndexRecord::facet_column`]; escaped delimiters stay inside
/// their facet.
pub fn split_facet_column(column: &str) -> Vec<String> {
    let mut facets = Vec::new();
    let mut current = String::new();
    let mut chars = column.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                current.push(c);
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            '|' => {
                if !current.is_empty() {
                    facets.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        facets.push(current);
    }
    facets
}

fn facet_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn collect_facets(document: &Document, prefix: &str, facets: &mut Vec<String>) {
    for (name, value) in &document.fields {
        let path = format!("{}{}", prefix, name);
        match value {
            DocValue::Scalar(Value::Null) => {}
            DocValue::Scalar(Value::Array(items)) => {
                for item in items.iter().filter(|item| !item.is_null()) {
                    facets.push(facet(&path, &facet_value(item)));
                }
            }
            DocValue::Scalar(scalar) => facets.push(facet(&path, &facet_value(scalar))),
            DocValue::One(None) => {}
            DocValue::One(Some(child)) => collect_facets(child, &format!("{}.", path), facets),
            DocValue::Many(children) => {
                for child in children {
                    collect_facets(child, &format!("{}.", path), facets);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn document() -> Document {
        let mut tag = Document::new("tag", "tag", "1");
        tag.insert("name", DocValue::Scalar(json!("Red")));

        let mut doc = Document::new("product", "product", "1");
        doc.insert("name", DocValue::Scalar(json!("WIDGET")));
        doc.insert("price", DocValue::Scalar(json!(12.5)));
        doc.insert("category", DocValue::One(None));
        doc.insert("tags", DocValue::Many(vec![tag]));
        doc
    }

    #[test]
    fn test_record_columns() {
        let record = IndexRecord::from_document(&document(), &["name".to_string()]).unwrap();
        assert_eq!(record.key, "product:1");
        assert_eq!(record.entity_type, "product");
        assert_eq!(record.search_text, "widget");
        assert_eq!(
            record.facets,
            vec!["name=WIDGET", "price=12.5", "tags.name=Red"]
        );
        assert_eq!(record.facet_column(), "|name=WIDGET|price=12.5|tags.name=Red|");
    }

    #[test]
    fn test_delimiters_in_values_are_escaped() {
        let mut doc = Document::new("product", "product", "1");
        doc.insert("description", DocValue::Scalar(json!("a|b")));
        doc.insert("name", DocValue::Scalar(json!("back\\slash")));
        let record = IndexRecord::from_document(&doc, &[]).unwrap();

        assert_eq!(
            record.facet_column(),
            "|description=a\\|b|name=back\\\\slash|"
        );
        assert_eq!(split_facet_column(&record.facet_column()), record.facets);
        assert!(record.has_facet("description", "a|b"));
        assert!(!record.has_facet("description", "a"));
        assert!(record.has_facet("name", "back\\slash"));
    }

    #[test]
    fn test_split_empty_column() {
        assert!(split_facet_column("||").is_empty());
        assert!(split_facet_column("").is_empty());
    }

    #[test]
    fn test_absent_relation_has_no_facets() {
        let record = IndexRecord::from_document(&document(), &[]).unwrap();
        assert!(!record.facets.iter().any(|f| f.starts_with("category")));
        assert!(!record.has_facet("category.slug", "home-tools"));
    }

    #[test]
    fn test_body_round_trips_through_value() {
        let record = IndexRecord::from_document(&document(), &[]).unwrap();
        assert_eq!(record.body_value().unwrap()["category"], Value::Null);
        assert_eq!(record.fingerprint, document().fingerprint().unwrap());
    }
}
