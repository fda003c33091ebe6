// file: src/models/entity.rs
// description: entity trait and static relational metadata shared by store and schemas
// reference: internal data structures

use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    One,
    Many,
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cardinality::One => write!(f, "one"),
            Cardinality::Many => write!(f, "many"),
        }
    }
}

/// A relation as the relational store knows it.
///
/// Forward relations are resolved through the owning entity's foreign keys.
/// Reverse relations set `inverse` to the forward relation on `target` that
/// points back at the owner.
pub struct RelationDef {
    pub name: &'static str,
    pub target: &'static EntityType,
    pub cardinality: Cardinality,
    pub inverse: Option<&'static str>,
}

// Entity types reference each other cyclically, so Debug only prints names.
impl fmt::Debug for RelationDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelationDef")
            .field("name", &self.name)
            .field("target", &self.target.name)
            .field("cardinality", &self.cardinality)
            .field("inverse", &self.inverse)
            .finish()
    }
}

#[derive(Debug)]
pub struct EntityType {
    pub name: &'static str,
    pub fields: &'static [&'static str],
    pub relations: &'static [RelationDef],
}

impl EntityType {
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains(&name)
    }

    pub fn relation(&self, name: &str) -> Option<&'static RelationDef> {
        self.relations.iter().find(|relation| relation.name == name)
    }

    pub fn is(&self, other: &EntityType) -> bool {
        self.name == other.name
    }
}

/// Read access to a persisted record.
pub trait Entity: fmt::Debug + Send + Sync {
    fn entity_type(&self) -> &'static EntityType;

    fn id(&self) -> String;

    /// Stored value of a scalar field, `None` if the type has no such field.
    fn field(&self, name: &str) -> Option<Value>;

    /// Primary keys referenced by a forward relation. Empty when the relation
    /// is unset or unknown.
    fn references(&self, relation: &str) -> Vec<String>;
}

/// Records reached through a relation.
#[derive(Debug, Clone)]
pub enum Related<E> {
    One(Option<E>),
    Many(Vec<E>),
}

impl<E> Related<E> {
    pub fn len(&self) -> usize {
        match self {
            Related::One(one) => usize::from(one.is_some()),
            Related::Many(many) => many.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_vec(self) -> Vec<E> {
        match self {
            Related::One(one) => one.into_iter().collect(),
            Related::Many(many) => many,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::catalog::{CATEGORY, PRODUCT, VENDOR};

    #[test]
    fn test_relation_lookup() {
        let vendor = PRODUCT.relation("vendor").unwrap();
        assert!(vendor.target.is(&VENDOR));
        assert_eq!(vendor.cardinality, Cardinality::One);
        assert!(PRODUCT.relation("owner").is_none());
    }

    #[test]
    fn test_reverse_relation_points_back() {
        let products = CATEGORY.relation("products").unwrap();
        assert_eq!(products.inverse, Some("category"));
        assert!(products.target.is(&PRODUCT));
    }

    #[test]
    fn test_debug_does_not_recurse() {
        let rendered = format!("{:?}", PRODUCT);
        assert!(rendered.contains("vendor"));
    }

    #[test]
    fn test_related_len() {
        assert_eq!(Related::<u8>::One(None).len(), 0);
        assert!(Related::<u8>::Many(vec![]).is_empty());
        assert_eq!(Related::Many(vec![1, 2]).into_vec(), vec![1, 2]);
    }
}
