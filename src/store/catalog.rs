// file: src/store/catalog.rs
// description: in-memory catalog store backed by a JSON file
// reference: https://docs.rs/serde_json

use crate::error::StoreError;
use crate::models::catalog::{CATEGORY, PRODUCT, TAG, VENDOR};
use crate::models::{Category, EntityType, Product, Tag, Vendor};
use crate::store::{ChangeEvent, EntityRef, RelationalStore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

/// Serialized form of the catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogData {
    #[serde(default)]
    pub vendors: Vec<Vendor>,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub products: Vec<Product>,
}

#[derive(Debug, Default)]
struct Tables {
    vendors: BTreeMap<u64, Arc<Vendor>>,
    categories: BTreeMap<u64, Arc<Category>>,
    tags: BTreeMap<u64, Arc<Tag>>,
    products: BTreeMap<u64, Arc<Product>>,
}

/// Thread-safe catalog. Every mutation returns the change events the caller
/// should deliver to the indexer, including events for dependent products.
#[derive(Debug, Default)]
pub struct CatalogStore {
    tables: RwLock<Tables>,
}

impl CatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_data(data: CatalogData) -> Self {
        let tables = Tables {
            vendors: data.vendors.into_iter().map(|v| (v.id, Arc::new(v))).collect(),
            categories: data
                .categories
                .into_iter()
                .map(|c| (c.id, Arc::new(c)))
                .collect(),
            tags: data.tags.into_iter().map(|t| (t.id, Arc::new(t))).collect(),
            products: data.products.into_iter().map(|p| (p.id, Arc::new(p))).collect(),
        };
        Self {
            tables: RwLock::new(tables),
        }
    }

    pub fn load(path: &Path) -> Result<Self, StoreError> {
        info!("Loading catalog from {}", path.display());
        let raw = fs::read_to_string(path).map_err(|source| StoreError::File {
            path: path.to_path_buf(),
            source,
        })?;
        let data: CatalogData = serde_json::from_str(&raw)?;
        info!(
            "Loaded {} vendors, {} categories, {} tags, {} products",
            data.vendors.len(),
            data.categories.len(),
            data.tags.len(),
            data.products.len()
        );
        Ok(Self::from_data(data))
    }

    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let raw = serde_json::to_string_pretty(&self.snapshot()?)?;
        fs::write(path, raw).map_err(|source| StoreError::File {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn snapshot(&self) -> Result<CatalogData, StoreError> {
        let tables = self.read()?;
        Ok(CatalogData {
            vendors: tables.vendors.values().map(|v| v.as_ref().clone()).collect(),
            categories: tables.categories.values().map(|c| c.as_ref().clone()).collect(),
            tags: tables.tags.values().map(|t| t.as_ref().clone()).collect(),
            products: tables.products.values().map(|p| p.as_ref().clone()).collect(),
        })
    }

    pub fn save_vendor(&self, vendor: Vendor) -> Result<Vec<ChangeEvent>, StoreError> {
        let mut tables = self.write()?;
        let id = vendor.id;
        let event = upsert_event(VENDOR.name, id, tables.vendors.insert(id, Arc::new(vendor)).is_some());
        Ok(vec![event])
    }

    pub fn save_category(&self, category: Category) -> Result<Vec<ChangeEvent>, StoreError> {
        let mut tables = self.write()?;
        let id = category.id;
        let existed = tables.categories.insert(id, Arc::new(category)).is_some();
        Ok(vec![upsert_event(CATEGORY.name, id, existed)])
    }

    pub fn save_tag(&self, tag: Tag) -> Result<Vec<ChangeEvent>, StoreError> {
        let mut tables = self.write()?;
        let id = tag.id;
        let existed = tables.tags.insert(id, Arc::new(tag)).is_some();
        Ok(vec![upsert_event(TAG.name, id, existed)])
    }

    pub fn save_product(&self, product: Product) -> Result<Vec<ChangeEvent>, StoreError> {
        let mut tables = self.write()?;
        let id = product.id;
        let existed = tables.products.insert(id, Arc::new(product)).is_some();
        Ok(vec![upsert_event(PRODUCT.name, id, existed)])
    }

    pub fn delete_product(&self, id: u64) -> Result<Vec<ChangeEvent>, StoreError> {
        let mut tables = self.write()?;
        match tables.products.remove(&id) {
            Some(_) => Ok(vec![ChangeEvent::deleted(PRODUCT.name, id)]),
            None => Err(not_found(&PRODUCT, id)),
        }
    }

    /// Deleting a vendor deletes its products.
    pub fn delete_vendor(&self, id: u64) -> Result<Vec<ChangeEvent>, StoreError> {
        let mut tables = self.write()?;
        if tables.vendors.remove(&id).is_none() {
            return Err(not_found(&VENDOR, id));
        }

        let orphaned: Vec<u64> = tables
            .products
            .values()
            .filter(|product| product.vendor_id == id)
            .map(|product| product.id)
            .collect();

        let mut events = vec![ChangeEvent::deleted(VENDOR.name, id)];
        for product_id in orphaned {
            tables.products.remove(&product_id);
            events.push(ChangeEvent::deleted(PRODUCT.name, product_id));
        }
        debug!("Vendor {} deleted with {} dependent products", id, events.len() - 1);
        Ok(events)
    }

    /// Deleting a category leaves its products uncategorised.
    pub fn delete_category(&self, id: u64) -> Result<Vec<ChangeEvent>, StoreError> {
        let mut tables = self.write()?;
        if tables.categories.remove(&id).is_none() {
            return Err(not_found(&CATEGORY, id));
        }

        let mut events = vec![ChangeEvent::deleted(CATEGORY.name, id)];
        for product in tables.products.values_mut() {
            if product.category_id == Some(id) {
                Arc::make_mut(product).category_id = None;
                events.push(ChangeEvent::updated(PRODUCT.name, product.id));
            }
        }
        Ok(events)
    }

    /// Deleting a tag detaches it from every product.
    pub fn delete_tag(&self, id: u64) -> Result<Vec<ChangeEvent>, StoreError> {
        let mut tables = self.write()?;
        if tables.tags.remove(&id).is_none() {
            return Err(not_found(&TAG, id));
        }

        let mut events = vec![ChangeEvent::deleted(TAG.name, id)];
        for product in tables.products.values_mut() {
            if product.tag_ids.contains(&id) {
                Arc::make_mut(product).tag_ids.retain(|tag| *tag != id);
                events.push(ChangeEvent::updated(PRODUCT.name, product.id));
            }
        }
        Ok(events)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables.write().map_err(|_| StoreError::Poisoned)
    }
}

impl RelationalStore for CatalogStore {
    fn fetch(&self, entity_type: &EntityType) -> Result<Vec<EntityRef>, StoreError> {
        let tables = self.read()?;
        let records: Vec<EntityRef> = match entity_type.name {
            "vendor" => tables.vendors.values().map(|v| v.clone() as EntityRef).collect(),
            "category" => tables.categories.values().map(|c| c.clone() as EntityRef).collect(),
            "tag" => tables.tags.values().map(|t| t.clone() as EntityRef).collect(),
            "product" => tables.products.values().map(|p| p.clone() as EntityRef).collect(),
            other => return Err(StoreError::UnknownEntityType(other.to_string())),
        };
        Ok(records)
    }

    fn get(&self, entity_type: &EntityType, id: &str) -> Result<Option<EntityRef>, StoreError> {
        // Non-numeric keys cannot exist in this catalog.
        let Ok(key) = id.parse::<u64>() else {
            return Ok(None);
        };
        let tables = self.read()?;
        let record = match entity_type.name {
            "vendor" => tables.vendors.get(&key).map(|v| v.clone() as EntityRef),
            "category" => tables.categories.get(&key).map(|c| c.clone() as EntityRef),
            "tag" => tables.tags.get(&key).map(|t| t.clone() as EntityRef),
            "product" => tables.products.get(&key).map(|p| p.clone() as EntityRef),
            other => return Err(StoreError::UnknownEntityType(other.to_string())),
        };
        Ok(record)
    }
}

fn upsert_event(entity_type: &str, id: u64, existed: bool) -> ChangeEvent {
    if existed {
        ChangeEvent::updated(entity_type, id)
    } else {
        ChangeEvent::created(entity_type, id)
    }
}

fn not_found(entity_type: &EntityType, id: u64) -> StoreError {
    StoreError::NotFound {
        entity: entity_type.name.to_string(),
        id: id.to_string(),
    }
}
