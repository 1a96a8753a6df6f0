//! Catalog Service - products and categories with in-memory caching
//!
//! Reference data for the cart. Persisted in redb (`categories`, `products`),
//! served from an in-memory cache filled by [`CatalogService::warmup`].
//! A JSON seed file can be imported at startup:
//!
//! ```json
//! {
//!   "categories": [{ "id": 1, "name": "Coffee", "sort_order": 0 }],
//!   "products": [{ "id": 1, "name": "Latte", "price": "30", "category_id": 1,
//!                  "sizes": [{ "name": "Large", "price": "38" }] }]
//! }
//! ```

use crate::db::{StorageError, StorageResult};
use parking_lot::RwLock;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};
use shared::models::{Category, Product};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

const CATEGORIES_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("categories");

const PRODUCTS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("products");

/// Seed file name inside the work dir
pub const CATALOG_SEED_FILE: &str = "catalog.json";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Product {0} not found")]
    ProductNotFound(i64),

    #[error("Category {0} not found")]
    CategoryNotFound(i64),

    #[error("Invalid catalog entry: {0}")]
    Validation(String),

    #[error("Invalid catalog seed {path}: {message}")]
    Seed { path: String, message: String },

    #[error("Catalog store unavailable: {0}")]
    Storage(#[from] StorageError),
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        let message = err.to_string();
        match err {
            CatalogError::ProductNotFound(id) => {
                AppError::with_message(ErrorCode::ProductNotFound, message).with_detail("product_id", id)
            }
            CatalogError::CategoryNotFound(id) => {
                AppError::with_message(ErrorCode::CategoryNotFound, message)
                    .with_detail("category_id", id)
            }
            CatalogError::Validation(_) => AppError::validation(message),
            CatalogError::Seed { .. } => AppError::with_message(ErrorCode::ConfigError, message),
            CatalogError::Storage(_) => AppError::database(message),
        }
    }
}

/// Read-only catalog consumed by the cart
pub trait Catalog: Send + Sync {
    /// Categories by sort order
    fn list_categories(&self) -> Vec<Category>;

    /// Products by category, then id
    fn list_products(&self) -> Vec<Product>;

    fn get_product(&self, id: i64) -> Result<Product, CatalogError>;
}

/// Seed file layout
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogSeed {
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub products: Vec<Product>,
}

#[derive(Clone)]
pub struct CatalogService {
    db: Arc<Database>,
    /// Products cache: id -> Product
    products: Arc<RwLock<HashMap<i64, Product>>>,
    /// Categories cache: id -> Category
    categories: Arc<RwLock<HashMap<i64, Category>>>,
}

impl std::fmt::Debug for CatalogService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let products_count = self.products.read().len();
        let categories_count = self.categories.read().len();
        f.debug_struct("CatalogService")
            .field("products_count", &products_count)
            .field("categories_count", &categories_count)
            .finish()
    }
}

impl CatalogService {
    pub fn new(db: Arc<Database>) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(CATEGORIES_TABLE)?;
            let _ = write_txn.open_table(PRODUCTS_TABLE)?;
        }
        write_txn.commit()?;
        Ok(Self {
            db,
            products: Arc::new(RwLock::new(HashMap::new())),
            categories: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    /// Load everything from the database into the cache
    pub fn warmup(&self) -> Result<(), CatalogError> {
        let read_txn = self.db.begin_read().map_err(StorageError::from)?;

        let mut categories = HashMap::new();
        let table = read_txn
            .open_table(CATEGORIES_TABLE)
            .map_err(StorageError::from)?;
        for entry in table.iter().map_err(StorageError::from)? {
            let (key, value) = entry.map_err(StorageError::from)?;
            let category: Category =
                serde_json::from_slice(value.value()).map_err(StorageError::from)?;
            categories.insert(key.value(), category);
        }

        let mut products = HashMap::new();
        let table = read_txn
            .open_table(PRODUCTS_TABLE)
            .map_err(StorageError::from)?;
        for entry in table.iter().map_err(StorageError::from)? {
            let (key, value) = entry.map_err(StorageError::from)?;
            let product: Product =
                serde_json::from_slice(value.value()).map_err(StorageError::from)?;
            products.insert(key.value(), product);
        }

        tracing::info!(
            categories = categories.len(),
            products = products.len(),
            "Catalog warmed up"
        );
        *self.categories.write() = categories;
        *self.products.write() = products;
        Ok(())
    }

    /// Import a seed file if it exists. Returns whether a file was imported.
    pub fn import_seed_file(&self, path: impl AsRef<Path>) -> Result<bool, CatalogError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No catalog seed file");
            return Ok(false);
        }
        let seed_error = |message: String| CatalogError::Seed {
            path: path.display().to_string(),
            message,
        };
        let content = std::fs::read_to_string(path).map_err(|e| seed_error(e.to_string()))?;
        let seed: CatalogSeed =
            serde_json::from_str(&content).map_err(|e| seed_error(e.to_string()))?;
        self.import(seed)?;
        tracing::info!(path = %path.display(), "Catalog seed imported");
        Ok(true)
    }

    /// Upsert a whole seed in one transaction
    pub fn import(&self, seed: CatalogSeed) -> Result<(), CatalogError> {
        for category in &seed.categories {
            validate_category(category)?;
        }
        let known: Vec<i64> = {
            let cached = self.categories.read();
            cached
                .keys()
                .copied()
                .chain(seed.categories.iter().map(|c| c.id))
                .collect()
        };
        for product in &seed.products {
            validate_product(product)?;
            if !known.contains(&product.category_id) {
                return Err(CatalogError::CategoryNotFound(product.category_id));
            }
        }

        let txn = self.db.begin_write().map_err(StorageError::from)?;
        {
            let mut categories = txn
                .open_table(CATEGORIES_TABLE)
                .map_err(StorageError::from)?;
            for category in &seed.categories {
                let value = serde_json::to_vec(category).map_err(StorageError::from)?;
                categories
                    .insert(category.id, value.as_slice())
                    .map_err(StorageError::from)?;
            }
        }
        {
            let mut products = txn
                .open_table(PRODUCTS_TABLE)
                .map_err(StorageError::from)?;
            for product in &seed.products {
                let value = serde_json::to_vec(product).map_err(StorageError::from)?;
                products
                    .insert(product.id, value.as_slice())
                    .map_err(StorageError::from)?;
            }
        }
        txn.commit().map_err(StorageError::from)?;

        {
            let mut cache = self.categories.write();
            for category in seed.categories {
                cache.insert(category.id, category);
            }
        }
        let mut cache = self.products.write();
        for product in seed.products {
            cache.insert(product.id, product);
        }
        Ok(())
    }

    pub fn upsert_category(&self, category: Category) -> Result<(), CatalogError> {
        self.import(CatalogSeed {
            categories: vec![category],
            products: vec![],
        })
    }

    pub fn upsert_product(&self, product: Product) -> Result<(), CatalogError> {
        self.import(CatalogSeed {
            categories: vec![],
            products: vec![product],
        })
    }

    pub fn get_category(&self, id: i64) -> Option<Category> {
        self.categories.read().get(&id).cloned()
    }

    pub fn get_products_by_category(&self, category_id: i64) -> Vec<Product> {
        let mut products: Vec<_> = self
            .products
            .read()
            .values()
            .filter(|p| p.category_id == category_id)
            .cloned()
            .collect();
        products.sort_by_key(|p| p.id);
        products
    }
}

impl Catalog for CatalogService {
    fn list_categories(&self) -> Vec<Category> {
        let mut categories: Vec<_> = self.categories.read().values().cloned().collect();
        categories.sort_by_key(|c| (c.sort_order, c.id));
        categories
    }

    fn list_products(&self) -> Vec<Product> {
        let mut products: Vec<_> = self.products.read().values().cloned().collect();
        products.sort_by_key(|p| (p.category_id, p.id));
        products
    }

    fn get_product(&self, id: i64) -> Result<Product, CatalogError> {
        self.products
            .read()
            .get(&id)
            .cloned()
            .ok_or(CatalogError::ProductNotFound(id))
    }
}

fn validate_category(category: &Category) -> Result<(), CatalogError> {
    if category.id <= 0 || category.name.trim().is_empty() {
        return Err(CatalogError::Validation(format!(
            "category {} needs a positive id and a name",
            category.id
        )));
    }
    Ok(())
}

fn validate_product(product: &Product) -> Result<(), CatalogError> {
    if product.id <= 0 || product.name.trim().is_empty() {
        return Err(CatalogError::Validation(format!(
            "product {} needs a positive id and a name",
            product.id
        )));
    }
    if product.price <= Decimal::ZERO {
        return Err(CatalogError::Validation(format!(
            "{}: price must be positive",
            product.name
        )));
    }
    for size in &product.sizes {
        if size.name.trim().is_empty() || size.price <= Decimal::ZERO {
            return Err(CatalogError::Validation(format!(
                "{}: size variants need a name and a positive price",
                product.name
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use shared::models::SizeVariant;

    const SEED: &str = r#"{
        "categories": [
            { "id": 2, "name": "Cake", "sort_order": 1 },
            { "id": 1, "name": "Coffee", "sort_order": 0 }
        ],
        "products": [
            { "id": 1, "name": "Espresso", "price": "25", "category_id": 1 },
            { "id": 3, "name": "Latte", "price": 30, "category_id": 1,
              "sizes": [{ "name": "Large", "price": "38" }] },
            { "id": 2, "name": "Cheesecake", "price": "45", "category_id": 2, "is_active": false }
        ]
    }"#;

    fn service() -> CatalogService {
        CatalogService::new(db::open_in_memory().unwrap()).unwrap()
    }

    #[test]
    fn test_seed_file_import_and_listing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CATALOG_SEED_FILE);
        std::fs::write(&path, SEED).unwrap();

        let catalog = service();
        assert!(catalog.import_seed_file(&path).unwrap());

        let names: Vec<_> = catalog.list_categories().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Coffee", "Cake"]);

        let ids: Vec<_> = catalog.list_products().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 3, 2]);

        let latte = catalog.get_product(3).unwrap();
        assert_eq!(latte.price_for(Some("Large")), Some(Decimal::from(38)));
        assert!(!catalog.get_product(2).unwrap().is_active);
    }

    #[test]
    fn test_missing_seed_file_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!service().import_seed_file(dir.path().join("none.json")).unwrap());
    }

    #[test]
    fn test_broken_seed_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CATALOG_SEED_FILE);
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            service().import_seed_file(&path),
            Err(CatalogError::Seed { .. })
        ));
    }

    #[test]
    fn test_warmup_reloads_from_database() {
        let db = db::open_in_memory().unwrap();
        let catalog = CatalogService::new(db.clone()).unwrap();
        catalog.import(serde_json::from_str(SEED).unwrap()).unwrap();

        let reloaded = CatalogService::new(db).unwrap();
        assert!(reloaded.list_products().is_empty());
        reloaded.warmup().unwrap();
        assert_eq!(reloaded.list_products().len(), 3);
        assert_eq!(reloaded.get_category(2).unwrap().name, "Cake");
        assert_eq!(reloaded.get_products_by_category(1).len(), 2);
    }

    #[test]
    fn test_product_needs_known_category() {
        let catalog = service();
        let err = catalog
            .upsert_product(Product {
                id: 9,
                name: "Tea".to_string(),
                price: Decimal::from(20),
                category_id: 77,
                sizes: vec![],
                is_active: true,
            })
            .unwrap_err();
        assert!(matches!(err, CatalogError::CategoryNotFound(77)));
    }

    #[test]
    fn test_invalid_entries_are_rejected() {
        let catalog = service();
        catalog
            .upsert_category(Category {
                id: 1,
                name: "Coffee".to_string(),
                sort_order: 0,
            })
            .unwrap();
        let err = catalog
            .upsert_product(Product {
                id: 1,
                name: "Latte".to_string(),
                price: Decimal::from(30),
                category_id: 1,
                sizes: vec![SizeVariant {
                    name: "Large".to_string(),
                    price: Decimal::ZERO,
                }],
                is_active: true,
            })
            .unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));
        assert!(matches!(
            catalog.get_product(1),
            Err(CatalogError::ProductNotFound(1))
        ));
    }

    #[test]
    fn test_sample_seed_imports() {
        let seed: CatalogSeed =
            serde_json::from_str(include_str!("../../catalog.sample.json")).unwrap();
        let catalog = service();
        catalog.import(seed).unwrap();
        assert_eq!(catalog.list_categories().len(), 3);
        let coffee = catalog.get_product(102).unwrap();
        assert_eq!(coffee.price_for(Some("Large")), Some(Decimal::from(38)));
        assert!(!catalog.get_product(302).unwrap().is_active);
    }
}
