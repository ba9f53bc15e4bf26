use std::sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{
    database::ProductStore,
    error::{AppError, Result},
    models::{ProductRecord, StoredProduct},
};

/// In-process `productos` collection with the same conflict and versioning
/// rules as the PostgreSQL store.
#[derive(Default)]
pub struct MemoryProductStore {
    products: Mutex<Vec<StoredProduct>>,
    writes: AtomicUsize,
}

impl MemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of create and update calls that reached the store.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<StoredProduct>>> {
        self.products
            .lock()
            .map_err(|_| AppError::InternalError("product store lock poisoned".to_string()))
    }
}

#[async_trait]
impl ProductStore for MemoryProductStore {
    async fn create(&self, record: ProductRecord) -> Result<StoredProduct> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut products = self.lock()?;

        if products.iter().any(|p| p.record.sku == record.sku) {
            return Err(AppError::Conflict(format!(
                "Ya existe un producto con SKU {}",
                record.sku
            )));
        }

        let stored = StoredProduct {
            id: Uuid::new_v4(),
            version: 1,
            updated_at: Utc::now(),
            record,
        };
        products.push(stored.clone());

        Ok(stored)
    }

    async fn list_all(&self) -> Result<Vec<StoredProduct>> {
        Ok(self.lock()?.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<StoredProduct>> {
        Ok(self.lock()?.iter().find(|p| p.id == id).cloned())
    }

    async fn find_by_sku(&self, sku: &str) -> Result<Option<StoredProduct>> {
        Ok(self.lock()?.iter().find(|p| p.record.sku == sku).cloned())
    }

    async fn update_fields(
        &self,
        id: Uuid,
        expected_version: i64,
        patch: Map<String, Value>,
    ) -> Result<StoredProduct> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut products = self.lock()?;

        let stored = products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Producto {} no encontrado", id)))?;

        if stored.version != expected_version {
            return Err(AppError::Conflict(format!(
                "El producto {} fue modificado por otra sesión (versión {})",
                id, stored.version
            )));
        }

        let mut document = match serde_json::to_value(&stored.record) {
            Ok(Value::Object(document)) => document,
            Ok(_) => Map::new(),
            Err(e) => return Err(AppError::InternalError(e.to_string())),
        };
        document.extend(patch);

        stored.record = serde_json::from_value(Value::Object(document))
            .map_err(|e| AppError::BadRequest(format!("Documento inválido: {}", e)))?;
        stored.version += 1;
        stored.updated_at = Utc::now();

        Ok(stored.clone())
    }

    async fn check_health(&self) -> Result<()> {
        self.lock().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::product::fixtures;

    #[tokio::test]
    async fn create_rejects_duplicate_sku() {
        let store = MemoryProductStore::new();
        store.create(fixtures::record("CBL001")).await.unwrap();

        let duplicate = store.create(fixtures::record("CBL001")).await;
        assert!(matches!(duplicate, Err(AppError::Conflict(_))));
        assert_eq!(store.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_merges_top_level_keys_and_bumps_version() {
        let store = MemoryProductStore::new();
        let created = store.create(fixtures::record("CBL001")).await.unwrap();

        let mut patch = Map::new();
        patch.insert("producto".to_string(), Value::from("Cable USB-C 2m"));

        let updated = store.update_fields(created.id, 1, patch).await.unwrap();
        assert_eq!(updated.version, 2);
        assert_eq!(updated.record.producto, "Cable USB-C 2m");
        assert_eq!(updated.record.precio, created.record.precio);
    }

    #[tokio::test]
    async fn update_with_stale_version_conflicts() {
        let store = MemoryProductStore::new();
        let created = store.create(fixtures::record("CBL001")).await.unwrap();
        store.update_fields(created.id, 1, Map::new()).await.unwrap();

        let stale = store.update_fields(created.id, 1, Map::new()).await;
        assert!(matches!(stale, Err(AppError::Conflict(_))));

        let missing = store.update_fields(Uuid::new_v4(), 1, Map::new()).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }
}
