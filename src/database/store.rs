use async_trait::async_trait;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{
    error::Result,
    models::{ProductRecord, StoredProduct},
};

/// The `productos` document collection.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Inserts a new document. A second record with the same `sku` is a conflict.
    async fn create(&self, record: ProductRecord) -> Result<StoredProduct>;

    /// Every document, in the store's natural (insertion) order.
    async fn list_all(&self) -> Result<Vec<StoredProduct>>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<StoredProduct>>;

    async fn find_by_sku(&self, sku: &str) -> Result<Option<StoredProduct>>;

    /// Replaces the given top-level keys of the document when its version
    /// still equals `expected_version`, and bumps the version.
    async fn update_fields(
        &self,
        id: Uuid,
        expected_version: i64,
        patch: Map<String, Value>,
    ) -> Result<StoredProduct>;

    async fn check_health(&self) -> Result<()>;
}
