use std::sync::Arc;

use chrono::Utc;

use crate::{
    config::CatalogConfig,
    database::ProductStore,
    error::{AppError, Result},
    models::{ImageFile, ProductDraft, StoredProduct},
    services::{ImageUploader, UploadNamespace, UploadedBatch},
};

/// Turns a validated draft and its images into a new `productos` document.
#[derive(Clone)]
pub struct ProductWriter {
    products: Arc<dyn ProductStore>,
    uploader: ImageUploader,
    catalog: CatalogConfig,
}

impl ProductWriter {
    pub fn new(
        products: Arc<dyn ProductStore>,
        uploader: ImageUploader,
        catalog: CatalogConfig,
    ) -> Self {
        Self {
            products,
            uploader,
            catalog,
        }
    }

    pub async fn create(&self, draft: &ProductDraft, files: &[ImageFile]) -> Result<StoredProduct> {
        let valid = draft.parse(files.len()).map_err(AppError::Validation)?;

        if self.products.find_by_sku(&valid.sku).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "Ya existe un producto con SKU {}",
                valid.sku
            )));
        }

        let UploadedBatch { slots, keys } = self
            .uploader
            .upload_batch(
                UploadNamespace {
                    brand: &valid.brand,
                    sku: &valid.sku,
                },
                files,
                1,
            )
            .await?;

        let permalink = self.catalog.permalink(&valid.slug);
        let record = valid.into_record(slots, permalink, Utc::now());
        let sku = record.sku.clone();

        match self.products.create(record).await {
            Ok(stored) => {
                tracing::info!(
                    "Created product {} (sku {}) with {} images",
                    stored.id,
                    sku,
                    stored.record.imagenes.len()
                );
                Ok(stored)
            }
            Err(e) => {
                tracing::error!("Failed to store product {}: {}", sku, e);
                self.rollback(&sku, &keys).await;
                Err(e)
            }
        }
    }

    /// A concurrent submit of the same SKU writes the same image keys, so only
    /// blobs that the stored record does not reference are deleted.
    async fn rollback(&self, sku: &str, keys: &[String]) {
        match self.products.find_by_sku(sku).await {
            Ok(current) => {
                self.uploader
                    .discard_unreferenced(keys, current.as_ref().map(|p| &p.record.imagenes))
                    .await
            }
            Err(e) => tracing::warn!(
                "Keeping {} staged images of {}, re-read failed: {}",
                keys.len(),
                sku,
                e
            ),
        }
    }
}
