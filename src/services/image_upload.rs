//! Sequential image uploads that build a record's slot map.
//!
//! A batch is all-or-nothing: when an upload fails, every blob written by the
//! same batch is deleted again before the error is returned. Callers that fail
//! after a successful batch hand its keys back to [`ImageUploader::discard`].

use std::{collections::HashSet, sync::Arc};

use crate::{
    error::{AppError, Result},
    models::{
        ImageFile, ImageSlot, MAX_SLOTS, SlotKey, SlotMap, ValidationError, is_key_segment,
        product_image_key, section_image_key,
    },
    services::BlobStore,
};

const ALLOWED_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/jpg", "image/png", "image/webp"];

/// Storage namespace of a record's images.
#[derive(Debug, Clone, Copy)]
pub struct UploadNamespace<'a> {
    pub brand: &'a str,
    pub sku: &'a str,
}

/// Blobs written by one batch, and the slots that reference them.
#[derive(Debug, Default)]
pub struct UploadedBatch {
    pub slots: SlotMap,
    pub keys: Vec<String>,
}

#[derive(Clone)]
pub struct ImageUploader {
    blobs: Arc<dyn BlobStore>,
    max_image_size: usize,
}

impl ImageUploader {
    pub fn new(blobs: Arc<dyn BlobStore>, max_image_size: usize) -> Self {
        Self {
            blobs,
            max_image_size,
        }
    }

    pub fn blobs(&self) -> &Arc<dyn BlobStore> {
        &self.blobs
    }

    /// Uploads `files` in order to slots `first_index`, `first_index + 1`, ...
    pub async fn upload_batch(
        &self,
        namespace: UploadNamespace<'_>,
        files: &[ImageFile],
        first_index: u16,
    ) -> Result<UploadedBatch> {
        if files.is_empty() {
            return Ok(UploadedBatch::default());
        }

        let slots = slot_range(first_index, files.len())?;
        for file in files {
            self.check_image(file)?;
        }

        let mut batch = UploadedBatch::default();

        for (slot, file) in slots.into_iter().zip(files) {
            let key = product_image_key(namespace.brand, namespace.sku, slot);

            if let Err(e) = self
                .blobs
                .upload(&key, file.bytes.clone(), &file.content_type)
                .await
            {
                tracing::error!(
                    "Upload of {} failed, rolling back {} staged images",
                    key,
                    batch.keys.len()
                );
                self.discard(&batch.keys).await;
                return Err(e);
            }

            tracing::info!("Uploaded {} ({} bytes)", key, file.bytes.len());

            batch.slots.insert(
                slot,
                ImageSlot {
                    id: slot.image_id(namespace.sku),
                    img: self.blobs.public_url(&key),
                },
            );
            batch.keys.push(key);
        }

        Ok(batch)
    }

    /// Uploads a layout-section image and returns its public URL.
    pub async fn upload_section_image(&self, sku: &str, file: &ImageFile) -> Result<String> {
        if sku.trim().is_empty() {
            return Err(AppError::Validation(vec![ValidationError::MissingSku]));
        }
        if !is_key_segment(sku) {
            return Err(AppError::Validation(vec![ValidationError::InvalidSku]));
        }
        self.check_image(file)?;

        let key = section_image_key(sku.trim(), &file.file_name)
            .ok_or_else(|| AppError::BadRequest("El archivo no tiene nombre".to_string()))?;

        self.blobs
            .upload(&key, file.bytes.clone(), &file.content_type)
            .await?;

        tracing::info!("Uploaded section image {}", key);

        Ok(self.blobs.public_url(&key))
    }

    /// Deletes staged blobs. Failures are logged and skipped.
    pub async fn discard(&self, keys: &[String]) {
        for key in keys {
            match self.blobs.delete(key).await {
                Ok(()) => tracing::info!("Discarded staged image {}", key),
                Err(e) => tracing::warn!("Failed to discard staged image {}: {}", key, e),
            }
        }
    }

    /// Deletes staged blobs, skipping any that `current` already references.
    ///
    /// Keys are deterministic, so a batch that lost a race may share keys with
    /// the record another session stored. Those blobs belong to that record now.
    pub async fn discard_unreferenced(&self, keys: &[String], current: Option<&SlotMap>) {
        let referenced: HashSet<&str> = current
            .into_iter()
            .flat_map(|slots| slots.values().map(|slot| slot.img.as_str()))
            .collect();

        let (kept, staged): (Vec<String>, Vec<String>) = keys
            .iter()
            .cloned()
            .partition(|key| referenced.contains(self.blobs.public_url(key).as_str()));

        for key in &kept {
            tracing::warn!("Keeping staged image {} referenced by the stored record", key);
        }

        self.discard(&staged).await;
    }

    fn check_image(&self, file: &ImageFile) -> Result<()> {
        if file.bytes.is_empty() {
            return Err(AppError::BadRequest(format!(
                "El archivo {} está vacío",
                file.file_name
            )));
        }

        if file.bytes.len() > self.max_image_size {
            return Err(AppError::BadRequest(format!(
                "El archivo {} supera el tamaño máximo de {} bytes",
                file.file_name, self.max_image_size
            )));
        }

        let content_type = file.content_type.to_ascii_lowercase();
        if !ALLOWED_CONTENT_TYPES.contains(&content_type.as_str()) {
            return Err(AppError::BadRequest(format!(
                "Formato no soportado '{}'. Formatos válidos: {}",
                file.content_type,
                ALLOWED_CONTENT_TYPES.join(", ")
            )));
        }

        Ok(())
    }
}

fn slot_range(first_index: u16, count: usize) -> Result<Vec<SlotKey>> {
    (0..count)
        .map(|offset| {
            u16::try_from(offset)
                .ok()
                .and_then(|offset| first_index.checked_add(offset))
                .and_then(SlotKey::new)
                .ok_or_else(|| {
                    tracing::warn!(
                        "Slot range {}+{} exceeds {} slots",
                        first_index,
                        count,
                        MAX_SLOTS
                    );
                    AppError::Validation(vec![ValidationError::TooManyImages])
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::MemoryBlobStore;

    const CDN: &str = "https://cdn.test";

    fn png(name: &str) -> ImageFile {
        ImageFile::new(name, "image/png", vec![0x89, 0x50, 0x4e, 0x47])
    }

    fn uploader(store: &Arc<MemoryBlobStore>) -> ImageUploader {
        ImageUploader::new(store.clone(), 1024)
    }

    const NAMESPACE: UploadNamespace<'static> = UploadNamespace {
        brand: "Naztech",
        sku: "CBL001",
    };

    #[tokio::test]
    async fn slots_follow_selection_order() {
        let store = Arc::new(MemoryBlobStore::new(CDN));
        let files = vec![png("c.png"), png("a.png"), png("b.png")];

        let batch = uploader(&store)
            .upload_batch(NAMESPACE, &files, 1)
            .await
            .unwrap();

        let indices: Vec<u16> = batch.slots.keys().map(|k| k.index()).collect();
        assert_eq!(indices, vec![1, 2, 3]);
        assert_eq!(
            store.uploads(),
            vec![
                "productos/Naztech/CBL001/CBL001_01".to_string(),
                "productos/Naztech/CBL001/CBL001_02".to_string(),
                "productos/Naztech/CBL001/CBL001_03".to_string(),
            ]
        );

        let first = &batch.slots[&SlotKey::new(1).unwrap()];
        assert_eq!(first.id, "CBL001_01");
        assert_eq!(first.img, "https://cdn.test/productos/Naztech/CBL001/CBL001_01");
    }

    #[tokio::test]
    async fn batch_can_start_after_existing_slots() {
        let store = Arc::new(MemoryBlobStore::new(CDN));

        let batch = uploader(&store)
            .upload_batch(NAMESPACE, &[png("d.png")], 4)
            .await
            .unwrap();

        assert_eq!(batch.slots.keys().next().unwrap().to_string(), "imagen_04");
        assert_eq!(batch.keys, vec!["productos/Naztech/CBL001/CBL001_04".to_string()]);
    }

    #[tokio::test]
    async fn failed_upload_rolls_back_batch() {
        let store = Arc::new(MemoryBlobStore::new(CDN).with_quota(2));
        let files = vec![png("a.png"), png("b.png"), png("c.png")];

        let result = uploader(&store).upload_batch(NAMESPACE, &files, 1).await;

        assert!(matches!(result, Err(AppError::StorageError(_))));
        assert!(store.keys().is_empty());
        assert_eq!(store.deletes().len(), 2);
    }

    #[tokio::test]
    async fn invalid_files_are_rejected_before_upload() {
        let store = Arc::new(MemoryBlobStore::new(CDN));
        let files = vec![
            png("a.png"),
            ImageFile::new("doc.pdf", "application/pdf", vec![1]),
        ];

        let result = uploader(&store).upload_batch(NAMESPACE, &files, 1).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));

        let empty = uploader(&store)
            .upload_batch(NAMESPACE, &[ImageFile::new("a.png", "image/png", vec![])], 1)
            .await;
        assert!(matches!(empty, Err(AppError::BadRequest(_))));

        let large = uploader(&store)
            .upload_batch(NAMESPACE, &[ImageFile::new("a.png", "image/png", vec![0; 2048])], 1)
            .await;
        assert!(matches!(large, Err(AppError::BadRequest(_))));

        assert!(store.uploads().is_empty());
    }

    #[tokio::test]
    async fn slot_overflow_is_rejected() {
        let store = Arc::new(MemoryBlobStore::new(CDN));

        let result = uploader(&store)
            .upload_batch(NAMESPACE, &[png("a.png"), png("b.png")], MAX_SLOTS)
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(store.uploads().is_empty());
    }

    #[tokio::test]
    async fn empty_batch_touches_nothing() {
        let store = Arc::new(MemoryBlobStore::new(CDN));

        let batch = uploader(&store).upload_batch(NAMESPACE, &[], 1).await.unwrap();
        assert!(batch.slots.is_empty());
        assert!(store.uploads().is_empty());
    }

    #[tokio::test]
    async fn discard_keeps_blobs_the_stored_record_references() {
        let store = Arc::new(MemoryBlobStore::new(CDN));
        let uploader = uploader(&store);
        let batch = uploader
            .upload_batch(NAMESPACE, &[png("a.png"), png("b.png")], 1)
            .await
            .unwrap();

        let mut current = SlotMap::new();
        let first = SlotKey::new(1).unwrap();
        current.insert(first, batch.slots[&first].clone());

        uploader.discard_unreferenced(&batch.keys, Some(&current)).await;

        assert!(store.get("productos/Naztech/CBL001/CBL001_01").is_some());
        assert!(store.get("productos/Naztech/CBL001/CBL001_02").is_none());
        assert_eq!(
            store.deletes(),
            vec!["productos/Naztech/CBL001/CBL001_02".to_string()]
        );

        uploader.discard_unreferenced(&batch.keys[..1], None).await;
        assert!(store.keys().is_empty());
    }

    #[tokio::test]
    async fn section_images_use_file_name() {
        let store = Arc::new(MemoryBlobStore::new(CDN));

        let url = uploader(&store)
            .upload_section_image("CBL001", &png("banner.png"))
            .await
            .unwrap();

        assert_eq!(url, "https://cdn.test/secciones/CBL001/banner.png");
        assert!(store.get("secciones/CBL001/banner.png").is_some());
    }
}
