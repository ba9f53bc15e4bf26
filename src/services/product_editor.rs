//! List/edit flow over stored products.
//!
//! The editor is either closed or open on one working copy. Edits, attached
//! files and image deletions only touch the working copy until [`ProductEditor::save`]
//! succeeds; a failed save leaves the editor open with the copy intact.

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    config::CatalogConfig,
    database::ProductStore,
    error::{AppError, Result},
    models::{
        FieldEdit, ImageFile, ProductRecord, SlotKey, SlotMap, StoredProduct, next_slot_index,
    },
    services::{ImageUploader, UploadNamespace, UploadedBatch},
};

#[derive(Debug, Clone)]
pub struct WorkingCopy {
    original: StoredProduct,
    record: ProductRecord,
    attached: Vec<ImageFile>,
    removed: Vec<String>,
}

impl WorkingCopy {
    fn new(original: StoredProduct) -> Self {
        Self {
            record: original.record.clone(),
            original,
            attached: Vec::new(),
            removed: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.original.id
    }

    pub fn version(&self) -> i64 {
        self.original.version
    }

    pub fn record(&self) -> &ProductRecord {
        &self.record
    }

    pub fn attached(&self) -> &[ImageFile] {
        &self.attached
    }

    /// URLs of images that will be deleted once the copy is saved.
    pub fn removed(&self) -> &[String] {
        &self.removed
    }
}

#[derive(Debug, Clone, Default)]
pub enum EditorState {
    #[default]
    Closed,
    Open(WorkingCopy),
}

pub struct ProductEditor {
    products: Arc<dyn ProductStore>,
    uploader: ImageUploader,
    catalog: CatalogConfig,
    loaded: Vec<StoredProduct>,
    state: EditorState,
}

impl ProductEditor {
    pub fn new(
        products: Arc<dyn ProductStore>,
        uploader: ImageUploader,
        catalog: CatalogConfig,
    ) -> Self {
        Self {
            products,
            uploader,
            catalog,
            loaded: Vec::new(),
            state: EditorState::Closed,
        }
    }

    /// Fetches every stored product, replacing the loaded list.
    pub async fn load(&mut self) -> Result<&[StoredProduct]> {
        self.loaded = self.products.list_all().await?;
        tracing::info!("Loaded {} products", self.loaded.len());
        Ok(&self.loaded)
    }

    pub fn products(&self) -> &[StoredProduct] {
        &self.loaded
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn working_copy(&self) -> Option<&WorkingCopy> {
        match &self.state {
            EditorState::Open(copy) => Some(copy),
            EditorState::Closed => None,
        }
    }

    /// Opens a loaded product by id.
    pub fn open(&mut self, id: Uuid) -> Result<()> {
        let product = self
            .loaded
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Producto {} no encontrado", id)))?;

        self.open_record(product);
        Ok(())
    }

    /// Opens a product fetched elsewhere. Replaces any open working copy.
    pub fn open_record(&mut self, product: StoredProduct) {
        self.state = EditorState::Open(WorkingCopy::new(product));
    }

    pub fn cancel(&mut self) {
        self.state = EditorState::Closed;
    }

    pub fn apply(&mut self, edit: FieldEdit) -> Result<()> {
        let EditorState::Open(copy) = &mut self.state else {
            return Err(not_open());
        };

        let mut record = copy.record.clone();
        edit.apply(&mut record, &self.catalog)?;
        copy.record = record;

        Ok(())
    }

    pub fn attach_images(&mut self, files: Vec<ImageFile>) -> Result<()> {
        self.open_copy()?.attached.extend(files);
        Ok(())
    }

    /// Removes one slot from the working copy and schedules its blob for deletion.
    pub fn delete_image(&mut self, slot: SlotKey) -> Result<()> {
        let copy = self.open_copy()?;

        let removed = copy
            .record
            .imagenes
            .remove(&slot)
            .ok_or_else(|| AppError::NotFound(format!("Imagen {} no encontrada", slot)))?;
        copy.removed.push(removed.img);

        Ok(())
    }

    /// Persists the working copy and closes the editor.
    pub async fn save(&mut self) -> Result<StoredProduct> {
        let copy = match &self.state {
            EditorState::Open(copy) => copy.clone(),
            EditorState::Closed => return Err(not_open()),
        };

        self.ensure_current(&copy).await?;

        let first_index = next_slot_index([&copy.original.record.imagenes, &copy.record.imagenes]);
        let UploadedBatch { slots, keys } = self
            .uploader
            .upload_batch(
                UploadNamespace {
                    brand: &copy.record.marca_producto.marca,
                    sku: &copy.record.sku,
                },
                &copy.attached,
                first_index,
            )
            .await?;

        let saved = match self.commit(&copy, slots).await {
            Ok(saved) => saved,
            Err(e) => {
                tracing::warn!("Failed to update product {}: {}", copy.id(), e);
                self.rollback(copy.id(), &keys).await;
                return Err(e);
            }
        };

        for url in &copy.removed {
            match self.uploader.blobs().delete_by_url(url).await {
                Ok(()) => tracing::info!("Deleted image {}", url),
                Err(e) => tracing::warn!("Failed to delete image {}: {}", url, e),
            }
        }

        if let Some(entry) = self.loaded.iter_mut().find(|p| p.id == saved.id) {
            *entry = saved.clone();
        }
        self.state = EditorState::Closed;

        Ok(saved)
    }

    /// Fails fast when another session saved since the copy was opened, before
    /// anything is uploaded under the record's keys.
    async fn ensure_current(&self, copy: &WorkingCopy) -> Result<()> {
        let current = self
            .products
            .find_by_id(copy.id())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Producto {} no encontrado", copy.id())))?;

        if current.version != copy.version() {
            return Err(AppError::Conflict(format!(
                "El producto {} fue modificado por otra sesión (versión {})",
                copy.id(),
                current.version
            )));
        }

        Ok(())
    }

    async fn commit(&self, copy: &WorkingCopy, slots: SlotMap) -> Result<StoredProduct> {
        let mut record = copy.record.clone();
        record.imagenes.extend(slots);

        let patch = record
            .changed_fields(&copy.original.record)
            .map_err(|e| AppError::InternalError(format!("Failed to diff product: {}", e)))?;

        if patch.is_empty() {
            return Ok(copy.original.clone());
        }

        let fields: Vec<&str> = patch.keys().map(String::as_str).collect();
        tracing::info!("Updating product {} fields: {}", copy.id(), fields.join(", "));

        self.products
            .update_fields(copy.id(), copy.version(), patch)
            .await
    }

    async fn rollback(&self, id: Uuid, keys: &[String]) {
        if keys.is_empty() {
            return;
        }

        match self.products.find_by_id(id).await {
            Ok(current) => {
                self.uploader
                    .discard_unreferenced(keys, current.as_ref().map(|p| &p.record.imagenes))
                    .await
            }
            Err(e) => tracing::warn!(
                "Keeping {} staged images of product {}, re-read failed: {}",
                keys.len(),
                id,
                e
            ),
        }
    }

    fn open_copy(&mut self) -> Result<&mut WorkingCopy> {
        match &mut self.state {
            EditorState::Open(copy) => Ok(copy),
            EditorState::Closed => Err(not_open()),
        }
    }
}

fn not_open() -> AppError {
    AppError::BadRequest("No hay ningún producto abierto para editar".to_string())
}
