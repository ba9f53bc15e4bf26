use std::{collections::BTreeMap, sync::Mutex};

use async_trait::async_trait;

use crate::{
    error::{AppError, Result},
    services::BlobStore,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[derive(Default)]
struct State {
    blobs: BTreeMap<String, StoredBlob>,
    uploads: Vec<String>,
    deletes: Vec<String>,
}

/// In-process object store. An optional quota caps how many blobs it holds;
/// uploads past the quota fail.
pub struct MemoryBlobStore {
    assets_url: String,
    quota: Option<usize>,
    state: Mutex<State>,
}

impl MemoryBlobStore {
    pub fn new(assets_url: impl Into<String>) -> Self {
        Self {
            assets_url: assets_url.into().trim_end_matches('/').to_string(),
            quota: None,
            state: Mutex::new(State::default()),
        }
    }

    pub fn with_quota(mut self, quota: usize) -> Self {
        self.quota = Some(quota);
        self
    }

    pub fn get(&self, key: &str) -> Option<StoredBlob> {
        self.state.lock().ok()?.blobs.get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.state
            .lock()
            .map(|state| state.blobs.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Keys passed to `upload`, in call order.
    pub fn uploads(&self) -> Vec<String> {
        self.state
            .lock()
            .map(|state| state.uploads.clone())
            .unwrap_or_default()
    }

    /// Keys passed to `delete`, in call order.
    pub fn deletes(&self) -> Vec<String> {
        self.state
            .lock()
            .map(|state| state.deletes.clone())
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| AppError::InternalError("blob store lock poisoned".to_string()))
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        let mut state = self.lock()?;
        state.uploads.push(key.to_string());

        if let Some(quota) = self.quota {
            if state.blobs.len() >= quota && !state.blobs.contains_key(key) {
                return Err(AppError::StorageError(format!(
                    "storage quota of {} blobs exceeded",
                    quota
                )));
            }
        }

        state.blobs.insert(
            key.to_string(),
            StoredBlob {
                bytes,
                content_type: content_type.to_string(),
            },
        );

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut state = self.lock()?;
        state.deletes.push(key.to_string());
        state.blobs.remove(key);
        Ok(())
    }

    fn assets_url(&self) -> &str {
        &self.assets_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn urls_map_back_to_keys() {
        let store = MemoryBlobStore::new("https://cdn.test/");
        store
            .upload("productos/Naztech/A/A_01", vec![1], "image/png")
            .await
            .unwrap();

        let url = store.public_url("productos/Naztech/A/A_01");
        assert_eq!(url, "https://cdn.test/productos/Naztech/A/A_01");

        store.delete_by_url(&url).await.unwrap();
        assert!(store.keys().is_empty());
        assert_eq!(store.deletes(), vec!["productos/Naztech/A/A_01".to_string()]);
    }

    #[tokio::test]
    async fn url_segments_are_percent_encoded() {
        let store = MemoryBlobStore::new("https://cdn.test");
        let key = "productos/Rock Space/RS 01/RS 01_01";
        store.upload(key, vec![1], "image/png").await.unwrap();

        let url = store.public_url(key);
        assert_eq!(
            url,
            "https://cdn.test/productos/Rock%20Space/RS%2001/RS%2001_01"
        );
        assert_eq!(store.key_from_url(&url).as_deref(), Some(key));

        store.delete_by_url(&url).await.unwrap();
        assert!(store.keys().is_empty());
    }

    #[tokio::test]
    async fn foreign_urls_are_rejected() {
        let store = MemoryBlobStore::new("https://cdn.test");

        let result = store.delete_by_url("https://elsewhere.test/a").await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));

        let result = store.delete_by_url("https://cdn.test/").await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
        assert!(store.deletes().is_empty());
    }

    #[tokio::test]
    async fn quota_rejects_new_keys() {
        let store = MemoryBlobStore::new("https://cdn.test").with_quota(1);
        store.upload("a", vec![1], "image/png").await.unwrap();

        let result = store.upload("b", vec![2], "image/png").await;
        assert!(matches!(result, Err(AppError::StorageError(_))));
        assert_eq!(store.keys(), vec!["a".to_string()]);
    }
}
