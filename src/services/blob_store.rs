use async_trait::async_trait;

use crate::error::{AppError, Result};

/// Object storage for product and section images.
///
/// Public URLs are `<assets_url>/<key>` with encoded segments, so a URL handed out by
/// [`BlobStore::public_url`] maps back to exactly one key.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    fn assets_url(&self) -> &str;

    /// Each key segment is percent-encoded, so brands like `Rock Space` stay
    /// one path segment in the URL.
    fn public_url(&self, key: &str) -> String {
        let path: Vec<_> = key.split('/').map(urlencoding::encode).collect();
        format!("{}/{}", self.assets_url(), path.join("/"))
    }

    fn key_from_url(&self, url: &str) -> Option<String> {
        let path = url
            .strip_prefix(self.assets_url())?
            .strip_prefix('/')
            .filter(|path| !path.is_empty())?;

        let segments = path
            .split('/')
            .map(|segment| urlencoding::decode(segment).ok().map(|s| s.into_owned()))
            .collect::<Option<Vec<_>>>()?;

        Some(segments.join("/"))
    }

    async fn delete_by_url(&self, url: &str) -> Result<()> {
        let key = self.key_from_url(url).ok_or_else(|| {
            AppError::BadRequest(format!("La URL {} no pertenece al almacenamiento", url))
        })?;

        self.delete(&key).await
    }
}
