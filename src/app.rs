use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
};
use tower_http::cors::CorsLayer;

use crate::{
    config::{self, AppConfig, CatalogConfig},
    database::{self, ProductStore},
    error::Result,
    queries::PgProductStore,
    routes,
    services::{BlobStore, ImageUploader, ProductEditor, ProductWriter, S3BlobStore},
};

#[derive(Clone)]
pub struct AppState {
    pub products: Arc<dyn ProductStore>,
    pub blobs: Arc<dyn BlobStore>,
    pub catalog: CatalogConfig,
}

impl AppState {
    pub fn new(
        products: Arc<dyn ProductStore>,
        blobs: Arc<dyn BlobStore>,
        catalog: CatalogConfig,
    ) -> Self {
        Self {
            products,
            blobs,
            catalog,
        }
    }

    pub fn uploader(&self) -> ImageUploader {
        ImageUploader::new(self.blobs.clone(), self.catalog.max_image_size)
    }

    pub fn writer(&self) -> ProductWriter {
        ProductWriter::new(self.products.clone(), self.uploader(), self.catalog.clone())
    }

    pub fn editor(&self) -> ProductEditor {
        ProductEditor::new(self.products.clone(), self.uploader(), self.catalog.clone())
    }
}

pub async fn build(config: &AppConfig) -> Result<Router> {
    let pool = database::create_pool(&config.database).await?;
    let s3_client = config::load_s3_client(&config.s3).await?;

    let state = AppState::new(
        Arc::new(PgProductStore::new(pool)),
        Arc::new(S3BlobStore::new(
            s3_client,
            config.s3.bucket.clone(),
            config.s3.assets_url.clone(),
        )),
        config.catalog.clone(),
    );

    let allowed_origins: Vec<HeaderValue> = config
        .cors
        .allowed_origins
        .iter()
        .map(|origin| {
            origin.parse::<HeaderValue>().map_err(|_| {
                crate::error::AppError::ConfigError(format!("Invalid CORS origin: {}", origin))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([http::header::CONTENT_TYPE, http::header::AUTHORIZATION])
        .allow_origin(allowed_origins);

    let app = routes::create_router()
        .layer(DefaultBodyLimit::max(config.server.max_body_size))
        .layer(cors)
        .with_state(state);

    Ok(app)
}
