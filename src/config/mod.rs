mod app_config;
mod s3_config;

pub use app_config::{
    AppConfig, CatalogConfig, CorsConfig, DEFAULT_PERMALINK_BASE, DatabaseConfig, S3Config,
    ServerConfig,
};
pub use s3_config::*;
