use crate::error::{AppError, Result};
use std::env;

pub const DEFAULT_PERMALINK_BASE: &str = "https://tecpoint.ws/shop";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cors: CorsConfig,
    pub s3: S3Config,
    pub catalog: CatalogConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_body_size: usize,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    pub assets_url: String,
}

#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub permalink_base: String,
    pub max_image_size: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            permalink_base: DEFAULT_PERMALINK_BASE.to_string(),
            max_image_size: 5 * 1024 * 1024,
        }
    }
}

impl CatalogConfig {
    pub fn permalink(&self, slug: &str) -> String {
        format!("{}/{}", self.permalink_base.trim_end_matches('/'), slug)
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "3000".to_string())
                    .parse()
                    .map_err(|_| AppError::ConfigError("Invalid PORT value".to_string()))?,
                max_body_size: env::var("MAX_BODY_SIZE")
                    .unwrap_or_else(|_| "10485760".to_string())
                    .parse()
                    .map_err(|_| AppError::ConfigError("Invalid MAX_BODY_SIZE value".to_string()))?,
            },
            database: DatabaseConfig {
                url: env::var("DB_URL")?,
                max_connections: env::var("DB_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "20".to_string())
                    .parse()
                    .map_err(|_| {
                        AppError::ConfigError("Invalid DB_MAX_CONNECTIONS value".to_string())
                    })?,
            },
            cors: CorsConfig {
                allowed_origins: env::var("FRONTEND_URL")?
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            },
            s3: S3Config {
                bucket: env::var("S3_BUCKET")
                    .map_err(|_| AppError::ConfigError("S3_BUCKET not set".to_string()))?,
                region: env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
                assets_url: env::var("ASSETS_URL")
                    .map_err(|_| AppError::ConfigError("ASSETS_URL not set".to_string()))?
                    .trim_end_matches('/')
                    .to_string(),
            },
            catalog: CatalogConfig {
                permalink_base: env::var("PERMALINK_BASE")
                    .unwrap_or_else(|_| DEFAULT_PERMALINK_BASE.to_string()),
                max_image_size: env::var("MAX_IMAGE_SIZE")
                    .unwrap_or_else(|_| "5242880".to_string())
                    .parse()
                    .map_err(|_| AppError::ConfigError("Invalid MAX_IMAGE_SIZE value".to_string()))?,
            },
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permalink_joins_base_and_slug() {
        let catalog = CatalogConfig::default();
        assert_eq!(
            catalog.permalink("cable-usb-c"),
            "https://tecpoint.ws/shop/cable-usb-c"
        );
    }

    #[test]
    fn permalink_ignores_trailing_slash_on_base() {
        let catalog = CatalogConfig {
            permalink_base: "https://example.com/tienda/".to_string(),
            ..CatalogConfig::default()
        };
        assert_eq!(catalog.permalink("x"), "https://example.com/tienda/x");
    }
}
