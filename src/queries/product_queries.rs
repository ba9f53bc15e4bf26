use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::{PgPool, types::Json};
use uuid::Uuid;

use crate::{
    database::{self, ProductStore},
    error::{AppError, Result},
    models::{ProductRecord, StoredProduct},
};

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    version: i64,
    updated_at: DateTime<Utc>,
    data: Json<ProductRecord>,
}

impl From<ProductRow> for StoredProduct {
    fn from(row: ProductRow) -> Self {
        StoredProduct {
            id: row.id,
            version: row.version,
            updated_at: row.updated_at,
            record: row.data.0,
        }
    }
}

const PRODUCT_COLUMNS: &str = "id, version, updated_at, data";

/// `productos` collection backed by a JSONB column.
#[derive(Clone)]
pub struct PgProductStore {
    pool: PgPool,
}

impl PgProductStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductStore for PgProductStore {
    async fn create(&self, record: ProductRecord) -> Result<StoredProduct> {
        let sku = record.sku.clone();

        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            INSERT INTO productos (id, sku, data)
            VALUES ($1, $2, $3)
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&sku)
        .bind(Json(&record))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(format!("Ya existe un producto con SKU {}", sku))
            }
            other => AppError::DatabaseError(other),
        })?;

        Ok(row.into())
    }

    async fn list_all(&self) -> Result<Vec<StoredProduct>> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {} FROM productos ORDER BY created_at ASC",
            PRODUCT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(StoredProduct::from).collect())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<StoredProduct>> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {} FROM productos WHERE id = $1",
            PRODUCT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(StoredProduct::from))
    }

    async fn find_by_sku(&self, sku: &str) -> Result<Option<StoredProduct>> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {} FROM productos WHERE sku = $1",
            PRODUCT_COLUMNS
        ))
        .bind(sku)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(StoredProduct::from))
    }

    async fn update_fields(
        &self,
        id: Uuid,
        expected_version: i64,
        patch: Map<String, Value>,
    ) -> Result<StoredProduct> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            UPDATE productos
            SET
                data = data || $3,
                version = version + 1,
                updated_at = NOW()
            WHERE id = $1 AND version = $2
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(id)
        .bind(expected_version)
        .bind(Json(Value::Object(patch)))
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(row.into()),
            None => match self.find_by_id(id).await? {
                Some(current) => Err(AppError::Conflict(format!(
                    "El producto {} fue modificado por otra sesión (versión {})",
                    id, current.version
                ))),
                None => Err(AppError::NotFound(format!("Producto {} no encontrado", id))),
            },
        }
    }

    async fn check_health(&self) -> Result<()> {
        database::check_health(&self.pool).await
    }
}
