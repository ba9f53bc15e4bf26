use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    AppState,
    error::{AppError, Result},
    models::{FieldEdit, ProductDraft, SlotKey, StoredProduct},
    utils::multipart::read_form,
};

#[derive(Debug, Deserialize)]
pub struct UpdateProductRequest {
    pub version: i64,
    #[serde(default)]
    pub edits: Vec<FieldEdit>,
}

#[derive(Debug, Deserialize)]
pub struct VersionQuery {
    pub version: i64,
}

pub async fn list_products(State(state): State<AppState>) -> Result<Json<Vec<StoredProduct>>> {
    let mut editor = state.editor();
    let products = editor.load().await?.to_vec();

    Ok(Json(products))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<StoredProduct>> {
    let product = find_product(&state, id).await?;

    Ok(Json(product))
}

pub async fn create_product(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<StoredProduct>)> {
    let form = read_form(multipart, Some("draft"), "images").await?;
    let draft: ProductDraft = serde_json::from_str(form.require_json("draft")?)?;

    let product = state.writer().create(&draft, &form.files).await?;

    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<StoredProduct>> {
    let form = read_form(multipart, Some("cambios"), "images").await?;
    let request: UpdateProductRequest = serde_json::from_str(form.require_json("cambios")?)?;

    let product = find_product(&state, id).await?;
    ensure_version(&product, request.version)?;

    let mut editor = state.editor();
    editor.open_record(product);
    for edit in request.edits {
        editor.apply(edit)?;
    }
    editor.attach_images(form.files)?;

    let saved = editor.save().await?;

    Ok(Json(saved))
}

pub async fn delete_product_image(
    State(state): State<AppState>,
    Path((id, slot)): Path<(Uuid, String)>,
    Query(params): Query<VersionQuery>,
) -> Result<Json<StoredProduct>> {
    let slot: SlotKey = slot.parse().map_err(AppError::BadRequest)?;

    let product = find_product(&state, id).await?;
    ensure_version(&product, params.version)?;

    let mut editor = state.editor();
    editor.open_record(product);
    editor.delete_image(slot)?;

    let saved = editor.save().await?;

    Ok(Json(saved))
}

async fn find_product(state: &AppState, id: Uuid) -> Result<StoredProduct> {
    state
        .products
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Producto {} no encontrado", id)))
}

fn ensure_version(product: &StoredProduct, version: i64) -> Result<()> {
    if product.version != version {
        return Err(AppError::Conflict(format!(
            "El producto {} fue modificado por otra sesión (versión {})",
            product.id, product.version
        )));
    }
    Ok(())
}
