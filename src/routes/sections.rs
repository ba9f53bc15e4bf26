use axum::{
    Json,
    extract::{Multipart, Path, State},
};
use serde::Serialize;

use crate::{
    AppState,
    error::{AppError, Result},
    utils::multipart::read_form,
};

#[derive(Debug, Serialize)]
pub struct SectionImageResponse {
    pub url: String,
}

pub async fn upload_section_image(
    State(state): State<AppState>,
    Path(sku): Path<String>,
    multipart: Multipart,
) -> Result<Json<SectionImageResponse>> {
    let form = read_form(multipart, None, "file").await?;
    let file = form
        .files
        .first()
        .ok_or_else(|| AppError::BadRequest("Falta el campo 'file'".to_string()))?;

    let url = state.uploader().upload_section_image(&sku, file).await?;

    Ok(Json(SectionImageResponse { url }))
}
