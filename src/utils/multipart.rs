use axum::extract::Multipart;

use crate::{
    error::{AppError, Result},
    models::ImageFile,
};

/// Parts of an admin form upload: one JSON field and the files, in the order
/// they were sent.
#[derive(Debug, Default)]
pub struct FormParts {
    pub json: Option<String>,
    pub files: Vec<ImageFile>,
}

impl FormParts {
    pub fn require_json(&self, field: &str) -> Result<&str> {
        self.json
            .as_deref()
            .ok_or_else(|| AppError::BadRequest(format!("Falta el campo '{}'", field)))
    }
}

pub async fn read_form(
    mut multipart: Multipart,
    json_field: Option<&str>,
    file_field: &str,
) -> Result<FormParts> {
    let mut parts = FormParts::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Formulario inválido: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if Some(name.as_str()) == json_field {
            let text = field
                .text()
                .await
                .map_err(|e| AppError::BadRequest(format!("No se pudo leer '{}': {}", name, e)))?;
            parts.json = Some(text);
        } else if name == file_field {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field.bytes().await.map_err(|e| {
                AppError::BadRequest(format!("No se pudo leer el archivo {}: {}", file_name, e))
            })?;

            parts
                .files
                .push(ImageFile::new(file_name, content_type, bytes.to_vec()));
        }
    }

    Ok(parts)
}
