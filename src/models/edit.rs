use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    config::CatalogConfig,
    error::{AppError, Result},
    models::{ProductRecord, ValidationError, is_key_segment},
};

/// A single-leaf edit of a stored record.
///
/// The variant names the path inside the document, so editing `precio.detalle`
/// can never touch `precio.mayoreo`. `sku` is the storage namespace of the
/// record's images and has no edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum FieldEdit {
    Producto(String),
    Descripcion(String),
    Slug(String),
    PrecioDetalle(#[serde(with = "rust_decimal::serde::float")] Decimal),
    PrecioMayoreo(#[serde(with = "rust_decimal::serde::float")] Decimal),
    Categorias(Vec<String>),
    SubCategorias(Vec<String>),
    Tags(Vec<String>),
    Marca(String),
    MarcaLogo(Option<String>),
    Stock(bool),
    ModelId(String),
    Upc(String),
    Color(String),
    Discount(#[serde(with = "rust_decimal::serde::float")] Decimal),
    Especificacion { key: String, value: String },
    RemoveEspecificacion(String),
    SeccionTitle { slot: String, title: String },
    SeccionImagen { slot: String, url: String },
    FichaTitle(String),
    FichaDescription(String),
    FichaImage(String),
}

impl FieldEdit {
    pub fn apply(self, record: &mut ProductRecord, catalog: &CatalogConfig) -> Result<()> {
        match self {
            FieldEdit::Producto(value) => {
                record.producto = non_blank(value, ValidationError::MissingProductName)?;
            }
            FieldEdit::Descripcion(value) => {
                record.descripcion = non_blank(value, ValidationError::MissingDescription)?;
            }
            FieldEdit::Slug(value) => {
                let slug = non_blank(value, ValidationError::MissingSlug)?;
                record.permalink = catalog.permalink(&slug);
                record.slug = slug;
            }
            FieldEdit::PrecioDetalle(value) => {
                record.precio.detalle = non_negative(value, ValidationError::InvalidDetailPrice)?;
            }
            FieldEdit::PrecioMayoreo(value) => {
                record.precio.mayoreo =
                    non_negative(value, ValidationError::InvalidWholesalePrice)?;
            }
            FieldEdit::Categorias(values) => {
                let categorias = normalize(values);
                if categorias.is_empty() {
                    return Err(AppError::Validation(vec![
                        ValidationError::MissingCategories,
                    ]));
                }
                record.categorias = categorias;
            }
            FieldEdit::SubCategorias(values) => record.sub_categorias = normalize(values),
            FieldEdit::Tags(values) => record.tags = normalize(values),
            FieldEdit::Marca(value) => {
                let marca = non_blank(value, ValidationError::MissingBrand)?;
                if !is_key_segment(&marca) {
                    return Err(AppError::Validation(vec![ValidationError::InvalidBrand]));
                }
                record.marca_producto.marca = marca;
            }
            FieldEdit::MarcaLogo(value) => {
                record.marca_producto.logo = value
                    .map(|logo| logo.trim().to_string())
                    .filter(|logo| !logo.is_empty());
            }
            FieldEdit::Stock(value) => record.extradata.stock = value,
            FieldEdit::ModelId(value) => record.extradata.model_id = value.trim().to_string(),
            FieldEdit::Upc(value) => {
                record.extradata.upc = non_blank(value, ValidationError::MissingUpc)?;
            }
            FieldEdit::Color(value) => record.extradata.color = value.trim().to_string(),
            FieldEdit::Discount(value) => {
                record.extradata.discount = non_negative(value, ValidationError::InvalidDiscount)?;
            }
            FieldEdit::Especificacion { key, value } => {
                let key = non_blank(key, ValidationError::BlankSpecificationKey)?;
                record
                    .extradata
                    .especificaciones
                    .insert(key, value.trim().to_string());
            }
            FieldEdit::RemoveEspecificacion(key) => {
                record.extradata.especificaciones.remove(key.trim());
            }
            FieldEdit::SeccionTitle { slot, title } => {
                section_mut(record, &slot)?.title = title;
            }
            FieldEdit::SeccionImagen { slot, url } => {
                section_mut(record, &slot)?.imagen_url = url;
            }
            FieldEdit::FichaTitle(value) => {
                record.secciones.ficha_descriptiva.ficha_title = value;
            }
            FieldEdit::FichaDescription(value) => {
                record.secciones.ficha_descriptiva.ficha_description = value;
            }
            FieldEdit::FichaImage(value) => {
                record.secciones.ficha_descriptiva.ficha_image = value;
            }
        }

        Ok(())
    }
}

fn non_blank(value: String, error: ValidationError) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(vec![error]));
    }
    Ok(trimmed.to_string())
}

fn non_negative(value: Decimal, error: ValidationError) -> Result<Decimal> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(AppError::Validation(vec![error]));
    }
    Ok(value)
}

fn normalize(values: Vec<String>) -> std::collections::BTreeSet<String> {
    values
        .into_iter()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect()
}

fn section_mut<'a>(
    record: &'a mut ProductRecord,
    slot: &str,
) -> Result<&'a mut crate::models::Seccion> {
    record
        .secciones
        .slots
        .get_mut(slot)
        .ok_or_else(|| AppError::NotFound(format!("Sección {} no encontrada", slot)))
}
