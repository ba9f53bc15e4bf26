//! Draft state for the create form.
//!
//! A [`ProductDraft`] is an immutable value. Form events are expressed as
//! [`DraftAction`]s and applied with [`ProductDraft::apply`], which returns the
//! next draft. [`ProductDraft::parse`] is the only way to obtain a
//! [`ValidDraft`], the input of record shaping.

use std::{
    collections::{BTreeMap, BTreeSet},
    str::FromStr,
};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{
    Extradata, FichaDescriptiva, MAX_SLOTS, MarcaProducto, Precio, ProductRecord, Seccion,
    Secciones, SlotMap, is_key_segment, section_slot,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpecificationRow {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionDraft {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub image_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FichaDraft {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductDraft {
    pub product_name: String,
    pub description: String,
    pub sku: String,
    pub upc: String,
    pub slug: String,
    pub detail_price: String,
    pub wholesale_price: String,
    pub categories: Vec<String>,
    #[serde(rename = "SubCategorias")]
    pub sub_categories: Vec<String>,
    pub tags: Vec<String>,
    pub brand: String,
    pub brand_logo: String,
    pub model_id: String,
    pub stock: bool,
    pub color: String,
    pub discount: String,
    pub specifications: Vec<SpecificationRow>,
    pub sections: Vec<SectionDraft>,
    pub ficha_descriptiva: FichaDraft,
}

impl Default for ProductDraft {
    fn default() -> Self {
        Self {
            product_name: String::new(),
            description: String::new(),
            sku: String::new(),
            upc: String::new(),
            slug: String::new(),
            detail_price: String::new(),
            wholesale_price: String::new(),
            categories: Vec::new(),
            sub_categories: Vec::new(),
            tags: Vec::new(),
            brand: String::new(),
            brand_logo: String::new(),
            model_id: String::new(),
            stock: true,
            color: String::new(),
            discount: String::new(),
            specifications: vec![SpecificationRow::default()],
            sections: vec![SectionDraft::default(), SectionDraft::default()],
            ficha_descriptiva: FichaDraft::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TextField {
    ProductName,
    Description,
    Sku,
    Upc,
    Slug,
    DetailPrice,
    WholesalePrice,
    Brand,
    BrandLogo,
    ModelId,
    Color,
    Discount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SpecificationField {
    Key,
    Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FichaField {
    Title,
    Description,
    Image,
}

/// One form event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DraftAction {
    SetText { field: TextField, value: String },
    SetStock { value: bool },
    SetCategories { values: Vec<String> },
    SetSubCategories { values: Vec<String> },
    SetTags { values: Vec<String> },
    AddSpecification,
    SetSpecification { index: usize, field: SpecificationField, value: String },
    RemoveSpecification { index: usize },
    AddSection,
    SetSectionTitle { index: usize, value: String },
    SetSectionImage { index: usize, url: String },
    SetFicha { field: FichaField, value: String },
    Reset,
}

impl ProductDraft {
    /// Returns the draft that results from applying `action`.
    ///
    /// Out-of-range row indices leave the draft unchanged.
    pub fn apply(mut self, action: DraftAction) -> Self {
        match action {
            DraftAction::SetText { field, value } => {
                *self.text_mut(field) = value;
            }
            DraftAction::SetStock { value } => self.stock = value,
            DraftAction::SetCategories { values } => self.categories = values,
            DraftAction::SetSubCategories { values } => self.sub_categories = values,
            DraftAction::SetTags { values } => self.tags = values,
            DraftAction::AddSpecification => self.specifications.push(SpecificationRow::default()),
            DraftAction::SetSpecification { index, field, value } => {
                if let Some(row) = self.specifications.get_mut(index) {
                    match field {
                        SpecificationField::Key => row.key = value,
                        SpecificationField::Value => row.value = value,
                    }
                }
            }
            DraftAction::RemoveSpecification { index } => {
                if index < self.specifications.len() {
                    self.specifications.remove(index);
                }
            }
            DraftAction::AddSection => self.sections.push(SectionDraft::default()),
            DraftAction::SetSectionTitle { index, value } => {
                if let Some(section) = self.sections.get_mut(index) {
                    section.title = value;
                }
            }
            DraftAction::SetSectionImage { index, url } => {
                if let Some(section) = self.sections.get_mut(index) {
                    section.image_url = url;
                }
            }
            DraftAction::SetFicha { field, value } => match field {
                FichaField::Title => self.ficha_descriptiva.title = value,
                FichaField::Description => self.ficha_descriptiva.description = value,
                FichaField::Image => self.ficha_descriptiva.image = value,
            },
            DraftAction::Reset => return Self::default(),
        }

        self
    }

    fn text_mut(&mut self, field: TextField) -> &mut String {
        match field {
            TextField::ProductName => &mut self.product_name,
            TextField::Description => &mut self.description,
            TextField::Sku => &mut self.sku,
            TextField::Upc => &mut self.upc,
            TextField::Slug => &mut self.slug,
            TextField::DetailPrice => &mut self.detail_price,
            TextField::WholesalePrice => &mut self.wholesale_price,
            TextField::Brand => &mut self.brand,
            TextField::BrandLogo => &mut self.brand_logo,
            TextField::ModelId => &mut self.model_id,
            TextField::Color => &mut self.color,
            TextField::Discount => &mut self.discount,
        }
    }

    /// Checks the draft against `image_count` selected files and, when every
    /// rule holds, returns the normalized values used to build the record.
    pub fn parse(&self, image_count: usize) -> Result<ValidDraft, Vec<ValidationError>> {
        let mut errors = Vec::new();

        let product_name = required(&self.product_name, ValidationError::MissingProductName, &mut errors);
        let description = required(&self.description, ValidationError::MissingDescription, &mut errors);
        let sku = required(&self.sku, ValidationError::MissingSku, &mut errors);
        let upc = required(&self.upc, ValidationError::MissingUpc, &mut errors);
        let slug = required(&self.slug, ValidationError::MissingSlug, &mut errors);
        let brand = required(&self.brand, ValidationError::MissingBrand, &mut errors);
        if !is_key_segment(&sku) {
            errors.push(ValidationError::InvalidSku);
        }
        if !is_key_segment(&brand) {
            errors.push(ValidationError::InvalidBrand);
        }

        let detail_price = price(
            &self.detail_price,
            ValidationError::MissingDetailPrice,
            ValidationError::InvalidDetailPrice,
            &mut errors,
        );
        let wholesale_price = price(
            &self.wholesale_price,
            ValidationError::MissingWholesalePrice,
            ValidationError::InvalidWholesalePrice,
            &mut errors,
        );

        let discount = if self.discount.trim().is_empty() {
            Some(Decimal::ZERO)
        } else {
            match parse_amount(&self.discount) {
                Some(value) => Some(value),
                None => {
                    errors.push(ValidationError::InvalidDiscount);
                    None
                }
            }
        };

        let categories = normalize_set(&self.categories);
        if categories.is_empty() {
            errors.push(ValidationError::MissingCategories);
        }

        if image_count == 0 {
            errors.push(ValidationError::MissingImages);
        } else if image_count > MAX_SLOTS as usize {
            errors.push(ValidationError::TooManyImages);
        }

        let mut specifications = BTreeMap::new();
        for row in &self.specifications {
            let key = row.key.trim();
            if key.is_empty() {
                continue;
            }
            if specifications
                .insert(key.to_string(), row.value.trim().to_string())
                .is_some()
            {
                errors.push(ValidationError::DuplicateSpecification(key.to_string()));
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        let (Some(detail_price), Some(wholesale_price), Some(discount)) =
            (detail_price, wholesale_price, discount)
        else {
            return Err(vec![ValidationError::InvalidDetailPrice]);
        };

        Ok(ValidDraft {
            product_name,
            description,
            sku,
            upc,
            slug,
            brand,
            brand_logo: Some(self.brand_logo.trim().to_string()).filter(|logo| !logo.is_empty()),
            model_id: self.model_id.trim().to_string(),
            color: self.color.trim().to_string(),
            stock: self.stock,
            precio: Precio {
                detalle: detail_price,
                mayoreo: wholesale_price,
            },
            discount,
            categories,
            sub_categories: normalize_set(&self.sub_categories),
            tags: normalize_set(&self.tags),
            specifications,
            secciones: self.secciones(),
        })
    }

    /// Error codes for the draft; empty when it can be submitted.
    pub fn validate(&self, image_count: usize) -> Vec<ValidationError> {
        self.parse(image_count).err().unwrap_or_default()
    }

    fn secciones(&self) -> Secciones {
        Secciones {
            ficha_descriptiva: FichaDescriptiva {
                ficha_title: self.ficha_descriptiva.title.clone(),
                ficha_description: self.ficha_descriptiva.description.clone(),
                ficha_image: self.ficha_descriptiva.image.clone(),
            },
            slots: self
                .sections
                .iter()
                .enumerate()
                .map(|(index, section)| {
                    (
                        section_slot(index),
                        Seccion {
                            title: section.title.clone(),
                            imagen_url: section.image_url.clone(),
                        },
                    )
                })
                .collect(),
        }
    }
}

fn required(value: &str, error: ValidationError, errors: &mut Vec<ValidationError>) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.push(error);
    }
    trimmed.to_string()
}

fn price(
    value: &str,
    missing: ValidationError,
    invalid: ValidationError,
    errors: &mut Vec<ValidationError>,
) -> Option<Decimal> {
    if value.trim().is_empty() {
        errors.push(missing);
        return None;
    }

    let parsed = parse_amount(value);
    if parsed.is_none() {
        errors.push(invalid);
    }
    parsed
}

/// Parses a non-negative decimal amount typed into the form.
pub fn parse_amount(value: &str) -> Option<Decimal> {
    Decimal::from_str(value.trim())
        .ok()
        .filter(|amount| !amount.is_sign_negative())
}

fn normalize_set(values: &[String]) -> BTreeSet<String> {
    values
        .iter()
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect()
}

/// A draft that passed validation, with prices parsed and sets normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidDraft {
    pub product_name: String,
    pub description: String,
    pub sku: String,
    pub upc: String,
    pub slug: String,
    pub brand: String,
    pub brand_logo: Option<String>,
    pub model_id: String,
    pub color: String,
    pub stock: bool,
    pub precio: Precio,
    pub discount: Decimal,
    pub categories: BTreeSet<String>,
    pub sub_categories: BTreeSet<String>,
    pub tags: BTreeSet<String>,
    pub specifications: BTreeMap<String, String>,
    pub secciones: Secciones,
}

impl ValidDraft {
    pub fn into_record(
        self,
        imagenes: SlotMap,
        permalink: String,
        fecha_agregado: DateTime<Utc>,
    ) -> ProductRecord {
        ProductRecord {
            sku: self.sku,
            slug: self.slug,
            permalink,
            producto: self.product_name,
            descripcion: self.description,
            precio: self.precio,
            categorias: self.categories,
            sub_categorias: self.sub_categories,
            tags: self.tags,
            marca_producto: MarcaProducto {
                marca: self.brand,
                logo: self.brand_logo,
            },
            extradata: Extradata {
                stock: self.stock,
                model_id: self.model_id,
                upc: self.upc,
                color: self.color,
                discount: self.discount,
                especificaciones: self.specifications,
            },
            imagenes,
            secciones: self.secciones,
            fecha_agregado,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    MissingProductName,
    MissingDescription,
    MissingSku,
    MissingUpc,
    MissingSlug,
    MissingDetailPrice,
    MissingWholesalePrice,
    MissingCategories,
    MissingBrand,
    MissingImages,
    TooManyImages,
    InvalidSku,
    InvalidBrand,
    InvalidDetailPrice,
    InvalidWholesalePrice,
    InvalidDiscount,
    DuplicateSpecification(String),
    BlankSpecificationKey,
}

impl ValidationError {
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::MissingProductName => "missing_product_name",
            ValidationError::MissingDescription => "missing_description",
            ValidationError::MissingSku => "missing_sku",
            ValidationError::MissingUpc => "missing_upc",
            ValidationError::MissingSlug => "missing_slug",
            ValidationError::MissingDetailPrice => "missing_detail_price",
            ValidationError::MissingWholesalePrice => "missing_wholesale_price",
            ValidationError::MissingCategories => "missing_categories",
            ValidationError::MissingBrand => "missing_brand",
            ValidationError::MissingImages => "missing_images",
            ValidationError::TooManyImages => "too_many_images",
            ValidationError::InvalidSku => "invalid_sku",
            ValidationError::InvalidBrand => "invalid_brand",
            ValidationError::InvalidDetailPrice => "invalid_detail_price",
            ValidationError::InvalidWholesalePrice => "invalid_wholesale_price",
            ValidationError::InvalidDiscount => "invalid_discount",
            ValidationError::DuplicateSpecification(_) => "duplicate_specification",
            ValidationError::BlankSpecificationKey => "blank_specification_key",
        }
    }
}
