use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::models::SlotMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Precio {
    #[serde(with = "rust_decimal::serde::float")]
    pub detalle: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub mayoreo: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarcaProducto {
    pub marca: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extradata {
    pub stock: bool,
    #[serde(rename = "modelId", default)]
    pub model_id: String,
    #[serde(default)]
    pub upc: String,
    #[serde(default)]
    pub color: String,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub discount: Decimal,
    #[serde(default)]
    pub especificaciones: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Seccion {
    #[serde(default)]
    pub title: String,
    #[serde(rename = "imagenUrl", default)]
    pub imagen_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FichaDescriptiva {
    #[serde(default)]
    pub ficha_title: String,
    #[serde(default)]
    pub ficha_description: String,
    #[serde(default)]
    pub ficha_image: String,
}

/// Numbered layout sections (`seccion_01`, ...) plus the descriptive sheet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Secciones {
    #[serde(default)]
    pub ficha_descriptiva: FichaDescriptiva,
    #[serde(flatten)]
    pub slots: BTreeMap<String, Seccion>,
}

pub fn section_slot(index: usize) -> String {
    format!("seccion_{:02}", index + 1)
}

/// Body of a document in the `productos` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub sku: String,
    pub slug: String,
    pub permalink: String,
    pub producto: String,
    pub descripcion: String,
    pub precio: Precio,
    pub categorias: BTreeSet<String>,
    #[serde(rename = "SubCategorias", default)]
    pub sub_categorias: BTreeSet<String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    pub marca_producto: MarcaProducto,
    pub extradata: Extradata,
    #[serde(default)]
    pub imagenes: SlotMap,
    #[serde(default)]
    pub secciones: Secciones,
    pub fecha_agregado: DateTime<Utc>,
}

impl ProductRecord {
    /// Top-level keys whose values differ from `original`, with their new values.
    pub fn changed_fields(&self, original: &ProductRecord) -> serde_json::Result<Map<String, Value>> {
        let Value::Object(current) = serde_json::to_value(self)? else {
            return Ok(Map::new());
        };
        let Value::Object(before) = serde_json::to_value(original)? else {
            return Ok(current);
        };

        Ok(current
            .into_iter()
            .filter(|(key, value)| before.get(key) != Some(value))
            .collect())
    }
}

/// A persisted record together with its store identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredProduct {
    pub id: Uuid,
    pub version: i64,
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub record: ProductRecord,
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_uses_catalog_key_names() {
        let mut record = fixtures::record("CBL001");
        record.secciones.slots.insert(
            section_slot(0),
            Seccion {
                title: "Carga rápida".to_string(),
                imagen_url: "https://cdn.test/secciones/CBL001/a.png".to_string(),
            },
        );

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["precio"]["detalle"], 10.5);
        assert_eq!(value["precio"]["mayoreo"], 6.0);
        assert_eq!(value["extradata"]["modelId"], "NZ-1");
        assert_eq!(value["extradata"]["stock"], true);
        assert_eq!(value["marca_producto"]["marca"], "Naztech");
        assert!(value["marca_producto"].get("logo").is_none());
        assert_eq!(value["SubCategorias"], serde_json::json!([]));
        assert_eq!(value["imagenes"]["imagen_01"]["id"], "CBL001_01");
        assert_eq!(value["secciones"]["seccion_01"]["imagenUrl"], "https://cdn.test/secciones/CBL001/a.png");
        assert_eq!(value["secciones"]["ficha_descriptiva"]["ficha_title"], "");

        let back: ProductRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn changed_fields_reports_only_top_level_differences() {
        let original = fixtures::record("CBL001");
        let mut edited = original.clone();
        edited.extradata.stock = false;

        let changed = edited.changed_fields(&original).unwrap();
        assert_eq!(changed.len(), 1);
        assert_eq!(changed["extradata"]["stock"], false);
        assert_eq!(changed["extradata"]["upc"], "123");
    }

    #[test]
    fn changed_fields_is_empty_for_identical_records() {
        let original = fixtures::record("CBL001");
        assert!(original.changed_fields(&original).unwrap().is_empty());
    }
}
