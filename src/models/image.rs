use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Highest slot index a record can hold.
pub const MAX_SLOTS: u16 = 99;

const SLOT_PREFIX: &str = "imagen_";

/// Indexed position of an image inside a record (`imagen_01`, `imagen_02`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotKey(u16);

impl SlotKey {
    pub fn new(index: u16) -> Option<Self> {
        (1..=MAX_SLOTS).contains(&index).then_some(Self(index))
    }

    pub fn index(&self) -> u16 {
        self.0
    }

    /// Image id stored in the slot, e.g. `CBL001_01`.
    pub fn image_id(&self, sku: &str) -> String {
        format!("{}_{:02}", sku, self.0)
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:02}", SLOT_PREFIX, self.0)
    }
}

impl FromStr for SlotKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_prefix(SLOT_PREFIX)
            .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|digits| digits.parse::<u16>().ok())
            .and_then(SlotKey::new)
            .ok_or_else(|| format!("clave de imagen inválida: {}", s))
    }
}

impl Serialize for SlotKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SlotKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSlot {
    pub id: String,
    pub img: String,
}

pub type SlotMap = BTreeMap<SlotKey, ImageSlot>;

/// First free index after every slot in `maps`.
pub fn next_slot_index<'a>(maps: impl IntoIterator<Item = &'a SlotMap>) -> u16 {
    maps.into_iter()
        .filter_map(|map| map.keys().next_back())
        .map(|key| key.index())
        .max()
        .unwrap_or(0)
        + 1
}

/// A file selected by the operator, in selection order.
#[derive(Debug, Clone)]
pub struct ImageFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }
}

/// Whether `value` can stand as one segment of a blob key.
pub fn is_key_segment(value: &str) -> bool {
    !value.contains(['/', '\\'])
}

/// `productos/<brand>/<sku>/<sku>_<NN>`
pub fn product_image_key(brand: &str, sku: &str, slot: SlotKey) -> String {
    format!("productos/{}/{}/{}", brand, sku, slot.image_id(sku))
}

/// `secciones/<sku>/<filename>`, keeping only the last path component of the name.
pub fn section_image_key(sku: &str, file_name: &str) -> Option<String> {
    let name = file_name
        .rsplit(['/', '\\'])
        .next()
        .map(str::trim)
        .filter(|name| !name.is_empty())?;

    Some(format!("secciones/{}/{}", sku, name))
}
