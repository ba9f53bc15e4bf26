mod draft;
mod edit;
mod image;
pub(crate) mod product;

pub use draft::*;
pub use edit::*;
pub use image::*;
pub use product::{
    Extradata, FichaDescriptiva, MarcaProducto, Precio, ProductRecord, Seccion, Secciones,
    StoredProduct, section_slot,
};
