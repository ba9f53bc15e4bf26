mod blob_store;
pub mod image_upload;
pub mod image_url_service;
mod memory_blob_store;
pub mod product_editor;
pub mod product_writer;

pub use blob_store::BlobStore;
pub use image_upload::{ImageUploader, UploadNamespace, UploadedBatch};
pub use image_url_service::S3BlobStore;
pub use memory_blob_store::{MemoryBlobStore, StoredBlob};
pub use product_editor::{EditorState, ProductEditor, WorkingCopy};
pub use product_writer::ProductWriter;
