mod connection;
mod memory;
mod store;

pub use connection::{check_health, create_pool};
pub use memory::MemoryProductStore;
pub use store::ProductStore;
