mod app_error;

pub use app_error::{AppError, VALIDATION_MESSAGE};

pub type Result<T> = std::result::Result<T, AppError>;
