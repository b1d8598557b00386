use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by catalog operations
///
/// Every variant is terminal for the current user action; nothing is retried.
/// `ImageLoad` is the exception: the catalog renderer recovers from it locally
/// by drawing a placeholder box.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// An upload lacks one or more required columns (listed in column order)
    #[error("missing columns: {}", .0.join("、"))]
    MissingColumns(Vec<String>),

    /// An upload or stored file could not be read or parsed
    #[error("failed to read {path}: {reason}")]
    FileRead { path: String, reason: String },

    /// Quote requested for a product code absent from the price-rule table
    #[error("product not found: {0}")]
    ProductNotFound(String),

    /// Request values outside the ranges the surfaces accept
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("image {path} could not be loaded: {reason}")]
    ImageLoad { path: PathBuf, reason: String },

    #[error("pdf generation failed: {0}")]
    Pdf(String),

    /// A blocking worker panicked or was cancelled
    #[error("background task failed: {0}")]
    Task(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, CatalogError>;

impl CatalogError {
    pub fn file_read(path: impl Into<String>, reason: impl ToString) -> Self {
        CatalogError::FileRead {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
