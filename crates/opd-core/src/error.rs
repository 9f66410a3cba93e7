//! Top-level error type.

use thiserror::Error;

use crate::db::DbError;
use crate::export::ExportError;
use crate::validation::ValidationError;

/// Errors surfaced to the view layer.
#[derive(Error, Debug)]
pub enum ClinicError {
    /// User-correctable input problem; nothing was written.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Record has not been saved yet")]
    NotPersisted,

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type ClinicResult<T> = Result<T, ClinicError>;
