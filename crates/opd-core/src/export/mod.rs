//! Export of visit records to monthly workbooks.

mod workbook;

pub use workbook::*;

use std::path::PathBuf;

use thiserror::Error;

use crate::models::Record;

/// Export errors. Never retried.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Workbook error: {0}")]
    Xlsx(String),

    /// A batch stopped part way. `appended` holds the input positions of the
    /// records that were durably written before the failure.
    #[error("export stopped after {} records were written: {source}", .appended.len())]
    Batch {
        appended: Vec<usize>,
        source: Box<ExportError>,
    },
}

impl ExportError {
    /// Input positions already written when a batch failed. Empty for
    /// failures that wrote nothing.
    pub fn appended(&self) -> &[usize] {
        match self {
            ExportError::Batch { appended, .. } => appended.as_slice(),
            _ => &[],
        }
    }

    pub(crate) fn after_partial(appended: Vec<usize>, err: ExportError) -> Self {
        if appended.is_empty() {
            err
        } else {
            ExportError::Batch {
                appended,
                source: Box::new(err),
            }
        }
    }
}

/// Map a reader or writer failure from the xlsx crate.
pub(crate) fn xlsx_error<E: std::fmt::Display>(err: E) -> ExportError {
    ExportError::Xlsx(err.to_string())
}

pub type ExportResult<T> = Result<T, ExportError>;

/// Destination that mirrors each saved visit.
pub trait RecordSink {
    /// Append one visit and return the file it landed in.
    fn append_record(&self, record: &Record) -> ExportResult<PathBuf>;

    /// Append several visits. Returns each destination once, in order of
    /// first appearance.
    ///
    /// On failure the error reports which records were already written
    /// through [`ExportError::appended`].
    fn append_records(&self, records: &[Record]) -> ExportResult<Vec<PathBuf>> {
        let mut paths: Vec<PathBuf> = Vec::new();
        for (index, record) in records.iter().enumerate() {
            let path = self
                .append_record(record)
                .map_err(|err| ExportError::after_partial((0..index).collect(), err))?;
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
        Ok(paths)
    }
}
