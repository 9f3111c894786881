//! Error types for the warehouse load.

use std::path::PathBuf;
use thiserror::Error;

/// Coarse failure classes reported to the operator.
///
/// Per-value coercion failures are not part of this taxonomy: they are
/// absorbed where they happen by substituting a missing value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    SourceUnavailable,
    MalformedInput,
    StorageWriteFailure,
}

/// Errors that abort a warehouse run.
#[derive(Debug, Error)]
pub enum EtlError {
    // === Source Errors ===
    /// Input file does not exist.
    #[error("source file not found: {path}")]
    SourceNotFound { path: PathBuf },

    /// Input file exists but could not be opened or read.
    #[error("failed to read source {path}: {source}")]
    SourceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // === Parsing Errors ===
    /// Input file could not be parsed as a table.
    #[error("failed to parse {path}: {message}")]
    Malformed { path: PathBuf, message: String },

    /// A column the load depends on is absent.
    #[error("required column '{column}' not found in {table}")]
    MissingColumn { table: String, column: String },

    // === Storage Errors ===
    /// Output directory could not be created.
    #[error("failed to create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Database file could not be opened.
    #[error("failed to open warehouse {path}: {source}")]
    StoreOpen {
        path: PathBuf,
        #[source]
        source: sqlx::Error,
    },

    /// A statement against the warehouse failed.
    #[error("failed to write table {table}: {source}")]
    StoreWrite {
        table: String,
        #[source]
        source: sqlx::Error,
    },

    /// Read-back count disagrees with the rows handed to the writer.
    #[error("table {table} holds {actual} rows after write, expected {expected}")]
    CountMismatch {
        table: String,
        expected: usize,
        actual: i64,
    },
}

impl EtlError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EtlError::SourceNotFound { .. } | EtlError::SourceRead { .. } => {
                ErrorKind::SourceUnavailable
            }
            EtlError::Malformed { .. } | EtlError::MissingColumn { .. } => {
                ErrorKind::MalformedInput
            }
            EtlError::OutputDir { .. }
            | EtlError::StoreOpen { .. }
            | EtlError::StoreWrite { .. }
            | EtlError::CountMismatch { .. } => ErrorKind::StorageWriteFailure,
        }
    }

    pub(crate) fn malformed(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        EtlError::Malformed {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub(crate) fn write(table: &str, source: sqlx::Error) -> Self {
        EtlError::StoreWrite {
            table: table.to_string(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
