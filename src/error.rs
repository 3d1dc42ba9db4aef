use std::path::PathBuf;

use thiserror::Error;

/// Failures that abort a table load.
///
/// Cell-level parse problems never show up here: they are coerced to null
/// and collected as [`ParseWarning`](crate::data::model::ParseWarning)s.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("opening workbook {path}: {source}")]
    Workbook {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    #[error("{path} contains no worksheet")]
    NoWorksheet { path: PathBuf },

    #[error("parsing CSV {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("unsupported file extension: .{0}")]
    UnsupportedFormat(String),

    #[error("{path} has no header at row {row}")]
    MissingHeader { path: PathBuf, row: usize },

    /// A required column could not be located (schema error).
    #[error("{path}: no column {column}")]
    MissingColumn { path: PathBuf, column: String },
}

impl LoadError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        LoadError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn missing_column(path: &std::path::Path, column: impl Into<String>) -> Self {
        LoadError::MissingColumn {
            path: path.to_path_buf(),
            column: column.into(),
        }
    }

    /// Whether this is a schema failure rather than an I/O or format one.
    pub fn is_schema_error(&self) -> bool {
        matches!(self, LoadError::MissingColumn { .. })
    }
}

pub type LoadResult<T> = std::result::Result<T, LoadError>;
