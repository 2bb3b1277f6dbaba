use std::path::PathBuf;

use thiserror::Error;

/// Convenience result type for ingestion and retrieval operations.
pub type ObsResult<T> = Result<T, ObsError>;

/// Error type returned across the crate.
///
/// This is a single error enum shared by the ingestion pipeline (header
/// translation, path decomposition, registration) and the retrieval pipeline
/// (exposure assembly, calibration standardization). Every fatal condition
/// aborts only the file/record/retrieval in progress; callers iterating over
/// many files are expected to collect these per file and keep going.
#[derive(Debug, Error)]
pub enum ObsError {
    /// Underlying I/O error (e.g. file not found, truncated read).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid FITS (bad card, bad block, unsupported BITPIX, ...).
    #[error("malformed FITS in '{path}': {message}")]
    Fits { path: PathBuf, message: String },

    /// A header key required by a translator or translation table is absent.
    #[error("header key '{key}' not found")]
    MissingKey { key: String },

    /// A header key exists but holds a value of the wrong type.
    #[error("header key '{key}': {message}")]
    KeyType { key: String, message: String },

    /// The file path does not carry the six-component test-stand layout.
    #[error("path '{path}' does not match the test-stand layout: {message}")]
    PathStructure { path: PathBuf, message: String },

    /// The run id encoded in the path disagrees with the header's run.
    #[error("run mismatch for '{path}': header says '{header_run}', path says '{path_run}'")]
    RunMismatch {
        path: PathBuf,
        header_run: String,
        path_run: String,
    },

    /// A declared registration column resolved to no value and has no default.
    #[error("no value for registration column '{column}' (no mapping, translator, or default)")]
    MissingField { column: String },

    /// A resolved value could not be coerced to the column's declared type.
    #[error("column '{column}': cannot store '{raw}': {message}")]
    ColumnParse {
        column: String,
        raw: String,
        message: String,
    },

    /// A `key=value` field was not found inside a composite `CALIB_ID` string.
    #[error("field '{field}' not present in CALIB_ID '{calib_id}'")]
    CalibIdLookup { field: String, calib_id: String },

    /// A record with the same uniqueness-key tuple is already registered.
    #[error("duplicate registry entry for key ({key})")]
    DuplicateEntry { key: String },

    /// No registered record matches the data identifier.
    #[error("no registry entry matches {data_id}")]
    NoSuchEntry { data_id: String },

    /// The data identifier matches more than one record where one was required.
    #[error("data id {data_id} is ambiguous: {matches} records match")]
    AmbiguousDataId { data_id: String, matches: usize },

    /// A data-identifier value could not be normalized (e.g. textual `visit`
    /// that is not an integer).
    #[error("data id key '{key}': '{raw}' is not an integer")]
    DataIdCoercion { key: String, raw: String },

    /// A data identifier names a sensor the camera model does not have.
    #[error("detector '{name}' is not part of camera '{camera}'")]
    UnknownDetector { camera: String, name: String },

    /// The declared calibration storage shape matches none of the known kinds.
    #[error("unrecognised calibration storage shape for '{dataset}': {message}")]
    CalibShape { dataset: String, message: String },

    /// Registry CSV persistence error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration (de)serialization error.
    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),
}

impl ObsError {
    /// Build a FITS-format error for `path`.
    pub(crate) fn fits(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Fits {
            path: path.into(),
            message: message.into(),
        }
    }
}
