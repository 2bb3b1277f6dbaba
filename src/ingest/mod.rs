//! The ingestion pipeline.
//!
//! Most callers should use [`assemble::sweep_directory`] (or
//! [`assemble::parse_file`] for a single file), which:
//!
//! - reads the header of the HDU the active [`config::IngestConfig`] selects
//! - applies the translation table, translators, and defaults
//! - merges the path-derived identifiers
//! - validates the record against the registration schema
//! - optionally reports per-file outcomes to an [`IngestObserver`]
//!
//! The pieces are also available individually:
//! - [`config`]: per-variant declarative configuration
//! - [`translate`]: computed-field translators
//! - [`path`]: the six-component path contract
//! - [`observability`]: outcome observers

pub mod assemble;
pub mod config;
pub mod observability;
pub mod path;
pub mod translate;

pub use assemble::{
    IngestOptions, IngestedFile, SweepOutcome, parse_file, record_from_header, sweep_directory,
};
pub use config::{IngestConfig, TranslatorKind};
pub use observability::{
    CompositeObserver, FileObserver, IngestContext, IngestObserver, IngestSeverity, IngestStats,
    LogObserver,
};
pub use path::{PathInfo, decompose};
pub use translate::{
    round_wavelength, run_translator, translate_calib_date, translate_ccd, translate_filter,
    translate_visit, translate_wavelength,
};
