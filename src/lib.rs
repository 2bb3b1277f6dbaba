//! `obs-teststand` ingests, indexes, and assembles multi-extension FITS data
//! produced by a multi-sensor camera test stand.
//!
//! Two pipelines make up the crate:
//!
//! 1. **Ingestion** ([`ingest`]): read a raw file's header, translate it into
//!    a typed per-exposure record (direct copies, computed translators,
//!    configured defaults, path-derived identifiers), validate the record
//!    against the variant's registration schema, and register it in the
//!    queryable [`registry::Registry`].
//! 2. **Retrieval** ([`exposure`]): resolve a [`types::DataId`] through the
//!    registry, assemble the sensor's per-amplifier raw segments into one
//!    full-frame [`exposure::Exposure`], and normalize calibration products
//!    into the same exposure shape.
//!
//! Everything variant-specific is declarative configuration
//! ([`ingest::IngestConfig`]): the HDU to parse, the translation table,
//! translator bindings, defaults, and the column schema. Three hardware
//! generations ship as constructors (`com_cam`, `ts8`, `ts3`), plus a
//! calibration-product variant; arbitrary variants load from JSON.
//!
//! ## Ingest a directory and fetch an exposure
//!
//! ```no_run
//! use obs_teststand::exposure::Camera;
//! use obs_teststand::ingest::{IngestConfig, IngestOptions};
//! use obs_teststand::mapper::TestStandMapper;
//! use obs_teststand::types::{ColumnValue, DataId};
//!
//! # fn main() -> Result<(), obs_teststand::ObsError> {
//! let mut mapper = TestStandMapper::new(IngestConfig::com_cam(), Camera::com_cam());
//!
//! let outcome = mapper.ingest_directory("/data/teststand", &IngestOptions::default())?;
//! println!("registered {} files, {} failed", outcome.ingested.len(), outcome.failures.len());
//!
//! let id = DataId::new()
//!     .with("visit", ColumnValue::Int(269921586))
//!     .with("ccd", ColumnValue::Text("S00".to_string()));
//! let exposure = mapper.get_raw(&id)?;
//! println!("assembled {:?} pixels", exposure.image.dim());
//! # Ok(())
//! # }
//! ```
//!
//! ## Parse one file without a mapper
//!
//! ```no_run
//! use obs_teststand::ingest::{IngestConfig, parse_file};
//!
//! # fn main() -> Result<(), obs_teststand::ObsError> {
//! let config = IngestConfig::com_cam();
//! let record = parse_file("/data/R00/RUN123/FLAT/v0/42/S00/frame.fits", &config)?;
//! println!("visit = {:?}", record.get("visit"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`ingest`]: metadata ingestion pipeline and its configuration
//! - [`registry`]: the queryable per-exposure index (with CSV persistence)
//! - [`exposure`]: detector geometry, raw assembly, calibration shapes
//! - [`mapper`]: the façade tying one variant's pipelines together
//! - [`fits`]: the FITS subset the test stand writes
//! - [`types`]: schema, record, and data-identifier types
//! - [`error`]: the crate-wide error enum

pub mod error;
pub mod exposure;
pub mod fits;
pub mod ingest;
pub mod mapper;
pub mod registry;
pub mod types;

pub use error::{ObsError, ObsResult};
