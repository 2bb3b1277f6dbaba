//! The retrieval/standardization pipeline.
//!
//! - [`geometry`]: camera/detector/amplifier model
//! - [`assemble`]: raw exposure assembly with the metadata fallback path
//! - [`calib`]: calibration-product shape normalization

pub mod assemble;
pub mod calib;
pub mod geometry;

pub use assemble::{Exposure, assemble_raw, read_primary_metadata};
pub use calib::{
    CalibKind, CalibMapping, CalibProduct, CalibStorage, StandardizeRegistry, StdHandler,
    standardize,
};
pub use geometry::{AmpSegment, Camera, Detector};
