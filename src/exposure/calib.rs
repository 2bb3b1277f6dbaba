//! Calibration-product standardization.
//!
//! Calibration frames are persisted in one of three shapes, depending on
//! which pipeline wrote them: a bare pixel image, an image+mask pair, or an
//! already-full exposure. Consumers always want the full-exposure shape, so
//! retrieval classifies the declared storage type, wraps accordingly, and
//! then applies either a per-kind override from an explicit
//! [`StandardizeRegistry`] or the generic path.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use ndarray::Array2;

use crate::error::{ObsError, ObsResult};
use crate::exposure::assemble::Exposure;
use crate::fits::HeaderRecord;
use crate::types::DataId;

/// The calibration product kinds this camera uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CalibKind {
    Bias,
    Dark,
    Flat,
    Fringe,
}

impl CalibKind {
    /// Dataset-kind tag, as used in mappings and error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            CalibKind::Bias => "bias",
            CalibKind::Dark => "dark",
            CalibKind::Flat => "flat",
            CalibKind::Fringe => "fringe",
        }
    }
}

impl fmt::Display for CalibKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three on-disk shapes a calibration product may have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibStorage {
    /// Bare pixel image, no mask, no metadata beyond the header.
    Image,
    /// Image plus mask plane.
    MaskedImage,
    /// Already the full exposure shape.
    Exposure,
}

impl CalibStorage {
    /// Classify a mapping's declared storage type name.
    ///
    /// Declarations are container type names like `DecoratedImageF` or
    /// `MaskedImageF`; classification is by substring, checking the most
    /// specific name first. An unrecognized declaration is fatal for the
    /// retrieval.
    pub fn classify(kind: CalibKind, declared: &str) -> ObsResult<Self> {
        if declared.contains("MaskedImage") {
            Ok(CalibStorage::MaskedImage)
        } else if declared.contains("Exposure") {
            Ok(CalibStorage::Exposure)
        } else if declared.contains("Image") {
            Ok(CalibStorage::Image)
        } else {
            Err(ObsError::CalibShape {
                dataset: kind.as_str().to_string(),
                message: format!("declared storage type '{declared}' is not recognised"),
            })
        }
    }
}

/// How one calibration dataset kind is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalibMapping {
    /// Dataset kind.
    pub kind: CalibKind,
    /// Declared storage type name, classified on use.
    pub storage_type: String,
}

impl CalibMapping {
    /// Create a mapping.
    pub fn new(kind: CalibKind, storage_type: impl Into<String>) -> Self {
        Self {
            kind,
            storage_type: storage_type.into(),
        }
    }
}

/// A calibration product as read from disk, in whichever shape it was
/// persisted.
#[derive(Debug, Clone, PartialEq)]
pub enum CalibProduct {
    /// Bare pixel image.
    Image(Array2<f64>),
    /// Image plus mask plane.
    MaskedImage {
        image: Array2<f64>,
        mask: Array2<f64>,
    },
    /// Already-assembled exposure.
    Exposure(Exposure),
}

impl CalibProduct {
    fn shape_name(&self) -> &'static str {
        match self {
            CalibProduct::Image(_) => "Image",
            CalibProduct::MaskedImage { .. } => "MaskedImage",
            CalibProduct::Exposure(_) => "Exposure",
        }
    }
}

/// Per-kind standardization override.
pub type StdHandler = Arc<dyn Fn(Exposure, &DataId) -> ObsResult<Exposure> + Send + Sync>;

/// Explicit registry mapping dataset kinds to standardization overrides.
///
/// An override beats the generic path; kinds without an entry standardize
/// generically. Lookup is by tag, never by naming convention.
#[derive(Clone, Default)]
pub struct StandardizeRegistry {
    handlers: HashMap<CalibKind, StdHandler>,
}

impl StandardizeRegistry {
    /// An empty registry: every kind takes the generic path.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an override for `kind`, replacing any previous one.
    pub fn register(&mut self, kind: CalibKind, handler: StdHandler) {
        self.handlers.insert(kind, handler);
    }

    /// Look up the override for `kind`.
    pub fn get(&self, kind: CalibKind) -> Option<&StdHandler> {
        self.handlers.get(&kind)
    }
}

impl fmt::Debug for StandardizeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<&str> = self.handlers.keys().map(|k| k.as_str()).collect();
        kinds.sort_unstable();
        f.debug_struct("StandardizeRegistry")
            .field("overridden", &kinds)
            .finish()
    }
}

/// Normalize a stored calibration product into the full-exposure shape.
///
/// The declared mapping decides the classification; a product whose actual
/// shape disagrees with its declaration is rejected. Standardizing an
/// already-exposure-shaped product through the generic path is a no-op.
pub fn standardize(
    registry: &StandardizeRegistry,
    mapping: &CalibMapping,
    product: CalibProduct,
    data_id: &DataId,
) -> ObsResult<Exposure> {
    let storage = CalibStorage::classify(mapping.kind, &mapping.storage_type)?;

    let exposure = match (storage, product) {
        (CalibStorage::Image, CalibProduct::Image(image)) => Exposure {
            image,
            mask: None,
            metadata: HeaderRecord::default(),
            detector: None,
        }
        .with_mask_plane(),
        (CalibStorage::MaskedImage, CalibProduct::MaskedImage { image, mask }) => Exposure {
            image,
            mask: Some(mask),
            metadata: HeaderRecord::default(),
            detector: None,
        },
        (CalibStorage::Exposure, CalibProduct::Exposure(exposure)) => exposure,
        (declared, product) => {
            return Err(ObsError::CalibShape {
                dataset: mapping.kind.as_str().to_string(),
                message: format!(
                    "declared {declared:?} but the stored item is {}",
                    product.shape_name()
                ),
            });
        }
    };

    match registry.get(mapping.kind) {
        Some(handler) => handler(exposure, data_id),
        None => Ok(exposure),
    }
}
