//! Exposure assembly: one full-frame sensor image from per-amplifier raw
//! sub-images.

use std::path::Path;

use ndarray::{Array2, s};

use crate::error::{ObsError, ObsResult};
use crate::exposure::geometry::Detector;
use crate::fits::{self, HeaderRecord};

/// An assembled in-memory exposure: pixels, attached metadata, and the
/// detector association. Built fresh per retrieval request; never cached
/// here.
#[derive(Debug, Clone, PartialEq)]
pub struct Exposure {
    /// Full-frame pixel data, `(height, width)`.
    pub image: Array2<f64>,
    /// Pixel mask, when the product carries one. Zero means good.
    pub mask: Option<Array2<f64>>,
    /// Metadata read from the file's primary header (or its fallback).
    pub metadata: HeaderRecord,
    /// Sensor-location name of the associated detector, when known.
    pub detector: Option<String>,
}

impl Exposure {
    /// Ensure a mask plane exists; absent masks become all-good planes of
    /// the image's shape.
    pub fn with_mask_plane(mut self) -> Self {
        if self.mask.is_none() {
            self.mask = Some(Array2::zeros(self.image.dim()));
        }
        self
    }
}

/// Assemble one sensor's raw exposure from its per-amplifier extensions.
///
/// Each amplifier segment is read from the extension the detector model
/// names and placed at its assembled position untouched: no overscan
/// trimming, no gain normalization (calibration is applied downstream, so
/// both are explicitly disabled for this camera).
pub fn assemble_raw(path: impl AsRef<Path>, detector: &Detector) -> ObsResult<Exposure> {
    let path = path.as_ref();
    let (height, width) = detector.assembled_size();
    let mut image = Array2::zeros((height, width));

    for amp in &detector.amps {
        let segment = fits::read_image_at(path, amp.hdu)?;
        if segment.dim() != (amp.height, amp.width) {
            return Err(ObsError::fits(
                path,
                format!(
                    "amp '{}' extension {} is {:?}, geometry says ({}, {})",
                    amp.name,
                    amp.hdu,
                    segment.dim(),
                    amp.height,
                    amp.width
                ),
            ));
        }
        image
            .slice_mut(s![amp.y0..amp.y0 + amp.height, amp.x0..amp.x0 + amp.width])
            .assign(&segment);
    }

    let metadata = read_primary_metadata(path)?;
    Ok(Exposure {
        image,
        mask: None,
        metadata,
        detector: Some(detector.name.clone()),
    })
}

/// Read exposure metadata from the primary header, tolerating files whose
/// primary HDU is unreadable or carries only structural keywords.
///
/// The fallback parses the first data extension's header directly. Only
/// failure of both paths is fatal.
pub fn read_primary_metadata(path: impl AsRef<Path>) -> ObsResult<HeaderRecord> {
    let path = path.as_ref();
    match fits::read_header_at(path, 0) {
        Ok(header) if !header.is_bare() => Ok(header),
        Ok(_) => {
            log::warn!(
                "primary header of '{}' carries no metadata; falling back to extension 1",
                path.display()
            );
            fits::read_header_at(path, 1)
        }
        Err(error) => {
            log::warn!(
                "primary header of '{}' unreadable ({error}); falling back to extension 1",
                path.display()
            );
            fits::read_header_at(path, 1)
        }
    }
}
