//! The camera mapper: the plugin surface that ties the pipelines together.
//!
//! A [`TestStandMapper`] owns one variant's configuration, the camera
//! geometry model, the per-exposure registry, and the calibration
//! standardization registry. Ingestion fills the registry; retrieval goes
//! from a [`DataId`] through the registry to an assembled [`Exposure`].

use std::collections::HashMap;
use std::path::Path;

use crate::error::{ObsError, ObsResult};
use crate::exposure::assemble::{Exposure, assemble_raw};
use crate::exposure::calib::{
    CalibKind, CalibMapping, CalibProduct, StandardizeRegistry, StdHandler, standardize,
};
use crate::exposure::geometry::{Camera, Detector};
use crate::ingest::assemble::{IngestOptions, SweepOutcome, sweep_directory};
use crate::ingest::config::IngestConfig;
use crate::registry::Registry;
use crate::types::{ColumnValue, DataId};

/// One camera variant's mapper: configuration, geometry, index, and
/// calibration handling in one place.
#[derive(Debug)]
pub struct TestStandMapper {
    config: IngestConfig,
    camera: Camera,
    registry: Registry,
    standardizers: StandardizeRegistry,
    calib_mappings: HashMap<CalibKind, CalibMapping>,
}

impl TestStandMapper {
    /// Create a mapper for `config` over `camera`.
    ///
    /// Calibration mappings default to the bare-image storage shape, the
    /// most common way the construction pipeline persists them; declare a
    /// different shape with [`set_calib_mapping`](Self::set_calib_mapping).
    pub fn new(config: IngestConfig, camera: Camera) -> Self {
        let registry = Registry::new(config.schema.clone());
        let calib_mappings = [
            CalibKind::Bias,
            CalibKind::Dark,
            CalibKind::Flat,
            CalibKind::Fringe,
        ]
        .into_iter()
        .map(|kind| (kind, CalibMapping::new(kind, "DecoratedImageF")))
        .collect();

        Self {
            config,
            camera,
            registry,
            standardizers: StandardizeRegistry::new(),
            calib_mappings,
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// The camera geometry model.
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// The per-exposure registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Declare how a calibration kind is persisted.
    pub fn set_calib_mapping(&mut self, kind: CalibKind, storage_type: impl Into<String>) {
        self.calib_mappings
            .insert(kind, CalibMapping::new(kind, storage_type));
    }

    /// Register a standardization override for a calibration kind.
    pub fn set_standardizer(&mut self, kind: CalibKind, handler: StdHandler) {
        self.standardizers.register(kind, handler);
    }

    /// Sweep a directory tree and register every successfully parsed record.
    ///
    /// Registration failures (e.g. duplicate uniqueness keys) join the
    /// sweep's per-file failures; they never abort the run.
    pub fn ingest_directory(
        &mut self,
        root: impl AsRef<Path>,
        options: &IngestOptions,
    ) -> ObsResult<SweepOutcome> {
        let mut outcome = sweep_directory(root, &self.config, options)?;

        let mut registered = Vec::with_capacity(outcome.ingested.len());
        for file in outcome.ingested.drain(..) {
            match self.registry.insert(file.record.clone(), file.path.clone()) {
                Ok(()) => registered.push(file),
                Err(error) => outcome.failures.push((file.path, error)),
            }
        }
        outcome.ingested = registered;
        Ok(outcome)
    }

    /// Retrieve and assemble the raw exposure a data identifier names.
    pub fn get_raw(&self, data_id: &DataId) -> ObsResult<Exposure> {
        let row = self.registry.locate(data_id)?;
        let ccd = row
            .record
            .get("ccd")
            .ok_or_else(|| ObsError::MissingField {
                column: "ccd".to_string(),
            })?;
        let detector = self.detector_for(ccd)?;
        assemble_raw(&row.path, detector)
    }

    /// Standardize a calibration product read for `data_id` into the
    /// full-exposure shape.
    pub fn standardize_calib(
        &self,
        kind: CalibKind,
        product: CalibProduct,
        data_id: &DataId,
    ) -> ObsResult<Exposure> {
        let mapping = self
            .calib_mappings
            .get(&kind)
            .ok_or_else(|| ObsError::CalibShape {
                dataset: kind.as_str().to_string(),
                message: "no storage mapping declared".to_string(),
            })?;
        standardize(&self.standardizers, mapping, product, data_id)
    }

    fn detector_for(&self, ccd: &ColumnValue) -> ObsResult<&Detector> {
        let found = match ccd {
            ColumnValue::Text(name) => self.camera.detector(name),
            ColumnValue::Int(id) => u32::try_from(*id)
                .ok()
                .and_then(|id| self.camera.detector_by_id(id)),
            ColumnValue::Double(_) => None,
        };
        found.ok_or_else(|| ObsError::UnknownDetector {
            camera: self.camera.name.clone(),
            name: ccd.to_field(),
        })
    }
}
