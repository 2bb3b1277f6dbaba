//! Metadata assembly: one complete per-exposure record per ingested file.
//!
//! Resolution order for each logical field, per the active
//! [`IngestConfig`](crate::ingest::config::IngestConfig):
//!
//! 1. Direct copy from the translation table's header key.
//! 2. The bound translator, when one is configured for the field.
//! 3. The configured default.
//! 4. Path-derived fields (`basename`, `raftId`, `field`, `jobId`, `raft`,
//!    `ccd`) merged from the six-component layout.
//!
//! The record is then validated: any required registration column still
//! absent fails ingestion of that file. [`sweep_directory`] applies this per
//! file across a tree, isolating failures so one bad file never stops a run.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use walkdir::WalkDir;

use crate::error::{ObsError, ObsResult};
use crate::fits::{self, HeaderRecord, HeaderValue};
use crate::ingest::config::IngestConfig;
use crate::ingest::observability::{IngestContext, IngestObserver, IngestSeverity, IngestStats};
use crate::ingest::{path as path_decomp, translate};
use crate::types::{ColumnType, ColumnValue, ExposureRecord};

/// One successfully ingested file: the record plus its backing path.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestedFile {
    /// The raw file the record was built from.
    pub path: PathBuf,
    /// The completed, validated per-exposure record.
    pub record: ExposureRecord,
}

/// Options controlling a directory sweep.
#[derive(Clone, Default)]
pub struct IngestOptions {
    /// Optional observer for per-file outcomes.
    pub observer: Option<Arc<dyn IngestObserver>>,
    /// Severity threshold at which `on_alert` is invoked. `None` never alerts.
    pub alert_at_or_above: Option<IngestSeverity>,
}

impl std::fmt::Debug for IngestOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestOptions")
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

/// Result of sweeping a directory tree.
#[derive(Debug, Default)]
pub struct SweepOutcome {
    /// Files whose records were produced and validated.
    pub ingested: Vec<IngestedFile>,
    /// Files that failed, with the error that stopped each one.
    pub failures: Vec<(PathBuf, ObsError)>,
}

/// Build the per-exposure record for one raw file.
pub fn parse_file(path: impl AsRef<Path>, config: &IngestConfig) -> ObsResult<ExposureRecord> {
    let path = path.as_ref();
    let header = fits::read_header_at(path, config.hdu)?;
    record_from_header(path, &header, config)
}

/// Build and validate a record from an already-read header.
pub fn record_from_header(
    path: &Path,
    header: &HeaderRecord,
    config: &IngestConfig,
) -> ObsResult<ExposureRecord> {
    let mut record = ExposureRecord::new();

    for (field, key) in &config.translation {
        if let Some(value) = header.get(key) {
            let declared = config.schema.column_type(field);
            record.set(field.clone(), coerce_header_value(field, value, declared)?);
        }
    }

    for (field, kind) in &config.translators {
        match translate::run_translator(*kind, header) {
            Ok(value) => record.set(field.clone(), value),
            // A missing source key leaves the field to defaults/validation;
            // any other translator failure is fatal for this file.
            Err(ObsError::MissingKey { key }) => {
                log::warn!(
                    "translator for '{field}' skipped on '{}': header key '{key}' absent",
                    path.display()
                );
            }
            Err(e) => return Err(e),
        }
    }

    for (field, raw) in &config.defaults {
        if !record.contains(field) {
            let declared = config.schema.column_type(field).unwrap_or(ColumnType::Text);
            record.set(field.clone(), ColumnValue::from_field(field, declared, raw)?);
        }
    }

    if config.decompose_path {
        let run = match record.get("run") {
            Some(value) => value.to_field(),
            None => {
                return Err(ObsError::MissingField {
                    column: "run".to_string(),
                });
            }
        };
        let info = path_decomp::decompose(path, &run)?;
        let raft = config
            .raft_override
            .clone()
            .unwrap_or_else(|| info.raft_id.clone());

        record.set("basename", ColumnValue::Text(info.basename));
        record.set("raftId", ColumnValue::Text(info.raft_id));
        record.set("field", ColumnValue::Text(info.acquisition_type));
        record.set("jobId", ColumnValue::Int(info.job_id));
        record.set("raft", ColumnValue::Text(raft));
        record.set("ccd", ColumnValue::Text(info.sensor_location));
    }

    record.validate(&config.schema)?;
    Ok(record)
}

/// Coerce a header value into the column's declared storage type.
///
/// Undeclared fields keep their natural type. Floats never silently truncate
/// to integers; the explicit translators are the only place that happens.
fn coerce_header_value(
    field: &str,
    value: &HeaderValue,
    declared: Option<ColumnType>,
) -> ObsResult<ColumnValue> {
    let parse_err = |message: &str| ObsError::ColumnParse {
        column: field.to_string(),
        raw: value.to_display(),
        message: message.to_string(),
    };

    match declared {
        None => Ok(match value {
            HeaderValue::Logical(_) | HeaderValue::Text(_) => {
                ColumnValue::Text(value.to_display())
            }
            HeaderValue::Integer(v) => ColumnValue::Int(*v),
            HeaderValue::Float(v) => ColumnValue::Double(*v),
        }),
        Some(ColumnType::Text) => Ok(ColumnValue::Text(value.to_display())),
        Some(ColumnType::Int) => match value {
            HeaderValue::Integer(v) => Ok(ColumnValue::Int(*v)),
            HeaderValue::Text(s) => s
                .trim()
                .parse::<i64>()
                .map(ColumnValue::Int)
                .map_err(|e| parse_err(&e.to_string())),
            _ => Err(parse_err("expected an integer")),
        },
        Some(ColumnType::Double) => match value {
            HeaderValue::Float(v) => Ok(ColumnValue::Double(*v)),
            HeaderValue::Integer(v) => Ok(ColumnValue::Double(*v as f64)),
            HeaderValue::Text(s) => s
                .trim()
                .parse::<f64>()
                .map(ColumnValue::Double)
                .map_err(|e| parse_err(&e.to_string())),
            HeaderValue::Logical(_) => Err(parse_err("expected a number")),
        },
    }
}

/// Ingest every FITS file under `root`, one file at a time.
///
/// Each file is handled independently: a failure is recorded (and reported to
/// the observer) and the sweep continues. Only a failure to walk the tree
/// itself aborts the sweep.
pub fn sweep_directory(
    root: impl AsRef<Path>,
    config: &IngestConfig,
    options: &IngestOptions,
) -> ObsResult<SweepOutcome> {
    let mut outcome = SweepOutcome::default();

    for entry in WalkDir::new(root.as_ref()).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if !is_fits_name(&name) {
            continue;
        }

        let path = entry.path().to_path_buf();
        let ctx = IngestContext {
            path: path.clone(),
            camera: config.camera.clone(),
        };
        match parse_file(&path, config) {
            Ok(record) => {
                if let Some(obs) = options.observer.as_ref() {
                    let visit = match record.get("visit") {
                        Some(ColumnValue::Int(v)) => Some(*v),
                        _ => None,
                    };
                    let fields = record.iter().count();
                    obs.on_success(&ctx, IngestStats { visit, fields });
                }
                outcome.ingested.push(IngestedFile { path, record });
            }
            Err(error) => {
                if let Some(obs) = options.observer.as_ref() {
                    let severity = severity_for_error(&error);
                    obs.on_failure(&ctx, severity, &error);
                    if options
                        .alert_at_or_above
                        .is_some_and(|threshold| severity >= threshold)
                    {
                        obs.on_alert(&ctx, severity, &error);
                    }
                }
                outcome.failures.push((path, error));
            }
        }
    }

    Ok(outcome)
}

fn is_fits_name(name: &str) -> bool {
    name.ends_with(".fits") || name.ends_with(".fits.gz") || name.ends_with(".fits.fz")
}

fn severity_for_error(error: &ObsError) -> IngestSeverity {
    match error {
        ObsError::Io(_) => IngestSeverity::Critical,
        _ => IngestSeverity::Error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::config::IngestConfig;

    fn com_cam_header() -> HeaderRecord {
        HeaderRecord::from_pairs(vec![
            ("EXPTIME".to_string(), HeaderValue::Float(30.0)),
            ("IMGTYPE".to_string(), HeaderValue::Text("FLAT".to_string())),
            ("TESTTYPE".to_string(), HeaderValue::Text("LAMBDA".to_string())),
            ("FILTER".to_string(), HeaderValue::Text("550CutOn".to_string())),
            ("LSST_NUM".to_string(), HeaderValue::Text("ITL-3800C-098".to_string())),
            ("DATE-OBS".to_string(), HeaderValue::Text("2017-06-19T02:33:19".to_string())),
            ("RUNNUM".to_string(), HeaderValue::Text("RUN123".to_string())),
            ("MJD-OBS".to_string(), HeaderValue::Float(57923.106)),
            ("MONOWL".to_string(), HeaderValue::Float(550.001)),
        ])
    }

    fn com_cam_path() -> PathBuf {
        PathBuf::from("/repo/R00/RUN123/FLAT/v0/1234/S11/frame.fits")
    }

    #[test]
    fn record_resolves_copies_translators_defaults_and_path() {
        let config = IngestConfig::com_cam();
        let record = record_from_header(&com_cam_path(), &com_cam_header(), &config).unwrap();

        assert_eq!(record.get("expTime"), Some(&ColumnValue::Double(30.0)));
        assert_eq!(
            record.get("filter"),
            Some(&ColumnValue::Text("550CutOn".to_string()))
        );
        // No OBJECT in the header -> configured default.
        assert_eq!(
            record.get("object"),
            Some(&ColumnValue::Text("UNKNOWN".to_string()))
        );
        assert_eq!(record.get("wavelength"), Some(&ColumnValue::Int(550)));
        assert_eq!(
            record.get("visit"),
            Some(&ColumnValue::Int((1e5 * (57923.106 - 55197.0)) as i64))
        );
        // Path-derived fields.
        assert_eq!(
            record.get("basename"),
            Some(&ColumnValue::Text("frame".to_string()))
        );
        assert_eq!(record.get("field"), Some(&ColumnValue::Text("FLAT".to_string())));
        assert_eq!(record.get("jobId"), Some(&ColumnValue::Int(1234)));
        assert_eq!(record.get("ccd"), Some(&ColumnValue::Text("S11".to_string())));
        // Single-raft camera pins the raft.
        assert_eq!(record.get("raft"), Some(&ColumnValue::Text("R00".to_string())));
    }

    #[test]
    fn missing_required_column_without_default_is_fatal() {
        let mut config = IngestConfig::com_cam();
        config.defaults.remove("filter");
        let header = HeaderRecord::from_pairs(
            com_cam_header()
                .iter()
                .filter(|(k, _)| *k != "FILTER")
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        );

        let err = record_from_header(&com_cam_path(), &header, &config).unwrap_err();
        assert!(matches!(err, ObsError::MissingField { column } if column == "filter"));
    }

    #[test]
    fn absent_translator_source_falls_through_to_validation() {
        let config = IngestConfig::com_cam();
        let header = HeaderRecord::from_pairs(
            com_cam_header()
                .iter()
                .filter(|(k, _)| *k != "MONOWL")
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        );

        // `wavelength` is optional, so the record still validates without it.
        let record = record_from_header(&com_cam_path(), &header, &config).unwrap();
        assert_eq!(record.get("wavelength"), None);
    }

    #[test]
    fn run_mismatch_fails_the_file() {
        let config = IngestConfig::com_cam();
        let path = PathBuf::from("/repo/R00/RUN999/FLAT/v0/1234/S11/frame.fits");
        let err = record_from_header(&path, &com_cam_header(), &config).unwrap_err();
        assert!(matches!(err, ObsError::RunMismatch { .. }));
    }

    #[test]
    fn float_does_not_silently_truncate_to_int_column() {
        let err = coerce_header_value(
            "wavelength",
            &HeaderValue::Float(550.25),
            Some(ColumnType::Int),
        )
        .unwrap_err();
        assert!(matches!(err, ObsError::ColumnParse { column, .. } if column == "wavelength"));
    }
}
