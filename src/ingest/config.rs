//! Per-camera-variant ingestion configuration.
//!
//! One [`IngestConfig`] captures everything that distinguishes a camera or
//! test-stand generation: which HDU carries the metadata, the header-key
//! translation table, translator bindings, default values, and the
//! registration schema. Configurations are built once (from a constructor or
//! a JSON file) and never mutated afterwards; the pipeline takes them by
//! shared reference.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ObsResult;
use crate::types::{Column, ColumnType, RegistrationSchema};

/// Named translator functions a logical field can bind to.
///
/// Translators are resolved through this explicit tag, not by method-name
/// lookup, so a configuration can only reference translators that exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranslatorKind {
    /// Visit number derived from `MJD-OBS`.
    Visit,
    /// Monochromator wavelength rounded from `MONOWL`.
    Wavelength,
    /// `ccd=` field of the composite `CALIB_ID` string.
    CalibCcd,
    /// `filter=` field of the composite `CALIB_ID` string.
    CalibFilter,
    /// `calibDate=` field of the composite `CALIB_ID` string.
    CalibDate,
}

/// Immutable ingestion configuration for one camera variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Variant name, used in observer context and log lines.
    pub camera: String,
    /// HDU index whose header is parsed (0 = primary).
    pub hdu: usize,
    /// Direct copies: logical field name to literal header key.
    pub translation: BTreeMap<String, String>,
    /// Computed fields: logical field name to translator tag.
    pub translators: BTreeMap<String, TranslatorKind>,
    /// Fallback values applied when neither a copy nor a translator resolved.
    pub defaults: BTreeMap<String, String>,
    /// Whether the six-component path contract applies to this variant's
    /// files. Calibration products are not laid out that way.
    #[serde(default)]
    pub decompose_path: bool,
    /// Fixed `raft` value for single-raft cameras; `None` uses the raft id
    /// decoded from the path.
    #[serde(default)]
    pub raft_override: Option<String>,
    /// Columns every record must carry, plus the uniqueness-key tuple.
    pub schema: RegistrationSchema,
}

impl IngestConfig {
    /// Load a configuration from a JSON file.
    pub fn from_json_path(path: impl AsRef<Path>) -> ObsResult<Self> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        Ok(serde_json::from_reader(reader)?)
    }

    /// The commissioning-camera variant: single raft, metadata in the
    /// primary HDU, full column set.
    pub fn com_cam() -> Self {
        Self {
            camera: "comCam".to_string(),
            hdu: 0,
            translation: raw_translation(),
            translators: BTreeMap::from([
                ("visit".to_string(), TranslatorKind::Visit),
                ("wavelength".to_string(), TranslatorKind::Wavelength),
            ]),
            defaults: BTreeMap::from([
                ("object".to_string(), "UNKNOWN".to_string()),
                ("filter".to_string(), "NONE".to_string()),
            ]),
            decompose_path: true,
            raft_override: Some("R00".to_string()),
            schema: RegistrationSchema::new(
                raw_columns(true),
                vec!["run", "visit", "ccd"],
            ),
        }
    }

    /// The raft test stand: nine sensors per raft, metadata in the first
    /// data extension, `raft` registered from the path.
    pub fn ts8() -> Self {
        let mut columns = raw_columns(true);
        columns.push(Column::new("raft", ColumnType::Text));
        Self {
            camera: "ts8".to_string(),
            hdu: 1,
            translation: raw_translation(),
            translators: BTreeMap::from([
                ("visit".to_string(), TranslatorKind::Visit),
                ("wavelength".to_string(), TranslatorKind::Wavelength),
            ]),
            defaults: BTreeMap::from([
                ("object".to_string(), "UNKNOWN".to_string()),
                ("filter".to_string(), "NONE".to_string()),
            ]),
            decompose_path: true,
            raft_override: None,
            schema: RegistrationSchema::new(columns, vec!["run", "visit", "raft", "ccd"]),
        }
    }

    /// The single-sensor test stand: no raft, no test-type bookkeeping,
    /// metadata in the first data extension.
    pub fn ts3() -> Self {
        Self {
            camera: "ts3".to_string(),
            hdu: 1,
            translation: {
                let mut t = raw_translation();
                t.remove("testType");
                t
            },
            translators: BTreeMap::from([
                ("visit".to_string(), TranslatorKind::Visit),
                ("wavelength".to_string(), TranslatorKind::Wavelength),
            ]),
            defaults: BTreeMap::from([
                ("object".to_string(), "UNKNOWN".to_string()),
                ("filter".to_string(), "NONE".to_string()),
            ]),
            decompose_path: true,
            raft_override: None,
            schema: RegistrationSchema::new(raw_columns(false), vec!["run", "visit", "ccd"]),
        }
    }

    /// Calibration-product ingestion: every interesting field lives inside
    /// the composite `CALIB_ID` header string.
    pub fn calibs() -> Self {
        Self {
            camera: "comCam-calibs".to_string(),
            hdu: 0,
            translation: BTreeMap::new(),
            translators: BTreeMap::from([
                ("ccd".to_string(), TranslatorKind::CalibCcd),
                ("filter".to_string(), TranslatorKind::CalibFilter),
                ("calibDate".to_string(), TranslatorKind::CalibDate),
            ]),
            defaults: BTreeMap::new(),
            decompose_path: false,
            raft_override: None,
            schema: RegistrationSchema::new(
                vec![
                    Column::new("ccd", ColumnType::Text),
                    Column::new("filter", ColumnType::Text),
                    Column::new("calibDate", ColumnType::Text),
                ],
                vec!["ccd", "filter", "calibDate"],
            ),
        }
    }
}

fn raw_translation() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("expTime".to_string(), "EXPTIME".to_string()),
        ("object".to_string(), "OBJECT".to_string()),
        ("imageType".to_string(), "IMGTYPE".to_string()),
        ("testType".to_string(), "TESTTYPE".to_string()),
        ("filter".to_string(), "FILTER".to_string()),
        ("lsstSerial".to_string(), "LSST_NUM".to_string()),
        ("date".to_string(), "DATE-OBS".to_string()),
        ("dateObs".to_string(), "DATE-OBS".to_string()),
        ("run".to_string(), "RUNNUM".to_string()),
    ])
}

fn raw_columns(with_test_type: bool) -> Vec<Column> {
    let mut columns = vec![
        Column::new("run", ColumnType::Text),
        Column::new("visit", ColumnType::Int),
        Column::new("basename", ColumnType::Text),
        Column::new("filter", ColumnType::Text),
        Column::new("date", ColumnType::Text),
        Column::new("dateObs", ColumnType::Text),
        Column::new("expTime", ColumnType::Double),
        Column::new("ccd", ColumnType::Text),
        Column::new("object", ColumnType::Text),
        Column::new("imageType", ColumnType::Text),
        Column::new("lsstSerial", ColumnType::Text),
        Column::new("field", ColumnType::Text),
        Column::optional("wavelength", ColumnType::Int),
    ];
    if with_test_type {
        columns.push(Column::optional("testType", ColumnType::Text));
    }
    columns
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn com_cam_translation_covers_header_subset() {
        let config = IngestConfig::com_cam();
        assert_eq!(config.hdu, 0);
        assert_eq!(config.translation.get("run").unwrap(), "RUNNUM");
        assert_eq!(config.translation.get("date").unwrap(), "DATE-OBS");
        assert_eq!(
            config.translators.get("visit"),
            Some(&TranslatorKind::Visit)
        );
        assert_eq!(config.defaults.get("filter").unwrap(), "NONE");
        assert_eq!(config.schema.visit_keys, vec!["run", "visit", "ccd"]);
    }

    #[test]
    fn variants_differ_in_hdu_and_columns() {
        let ts8 = IngestConfig::ts8();
        let ts3 = IngestConfig::ts3();
        assert_eq!(ts8.hdu, 1);
        assert!(ts8.schema.column_type("raft").is_some());
        assert!(ts3.schema.column_type("testType").is_none());
        assert!(ts3.translation.get("testType").is_none());
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = IngestConfig::ts8();
        let json = serde_json::to_string(&config).unwrap();
        let back: IngestConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
