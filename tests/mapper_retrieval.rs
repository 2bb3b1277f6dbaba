use std::fs;
use std::path::{Path, PathBuf};

use ndarray::Array2;
use obs_teststand::ObsError;
use obs_teststand::exposure::{AmpSegment, Camera, Detector};
use obs_teststand::fits::{HduSpec, HeaderValue, write_fits};
use obs_teststand::ingest::{IngestConfig, IngestOptions};
use obs_teststand::mapper::TestStandMapper;
use obs_teststand::types::{ColumnValue, DataId};

/// One-sensor toy camera: two 4x3 amplifier segments side by side, raw
/// pixels in extensions 1 and 2.
fn toy_camera() -> Camera {
    let detector = Detector {
        name: "S00".to_string(),
        id: 0,
        serial: "TOY-000".to_string(),
        amps: vec![
            AmpSegment {
                name: "C00".to_string(),
                hdu: 1,
                x0: 0,
                y0: 0,
                width: 4,
                height: 3,
            },
            AmpSegment {
                name: "C01".to_string(),
                hdu: 2,
                x0: 4,
                y0: 0,
                width: 4,
                height: 3,
            },
        ],
    };
    Camera::new("Toy", vec![detector])
}

fn acquisition_keys(mjd: f64) -> Vec<(&'static str, HeaderValue)> {
    vec![
        ("EXPTIME", HeaderValue::Float(30.0)),
        ("OBJECT", HeaderValue::Text("SLIT".to_string())),
        ("IMGTYPE", HeaderValue::Text("FLAT".to_string())),
        ("TESTTYPE", HeaderValue::Text("LAMBDA".to_string())),
        ("FILTER", HeaderValue::Text("550CutOn".to_string())),
        ("LSST_NUM", HeaderValue::Text("ITL-3800C-098".to_string())),
        ("DATE-OBS", HeaderValue::Text("2017-06-19T02:33:19".to_string())),
        ("RUNNUM", HeaderValue::Text("RUN123".to_string())),
        ("MJD-OBS", HeaderValue::Float(mjd)),
        ("MONOWL", HeaderValue::Float(550.0)),
    ]
}

/// Write one raw file under the six-component layout, with per-amplifier
/// pixel extensions matching the toy camera geometry.
fn write_raw(root: &Path, sensor: &str, basename: &str, mjd: f64) -> PathBuf {
    let dir = root.join(format!("R00/RUN123/FLAT/v0/42/{sensor}"));
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join(format!("{basename}.fits"));

    let mut primary = HduSpec::new();
    for (key, value) in acquisition_keys(mjd) {
        primary = primary.key(key, value);
    }
    let hdus = vec![
        primary,
        HduSpec::new().image(Array2::from_elem((3, 4), 1.0)),
        HduSpec::new().image(Array2::from_elem((3, 4), 2.0)),
    ];
    write_fits(&path, &hdus).unwrap();
    path
}

#[test]
fn ingest_then_retrieve_assembles_the_named_exposure() {
    let tmp = tempfile::tempdir().unwrap();
    write_raw(tmp.path(), "S00", "frame", 57923.106);

    let mut mapper = TestStandMapper::new(IngestConfig::com_cam(), toy_camera());
    let outcome = mapper
        .ingest_directory(tmp.path(), &IngestOptions::default())
        .unwrap();
    assert_eq!(outcome.ingested.len(), 1);
    assert!(outcome.failures.is_empty());

    let data_id = DataId::new()
        .with("run", ColumnValue::Text("RUN123".to_string()))
        .with("ccd", ColumnValue::Text("S00".to_string()));
    let exposure = mapper.get_raw(&data_id).unwrap();
    assert_eq!(exposure.image.dim(), (3, 8));
    assert_eq!(exposure.image[(0, 0)], 1.0);
    assert_eq!(exposure.image[(0, 7)], 2.0);
    assert_eq!(exposure.detector.as_deref(), Some("S00"));
}

#[test]
fn duplicate_uniqueness_keys_join_the_failures_without_aborting() {
    let tmp = tempfile::tempdir().unwrap();
    // Same run, visit, and sensor; only the basename differs.
    write_raw(tmp.path(), "S00", "frame_a", 57923.106);
    write_raw(tmp.path(), "S00", "frame_b", 57923.106);

    let mut mapper = TestStandMapper::new(IngestConfig::com_cam(), toy_camera());
    let outcome = mapper
        .ingest_directory(tmp.path(), &IngestOptions::default())
        .unwrap();

    assert_eq!(outcome.ingested.len(), 1);
    assert_eq!(outcome.failures.len(), 1);
    assert!(matches!(outcome.failures[0].1, ObsError::DuplicateEntry { .. }));
}

#[test]
fn retrieval_rejects_an_unmodelled_sensor() {
    let tmp = tempfile::tempdir().unwrap();
    // S77 parses and registers fine; the toy camera just has no such sensor.
    write_raw(tmp.path(), "S77", "frame", 57923.106);

    let mut mapper = TestStandMapper::new(IngestConfig::com_cam(), toy_camera());
    mapper
        .ingest_directory(tmp.path(), &IngestOptions::default())
        .unwrap();

    let data_id = DataId::new().with("ccd", ColumnValue::Text("S77".to_string()));
    let err = mapper.get_raw(&data_id).unwrap_err();
    assert!(matches!(err, ObsError::UnknownDetector { .. }));
}

#[test]
fn a_data_id_matching_nothing_is_a_lookup_failure() {
    let mapper = TestStandMapper::new(IngestConfig::com_cam(), toy_camera());
    let data_id = DataId::new().with("run", ColumnValue::Text("NOPE".to_string()));
    assert!(matches!(
        mapper.get_raw(&data_id).unwrap_err(),
        ObsError::NoSuchEntry { .. }
    ));
}
