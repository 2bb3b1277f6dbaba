use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use obs_teststand::ObsError;
use obs_teststand::fits::{HduSpec, HeaderValue, write_fits};
use obs_teststand::ingest::{
    IngestConfig, IngestContext, IngestObserver, IngestOptions, IngestSeverity, sweep_directory,
};

#[derive(Default)]
struct RecordingObserver {
    successes: Mutex<usize>,
    failures: Mutex<Vec<IngestSeverity>>,
    alerts: Mutex<Vec<IngestSeverity>>,
}

impl IngestObserver for RecordingObserver {
    fn on_success(&self, _ctx: &IngestContext, _stats: obs_teststand::ingest::IngestStats) {
        *self.successes.lock().unwrap() += 1;
    }

    fn on_failure(&self, _ctx: &IngestContext, severity: IngestSeverity, _error: &ObsError) {
        self.failures.lock().unwrap().push(severity);
    }

    fn on_alert(&self, _ctx: &IngestContext, severity: IngestSeverity, _error: &ObsError) {
        self.alerts.lock().unwrap().push(severity);
    }
}

fn write_raw(root: &Path, run_dir: &str, header_run: &str, sensor: &str, mjd: f64) {
    let dir = root.join(format!("R00/{run_dir}/FLAT/v0/42/{sensor}"));
    fs::create_dir_all(&dir).unwrap();
    let primary = HduSpec::new()
        .key("EXPTIME", HeaderValue::Float(30.0))
        .key("IMGTYPE", HeaderValue::Text("FLAT".to_string()))
        .key("TESTTYPE", HeaderValue::Text("LAMBDA".to_string()))
        .key("FILTER", HeaderValue::Text("550CutOn".to_string()))
        .key("LSST_NUM", HeaderValue::Text("ITL-3800C-098".to_string()))
        .key("DATE-OBS", HeaderValue::Text("2017-06-19T02:33:19".to_string()))
        .key("RUNNUM", HeaderValue::Text(header_run.to_string()))
        .key("MJD-OBS", HeaderValue::Float(mjd));
    write_fits(dir.join("frame.fits"), &[primary]).unwrap();
}

#[test]
fn sweep_isolates_per_file_failures() {
    let tmp = tempfile::tempdir().unwrap();
    write_raw(tmp.path(), "RUN1", "RUN1", "S00", 57923.1);
    write_raw(tmp.path(), "RUN1", "RUN1", "S01", 57923.1);
    // Misfiled: directory says RUN2, header says RUN1.
    write_raw(tmp.path(), "RUN2", "RUN1", "S02", 57923.2);
    // Unrelated files are skipped entirely.
    fs::write(tmp.path().join("notes.txt"), "not fits").unwrap();

    let outcome =
        sweep_directory(tmp.path(), &IngestConfig::com_cam(), &IngestOptions::default()).unwrap();

    assert_eq!(outcome.ingested.len(), 2);
    assert_eq!(outcome.failures.len(), 1);
    assert!(matches!(outcome.failures[0].1, ObsError::RunMismatch { .. }));
}

#[test]
fn observer_sees_successes_failures_and_alerts() {
    let tmp = tempfile::tempdir().unwrap();
    write_raw(tmp.path(), "RUN1", "RUN1", "S00", 57923.1);
    write_raw(tmp.path(), "RUN2", "RUN1", "S01", 57923.2);
    // Truncated file -> FITS format error.
    let bad_dir = tmp.path().join("R00/RUN1/FLAT/v0/42/S02");
    fs::create_dir_all(&bad_dir).unwrap();
    fs::write(bad_dir.join("trunc.fits"), b"SIMPLE  =").unwrap();

    let observer = Arc::new(RecordingObserver::default());
    let options = IngestOptions {
        observer: Some(observer.clone()),
        alert_at_or_above: Some(IngestSeverity::Critical),
    };
    let outcome = sweep_directory(tmp.path(), &IngestConfig::com_cam(), &options).unwrap();

    assert_eq!(outcome.ingested.len(), 1);
    assert_eq!(*observer.successes.lock().unwrap(), 1);
    // Both failures are format/structure level, below the alert threshold.
    assert_eq!(
        *observer.failures.lock().unwrap(),
        vec![IngestSeverity::Error, IngestSeverity::Error]
    );
    assert!(observer.alerts.lock().unwrap().is_empty());
}

#[test]
fn alert_threshold_can_include_ordinary_errors() {
    let tmp = tempfile::tempdir().unwrap();
    write_raw(tmp.path(), "RUN2", "RUN1", "S00", 57923.1);

    let observer = Arc::new(RecordingObserver::default());
    let options = IngestOptions {
        observer: Some(observer.clone()),
        alert_at_or_above: Some(IngestSeverity::Error),
    };
    sweep_directory(tmp.path(), &IngestConfig::com_cam(), &options).unwrap();

    assert_eq!(*observer.alerts.lock().unwrap(), vec![IngestSeverity::Error]);
}
