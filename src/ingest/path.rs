//! Path decomposition for test-stand files.
//!
//! Several identifiers are encoded only in the directory layout, never in the
//! headers. The layout is frozen upstream (the acquisition software is in
//! production), so the six components immediately above the filename are
//! interpreted positionally:
//!
//! ```text
//! .../<raftId>/<runId>/<acquisitionType>/<testVersion>/<jobId>/<sensorLocationInRaft>/<file>
//! ```
//!
//! The decomposer validates what little it can: component count, an integer
//! `jobId`, and agreement between the path's run id and the run already read
//! from the header (a mismatch means a misfiled or relocated file).

use std::path::Path;

use crate::error::{ObsError, ObsResult};

/// Filename extensions stripped when deriving `basename`.
pub const STRIPPED_EXTENSIONS: [&str; 3] = ["fits", "gz", "fz"];

/// Identifiers recovered from one file path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathInfo {
    /// File stem with compression/format extensions stripped.
    pub basename: String,
    /// Physical raft, e.g. `R00`.
    pub raft_id: String,
    /// Run identifier; must match the header's `RUNNUM`.
    pub run_id: String,
    /// Acquisition/test type (flat, fe55, darks, ...), registered as `field`.
    pub acquisition_type: String,
    /// Test software version.
    pub test_version: String,
    /// Test number; corresponds to entries in the camera test database.
    pub job_id: i64,
    /// Sensor location within the raft, e.g. `S00`, registered as `ccd`.
    pub sensor_location: String,
}

/// Decompose `path` against the six-component contract, checking the decoded
/// run id against `header_run`.
pub fn decompose(path: &Path, header_run: &str) -> ObsResult<PathInfo> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ObsError::PathStructure {
            path: path.to_path_buf(),
            message: "no file name".to_string(),
        })?;
    let basename = strip_extensions(file_name);

    let components: Vec<&str> = path
        .parent()
        .map(|parent| {
            parent
                .components()
                .filter_map(|c| match c {
                    std::path::Component::Normal(s) => s.to_str(),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    if components.len() < 6 {
        return Err(ObsError::PathStructure {
            path: path.to_path_buf(),
            message: format!(
                "expected six directory components above the file, found {}",
                components.len()
            ),
        });
    }

    let tail = &components[components.len() - 6..];
    let (raft_id, run_id, acquisition_type, test_version, job_id, sensor_location) =
        (tail[0], tail[1], tail[2], tail[3], tail[4], tail[5]);

    let job_id = job_id.parse::<i64>().map_err(|_| ObsError::PathStructure {
        path: path.to_path_buf(),
        message: format!("jobId component '{job_id}' is not an integer"),
    })?;

    if run_id != header_run {
        return Err(ObsError::RunMismatch {
            path: path.to_path_buf(),
            header_run: header_run.to_string(),
            path_run: run_id.to_string(),
        });
    }

    Ok(PathInfo {
        basename,
        raft_id: raft_id.to_string(),
        run_id: run_id.to_string(),
        acquisition_type: acquisition_type.to_string(),
        test_version: test_version.to_string(),
        job_id,
        sensor_location: sensor_location.to_string(),
    })
}

/// Strip trailing recognized extensions, e.g. `x.fits.gz` -> `x`.
fn strip_extensions(file_name: &str) -> String {
    let mut name = file_name;
    loop {
        let stripped = STRIPPED_EXTENSIONS
            .iter()
            .find_map(|ext| name.strip_suffix(&format!(".{ext}")));
        match stripped {
            Some(rest) => name = rest,
            None => return name.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn sample_path() -> PathBuf {
        PathBuf::from("/data/teststand/R00/RUN123/DARK/v1/42/S00/file.fits")
    }

    #[test]
    fn decomposes_the_six_component_tail() {
        let info = decompose(&sample_path(), "RUN123").unwrap();
        assert_eq!(info.basename, "file");
        assert_eq!(info.raft_id, "R00");
        assert_eq!(info.run_id, "RUN123");
        assert_eq!(info.acquisition_type, "DARK");
        assert_eq!(info.test_version, "v1");
        assert_eq!(info.job_id, 42);
        assert_eq!(info.sensor_location, "S00");
    }

    #[test]
    fn run_mismatch_is_structural() {
        let err = decompose(&sample_path(), "RUN999").unwrap_err();
        assert!(matches!(
            err,
            ObsError::RunMismatch { header_run, path_run, .. }
                if header_run == "RUN999" && path_run == "RUN123"
        ));
    }

    #[test]
    fn short_path_is_rejected() {
        let path = PathBuf::from("RUN123/DARK/v1/42/S00/file.fits");
        let err = decompose(&path, "RUN123").unwrap_err();
        assert!(matches!(err, ObsError::PathStructure { .. }));
    }

    #[test]
    fn non_integer_job_id_is_rejected() {
        let path = PathBuf::from("/d/R00/RUN123/DARK/v1/notanum/S00/file.fits");
        let err = decompose(&path, "RUN123").unwrap_err();
        assert!(matches!(err, ObsError::PathStructure { message, .. } if message.contains("jobId")));
    }

    #[test]
    fn basename_strips_stacked_extensions() {
        assert_eq!(strip_extensions("img.fits"), "img");
        assert_eq!(strip_extensions("img.fits.gz"), "img");
        assert_eq!(strip_extensions("img.fits.fz"), "img");
        assert_eq!(strip_extensions("img.dat"), "img.dat");
    }
}
