//! Detector geometry model.
//!
//! A [`Camera`] is a set of [`Detector`]s; a detector is a set of
//! [`AmpSegment`]s, each naming the FITS extension its raw sub-image lives in
//! and the pixel box it occupies in the assembled full frame. Raw segments
//! are placed as read out: no overscan trimming and no gain normalization
//! happen at assembly time (calibration is applied downstream).

use serde::{Deserialize, Serialize};

/// One readout-channel sub-image of a sensor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmpSegment {
    /// Channel name, e.g. `C03`.
    pub name: String,
    /// FITS extension index carrying this segment's raw pixels.
    pub hdu: usize,
    /// Column of the segment's left edge in the assembled frame.
    pub x0: usize,
    /// Row of the segment's bottom edge in the assembled frame.
    pub y0: usize,
    /// Segment width in pixels (raw, untrimmed).
    pub width: usize,
    /// Segment height in pixels (raw, untrimmed).
    pub height: usize,
}

/// One sensor and its amplifier layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detector {
    /// Sensor location name, e.g. `S00`.
    pub name: String,
    /// Numeric detector id within the camera.
    pub id: u32,
    /// Manufacturer serial.
    pub serial: String,
    /// Amplifier segments, in readout order.
    pub amps: Vec<AmpSegment>,
}

impl Detector {
    /// Assembled full-frame size as `(height, width)`: the union of all
    /// segment boxes.
    pub fn assembled_size(&self) -> (usize, usize) {
        let height = self.amps.iter().map(|a| a.y0 + a.height).max().unwrap_or(0);
        let width = self.amps.iter().map(|a| a.x0 + a.width).max().unwrap_or(0);
        (height, width)
    }
}

/// A camera: one or more rafts' worth of detectors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Camera {
    /// Camera name.
    pub name: String,
    detectors: Vec<Detector>,
}

/// Raw amplifier segment width for the commissioning-camera sensors
/// (509 imaging columns plus prescan/overscan).
const COM_CAM_AMP_WIDTH: usize = 512;
/// Raw amplifier segment height (2000 imaging rows plus overscan).
const COM_CAM_AMP_HEIGHT: usize = 2002;

impl Camera {
    /// Build a camera from detectors.
    pub fn new(name: impl Into<String>, detectors: Vec<Detector>) -> Self {
        Self {
            name: name.into(),
            detectors,
        }
    }

    /// The commissioning camera: one raft of nine sensors (`S00`..`S22`),
    /// each with 16 amplifiers in two rows of eight. Raw extensions are
    /// numbered 1..=16 in readout order, giving a 4096 x 4004 assembled
    /// frame per sensor.
    pub fn com_cam() -> Self {
        let mut detectors = Vec::with_capacity(9);
        for sy in 0..3usize {
            for sx in 0..3usize {
                let id = (sy * 3 + sx) as u32;
                let mut amps = Vec::with_capacity(16);
                for row in 0..2usize {
                    for col in 0..8usize {
                        amps.push(AmpSegment {
                            name: format!("C{row}{col}"),
                            hdu: 1 + row * 8 + col,
                            x0: col * COM_CAM_AMP_WIDTH,
                            y0: row * COM_CAM_AMP_HEIGHT,
                            width: COM_CAM_AMP_WIDTH,
                            height: COM_CAM_AMP_HEIGHT,
                        });
                    }
                }
                detectors.push(Detector {
                    name: format!("S{sy}{sx}"),
                    id,
                    serial: format!("ITL-3800C-{:03}", 98 + id),
                    amps,
                });
            }
        }
        Self::new("ComCam", detectors)
    }

    /// Look up a detector by sensor-location name.
    pub fn detector(&self, name: &str) -> Option<&Detector> {
        self.detectors.iter().find(|d| d.name == name)
    }

    /// Look up a detector by numeric id.
    pub fn detector_by_id(&self, id: u32) -> Option<&Detector> {
        self.detectors.iter().find(|d| d.id == id)
    }

    /// All detectors.
    pub fn detectors(&self) -> &[Detector] {
        &self.detectors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn com_cam_has_nine_sensors_of_sixteen_amps() {
        let camera = Camera::com_cam();
        assert_eq!(camera.detectors().len(), 9);
        assert!(camera.detector("S00").is_some());
        assert!(camera.detector("S22").is_some());
        assert!(camera.detector("S30").is_none());

        let det = camera.detector("S11").unwrap();
        assert_eq!(det.amps.len(), 16);
        assert_eq!(det.assembled_size(), (4004, 4096));
    }

    #[test]
    fn amp_extensions_are_distinct_and_start_at_one() {
        let camera = Camera::com_cam();
        let det = camera.detector("S00").unwrap();
        let mut hdus: Vec<usize> = det.amps.iter().map(|a| a.hdu).collect();
        hdus.sort_unstable();
        assert_eq!(hdus, (1..=16).collect::<Vec<_>>());
    }
}
