//! Image HDU data decoding.
//!
//! Pixel data follows its header as big-endian samples whose width is given
//! by `BITPIX`, padded to a whole number of 2880-byte blocks. Values are
//! scaled by `BSCALE`/`BZERO` on read and returned as `f64`, which preserves
//! raw counts exactly for every integer sample type the test stand produces.

use std::io::Read;
use std::path::Path;

use ndarray::Array2;

use crate::error::{ObsError, ObsResult};
use crate::fits::header::{BLOCK_SIZE, HeaderRecord, HeaderValue};

/// Data layout of one HDU, derived from its header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataLayout {
    /// `BITPIX`: bits per sample, negative for IEEE floats.
    pub bitpix: i64,
    /// `NAXIS1` (columns); 0 for a data-less HDU.
    pub width: usize,
    /// `NAXIS2` (rows); 0 for a data-less HDU.
    pub height: usize,
}

impl DataLayout {
    /// Derive the layout from a parsed header.
    pub fn from_header(header: &HeaderRecord, path: &Path) -> ObsResult<Self> {
        let bitpix = header.get_i64("BITPIX").map_err(|_| {
            ObsError::fits(path, "header lacks a usable BITPIX")
        })?;
        let naxis = header.get_i64("NAXIS").map_err(|_| {
            ObsError::fits(path, "header lacks a usable NAXIS")
        })?;

        match naxis {
            0 => Ok(Self {
                bitpix,
                width: 0,
                height: 0,
            }),
            2 => {
                let width = header.get_i64("NAXIS1")?;
                let height = header.get_i64("NAXIS2")?;
                if width < 0 || height < 0 {
                    return Err(ObsError::fits(path, "negative NAXIS1/NAXIS2"));
                }
                Ok(Self {
                    bitpix,
                    width: width as usize,
                    height: height as usize,
                })
            }
            n => Err(ObsError::fits(
                path,
                format!("unsupported NAXIS={n}; only 2-D image HDUs are handled"),
            )),
        }
    }

    /// Number of payload bytes, before block padding.
    pub fn data_bytes(&self) -> u64 {
        let sample = (self.bitpix.unsigned_abs() / 8) as u64;
        sample * self.width as u64 * self.height as u64
    }

    /// Number of bytes the data area occupies on disk (padded to blocks).
    pub fn padded_bytes(&self) -> u64 {
        let raw = self.data_bytes();
        raw.div_ceil(BLOCK_SIZE as u64) * BLOCK_SIZE as u64
    }
}

/// Read and decode one image HDU's data area into a row-major array of
/// `(height, width)` shape, applying `BSCALE`/`BZERO` from `header`.
pub fn read_image<R: Read>(
    reader: &mut R,
    header: &HeaderRecord,
    layout: DataLayout,
    path: &Path,
) -> ObsResult<Array2<f64>> {
    if layout.width == 0 || layout.height == 0 {
        return Err(ObsError::fits(path, "HDU carries no image data"));
    }

    let mut bytes = vec![0u8; layout.data_bytes() as usize];
    reader.read_exact(&mut bytes).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            ObsError::fits(path, "truncated image data")
        } else {
            ObsError::Io(e)
        }
    })?;

    let bscale = match header.get("BSCALE") {
        Some(HeaderValue::Float(v)) => *v,
        Some(HeaderValue::Integer(v)) => *v as f64,
        _ => 1.0,
    };
    let bzero = match header.get("BZERO") {
        Some(HeaderValue::Float(v)) => *v,
        Some(HeaderValue::Integer(v)) => *v as f64,
        _ => 0.0,
    };

    let samples = decode_samples(&bytes, layout.bitpix, path)?;
    let scaled: Vec<f64> = samples.into_iter().map(|v| bzero + bscale * v).collect();

    Array2::from_shape_vec((layout.height, layout.width), scaled)
        .map_err(|e| ObsError::fits(path, format!("image shape error: {e}")))
}

fn decode_samples(bytes: &[u8], bitpix: i64, path: &Path) -> ObsResult<Vec<f64>> {
    let out = match bitpix {
        8 => bytes.iter().map(|&b| b as f64).collect(),
        16 => bytes
            .chunks_exact(2)
            .map(|c| i16::from_be_bytes([c[0], c[1]]) as f64)
            .collect(),
        32 => bytes
            .chunks_exact(4)
            .map(|c| i32::from_be_bytes([c[0], c[1], c[2], c[3]]) as f64)
            .collect(),
        64 => bytes
            .chunks_exact(8)
            .map(|c| i64::from_be_bytes(c.try_into().unwrap()) as f64)
            .collect(),
        -32 => bytes
            .chunks_exact(4)
            .map(|c| f32::from_be_bytes([c[0], c[1], c[2], c[3]]) as f64)
            .collect(),
        -64 => bytes
            .chunks_exact(8)
            .map(|c| f64::from_be_bytes(c.try_into().unwrap()))
            .collect(),
        other => {
            return Err(ObsError::fits(
                path,
                format!("unsupported BITPIX={other}"),
            ));
        }
    };
    Ok(out)
}
