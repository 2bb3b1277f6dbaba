//! Multi-extension FITS reading and writing.
//!
//! This module handles exactly the slice of FITS that test-stand raw and
//! calibration files use: 80-byte header cards in 2880-byte blocks, and 2-D
//! image HDUs with big-endian samples scaled by `BSCALE`/`BZERO`.
//!
//! - [`header`]: card grammar and [`HeaderRecord`] lookup
//! - [`image`]: data-area layout and pixel decoding
//! - [`write`]: fixture/product writing
//!
//! File-level access goes through [`read_header_at`] and [`read_image_at`],
//! which walk HDUs sequentially and seek past data areas that are not the
//! target. Files are opened, read, and closed within one call; no handles
//! are retained.

pub mod header;
pub mod image;
pub mod write;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use ndarray::Array2;

pub use header::{HeaderRecord, HeaderValue};
pub use image::DataLayout;
pub use write::{HduSpec, write_fits};

use crate::error::{ObsError, ObsResult};

/// Read the header of HDU `hdu` (0 = primary).
pub fn read_header_at(path: impl AsRef<Path>, hdu: usize) -> ObsResult<HeaderRecord> {
    let path = path.as_ref();
    walk_to(path, hdu, |_reader, header, _layout| Ok(header.clone()))
}

/// Read and decode the image data of HDU `hdu` (0 = primary).
pub fn read_image_at(path: impl AsRef<Path>, hdu: usize) -> ObsResult<Array2<f64>> {
    let path = path.as_ref();
    walk_to(path, hdu, |reader, header, layout| {
        image::read_image(reader, header, layout, path)
    })
}

fn walk_to<T>(
    path: &Path,
    hdu: usize,
    mut at_target: impl FnMut(&mut BufReader<File>, &HeaderRecord, DataLayout) -> ObsResult<T>,
) -> ObsResult<T> {
    let mut reader = BufReader::new(File::open(path)?);

    for index in 0..=hdu {
        if reader.fill_buf()?.is_empty() {
            return Err(ObsError::fits(
                path,
                format!("no HDU {hdu}: file ends after {index} HDUs"),
            ));
        }
        let (header, _) = header::read_header(&mut reader, path)?;
        let layout = DataLayout::from_header(&header, path)?;
        if index == hdu {
            return at_target(&mut reader, &header, layout);
        }
        reader.seek_relative(layout.padded_bytes() as i64)?;
    }
    unreachable!("loop returns at the target HDU");
}
