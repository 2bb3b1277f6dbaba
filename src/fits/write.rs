//! Minimal multi-extension FITS writing.
//!
//! Used to materialize test fixtures and to round-trip assembled products.
//! Image data is always written as `BITPIX = -64` (IEEE doubles), which
//! every reader in this crate decodes losslessly.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use ndarray::Array2;

use crate::error::ObsResult;
use crate::fits::header::{BLOCK_SIZE, CARD_SIZE, HeaderValue};

/// Specification of one HDU to write: observation keys plus optional image.
///
/// Mandatory structural keywords (`SIMPLE`/`XTENSION`, `BITPIX`, `NAXIS*`,
/// ...) are generated; callers supply only content keys.
#[derive(Debug, Clone, Default)]
pub struct HduSpec {
    keys: Vec<(String, HeaderValue)>,
    image: Option<Array2<f64>>,
}

impl HduSpec {
    /// An HDU with no content keys and no data.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style key insertion. Keys are uppercased.
    pub fn key(mut self, name: &str, value: HeaderValue) -> Self {
        self.keys.push((name.to_ascii_uppercase(), value));
        self
    }

    /// Attach image data.
    pub fn image(mut self, image: Array2<f64>) -> Self {
        self.image = Some(image);
        self
    }
}

/// Write a multi-extension FITS file: `hdus[0]` becomes the primary HDU,
/// the rest become IMAGE extensions.
pub fn write_fits(path: impl AsRef<Path>, hdus: &[HduSpec]) -> ObsResult<()> {
    let mut out = BufWriter::new(File::create(path.as_ref())?);

    for (index, hdu) in hdus.iter().enumerate() {
        write_hdu(&mut out, hdu, index == 0)?;
    }
    out.flush()?;
    Ok(())
}

fn write_hdu<W: Write>(out: &mut W, hdu: &HduSpec, primary: bool) -> ObsResult<()> {
    let mut cards: Vec<[u8; CARD_SIZE]> = Vec::new();

    let (bitpix, naxis): (i64, Vec<usize>) = match &hdu.image {
        Some(img) => {
            let (height, width) = img.dim();
            (-64, vec![width, height])
        }
        None => (8, vec![]),
    };

    if primary {
        cards.push(format_card("SIMPLE", &HeaderValue::Logical(true)));
    } else {
        cards.push(format_card(
            "XTENSION",
            &HeaderValue::Text("IMAGE".to_string()),
        ));
    }
    cards.push(format_card("BITPIX", &HeaderValue::Integer(bitpix)));
    cards.push(format_card(
        "NAXIS",
        &HeaderValue::Integer(naxis.len() as i64),
    ));
    for (i, n) in naxis.iter().enumerate() {
        cards.push(format_card(
            &format!("NAXIS{}", i + 1),
            &HeaderValue::Integer(*n as i64),
        ));
    }
    if primary {
        cards.push(format_card("EXTEND", &HeaderValue::Logical(true)));
    } else {
        cards.push(format_card("PCOUNT", &HeaderValue::Integer(0)));
        cards.push(format_card("GCOUNT", &HeaderValue::Integer(1)));
    }
    for (key, value) in &hdu.keys {
        cards.push(format_card(key, value));
    }

    let mut end = [b' '; CARD_SIZE];
    end[..3].copy_from_slice(b"END");
    cards.push(end);

    for card in &cards {
        out.write_all(card)?;
    }
    // Header area pads with spaces to a whole block.
    let header_bytes = cards.len() * CARD_SIZE;
    let header_pad = header_bytes.next_multiple_of(BLOCK_SIZE) - header_bytes;
    out.write_all(&vec![b' '; header_pad])?;

    if let Some(img) = &hdu.image {
        let mut written = 0usize;
        for v in img.iter() {
            out.write_all(&v.to_be_bytes())?;
            written += 8;
        }
        // Data area pads with zeros.
        let data_pad = written.next_multiple_of(BLOCK_SIZE) - written;
        out.write_all(&vec![0u8; data_pad])?;
    }
    Ok(())
}

fn format_card(keyword: &str, value: &HeaderValue) -> [u8; CARD_SIZE] {
    let mut card = [b' '; CARD_SIZE];
    let kw = keyword.as_bytes();
    card[..kw.len().min(8)].copy_from_slice(&kw[..kw.len().min(8)]);
    card[8] = b'=';

    let rendered = match value {
        HeaderValue::Logical(true) => format!("{:>20}", "T"),
        HeaderValue::Logical(false) => format!("{:>20}", "F"),
        HeaderValue::Integer(v) => format!("{v:>20}"),
        HeaderValue::Float(v) => format!("{:>20}", float_literal(*v)),
        HeaderValue::Text(v) => {
            // Content pads to at least 8 characters; embedded quotes double.
            let escaped = v.replace('\'', "''");
            format!("'{escaped:<8}'")
        }
    };
    let bytes = rendered.as_bytes();
    let len = bytes.len().min(CARD_SIZE - 10);
    card[10..10 + len].copy_from_slice(&bytes[..len]);
    card
}

/// Render an `f64` so it reads back as a float (a bare integer literal would
/// be parsed as BITPIX-style integer).
fn float_literal(v: f64) -> String {
    let mut s = format!("{v}");
    if !s.contains('.') && !s.contains('e') && !s.contains('E') {
        s.push_str(".0");
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_literal_keeps_floatness() {
        assert_eq!(float_literal(30.0), "30.0");
        assert_eq!(float_literal(309.999), "309.999");
        assert_eq!(float_literal(0.5), "0.5");
    }

    #[test]
    fn formatted_card_is_eighty_bytes_and_fixed_format() {
        let card = format_card("EXPTIME", &HeaderValue::Float(30.0));
        assert_eq!(card.len(), CARD_SIZE);
        assert_eq!(&card[..8], b"EXPTIME ");
        assert_eq!(card[8], b'=');
        // Fixed format right-justifies numbers to column 30.
        assert_eq!(card[29], b'0');
    }
}
