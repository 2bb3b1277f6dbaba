//! FITS header card parsing.
//!
//! A header is a sequence of 80-byte cards packed into 2880-byte blocks and
//! terminated by the `END` keyword. Only the subset of the card grammar that
//! test-stand files actually use is handled: logical, integer, floating-point
//! and quoted-string values, with optional ` /` comments. Commentary cards
//! (`COMMENT`, `HISTORY`, blank keyword) carry no value and are not retained.

use std::io::Read;
use std::path::Path;

use crate::error::{ObsError, ObsResult};

/// Size of one header card in bytes.
pub const CARD_SIZE: usize = 80;
/// Size of one FITS block in bytes (36 cards).
pub const BLOCK_SIZE: usize = 2880;

/// A scalar header value.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    /// FITS logical (`T` or `F`).
    Logical(bool),
    /// Integer value.
    Integer(i64),
    /// Floating-point value.
    Float(f64),
    /// Character string (content between single quotes, trailing blanks
    /// stripped).
    Text(String),
}

impl HeaderValue {
    /// Render the value the way a header card would carry it (unquoted).
    pub fn to_display(&self) -> String {
        match self {
            HeaderValue::Logical(true) => "T".to_string(),
            HeaderValue::Logical(false) => "F".to_string(),
            HeaderValue::Integer(v) => v.to_string(),
            HeaderValue::Float(v) => v.to_string(),
            HeaderValue::Text(v) => v.clone(),
        }
    }
}

/// An ordered, read-only record of one HDU's header keys.
///
/// Lookup is by exact uppercase key; when a key repeats, the last occurrence
/// wins (matching how FITS readers overwrite on re-read).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderRecord {
    cards: Vec<(String, HeaderValue)>,
}

/// Keywords that describe HDU structure rather than observation content.
const STRUCTURAL_KEYS: [&str; 6] = ["SIMPLE", "XTENSION", "BITPIX", "EXTEND", "PCOUNT", "GCOUNT"];

impl HeaderRecord {
    /// Build a record from `(key, value)` pairs. Keys are uppercased.
    pub fn from_pairs(pairs: Vec<(String, HeaderValue)>) -> Self {
        Self {
            cards: pairs
                .into_iter()
                .map(|(k, v)| (k.to_ascii_uppercase(), v))
                .collect(),
        }
    }

    /// Look up a key; the last occurrence wins.
    pub fn get(&self, key: &str) -> Option<&HeaderValue> {
        self.cards
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Look up a key, failing with [`ObsError::MissingKey`] if absent.
    pub fn require(&self, key: &str) -> ObsResult<&HeaderValue> {
        self.get(key).ok_or_else(|| ObsError::MissingKey {
            key: key.to_string(),
        })
    }

    /// Numeric lookup; integers widen to `f64`.
    pub fn get_f64(&self, key: &str) -> ObsResult<f64> {
        match self.require(key)? {
            HeaderValue::Float(v) => Ok(*v),
            HeaderValue::Integer(v) => Ok(*v as f64),
            other => Err(ObsError::KeyType {
                key: key.to_string(),
                message: format!("expected a number, found {other:?}"),
            }),
        }
    }

    /// Integer lookup; floats are not silently truncated.
    pub fn get_i64(&self, key: &str) -> ObsResult<i64> {
        match self.require(key)? {
            HeaderValue::Integer(v) => Ok(*v),
            other => Err(ObsError::KeyType {
                key: key.to_string(),
                message: format!("expected an integer, found {other:?}"),
            }),
        }
    }

    /// String lookup.
    pub fn get_str(&self, key: &str) -> ObsResult<&str> {
        match self.require(key)? {
            HeaderValue::Text(v) => Ok(v.as_str()),
            other => Err(ObsError::KeyType {
                key: key.to_string(),
                message: format!("expected a string, found {other:?}"),
            }),
        }
    }

    /// Number of retained cards.
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Returns `true` if no cards were retained.
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Iterate `(key, value)` pairs in file order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.cards.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns `true` if the header carries nothing beyond HDU-structure
    /// keywords (`SIMPLE`, `BITPIX`, `NAXIS*`, ...). Such a header is treated
    /// as unusable for metadata and triggers the extension-header fallback.
    pub fn is_bare(&self) -> bool {
        self.cards.iter().all(|(k, _)| {
            STRUCTURAL_KEYS.contains(&k.as_str()) || k.starts_with("NAXIS")
        })
    }
}

/// Read header blocks from `reader` until the `END` card.
///
/// Returns the parsed record and the number of bytes consumed (always a
/// multiple of [`BLOCK_SIZE`]).
pub fn read_header<R: Read>(reader: &mut R, path: &Path) -> ObsResult<(HeaderRecord, u64)> {
    let mut cards = Vec::new();
    let mut consumed = 0u64;
    let mut block = [0u8; BLOCK_SIZE];

    loop {
        reader.read_exact(&mut block).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                ObsError::fits(path, "truncated header (no END card before end of file)")
            } else {
                ObsError::Io(e)
            }
        })?;
        consumed += BLOCK_SIZE as u64;

        for card_bytes in block.chunks_exact(CARD_SIZE) {
            match parse_card(card_bytes, path)? {
                ParsedCard::End => return Ok((HeaderRecord { cards }, consumed)),
                ParsedCard::Commentary => {}
                ParsedCard::Value(key, value) => cards.push((key, value)),
                ParsedCard::Bare(_) => {}
            }
        }
    }
}

/// Outcome of parsing one 80-byte card.
enum ParsedCard {
    /// The END keyword.
    End,
    /// COMMENT/HISTORY/blank card.
    Commentary,
    /// A keyword with a parsed value.
    Value(String, HeaderValue),
    /// A keyword with no value indicator (free-form bytes 8..80).
    Bare(String),
}

fn parse_card(card: &[u8], path: &Path) -> ObsResult<ParsedCard> {
    let keyword_bytes = &card[..8];
    for &b in keyword_bytes {
        match b {
            b'A'..=b'Z' | b'0'..=b'9' | b' ' | b'-' | b'_' => {}
            _ => {
                return Err(ObsError::fits(
                    path,
                    format!("invalid header keyword bytes {keyword_bytes:?}"),
                ));
            }
        }
    }
    let keyword = std::str::from_utf8(keyword_bytes)
        .map_err(|_| ObsError::fits(path, "non-ASCII header keyword"))?
        .trim_end()
        .to_string();

    if keyword == "END" {
        return Ok(ParsedCard::End);
    }
    if keyword.is_empty() || keyword == "COMMENT" || keyword == "HISTORY" {
        return Ok(ParsedCard::Commentary);
    }

    if card[8] == b'=' && card[9] == b' ' {
        let field = &card[10..];
        match parse_value_field(field) {
            Some(value) => Ok(ParsedCard::Value(keyword, value)),
            None => Ok(ParsedCard::Bare(keyword)),
        }
    } else {
        Ok(ParsedCard::Bare(keyword))
    }
}

/// Parse the 70-byte value field of a card carrying the `= ` indicator.
///
/// Returns `None` for an empty (undefined) value.
fn parse_value_field(field: &[u8]) -> Option<HeaderValue> {
    let trimmed_start = field.iter().position(|&b| b != b' ')?;
    let field = &field[trimmed_start..];

    if field[0] == b'\'' {
        return parse_string_value(field);
    }

    // Non-string: value runs to the ` /` comment separator or end of card.
    // Real-world files omit the space after the slash, so only ` /` is
    // required (cfitsio accepts the same).
    let mut end = field.len();
    for i in 0..field.len().saturating_sub(1) {
        if field[i] == b' ' && field[i + 1] == b'/' {
            end = i;
            break;
        }
    }
    let text = std::str::from_utf8(&field[..end]).ok()?.trim();
    if text.is_empty() {
        return None;
    }

    match text {
        "T" => return Some(HeaderValue::Logical(true)),
        "F" => return Some(HeaderValue::Logical(false)),
        _ => {}
    }
    if let Ok(v) = text.parse::<i64>() {
        return Some(HeaderValue::Integer(v));
    }
    // Fortran-style exponents (1.5D3) appear in old writers.
    let normalized = text.replace(['D', 'd'], "E");
    if let Ok(v) = normalized.parse::<f64>() {
        return Some(HeaderValue::Float(v));
    }
    None
}

fn parse_string_value(field: &[u8]) -> Option<HeaderValue> {
    let mut value = String::new();
    let mut i = 1; // skip opening quote
    loop {
        if i >= field.len() {
            break; // unterminated string, accept what we have
        }
        if field[i] == b'\'' {
            if i + 1 < field.len() && field[i + 1] == b'\'' {
                value.push('\'');
                i += 2;
                continue;
            }
            break;
        }
        value.push(field[i] as char);
        i += 1;
    }
    // Trailing blanks inside the quotes are not significant.
    Some(HeaderValue::Text(value.trim_end().to_string()))
}
