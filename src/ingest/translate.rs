//! Field translators: logical fields that cannot be copied verbatim from a
//! header.
//!
//! Each translator is a pure function of the header record (the wavelength
//! translator additionally logs a warning on suspicious readings). Bindings
//! from logical field names to translators are declared per variant in
//! [`crate::ingest::config::IngestConfig`] and dispatched through
//! [`run_translator`].

use crate::error::{ObsError, ObsResult};
use crate::fits::HeaderRecord;
use crate::ingest::config::TranslatorKind;
use crate::types::ColumnValue;

/// MJD of 2010-01-01, subtracted before scaling to keep visit numbers small.
pub const VISIT_EPOCH_MJD: f64 = 55197.0;

/// Readings this far from an integer nanometre suggest the monochromator
/// stopped short of its commanded position.
pub const WAVELENGTH_DRIFT_NM: f64 = 0.1;

/// Derive a visit number from the observation timestamp.
///
/// `1e5` units per 86400-second day gives sub-second resolution, so two
/// exposures more than ~10 microseconds of MJD apart get distinct visits.
/// Nothing stronger is guaranteed; exposures taken closer together than the
/// resolution floor would collide. It might be better to use
/// `1000 * runNo + seqNo`, but the sequence number is not currently set.
pub fn translate_visit(header: &HeaderRecord) -> ObsResult<i64> {
    let mjd = header.get_f64("MJD-OBS")?;
    Ok((1e5 * (mjd - VISIT_EPOCH_MJD)) as i64)
}

/// Translate the wavelength read back from the monochromator.
///
/// The driving script commands an integer wavelength and reads the achieved
/// position back with sub-nm precision; typically the two agree to within
/// 0.005 nm. A reading [`WAVELENGTH_DRIFT_NM`] or more from an integer is
/// logged as a warning (a possible positioning fault) but still returned
/// rounded — this translator never fails on a present `MONOWL`.
pub fn translate_wavelength(header: &HeaderRecord) -> ObsResult<i64> {
    let raw = header.get_f64("MONOWL")?;
    let (rounded, drifted) = round_wavelength(raw);
    if drifted {
        log::warn!(
            "translated significantly non-integer wavelength; {raw} is more than \
             {WAVELENGTH_DRIFT_NM}nm from an integer value"
        );
    }
    Ok(rounded)
}

/// Round a raw wavelength reading, reporting whether it drifted past the
/// warning threshold.
pub fn round_wavelength(raw: f64) -> (i64, bool) {
    let rounded = raw.round();
    (rounded as i64, (raw - rounded).abs() >= WAVELENGTH_DRIFT_NM)
}

/// Extract the `ccd=` field from the composite `CALIB_ID` string.
pub fn translate_ccd(header: &HeaderRecord) -> ObsResult<String> {
    calib_id_field(header, "ccd")
}

/// Extract the `filter=` field from the composite `CALIB_ID` string.
pub fn translate_filter(header: &HeaderRecord) -> ObsResult<String> {
    calib_id_field(header, "filter")
}

/// Extract the `calibDate=` field from the composite `CALIB_ID` string.
pub fn translate_calib_date(header: &HeaderRecord) -> ObsResult<String> {
    calib_id_field(header, "calibDate")
}

/// Get one `field=value` pair out of the `CALIB_ID` written by the
/// calibration construction pipeline, e.g.
/// `"ccd=S00 filter=550CutOn calibDate=2021-06-01"`.
fn calib_id_field(header: &HeaderRecord, field: &str) -> ObsResult<String> {
    let calib_id = header.get_str("CALIB_ID")?;
    let prefix = format!("{field}=");
    calib_id
        .split_whitespace()
        .find_map(|token| token.strip_prefix(prefix.as_str()))
        .map(str::to_owned)
        .ok_or_else(|| ObsError::CalibIdLookup {
            field: field.to_string(),
            calib_id: calib_id.to_string(),
        })
}

/// Dispatch the translator bound to a logical field.
pub fn run_translator(kind: TranslatorKind, header: &HeaderRecord) -> ObsResult<ColumnValue> {
    match kind {
        TranslatorKind::Visit => translate_visit(header).map(ColumnValue::Int),
        TranslatorKind::Wavelength => translate_wavelength(header).map(ColumnValue::Int),
        TranslatorKind::CalibCcd => translate_ccd(header).map(ColumnValue::Text),
        TranslatorKind::CalibFilter => translate_filter(header).map(ColumnValue::Text),
        TranslatorKind::CalibDate => translate_calib_date(header).map(ColumnValue::Text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fits::HeaderValue;

    fn header_with(key: &str, value: HeaderValue) -> HeaderRecord {
        HeaderRecord::from_pairs(vec![(key.to_string(), value)])
    }

    #[test]
    fn visit_is_deterministic_and_epoch_relative() {
        let header = header_with("MJD-OBS", HeaderValue::Float(55197.5));
        assert_eq!(translate_visit(&header).unwrap(), 50_000);
        assert_eq!(translate_visit(&header).unwrap(), 50_000);
    }

    #[test]
    fn visit_is_monotone_above_the_resolution_floor() {
        // One visit unit is 1e-5 days, ~0.86 s.
        let mjds = [57922.0, 57922.00002, 57922.1, 57923.0];
        let visits: Vec<i64> = mjds
            .iter()
            .map(|&m| {
                translate_visit(&header_with("MJD-OBS", HeaderValue::Float(m))).unwrap()
            })
            .collect();
        assert!(visits.windows(2).all(|w| w[0] < w[1]), "{visits:?}");
    }

    #[test]
    fn visit_requires_mjd_key() {
        let header = header_with("EXPTIME", HeaderValue::Float(30.0));
        let err = translate_visit(&header).unwrap_err();
        assert!(matches!(err, ObsError::MissingKey { key } if key == "MJD-OBS"));
    }

    #[test]
    fn wavelength_rounds_and_flags_drift() {
        assert_eq!(round_wavelength(310.0), (310, false));
        assert_eq!(round_wavelength(309.999), (310, false));
        assert_eq!(round_wavelength(309.85), (310, true));
        assert_eq!(round_wavelength(310.1), (310, true));

        let header = header_with("MONOWL", HeaderValue::Float(309.85));
        // Drift warns but never fails.
        assert_eq!(translate_wavelength(&header).unwrap(), 310);
    }

    #[test]
    fn calib_id_fields_extract_by_name() {
        let header = header_with(
            "CALIB_ID",
            HeaderValue::Text("ccd=S01 filter=550CutOn calibDate=2021-06-01".to_string()),
        );
        assert_eq!(translate_ccd(&header).unwrap(), "S01");
        assert_eq!(translate_filter(&header).unwrap(), "550CutOn");
        assert_eq!(translate_calib_date(&header).unwrap(), "2021-06-01");
    }

    #[test]
    fn absent_calib_id_field_is_a_lookup_error() {
        let header = header_with("CALIB_ID", HeaderValue::Text("ccd=S01".to_string()));
        let err = translate_filter(&header).unwrap_err();
        assert!(matches!(err, ObsError::CalibIdLookup { field, .. } if field == "filter"));
    }
}
