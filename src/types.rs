//! Core data model types for the per-exposure index.
//!
//! Ingestion produces one [`ExposureRecord`] per raw file, validated against a
//! [`RegistrationSchema`] (an ordered list of typed columns plus the
//! uniqueness-key column list). Retrieval addresses registered records with a
//! [`DataId`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ObsError, ObsResult};

/// Declared storage type for a registration column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    /// UTF-8 string.
    Text,
    /// 64-bit signed integer.
    Int,
    /// 64-bit floating point number.
    Double,
}

/// A single named, typed column in a [`RegistrationSchema`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name (logical field name, e.g. `expTime`).
    pub name: String,
    /// Declared storage type.
    pub column_type: ColumnType,
    /// Whether a record without this column is rejected. Defaults to `true`;
    /// only fields some hardware generations never produce (e.g.
    /// `wavelength` on broadband acquisitions) are optional.
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

impl Column {
    /// Create a required column.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            required: true,
        }
    }

    /// Create an optional column.
    pub fn optional(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            required: false,
        }
    }
}

/// The registration schema: every column an [`ExposureRecord`] must carry,
/// plus the column tuple that makes a record unique in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationSchema {
    /// Ordered list of declared columns.
    pub columns: Vec<Column>,
    /// Columns forming the uniqueness-key tuple (e.g. `run`, `visit`, `ccd`).
    pub visit_keys: Vec<String>,
}

impl RegistrationSchema {
    /// Create a schema from columns and uniqueness-key column names.
    pub fn new(columns: Vec<Column>, visit_keys: Vec<impl Into<String>>) -> Self {
        Self {
            columns,
            visit_keys: visit_keys.into_iter().map(Into::into).collect(),
        }
    }

    /// Iterate column names in declaration order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Returns the declared type of a column by name, if present.
    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.column_type)
    }
}

/// A single typed value stored in an [`ExposureRecord`] or [`DataId`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnValue {
    /// 64-bit signed integer.
    Int(i64),
    /// 64-bit float.
    Double(f64),
    /// UTF-8 string.
    Text(String),
}

impl ColumnValue {
    /// Render the value the way the registry's CSV persistence writes it.
    pub fn to_field(&self) -> String {
        match self {
            ColumnValue::Int(v) => v.to_string(),
            ColumnValue::Double(v) => v.to_string(),
            ColumnValue::Text(v) => v.clone(),
        }
    }

    /// Parse a CSV field back into a value of the declared column type.
    pub fn from_field(column: &str, column_type: ColumnType, raw: &str) -> ObsResult<Self> {
        match column_type {
            ColumnType::Text => Ok(ColumnValue::Text(raw.to_owned())),
            ColumnType::Int => raw.parse::<i64>().map(ColumnValue::Int).map_err(|e| {
                ObsError::ColumnParse {
                    column: column.to_owned(),
                    raw: raw.to_owned(),
                    message: e.to_string(),
                }
            }),
            ColumnType::Double => raw.parse::<f64>().map(ColumnValue::Double).map_err(|e| {
                ObsError::ColumnParse {
                    column: column.to_owned(),
                    raw: raw.to_owned(),
                    message: e.to_string(),
                }
            }),
        }
    }
}

impl fmt::Display for ColumnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnValue::Int(v) => write!(f, "{v}"),
            ColumnValue::Double(v) => write!(f, "{v}"),
            ColumnValue::Text(v) => write!(f, "{v}"),
        }
    }
}

/// One per-exposure record: logical field name to typed value.
///
/// Field order is not significant; completeness against a
/// [`RegistrationSchema`] is what makes a record acceptable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExposureRecord {
    fields: BTreeMap<String, ColumnValue>,
}

impl ExposureRecord {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, replacing any previous value.
    pub fn set(&mut self, name: impl Into<String>, value: ColumnValue) {
        self.fields.insert(name.into(), value);
    }

    /// Look up a field by name.
    pub fn get(&self, name: &str) -> Option<&ColumnValue> {
        self.fields.get(name)
    }

    /// Returns `true` if the record carries `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Iterate `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ColumnValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Check the record against `schema`: every required column must be
    /// present. The first absent column is reported.
    pub fn validate(&self, schema: &RegistrationSchema) -> ObsResult<()> {
        for column in schema.columns.iter().filter(|c| c.required) {
            if !self.fields.contains_key(&column.name) {
                return Err(ObsError::MissingField {
                    column: column.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Extract the uniqueness-key tuple declared by `schema`.
    ///
    /// Callers should [`validate`](Self::validate) first; a missing key column
    /// is reported the same way.
    pub fn visit_key(&self, schema: &RegistrationSchema) -> ObsResult<Vec<ColumnValue>> {
        schema
            .visit_keys
            .iter()
            .map(|name| {
                self.fields
                    .get(name)
                    .cloned()
                    .ok_or_else(|| ObsError::MissingField {
                        column: name.clone(),
                    })
            })
            .collect()
    }
}

/// A data identifier naming one logical dataset instance.
///
/// Minimally `{visit, ccd}`; extended with dataset-kind-specific keys. A
/// `DataId` used for lookup must be normalized first — see
/// [`normalized`](Self::normalized).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataId {
    entries: BTreeMap<String, ColumnValue>,
}

impl DataId {
    /// Create an empty identifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion.
    pub fn with(mut self, key: impl Into<String>, value: ColumnValue) -> Self {
        self.entries.insert(key.into(), value);
        self
    }

    /// Look up a key.
    pub fn get(&self, key: &str) -> Option<&ColumnValue> {
        self.entries.get(key)
    }

    /// Iterate `(key, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ColumnValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns a copy with `visit` (and any other key the schema declares as
    /// an integer column) coerced from text to integer.
    ///
    /// This is the only silent coercion the lookup path performs; a textual
    /// value that does not parse is a [`ObsError::DataIdCoercion`] error.
    pub fn normalized(&self, schema: &RegistrationSchema) -> ObsResult<Self> {
        let mut entries = BTreeMap::new();
        for (key, value) in &self.entries {
            let coerced = match (schema.column_type(key), value) {
                (Some(ColumnType::Int), ColumnValue::Text(raw)) => {
                    let parsed =
                        raw.trim()
                            .parse::<i64>()
                            .map_err(|_| ObsError::DataIdCoercion {
                                key: key.clone(),
                                raw: raw.clone(),
                            })?;
                    ColumnValue::Int(parsed)
                }
                _ => value.clone(),
            };
            entries.insert(key.clone(), coerced);
        }
        Ok(Self { entries })
    }

    /// Returns `true` if every key of this identifier matches `record`.
    pub fn matches(&self, record: &ExposureRecord) -> bool {
        self.entries
            .iter()
            .all(|(key, value)| record.get(key) == Some(value))
    }
}

impl fmt::Display for DataId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (key, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{key}: {value}")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_schema() -> RegistrationSchema {
        RegistrationSchema::new(
            vec![
                Column::new("run", ColumnType::Text),
                Column::new("visit", ColumnType::Int),
                Column::new("expTime", ColumnType::Double),
            ],
            vec!["run", "visit"],
        )
    }

    #[test]
    fn validate_reports_first_missing_column() {
        let schema = small_schema();
        let mut record = ExposureRecord::new();
        record.set("run", ColumnValue::Text("RUN1".to_string()));

        let err = record.validate(&schema).unwrap_err();
        assert!(matches!(err, ObsError::MissingField { column } if column == "visit"));
    }

    #[test]
    fn visit_key_extracts_declared_tuple() {
        let schema = small_schema();
        let mut record = ExposureRecord::new();
        record.set("run", ColumnValue::Text("RUN1".to_string()));
        record.set("visit", ColumnValue::Int(7));
        record.set("expTime", ColumnValue::Double(30.0));

        let key = record.visit_key(&schema).unwrap();
        assert_eq!(
            key,
            vec![ColumnValue::Text("RUN1".to_string()), ColumnValue::Int(7)]
        );
    }

    #[test]
    fn data_id_normalization_coerces_textual_visit() {
        let schema = small_schema();
        let id = DataId::new().with("visit", ColumnValue::Text("269921586".to_string()));

        let normalized = id.normalized(&schema).unwrap();
        assert_eq!(normalized.get("visit"), Some(&ColumnValue::Int(269921586)));
    }

    #[test]
    fn data_id_normalization_rejects_non_integer_visit() {
        let schema = small_schema();
        let id = DataId::new().with("visit", ColumnValue::Text("not_a_visit".to_string()));

        let err = id.normalized(&schema).unwrap_err();
        assert!(matches!(err, ObsError::DataIdCoercion { key, .. } if key == "visit"));
    }
}
