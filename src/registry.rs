//! The queryable per-exposure index.
//!
//! Validated records are registered keyed by the schema's uniqueness tuple
//! (for raw data: `run`, `visit`, `ccd` or the variant's equivalent).
//! Retrieval addresses the registry with a [`DataId`], which is normalized
//! (textual `visit` coerced to integer) before matching.
//!
//! The registry also remembers each record's backing file path, and can be
//! persisted to / reloaded from a CSV table whose first column is that path.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{ObsError, ObsResult};
use crate::types::{ColumnValue, DataId, ExposureRecord, RegistrationSchema};

/// One registered record and the file it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryRow {
    /// The raw/calibration file backing this record.
    pub path: PathBuf,
    /// The validated per-exposure record.
    pub record: ExposureRecord,
}

/// In-memory per-exposure index for one registration schema.
#[derive(Debug, Clone)]
pub struct Registry {
    schema: RegistrationSchema,
    rows: Vec<RegistryRow>,
    // Uniqueness-key tuple, rendered, to row index.
    index: HashMap<String, usize>,
}

/// CSV column carrying the backing file path; must not collide with a schema
/// column name.
const PATH_COLUMN: &str = "path";

impl Registry {
    /// Create an empty registry for `schema`.
    pub fn new(schema: RegistrationSchema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// The registration schema this registry enforces.
    pub fn schema(&self) -> &RegistrationSchema {
        &self.schema
    }

    /// Number of registered records.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All registered rows, in insertion order.
    pub fn rows(&self) -> &[RegistryRow] {
        &self.rows
    }

    /// Register one record. The record is re-validated against the schema,
    /// and a second record with the same uniqueness-key tuple is rejected.
    pub fn insert(&mut self, record: ExposureRecord, path: PathBuf) -> ObsResult<()> {
        record.validate(&self.schema)?;
        let key = render_key(&record.visit_key(&self.schema)?);
        if self.index.contains_key(&key) {
            return Err(ObsError::DuplicateEntry { key });
        }
        self.index.insert(key, self.rows.len());
        self.rows.push(RegistryRow { path, record });
        Ok(())
    }

    /// Find every row matching the (normalized) data identifier. All keys of
    /// the identifier must match; keys the identifier omits are
    /// unconstrained.
    pub fn query(&self, data_id: &DataId) -> ObsResult<Vec<&RegistryRow>> {
        let data_id = data_id.normalized(&self.schema)?;
        Ok(self
            .rows
            .iter()
            .filter(|row| data_id.matches(&row.record))
            .collect())
    }

    /// Resolve a data identifier to exactly one row.
    pub fn locate(&self, data_id: &DataId) -> ObsResult<&RegistryRow> {
        let matches = self.query(data_id)?;
        match matches.len() {
            0 => Err(ObsError::NoSuchEntry {
                data_id: data_id.to_string(),
            }),
            1 => Ok(matches[0]),
            n => Err(ObsError::AmbiguousDataId {
                data_id: data_id.to_string(),
                matches: n,
            }),
        }
    }

    /// Persist the registry as a CSV table: the backing path, then the
    /// schema's columns in declaration order. Optional columns a record does
    /// not carry are written empty.
    pub fn save_csv(&self, path: impl AsRef<Path>) -> ObsResult<()> {
        let mut writer = csv::Writer::from_path(path.as_ref())?;

        let mut headers = vec![PATH_COLUMN.to_string()];
        headers.extend(self.schema.column_names().map(str::to_owned));
        writer.write_record(&headers)?;

        for row in &self.rows {
            let mut fields = vec![row.path.display().to_string()];
            for column in self.schema.column_names() {
                fields.push(
                    row.record
                        .get(column)
                        .map(ColumnValue::to_field)
                        .unwrap_or_default(),
                );
            }
            writer.write_record(&fields)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Reload a registry persisted by [`save_csv`](Self::save_csv).
    ///
    /// Columns may appear in any order; every schema column must be present
    /// in the CSV header.
    pub fn load_csv(path: impl AsRef<Path>, schema: RegistrationSchema) -> ObsResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(path.as_ref())?;
        let headers = reader.headers()?.clone();

        let path_idx = headers
            .iter()
            .position(|h| h == PATH_COLUMN)
            .ok_or_else(|| ObsError::MissingField {
                column: PATH_COLUMN.to_string(),
            })?;
        let mut column_idxs = Vec::with_capacity(schema.columns.len());
        for column in &schema.columns {
            let idx = headers
                .iter()
                .position(|h| h == column.name)
                .ok_or_else(|| ObsError::MissingField {
                    column: column.name.clone(),
                })?;
            column_idxs.push(idx);
        }

        let mut registry = Self::new(schema.clone());
        for result in reader.records() {
            let csv_row = result?;
            let mut record = ExposureRecord::new();
            for (column, &idx) in schema.columns.iter().zip(column_idxs.iter()) {
                let raw = csv_row.get(idx).unwrap_or("");
                if raw.is_empty() && !column.required {
                    continue;
                }
                record.set(
                    column.name.clone(),
                    ColumnValue::from_field(&column.name, column.column_type, raw)?,
                );
            }
            let backing = PathBuf::from(csv_row.get(path_idx).unwrap_or(""));
            registry.insert(record, backing)?;
        }
        Ok(registry)
    }
}

fn render_key(key: &[ColumnValue]) -> String {
    key.iter()
        .map(ColumnValue::to_field)
        .collect::<Vec<_>>()
        .join(", ")
}
