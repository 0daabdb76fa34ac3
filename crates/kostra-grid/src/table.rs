//! Table builder: one per-duration table joined with geolocation.

use std::io::Read;
use std::path::Path;

use tracing::{debug, warn};

use crate::config::ArchiveSchema;
use crate::error::{KostraError, Result};
use crate::geo::{CellIndex, GeoTable};
use crate::metadata::{parse_file_metadata, FileMetadata};

/// Geolocation columns joined onto a table row, under their canonical names.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellLocation {
    /// Grid column.
    pub x: i64,
    /// Grid row.
    pub y: i64,
    pub lon: f64,
    pub lat: f64,
}

/// One row of a flat table.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatRow {
    pub cell_index: CellIndex,
    /// Duration token of the source file (constant per table).
    pub duration: String,
    /// `None` when the cell index has no geolocation match.
    pub location: Option<CellLocation>,
    /// Raw values in `FlatTable::value_columns` order. Empty cells are `NaN`.
    pub values: Vec<f64>,
}

/// A per-duration table with geolocation left-joined by cell index.
#[derive(Debug, Clone)]
pub struct FlatTable {
    pub metadata: FileMetadata,
    /// Value column names in source order.
    pub value_columns: Vec<String>,
    pub rows: Vec<FlatRow>,
}

impl FlatTable {
    /// Read a table from any reader.
    ///
    /// `metadata` supplies the duration attached to every row; `path` in it is
    /// only used for error messages.
    pub fn from_reader<R: Read>(
        reader: R,
        metadata: FileMetadata,
        geo: &GeoTable,
        schema: &ArchiveSchema,
    ) -> Result<Self> {
        let path = metadata.path.clone();
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(schema.delimiter_byte())
            .trim(csv::Trim::All)
            .from_reader(reader);

        let header = csv_reader
            .headers()
            .map_err(|e| parse_error(&path, 1, "<header>", e.to_string()))?
            .clone();

        if header.len() < 2 {
            return Err(parse_error(
                &path,
                1,
                "<header>",
                "expected a cell index column followed by value columns",
            ));
        }

        if header.get(0) != Some(schema.index_column.as_str()) {
            debug!(
                path = %path.display(),
                found = header.get(0).unwrap_or_default(),
                expected = %schema.index_column,
                "First column is not the configured index column, using it as cell index"
            );
        }

        let value_columns: Vec<String> = header.iter().skip(1).map(str::to_string).collect();
        let duration = metadata.duration.label.clone();

        let mut rows = Vec::new();
        let mut unmatched = 0usize;

        for record in csv_reader.records() {
            let record = record.map_err(|e| {
                let line = e.position().map_or(0, |p| p.line());
                parse_error(&path, line, "<record>", e.to_string())
            })?;
            let line = record.position().map_or(0, |p| p.line());

            let index_field = record.get(0).unwrap_or_default();
            let cell_index: CellIndex = index_field.parse().map_err(|_| {
                parse_error(
                    &path,
                    line,
                    &schema.index_column,
                    format!("invalid cell index {:?}", index_field),
                )
            })?;

            let mut values = Vec::with_capacity(value_columns.len());
            for (i, name) in value_columns.iter().enumerate() {
                let field = record.get(i + 1).unwrap_or_default();
                values.push(parse_value(field).ok_or_else(|| {
                    parse_error(&path, line, name, format!("invalid number {:?}", field))
                })?);
            }

            // Left join: rows without a match are kept with no location.
            let location = geo.get(cell_index).map(|g| CellLocation {
                x: g.column,
                y: g.row,
                lon: g.center_lon,
                lat: g.center_lat,
            });
            if location.is_none() {
                unmatched += 1;
            }

            rows.push(FlatRow {
                cell_index,
                duration: duration.clone(),
                location,
                values,
            });
        }

        if unmatched > 0 {
            warn!(
                path = %path.display(),
                unmatched = unmatched,
                "Cell indices without geolocation"
            );
        }

        debug!(
            path = %path.display(),
            duration = %duration,
            rows = rows.len(),
            columns = value_columns.len(),
            "Built flat table"
        );

        Ok(Self {
            metadata,
            value_columns,
            rows,
        })
    }

    pub fn path(&self) -> &Path {
        &self.metadata.path
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Read one per-duration table and join it with the geolocation table.
pub fn build_flat_table(path: &Path, geo: &GeoTable, schema: &ArchiveSchema) -> Result<FlatTable> {
    let metadata = parse_file_metadata(path, schema)?;
    let file = std::fs::File::open(path)?;
    FlatTable::from_reader(std::io::BufReader::new(file), metadata, geo, schema)
}

/// Parse one value cell. Empty cells are null.
fn parse_value(field: &str) -> Option<f64> {
    if field.is_empty() {
        return Some(f64::NAN);
    }
    field.parse::<f64>().ok()
}

fn parse_error(path: &Path, line: u64, column: &str, reason: impl Into<String>) -> KostraError {
    KostraError::TableParse {
        path: path.to_path_buf(),
        line,
        column: column.to_string(),
        reason: reason.into(),
    }
}
