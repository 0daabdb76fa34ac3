//! Geolocation join table.
//!
//! Maps each cell index to its grid position and geographic coordinates.
//! The table is loaded once per run and only read afterwards; stages borrow
//! it as `&GeoTable`.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use tracing::{debug, info};

use crate::config::{ArchiveSchema, GeoColumns};
use crate::error::{KostraError, Result};

/// Unique key of one grid cell.
pub type CellIndex = i64;

/// One row of the geolocation table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoRecord {
    pub cell_index: CellIndex,
    /// Grid column (becomes the `x` axis).
    pub column: i64,
    /// Grid row (becomes the `y` axis).
    pub row: i64,
    pub center_lon: f64,
    pub center_lat: f64,
    /// Corner coordinates as (lon, lat), in source order.
    pub corners: [(f64, f64); 4],
}

/// Immutable lookup from cell index to [`GeoRecord`].
#[derive(Debug, Clone, Default)]
pub struct GeoTable {
    records: BTreeMap<CellIndex, GeoRecord>,
    /// (row, column) to cell index
    positions: HashMap<(i64, i64), CellIndex>,
}

impl GeoTable {
    /// Build a table from records.
    ///
    /// Cell indices and (column, row) pairs must both be unique.
    pub fn from_records(records: impl IntoIterator<Item = GeoRecord>) -> Result<Self> {
        let mut by_index = BTreeMap::new();
        let mut positions = HashMap::new();

        for record in records {
            if positions
                .insert((record.row, record.column), record.cell_index)
                .is_some()
            {
                return Err(KostraError::geo_table(
                    "<records>",
                    format!(
                        "cell position (column {}, row {}) is assigned twice",
                        record.column, record.row
                    ),
                ));
            }
            if by_index.insert(record.cell_index, record).is_some() {
                return Err(KostraError::geo_table(
                    "<records>",
                    format!("cell index {} is listed twice", record.cell_index),
                ));
            }
        }

        Ok(Self {
            records: by_index,
            positions,
        })
    }

    /// Load the table from a spreadsheet (`.xlsx`, `.xlsm`, `.xls`, `.ods`)
    /// or a delimited text file (`.csv`).
    pub fn load(path: &Path, schema: &ArchiveSchema) -> Result<Self> {
        if !path.is_file() {
            return Err(KostraError::geo_table(path, "file not found"));
        }

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        let records = match extension.as_str() {
            "csv" | "txt" => read_delimited(path, schema)?,
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => read_spreadsheet(path, schema)?,
            other => {
                return Err(KostraError::geo_table(
                    path,
                    format!("unsupported file type {:?}", other),
                ))
            }
        };

        let table = Self::from_records(records).map_err(|e| match e {
            KostraError::GeoTable { reason, .. } => KostraError::geo_table(path, reason),
            other => other,
        })?;

        if table.is_empty() {
            return Err(KostraError::geo_table(path, "table has no rows"));
        }

        info!(
            path = %path.display(),
            cells = table.len(),
            "Loaded geolocation table"
        );

        Ok(table)
    }

    /// Look up one cell.
    pub fn get(&self, cell_index: CellIndex) -> Option<&GeoRecord> {
        self.records.get(&cell_index)
    }

    /// Look up the cell at a grid position.
    pub fn at(&self, row: i64, column: i64) -> Option<&GeoRecord> {
        self.positions
            .get(&(row, column))
            .and_then(|index| self.records.get(index))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records ordered by cell index.
    pub fn iter(&self) -> impl Iterator<Item = &GeoRecord> {
        self.records.values()
    }

    /// Sorted unique rows and columns covered by the table.
    pub fn extent(&self) -> (Vec<i64>, Vec<i64>) {
        let rows: BTreeSet<i64> = self.records.values().map(|r| r.row).collect();
        let columns: BTreeSet<i64> = self.records.values().map(|r| r.column).collect();
        (rows.into_iter().collect(), columns.into_iter().collect())
    }
}

/// Header positions of the columns the table needs.
struct ColumnMap {
    index: usize,
    column: usize,
    row: usize,
    center_lon: usize,
    center_lat: usize,
    corner_lon: [usize; 4],
    corner_lat: [usize; 4],
}

impl ColumnMap {
    fn resolve(
        header: &[String],
        index_column: &str,
        names: &GeoColumns,
    ) -> std::result::Result<Self, String> {
        let find = |name: &str| {
            header
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| format!("missing column {:?}", name))
        };

        let mut corner_lon = [0; 4];
        let mut corner_lat = [0; 4];
        for i in 0..4 {
            corner_lon[i] = find(&names.corner_lon[i])?;
            corner_lat[i] = find(&names.corner_lat[i])?;
        }

        Ok(Self {
            index: find(index_column)?,
            column: find(&names.column)?,
            row: find(&names.row)?,
            center_lon: find(&names.center_lon)?,
            center_lat: find(&names.center_lat)?,
            corner_lon,
            corner_lat,
        })
    }

    /// Build a record from one row, reading cells through `value`.
    fn record<F>(&self, value: F) -> std::result::Result<GeoRecord, String>
    where
        F: Fn(usize) -> Option<f64>,
    {
        let number = |i: usize| value(i).ok_or_else(|| format!("column {} is not numeric", i));
        let integer = |i: usize| {
            let v = number(i)?;
            if v.fract() != 0.0 {
                return Err(format!("column {} is not an integer: {}", i, v));
            }
            Ok(v as i64)
        };

        let mut corners = [(0.0, 0.0); 4];
        for (i, corner) in corners.iter_mut().enumerate() {
            *corner = (number(self.corner_lon[i])?, number(self.corner_lat[i])?);
        }

        Ok(GeoRecord {
            cell_index: integer(self.index)?,
            column: integer(self.column)?,
            row: integer(self.row)?,
            center_lon: number(self.center_lon)?,
            center_lat: number(self.center_lat)?,
            corners,
        })
    }
}

fn read_delimited(path: &Path, schema: &ArchiveSchema) -> Result<Vec<GeoRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(schema.delimiter_byte())
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| KostraError::geo_table(path, e.to_string()))?;

    let header: Vec<String> = reader
        .headers()
        .map_err(|e| KostraError::geo_table(path, e.to_string()))?
        .iter()
        .map(str::to_string)
        .collect();

    let columns = ColumnMap::resolve(&header, &schema.index_column, &schema.geo_columns)
        .map_err(|reason| KostraError::geo_table(path, reason))?;

    let mut records = Vec::new();
    for (line, row) in reader.records().enumerate() {
        let row = row.map_err(|e| KostraError::geo_table(path, e.to_string()))?;
        let record = columns
            .record(|i| row.get(i).and_then(|s| s.parse::<f64>().ok()))
            .map_err(|reason| {
                KostraError::geo_table(path, format!("row {}: {}", line + 2, reason))
            })?;
        records.push(record);
    }

    debug!(path = %path.display(), rows = records.len(), "Read delimited geolocation table");
    Ok(records)
}

fn read_spreadsheet(path: &Path, schema: &ArchiveSchema) -> Result<Vec<GeoRecord>> {
    let mut workbook =
        open_workbook_auto(path).map_err(|e| KostraError::geo_table(path, e.to_string()))?;

    let sheet = match &schema.geo_sheet {
        Some(name) => name.clone(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| KostraError::geo_table(path, "workbook has no sheets"))?,
    };

    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| KostraError::geo_table(path, format!("sheet {:?}: {}", sheet, e)))?;

    let mut rows = range.rows();
    let header: Vec<String> = rows
        .next()
        .ok_or_else(|| KostraError::geo_table(path, format!("sheet {:?} is empty", sheet)))?
        .iter()
        .map(|cell| cell.to_string())
        .collect();

    let columns = ColumnMap::resolve(&header, &schema.index_column, &schema.geo_columns)
        .map_err(|reason| KostraError::geo_table(path, format!("sheet {:?}: {}", sheet, reason)))?;

    let mut records = Vec::new();
    for (line, row) in rows.enumerate() {
        if row.iter().all(|cell| matches!(cell, Data::Empty)) {
            continue;
        }
        let record = columns
            .record(|i| row.get(i).and_then(cell_to_f64))
            .map_err(|reason| {
                KostraError::geo_table(path, format!("row {}: {}", line + 2, reason))
            })?;
        records.push(record);
    }

    debug!(path = %path.display(), sheet = %sheet, rows = records.len(), "Read geolocation sheet");
    Ok(records)
}

fn cell_to_f64(cell: &Data) -> Option<f64> {
    match cell {
        Data::Float(v) => Some(*v),
        Data::Int(v) => Some(*v as f64),
        Data::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn record(cell_index: i64, column: i64, row: i64) -> GeoRecord {
        let lon = 6.0 + column as f64 * 0.1;
        let lat = 50.0 + row as f64 * 0.1;
        GeoRecord {
            cell_index,
            column,
            row,
            center_lon: lon,
            center_lat: lat,
            corners: [
                (lon - 0.05, lat - 0.05),
                (lon + 0.05, lat - 0.05),
                (lon + 0.05, lat + 0.05),
                (lon - 0.05, lat + 0.05),
            ],
        }
    }

    #[test]
    fn test_lookup_and_extent() {
        let table = GeoTable::from_records(vec![
            record(1, 0, 0),
            record(2, 1, 0),
            record(3, 0, 1),
            record(4, 1, 1),
        ])
        .unwrap();

        assert_eq!(table.len(), 4);
        assert_eq!(table.get(3).unwrap().row, 1);
        assert!(table.get(99).is_none());
        assert_eq!(table.extent(), (vec![0, 1], vec![0, 1]));
        assert_eq!(table.at(1, 0).unwrap().cell_index, 3);
        assert!(table.at(2, 0).is_none());
    }

    #[test]
    fn test_duplicate_index_rejected() {
        let err = GeoTable::from_records(vec![record(1, 0, 0), record(1, 1, 0)]).unwrap_err();
        assert!(matches!(err, KostraError::GeoTable { .. }));
    }

    #[test]
    fn test_duplicate_position_rejected() {
        assert!(GeoTable::from_records(vec![record(1, 0, 0), record(2, 0, 0)]).is_err());
    }

    #[test]
    fn test_load_delimited() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("geo.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "{}", test_utils::GEO_HEADER).unwrap();
        writeln!(file, "7;2;3;6.5;50.5;6.4;50.4;6.6;50.4;6.6;50.6;6.4;50.6").unwrap();
        drop(file);

        let table = GeoTable::load(&path, &ArchiveSchema::default()).unwrap();
        let rec = table.get(7).unwrap();
        assert_eq!((rec.column, rec.row), (3, 2));
        assert_eq!(rec.corners[2], (6.6, 50.6));
    }

    #[test]
    fn test_load_missing_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("geo.csv");
        std::fs::write(&path, "INDEX_RC;Row;Col\n1;0;0\n").unwrap();

        let err = GeoTable::load(&path, &ArchiveSchema::default()).unwrap_err();
        assert!(err.to_string().contains("X_CENT_GEO"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = GeoTable::load(Path::new("/nonexistent/geo.xlsx"), &ArchiveSchema::default())
            .unwrap_err();
        assert!(matches!(err, KostraError::GeoTable { .. }));
    }

    #[test]
    fn test_cell_to_f64() {
        assert_eq!(cell_to_f64(&Data::Float(6.25)), Some(6.25));
        assert_eq!(cell_to_f64(&Data::Int(42)), Some(42.0));
        assert_eq!(cell_to_f64(&Data::String(" 50.5 ".to_string())), Some(50.5));
        assert_eq!(cell_to_f64(&Data::String("n/a".to_string())), None);
        assert_eq!(cell_to_f64(&Data::Empty), None);
    }

    #[test]
    fn test_load_spreadsheet_named_sheet() {
        let path = test_utils::require_test_file!("KOSTRA_DWD_2020_geog_Bezug.xlsx");

        let mut workbook = open_workbook_auto(&path).unwrap();
        let sheet = workbook.sheet_names().first().cloned().unwrap();

        let schema = ArchiveSchema {
            geo_sheet: Some(sheet),
            ..Default::default()
        };
        let table = GeoTable::load(&path, &schema).unwrap();
        assert!(!table.is_empty());

        let (rows, columns) = table.extent();
        assert_eq!(table.len(), rows.len() * columns.len());

        let unknown = ArchiveSchema {
            geo_sheet: Some("no such sheet".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            GeoTable::load(&path, &unknown),
            Err(KostraError::GeoTable { .. })
        ));
    }
}
