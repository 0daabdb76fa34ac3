//! Archive schema configuration.
//!
//! Describes how the archive encodes its metadata: file name segments,
//! column markers, the geolocation sheet layout and the sentinel values.

use serde::{Deserialize, Serialize};

/// Missing-data sentinel used in the source tables.
pub const SOURCE_SENTINEL: f64 = -99.9;

/// Fill value written for null cells in the output file.
pub const OUTPUT_FILL_VALUE: f64 = 1.0e20;

/// Column names of the geolocation table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoColumns {
    /// Grid column of the cell.
    pub column: String,
    /// Grid row of the cell.
    pub row: String,
    /// Longitude of the cell center.
    pub center_lon: String,
    /// Latitude of the cell center.
    pub center_lat: String,
    /// Longitudes of the four cell corners.
    pub corner_lon: [String; 4],
    /// Latitudes of the four cell corners.
    pub corner_lat: [String; 4],
}

impl Default for GeoColumns {
    fn default() -> Self {
        Self {
            column: "Col".to_string(),
            row: "Row".to_string(),
            center_lon: "X_CENT_GEO".to_string(),
            center_lat: "Y_CENT_GEO".to_string(),
            corner_lon: ["X1_GEO", "X2_GEO", "X3_GEO", "X4_GEO"].map(String::from),
            corner_lat: ["Y1_GEO", "Y2_GEO", "Y3_GEO", "Y4_GEO"].map(String::from),
        }
    }
}

/// Layout of the archive being converted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveSchema {
    /// Field delimiter of the per-duration tables.
    pub delimiter: char,

    /// Name of the cell index column (tables and geolocation sheet).
    pub index_column: String,

    /// Sheet holding the geolocation table. `None` selects the first sheet.
    pub geo_sheet: Option<String>,

    /// Column names of the geolocation table.
    pub geo_columns: GeoColumns,

    /// Zero-based `_`-segment of the file stem holding the duration token.
    pub duration_segment: usize,

    /// Zero-based `_`-segment of the file stem holding the variant marker.
    pub variant_segment: usize,

    /// Marker of the urban (KOG) variant, in file names and column names.
    pub urban_marker: String,

    /// Marker of plain precipitation-depth columns.
    pub plain_marker: String,

    /// Output variable name of the plain family.
    pub plain_variable: String,

    /// Output variable name of the urban family.
    pub urban_variable: String,

    /// Missing-data sentinel in the source tables.
    pub sentinel: f64,

    /// Fill value for null cells in the output file.
    pub fill_value: f64,
}

impl Default for ArchiveSchema {
    fn default() -> Self {
        Self {
            delimiter: ';',
            index_column: "INDEX_RC".to_string(),
            geo_sheet: None,
            geo_columns: GeoColumns::default(),
            duration_segment: 2,
            variant_segment: 3,
            urban_marker: "KOG".to_string(),
            plain_marker: "HN".to_string(),
            plain_variable: "HN".to_string(),
            urban_variable: "HN_KOG".to_string(),
            sentinel: SOURCE_SENTINEL,
            fill_value: OUTPUT_FILL_VALUE,
        }
    }
}

impl ArchiveSchema {
    /// Load the schema from environment variables, starting from defaults.
    pub fn from_env() -> Self {
        let mut schema = Self::default();

        if let Ok(val) = std::env::var("KOSTRA_DELIMITER") {
            if let Some(c) = val.chars().next() {
                schema.delimiter = c;
            }
        }

        if let Ok(val) = std::env::var("KOSTRA_INDEX_COLUMN") {
            schema.index_column = val;
        }

        if let Ok(val) = std::env::var("KOSTRA_GEO_SHEET") {
            schema.geo_sheet = Some(val);
        }

        if let Ok(val) = std::env::var("KOSTRA_URBAN_MARKER") {
            schema.urban_marker = val;
        }

        if let Ok(val) = std::env::var("KOSTRA_SENTINEL") {
            if let Ok(v) = val.parse() {
                schema.sentinel = v;
            }
        }

        if let Ok(val) = std::env::var("KOSTRA_FILL_VALUE") {
            if let Ok(v) = val.parse() {
                schema.fill_value = v;
            }
        }

        schema
    }

    /// Validate the schema.
    pub fn validate(&self) -> Result<(), String> {
        if !self.delimiter.is_ascii() {
            return Err("delimiter must be an ASCII character".to_string());
        }

        if self.duration_segment == self.variant_segment {
            return Err("duration_segment and variant_segment must differ".to_string());
        }

        if self.urban_marker.is_empty() || self.plain_marker.is_empty() {
            return Err("column markers must not be empty".to_string());
        }

        if self.plain_variable == self.urban_variable {
            return Err("plain_variable and urban_variable must differ".to_string());
        }

        if self.index_column.is_empty() {
            return Err("index_column must not be empty".to_string());
        }

        Ok(())
    }

    /// Delimiter as a byte for the csv reader.
    pub fn delimiter_byte(&self) -> u8 {
        self.delimiter as u8
    }
}
