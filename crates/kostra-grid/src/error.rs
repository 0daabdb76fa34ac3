//! Error types for the kostra-grid crate.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while converting an archive.
///
/// Every variant is fatal for the run. Per-cell gaps (sentinels, missing
/// joins, absent cells) never surface here; they become `NaN` in the grid.
#[derive(Error, Debug)]
pub enum KostraError {
    #[error("Failed to read file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("File name {name:?} does not match the archive schema: {reason}")]
    InvalidFileName { name: String, reason: String },

    #[error("Failed to load geolocation table {path:?}: {reason}")]
    GeoTable { path: PathBuf, reason: String },

    #[error("Failed to parse table {path:?} (line {line}, column {column:?}): {reason}")]
    TableParse {
        path: PathBuf,
        line: u64,
        column: String,
        reason: String,
    },

    #[error("Column {0:?} has no return-period suffix")]
    InvalidColumnName(String),

    #[error("Cell (duration {duration}, y {y}, x {x}) appears more than once in {path:?}")]
    DuplicateCell {
        path: PathBuf,
        duration: u32,
        y: i64,
        x: i64,
    },

    #[error("Coordinates of cell (y {y}, x {x}) differ between durations")]
    InconsistentCoordinates { y: i64, x: i64 },

    #[error("No geolocation for grid cell (y {y}, x {x})")]
    MissingGeolocation { y: i64, x: i64 },

    #[error("Duration {duration} min occurs more than once for variable {variable}")]
    DuplicateDuration { variable: String, duration: u32 },

    #[error("Coordinate {coordinate:?} differs between merged grids: {detail}")]
    CoordinateMismatch { coordinate: String, detail: String },

    #[error("No data: {0}")]
    EmptyArchive(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl KostraError {
    /// Create an InvalidFileName error.
    pub fn invalid_file_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidFileName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a GeoTable error.
    pub fn geo_table(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::GeoTable {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a CoordinateMismatch error.
    pub fn coordinate_mismatch(coordinate: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::CoordinateMismatch {
            coordinate: coordinate.into(),
            detail: detail.into(),
        }
    }
}

/// Result type for kostra-grid operations.
pub type Result<T> = std::result::Result<T, KostraError>;
