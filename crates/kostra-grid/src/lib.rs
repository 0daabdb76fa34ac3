//! KOSTRA table-to-grid conversion.
//!
//! Reshapes the per-duration tables of a KOSTRA precipitation archive into
//! one labelled dataset indexed by (duration, returnPeriod, y, x).
//!
//! # Stages
//!
//! - [`metadata`]: duration level and urban flag from file names
//! - [`geo`]: cell index to grid position and coordinates
//! - [`table`]: one table left-joined with the geolocation table
//! - [`grid`]: pivot into dense (duration, y, x) arrays, sentinels to `NaN`
//! - [`merge`]: return-period axis, duration concatenation, family merge
//! - [`bounds`]: center coordinates and cell corner bounds
//! - [`encoding`]: fill values for serialization
//!
//! [`Pipeline`] runs them in order. Writing the result is left to the
//! `kostra-netcdf` crate.

pub mod bounds;
pub mod config;
pub mod dataset;
pub mod encoding;
pub mod error;
pub mod geo;
pub mod grid;
pub mod merge;
pub mod metadata;
pub mod pipeline;
pub mod table;

// Re-exports
pub use bounds::{annotate_bounds, fill_center_coordinates};
pub use config::{ArchiveSchema, GeoColumns, OUTPUT_FILL_VALUE, SOURCE_SENTINEL};
pub use dataset::{
    names, AttrValue, Attributes, DataType, Dataset, DatasetSummary, Dimension, Encoding,
    FillValue, Variable, VariableSummary,
};
pub use encoding::finalize_encoding;
pub use error::{KostraError, Result};
pub use geo::{CellIndex, GeoRecord, GeoTable};
pub use grid::{build_grid, mask_sentinel, DurationGrid, GridColumn};
pub use merge::{
    classify_column, combine, concat_durations, merge_families, merge_return_periods,
    parse_return_period, Family, FamilyGrid, FileFamilies,
};
pub use metadata::{parse_duration_label, parse_file_metadata, DurationLevel, FileMetadata};
pub use pipeline::{Pipeline, PipelineOptions};
pub use table::{build_flat_table, CellLocation, FlatRow, FlatTable};
