//! Error types for NetCDF persistence.

use thiserror::Error;

/// Result type for NetCDF operations.
pub type NetCdfResult<T> = Result<T, NetCdfError>;

/// Error types for NetCDF reading and writing.
#[derive(Error, Debug)]
pub enum NetCdfError {
    /// Error reported by the netCDF library
    #[error("NetCDF error: {0}")]
    Library(#[from] netcdf::Error),

    /// Missing required variable or attribute
    #[error("Missing required data: {0}")]
    MissingData(String),

    /// Invalid data format
    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    /// The file content does not form a valid dataset
    #[error("Invalid dataset: {0}")]
    Dataset(#[from] kostra_grid::KostraError),
}
