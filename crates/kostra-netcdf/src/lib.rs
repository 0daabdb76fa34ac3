//! NetCDF-4 persistence for KOSTRA datasets.
//!
//! Writes a [`kostra_grid::Dataset`] as a CF-style NetCDF-4 file and reads
//! it back. The native netcdf library (libnetcdf/HDF5) does the I/O.
//!
//! # System requirements
//!
//! `libhdf5-dev` and `libnetcdf-dev` must be installed.

pub mod error;
pub mod native;
pub mod reader;
pub mod writer;

pub use error::{NetCdfError, NetCdfResult};
pub use native::silence_hdf5_errors;
pub use reader::read_dataset;
pub use writer::{write_dataset, WriteOptions};
