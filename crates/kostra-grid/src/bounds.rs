//! Cell geolocation annotation.
//!
//! Fills the center coordinates of every grid cell from the geolocation
//! table and attaches the four corner coordinates as CF bounds variables
//! `lon_bnds` / `lat_bnds` with dimensions (y, x, nv).

use ndarray::{Array2, Array3};
use tracing::debug;

use crate::dataset::{names, Dataset, Variable};
use crate::error::{KostraError, Result};
use crate::geo::{GeoRecord, GeoTable};

/// Number of corners per cell.
pub const VERTICES: usize = 4;

/// Set `lon` / `lat` of every (y, x) cell from the geolocation table.
///
/// Cells no table row reached are filled as well, so the center
/// coordinates never hold `NaN`. A value already set must agree with the
/// table.
pub fn fill_center_coordinates(dataset: &mut Dataset, geo: &GeoTable) -> Result<()> {
    let y = axis_values(dataset, names::Y)?;
    let x = axis_values(dataset, names::X)?;

    let mut lon = Array2::zeros((y.len(), x.len()));
    let mut lat = Array2::zeros((y.len(), x.len()));
    for (yi, row) in y.iter().enumerate() {
        for (xi, column) in x.iter().enumerate() {
            let record = locate(geo, *row, *column)?;
            lon[[yi, xi]] = record.center_lon;
            lat[[yi, xi]] = record.center_lat;
        }
    }

    let mut filled = 0usize;
    for (name, centers) in [(names::LON, lon), (names::LAT, lat)] {
        let var = dataset
            .coordinate_mut(name)
            .ok_or_else(|| KostraError::coordinate_mismatch(name, "coordinate is missing"))?;
        if var.data.shape() != centers.shape() {
            return Err(KostraError::coordinate_mismatch(
                name,
                format!("shape {:?} does not match the (y, x) grid", var.data.shape()),
            ));
        }

        for (value, center) in var.data.iter_mut().zip(centers.iter()) {
            if value.is_nan() {
                *value = *center;
                filled += 1;
            } else if *value != *center {
                return Err(KostraError::coordinate_mismatch(
                    name,
                    format!("{} disagrees with the geolocation table ({})", value, center),
                ));
            }
        }
    }

    debug!(filled = filled, "Filled center coordinates from geolocation");
    Ok(())
}

/// Add `lon_bnds` and `lat_bnds` to a merged dataset.
///
/// Every cell of the dataset grid must be in the geolocation table.
pub fn annotate_bounds(dataset: &mut Dataset, geo: &GeoTable) -> Result<()> {
    let y = axis_values(dataset, names::Y)?;
    let x = axis_values(dataset, names::X)?;

    let shape = (y.len(), x.len(), VERTICES);
    let mut lon_bnds = Array3::zeros(shape);
    let mut lat_bnds = Array3::zeros(shape);

    for (yi, row) in y.iter().enumerate() {
        for (xi, column) in x.iter().enumerate() {
            let record = locate(geo, *row, *column)?;
            for (v, (lon, lat)) in record.corners.iter().enumerate() {
                lon_bnds[[yi, xi, v]] = *lon;
                lat_bnds[[yi, xi, v]] = *lat;
            }
        }
    }

    dataset.add_dimension(names::VERTEX, VERTICES)?;
    let dims = [names::Y, names::X, names::VERTEX];
    dataset.add_coordinate(
        Variable::new(names::LON_BOUNDS, &dims, lon_bnds.into_dyn())?
            .with_attr("units", "degrees_east"),
    )?;
    dataset.add_coordinate(
        Variable::new(names::LAT_BOUNDS, &dims, lat_bnds.into_dyn())?
            .with_attr("units", "degrees_north"),
    )?;

    for (center, bounds) in [(names::LON, names::LON_BOUNDS), (names::LAT, names::LAT_BOUNDS)] {
        let var = dataset
            .coordinate_mut(center)
            .ok_or_else(|| KostraError::coordinate_mismatch(center, "coordinate is missing"))?;
        var.attrs.insert("bounds".to_string(), bounds.into());
    }

    debug!(rows = y.len(), columns = x.len(), "Annotated cell bounds");
    Ok(())
}

fn locate(geo: &GeoTable, y: i64, x: i64) -> Result<&GeoRecord> {
    geo.at(y, x)
        .ok_or(KostraError::MissingGeolocation { y, x })
}

fn axis_values(dataset: &Dataset, name: &str) -> Result<Vec<i64>> {
    dataset
        .coordinate(name)
        .map(|c| c.values_i64())
        .ok_or_else(|| KostraError::coordinate_mismatch(name, "axis is missing"))
}
