//! NetCDF reader for datasets written by [`write_dataset`](crate::write_dataset).

use std::collections::HashSet;
use std::path::Path;

use kostra_grid::{DataType, Dataset, FillValue, Variable};
use ndarray::{ArrayD, IxDyn};
use netcdf::types::NcVariableType;
use tracing::debug;

use crate::error::{NetCdfError, NetCdfResult};
use crate::native::{
    collect_attributes, get_f64_attr, get_str_attr, silence_hdf5_errors, BOUNDS_ATTR,
    COORDINATES_ATTR, FILL_VALUE_ATTR,
};

/// Read a NetCDF file into a [`Dataset`].
///
/// Values equal to a variable's `_FillValue` become `NaN`. A variable is a
/// coordinate if it is a dimension variable, is named in a `coordinates`
/// attribute, or is referenced by a `bounds` attribute.
pub fn read_dataset(path: &Path) -> NetCdfResult<Dataset> {
    silence_hdf5_errors();

    if !path.is_file() {
        return Err(NetCdfError::MissingData(format!("{} does not exist", path.display())));
    }

    let file = netcdf::open(path)
        .map_err(|e| NetCdfError::InvalidFormat(format!("Failed to open NetCDF: {}", e)))?;

    let mut dataset = Dataset::new();
    for dim in file.dimensions() {
        dataset.add_dimension(&dim.name(), dim.len())?;
    }
    dataset.attrs = collect_attributes(file.attributes(), &[]);

    let dimension_names: HashSet<String> = file.dimensions().map(|d| d.name()).collect();
    let mut coordinate_names = dimension_names.clone();
    for var in file.variables() {
        if let Some(listed) = get_str_attr(&var, COORDINATES_ATTR) {
            coordinate_names.extend(listed.split_whitespace().map(str::to_string));
        }
        if let Some(bounds) = get_str_attr(&var, BOUNDS_ATTR) {
            coordinate_names.insert(bounds);
        }
    }

    for nc_var in file.variables() {
        let var = read_variable(&nc_var)?;
        if coordinate_names.contains(&var.name) {
            dataset.add_coordinate(var)?;
        } else {
            dataset.add_data_var(var)?;
        }
    }

    debug!(
        path = %path.display(),
        coordinates = dataset.coordinates.len(),
        data_vars = dataset.data_vars.len(),
        "Read NetCDF dataset"
    );

    Ok(dataset)
}

fn read_variable(nc_var: &netcdf::Variable) -> NetCdfResult<Variable> {
    let name = nc_var.name();
    let dims: Vec<String> = nc_var.dimensions().iter().map(|d| d.name()).collect();
    let shape: Vec<usize> = nc_var.dimensions().iter().map(|d| d.len()).collect();

    let dtype = match nc_var.vartype() {
        NcVariableType::Int(_) => DataType::Int32,
        _ => DataType::Float64,
    };

    // The library converts integer storage to f64 on read.
    let mut values: Vec<f64> = nc_var
        .get_values(..)
        .map_err(|e| NetCdfError::InvalidFormat(format!("Failed to read {}: {}", name, e)))?;

    let fill_value = match get_f64_attr(nc_var, FILL_VALUE_ATTR) {
        Some(fill) => {
            for v in values.iter_mut().filter(|v| **v == fill) {
                *v = f64::NAN;
            }
            FillValue::Value(fill)
        }
        None => FillValue::None,
    };

    let data = ArrayD::from_shape_vec(IxDyn(&shape), values)
        .map_err(|e| NetCdfError::InvalidFormat(format!("{}: {}", name, e)))?;

    let dim_refs: Vec<&str> = dims.iter().map(String::as_str).collect();
    let mut var = Variable::new(name.as_str(), &dim_refs, data)?;
    var.dtype = dtype;
    var.encoding.fill_value = fill_value;
    var.attrs = collect_attributes(nc_var.attributes(), &[FILL_VALUE_ATTR, COORDINATES_ATTR]);

    Ok(var)
}
