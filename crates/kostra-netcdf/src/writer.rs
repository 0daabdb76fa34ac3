//! NetCDF-4 writer for merged datasets.

use std::path::Path;

use kostra_grid::{AttrValue, DataType, Dataset, FillValue, Variable};
use tracing::{debug, info};

use crate::error::{NetCdfError, NetCdfResult};
use crate::native::{silence_hdf5_errors, COORDINATES_ATTR, FILL_VALUE_ATTR};

/// Options for writing a dataset.
#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    /// Deflate level (1-9) for all variables. `None` writes uncompressed.
    pub compression_level: Option<u8>,
}

impl WriteOptions {
    /// Validate the options.
    pub fn validate(&self) -> Result<(), String> {
        match self.compression_level {
            Some(level) if !(1..=9).contains(&level) => {
                Err(format!("compression level must be 1-9, got {}", level))
            }
            _ => Ok(()),
        }
    }
}

/// Write a dataset to a new NetCDF-4 file, replacing any existing file.
///
/// Null cells of variables with `FillValue::Value(v)` are written as `v` and
/// `_FillValue` is declared. Data variables point at the 2-D `lon`/`lat`
/// coordinates through a `coordinates` attribute.
pub fn write_dataset(dataset: &Dataset, path: &Path, options: &WriteOptions) -> NetCdfResult<()> {
    options.validate().map_err(NetCdfError::InvalidFormat)?;
    silence_hdf5_errors();

    let mut file = netcdf::create(path).map_err(|e| {
        NetCdfError::InvalidFormat(format!("Failed to create {}: {}", path.display(), e))
    })?;

    for dim in &dataset.dimensions {
        file.add_dimension(&dim.name, dim.len)?;
    }

    for (key, value) in &dataset.attrs {
        match value {
            AttrValue::Text(s) => file.add_attribute(key, s.as_str())?,
            AttrValue::Number(v) => file.add_attribute(key, *v)?,
        };
    }

    let auxiliary = auxiliary_coordinates(dataset);
    for var in &dataset.coordinates {
        write_variable(&mut file, var, None, options)?;
    }
    for var in &dataset.data_vars {
        write_variable(&mut file, var, auxiliary.as_deref(), options)?;
    }

    info!(
        path = %path.display(),
        dimensions = dataset.dimensions.len(),
        variables = dataset.coordinates.len() + dataset.data_vars.len(),
        "Wrote NetCDF dataset"
    );

    Ok(())
}

/// Names of 2-D lon/lat coordinates, for the `coordinates` attribute.
fn auxiliary_coordinates(dataset: &Dataset) -> Option<String> {
    let names: Vec<&str> = dataset
        .coordinates
        .iter()
        .filter(|c| c.dims.len() > 1 && c.attrs.contains_key("standard_name"))
        .map(|c| c.name.as_str())
        .collect();
    (!names.is_empty()).then(|| names.join(" "))
}

fn write_variable(
    file: &mut netcdf::FileMut,
    var: &Variable,
    coordinates: Option<&str>,
    options: &WriteOptions,
) -> NetCdfResult<()> {
    let dims: Vec<&str> = var.dims.iter().map(String::as_str).collect();

    match var.dtype {
        DataType::Int32 => {
            let values = int_values(var)?;
            let mut nc_var = file.add_variable::<i32>(&var.name, &dims)?;
            if let Some(level) = options.compression_level {
                nc_var.set_compression(level as i32, true)?;
            }
            if let FillValue::Value(fill) = var.encoding.fill_value {
                nc_var.put_attribute(FILL_VALUE_ATTR, fill as i32)?;
            }
            put_attributes(&mut nc_var, var, coordinates)?;
            nc_var.put_values(&values, ..)?;
        }
        DataType::Float64 => {
            let values = float_values(var)?;
            let mut nc_var = file.add_variable::<f64>(&var.name, &dims)?;
            if let Some(level) = options.compression_level {
                nc_var.set_compression(level as i32, true)?;
            }
            if let FillValue::Value(fill) = var.encoding.fill_value {
                nc_var.put_attribute(FILL_VALUE_ATTR, fill)?;
            }
            put_attributes(&mut nc_var, var, coordinates)?;
            nc_var.put_values(&values, ..)?;
        }
    }

    debug!(
        variable = %var.name,
        dims = ?var.dims,
        fill_value = ?var.encoding.fill_value,
        "Wrote variable"
    );
    Ok(())
}

fn put_attributes(
    nc_var: &mut netcdf::VariableMut,
    var: &Variable,
    coordinates: Option<&str>,
) -> NetCdfResult<()> {
    for (key, value) in &var.attrs {
        match value {
            AttrValue::Text(s) => nc_var.put_attribute(key, s.as_str())?,
            AttrValue::Number(v) => nc_var.put_attribute(key, *v)?,
        };
    }
    if let Some(coordinates) = coordinates {
        nc_var.put_attribute(COORDINATES_ATTR, coordinates)?;
    }
    Ok(())
}

/// Values in row-major order with nulls replaced per the encoding.
fn float_values(var: &Variable) -> NetCdfResult<Vec<f64>> {
    match var.encoding.fill_value {
        FillValue::Value(fill) => Ok(var
            .data
            .iter()
            .map(|&v| if v.is_nan() { fill } else { v })
            .collect()),
        FillValue::None | FillValue::Default => Ok(var.data.iter().copied().collect()),
    }
}

fn int_values(var: &Variable) -> NetCdfResult<Vec<i32>> {
    let fill = match var.encoding.fill_value {
        FillValue::Value(fill) => Some(fill as i32),
        FillValue::None | FillValue::Default => None,
    };

    var.data
        .iter()
        .map(|&v| match (v.is_nan(), fill) {
            (false, _) => i32::try_from(v as i64).map_err(|_| {
                NetCdfError::InvalidFormat(format!(
                    "{} value {} does not fit into i32",
                    var.name, v
                ))
            }),
            (true, Some(fill)) => Ok(fill),
            (true, None) => Err(NetCdfError::InvalidFormat(format!(
                "integer variable {} contains nulls but declares no fill value",
                var.name
            ))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_replaces_nulls() {
        let mut var =
            Variable::new("HN", &["x"], ndarray::arr1(&[1.0, f64::NAN]).into_dyn()).unwrap();
        var.encoding.fill_value = FillValue::Value(1e20);
        assert_eq!(float_values(&var).unwrap(), vec![1.0, 1e20]);
    }

    #[test]
    fn test_integer_nulls_need_fill() {
        let mut var = Variable::index_coordinate("x", &[0, 1]);
        var.data[1] = f64::NAN;
        var.encoding.fill_value = FillValue::None;
        assert!(int_values(&var).is_err());
    }

    #[test]
    fn test_compression_level_range() {
        assert!(WriteOptions { compression_level: Some(4) }.validate().is_ok());
        assert!(WriteOptions { compression_level: Some(0) }.validate().is_err());
        assert!(WriteOptions::default().validate().is_ok());
    }
}
