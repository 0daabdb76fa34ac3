//! Self-describing gridded dataset.
//!
//! A small labelled-array container: named dimensions, coordinate variables,
//! data variables, attributes and per-variable output encoding. Null cells
//! are `NaN` in memory.

use std::collections::BTreeMap;

use ndarray::{Array1, ArrayD};
use serde::Serialize;

use crate::error::{KostraError, Result};

/// Dimension and coordinate names of the output dataset.
pub mod names {
    /// Accumulation duration (minutes)
    pub const DURATION: &str = "duration";
    /// Return period (years)
    pub const RETURN_PERIOD: &str = "returnPeriod";
    /// Grid row
    pub const Y: &str = "y";
    /// Grid column
    pub const X: &str = "x";
    /// Cell corner index of the bounds arrays
    pub const VERTEX: &str = "nv";
    pub const LON: &str = "lon";
    pub const LAT: &str = "lat";
    pub const LON_BOUNDS: &str = "lon_bnds";
    pub const LAT_BOUNDS: &str = "lat_bnds";
}

/// Attribute value attached to a variable or the dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttrValue {
    Text(String),
    Number(f64),
}

impl AttrValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Number(_) => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            Self::Text(_) => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

/// Ordered attribute map.
pub type Attributes = BTreeMap<String, AttrValue>;

/// Storage type of a variable in the output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DataType {
    Int32,
    Float64,
}

/// Fill-value handling on serialization.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub enum FillValue {
    /// Not decided; writers use the format's default behavior.
    #[default]
    Default,
    /// No fill value is declared. The variable must not contain nulls.
    None,
    /// Nulls are written as this value, which is declared as `_FillValue`.
    Value(f64),
}

/// Serialization hints of one variable.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Encoding {
    pub fill_value: FillValue,
}

/// A named N-dimensional array.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub dims: Vec<String>,
    pub data: ArrayD<f64>,
    pub dtype: DataType,
    pub attrs: Attributes,
    pub encoding: Encoding,
}

impl Variable {
    /// Create a variable; the array rank must match the number of dimensions.
    pub fn new(name: impl Into<String>, dims: &[&str], data: ArrayD<f64>) -> Result<Self> {
        let name = name.into();
        if data.ndim() != dims.len() {
            return Err(KostraError::InvalidConfig(format!(
                "variable {} has {} dimensions but data of rank {}",
                name,
                dims.len(),
                data.ndim()
            )));
        }
        Ok(Self {
            name,
            dims: dims.iter().map(|d| d.to_string()).collect(),
            data,
            dtype: DataType::Float64,
            attrs: Attributes::new(),
            encoding: Encoding::default(),
        })
    }

    /// One-dimensional integer coordinate named after its dimension.
    pub fn index_coordinate(name: &str, values: &[i64]) -> Self {
        let data = Array1::from_iter(values.iter().map(|&v| v as f64)).into_dyn();
        Self {
            name: name.to_string(),
            dims: vec![name.to_string()],
            data,
            dtype: DataType::Int32,
            attrs: Attributes::new(),
            encoding: Encoding::default(),
        }
    }

    pub fn with_attr(mut self, key: &str, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(key.to_string(), value.into());
        self
    }

    pub fn attr_text(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).and_then(AttrValue::as_text)
    }

    pub fn units(&self) -> Option<&str> {
        self.attr_text("units")
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// Number of null (`NaN`) cells.
    pub fn null_count(&self) -> usize {
        self.data.iter().filter(|v| v.is_nan()).count()
    }

    /// Values of a 1-D variable as integers.
    pub fn values_i64(&self) -> Vec<i64> {
        self.data.iter().map(|&v| v as i64).collect()
    }
}

/// A named dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dimension {
    pub name: String,
    pub len: usize,
}

/// The final aggregate written to the archival file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub dimensions: Vec<Dimension>,
    pub coordinates: Vec<Variable>,
    pub data_vars: Vec<Variable>,
    pub attrs: Attributes,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a dimension, or check the length of an existing one.
    pub fn add_dimension(&mut self, name: &str, len: usize) -> Result<()> {
        if let Some(existing) = self.dimension(name) {
            if existing.len != len {
                return Err(KostraError::coordinate_mismatch(
                    name,
                    format!("dimension length {} conflicts with {}", len, existing.len),
                ));
            }
            return Ok(());
        }

        self.dimensions.push(Dimension {
            name: name.to_string(),
            len,
        });
        Ok(())
    }

    pub fn dimension(&self, name: &str) -> Option<&Dimension> {
        self.dimensions.iter().find(|d| d.name == name)
    }

    pub fn add_coordinate(&mut self, var: Variable) -> Result<()> {
        self.check_dims(&var)?;
        self.coordinates.retain(|c| c.name != var.name);
        self.coordinates.push(var);
        Ok(())
    }

    pub fn add_data_var(&mut self, var: Variable) -> Result<()> {
        self.check_dims(&var)?;
        self.data_vars.retain(|v| v.name != var.name);
        self.data_vars.push(var);
        Ok(())
    }

    fn check_dims(&self, var: &Variable) -> Result<()> {
        for (dim, &len) in var.dims.iter().zip(var.data.shape()) {
            match self.dimension(dim) {
                Some(d) if d.len == len => {}
                Some(d) => {
                    return Err(KostraError::coordinate_mismatch(
                        dim.as_str(),
                        format!(
                            "variable {} has length {}, dimension has {}",
                            var.name, len, d.len
                        ),
                    ))
                }
                None => {
                    return Err(KostraError::coordinate_mismatch(
                        dim.as_str(),
                        format!("variable {} uses an undeclared dimension", var.name),
                    ))
                }
            }
        }
        Ok(())
    }

    pub fn coordinate(&self, name: &str) -> Option<&Variable> {
        self.coordinates.iter().find(|c| c.name == name)
    }

    pub fn coordinate_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.coordinates.iter_mut().find(|c| c.name == name)
    }

    pub fn data_var(&self, name: &str) -> Option<&Variable> {
        self.data_vars.iter().find(|v| v.name == name)
    }

    pub fn data_var_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.data_vars.iter_mut().find(|v| v.name == name)
    }

    /// Any variable, coordinates first.
    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.coordinate(name).or_else(|| self.data_var(name))
    }

    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.coordinates.iter().chain(self.data_vars.iter())
    }

    pub fn set_attr(&mut self, key: &str, value: impl Into<AttrValue>) {
        self.attrs.insert(key.to_string(), value.into());
    }

    /// Compact description for logs and the `inspect` command.
    pub fn summary(&self) -> DatasetSummary {
        DatasetSummary {
            dimensions: self.dimensions.clone(),
            variables: self
                .variables()
                .map(|v| VariableSummary {
                    name: v.name.clone(),
                    dims: v.dims.clone(),
                    shape: v.shape().to_vec(),
                    units: v.units().map(str::to_string),
                    null_count: v.null_count(),
                    fill_value: v.encoding.fill_value,
                })
                .collect(),
            attrs: self.attrs.clone(),
        }
    }
}

/// Serializable overview of a dataset.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary {
    pub dimensions: Vec<Dimension>,
    pub variables: Vec<VariableSummary>,
    pub attrs: Attributes,
}

#[derive(Debug, Clone, Serialize)]
pub struct VariableSummary {
    pub name: String,
    pub dims: Vec<String>,
    pub shape: Vec<usize>,
    pub units: Option<String>,
    pub null_count: usize,
    pub fill_value: FillValue,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn test_rank_must_match_dims() {
        let data = Array2::<f64>::zeros((2, 3)).into_dyn();
        assert!(Variable::new("v", &["y"], data.clone()).is_err());
        assert!(Variable::new("v", &["y", "x"], data).is_ok());
    }

    #[test]
    fn test_dimension_conflict() {
        let mut ds = Dataset::new();
        ds.add_dimension("x", 3).unwrap();
        ds.add_dimension("x", 3).unwrap();
        assert!(ds.add_dimension("x", 4).is_err());
    }

    #[test]
    fn test_variable_dims_are_checked() {
        let mut ds = Dataset::new();
        ds.add_dimension("x", 2).unwrap();

        let ok = Variable::index_coordinate("x", &[0, 1]);
        ds.add_coordinate(ok).unwrap();

        let wrong = Variable::index_coordinate("x", &[0, 1, 2]);
        assert!(ds.add_coordinate(wrong).is_err());

        let undeclared = Variable::index_coordinate("y", &[0]);
        assert!(ds.add_coordinate(undeclared).is_err());
    }

    #[test]
    fn test_summary_counts_nulls() {
        let mut ds = Dataset::new();
        ds.add_dimension("x", 3).unwrap();
        let data = ndarray::arr1(&[1.0, f64::NAN, 3.0]).into_dyn();
        ds.add_data_var(Variable::new("v", &["x"], data).unwrap().with_attr("units", "mm"))
            .unwrap();

        let summary = ds.summary();
        assert_eq!(summary.variables[0].null_count, 1);
        assert_eq!(summary.variables[0].units.as_deref(), Some("mm"));
    }
}
