//! Output encoding of the merged dataset.

use tracing::debug;

use crate::dataset::{Dataset, FillValue};

/// Declare how nulls are written.
///
/// Data variables get `fill_value` as their `_FillValue`. Coordinate
/// variables, bounds included, are written without one. Array contents are
/// not touched.
pub fn finalize_encoding(dataset: &mut Dataset, fill_value: f64) {
    for var in &mut dataset.data_vars {
        var.encoding.fill_value = FillValue::Value(fill_value);
    }
    for coord in &mut dataset.coordinates {
        coord.encoding.fill_value = FillValue::None;
    }

    debug!(
        fill_value = fill_value,
        data_vars = dataset.data_vars.len(),
        coordinates = dataset.coordinates.len(),
        "Finalized encoding"
    );
}
