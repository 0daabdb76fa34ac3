//! Thin helpers over the native netcdf library.

use std::sync::Once;

use kostra_grid::{AttrValue, Attributes};
use netcdf::AttributeValue;

/// Attributes the reader interprets itself instead of copying.
pub(crate) const FILL_VALUE_ATTR: &str = "_FillValue";
pub(crate) const COORDINATES_ATTR: &str = "coordinates";
pub(crate) const BOUNDS_ATTR: &str = "bounds";

/// Silence HDF5's automatic error printing to stderr.
///
/// The HDF5 C library prints verbose error messages to stderr even when errors
/// are handled gracefully by the Rust code (e.g., when checking for optional
/// attributes that don't exist). This creates confusing log spam like:
///
/// ```text
/// HDF5-DIAG: Error detected in HDF5 (1.10.8) thread 3:
///   #003: ../../../src/H5Adense.c line 397 in H5A__dense_open(): can't locate attribute in name index
/// ```
///
/// Call it once early in `main()`. Repeated calls are no-ops.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 is thread-safe and we're passing null pointers
        // to disable error output, which is a documented valid use.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

/// Check if a variable has an attribute with the given name.
/// This avoids HDF5 error spam when checking for optional attributes.
pub(crate) fn has_attr(var: &netcdf::Variable, name: &str) -> bool {
    var.attributes().any(|attr| attr.name() == name)
}

/// Helper to get an f64 attribute.
pub(crate) fn get_f64_attr(var: &netcdf::Variable, name: &str) -> Option<f64> {
    if !has_attr(var, name) {
        return None;
    }
    let attr_value = var.attribute_value(name)?.ok()?;
    f64::try_from(attr_value).ok()
}

/// Helper to get a text attribute.
pub(crate) fn get_str_attr(var: &netcdf::Variable, name: &str) -> Option<String> {
    if !has_attr(var, name) {
        return None;
    }
    match var.attribute_value(name)?.ok()? {
        AttributeValue::Str(s) => Some(s),
        _ => None,
    }
}

/// Convert a stored attribute. Array-valued attributes are not supported.
pub(crate) fn to_attr_value(value: AttributeValue) -> Option<AttrValue> {
    match value {
        AttributeValue::Str(s) => Some(AttrValue::Text(s)),
        other => f64::try_from(other).ok().map(AttrValue::Number),
    }
}

/// Copy all attributes of an iterator, skipping the ones in `skip`.
pub(crate) fn collect_attributes<'a>(
    attrs: impl Iterator<Item = netcdf::Attribute<'a>>,
    skip: &[&str],
) -> Attributes {
    attrs
        .filter(|attr| !skip.contains(&attr.name()))
        .filter_map(|attr| {
            let name = attr.name().to_string();
            let value = attr.value().ok().and_then(to_attr_value)?;
            Some((name, value))
        })
        .collect()
}
