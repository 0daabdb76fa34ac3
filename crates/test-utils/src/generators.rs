//! Deterministic value generators for synthetic archives.
//!
//! Every generated value can be recomputed from its indices, so tests can
//! check any output cell without keeping the input around.

/// Grid spacing of the synthetic archive in degrees.
pub const CELL_SIZE_DEG: f64 = 0.1;

/// Longitude of the western-most cell center.
pub const ORIGIN_LON: f64 = 6.0;

/// Latitude of the southern-most cell center.
pub const ORIGIN_LAT: f64 = 47.5;

/// Predictable precipitation depth in mm.
///
/// The value is `minutes + years / 1000 + row / 100 + col / 10000`, which
/// keeps every index readable from the number:
///
/// ```
/// use test_utils::precipitation_depth;
///
/// assert_eq!(precipitation_depth(15, 5, 0, 0), 15.005);
/// ```
pub fn precipitation_depth(minutes: u32, years: u32, row: i64, col: i64) -> f64 {
    let raw = minutes as f64 + years as f64 / 1000.0 + row as f64 / 100.0 + col as f64 / 10000.0;
    // Round to the precision written to the CSV.
    (raw * 1e6).round() / 1e6
}

/// Cell-center longitude of a grid column.
pub fn cell_lon(col: i64) -> f64 {
    ORIGIN_LON + col as f64 * CELL_SIZE_DEG
}

/// Cell-center latitude of a grid row.
pub fn cell_lat(row: i64) -> f64 {
    ORIGIN_LAT + row as f64 * CELL_SIZE_DEG
}

/// Corner coordinates (lon, lat) of a cell, counter-clockwise from south-west.
pub fn cell_corners(row: i64, col: i64) -> [(f64, f64); 4] {
    let (lon, lat) = (cell_lon(col), cell_lat(row));
    let h = CELL_SIZE_DEG / 2.0;
    [
        (lon - h, lat - h),
        (lon + h, lat - h),
        (lon + h, lat + h),
        (lon - h, lat + h),
    ]
}
