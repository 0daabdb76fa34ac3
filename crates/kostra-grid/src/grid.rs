//! Grid builder: pivots a flat table into dense (duration, y, x) arrays.
//!
//! The flat table is sparse: it only lists the cells present in the file.
//! Pivoting densifies it explicitly. Every (duration, y, x) combination on
//! the observed axes gets a slot, and slots without a row stay `NaN`.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::PathBuf;

use ndarray::{Array, Array2, Array3, Dimension};
use tracing::{debug, warn};

use crate::config::ArchiveSchema;
use crate::error::{KostraError, Result};
use crate::metadata::parse_duration_label;
use crate::table::{CellLocation, FlatTable};

/// One raw value column pivoted onto the grid.
#[derive(Debug, Clone, PartialEq)]
pub struct GridColumn {
    /// Raw column name, e.g. `HN_020A`.
    pub name: String,
    /// Values indexed by (duration, y, x).
    pub data: Array3<f64>,
}

/// Output of the grid builder for one source table.
#[derive(Debug, Clone, PartialEq)]
pub struct DurationGrid {
    pub source: PathBuf,
    /// Urban flag decoded from the file name.
    pub is_urban_file: bool,
    /// Duration axis in minutes, ascending.
    pub durations: Vec<u32>,
    /// Row axis, ascending.
    pub y: Vec<i64>,
    /// Column axis, ascending.
    pub x: Vec<i64>,
    /// Value columns in source order.
    pub columns: Vec<GridColumn>,
    /// Cell-center longitude, indexed by (y, x).
    pub lon: Array2<f64>,
    /// Cell-center latitude, indexed by (y, x).
    pub lat: Array2<f64>,
}

impl DurationGrid {
    /// Grid shape as (durations, rows, columns).
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.durations.len(), self.y.len(), self.x.len())
    }

    pub fn column(&self, name: &str) -> Option<&GridColumn> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// True if `value` is the missing-data sentinel.
pub fn is_sentinel(value: f64, sentinel: f64) -> bool {
    (value - sentinel).abs() <= 1e-9 * sentinel.abs().max(1.0)
}

/// Replace sentinel values with `NaN`. Applying it twice changes nothing.
pub fn mask_sentinel<D: Dimension>(array: &mut Array<f64, D>, sentinel: f64) {
    array.mapv_inplace(|v| if is_sentinel(v, sentinel) { f64::NAN } else { v });
}

/// Pivot a flat table into a dense grid.
pub fn build_grid(table: FlatTable, schema: &ArchiveSchema) -> Result<DurationGrid> {
    let source = table.metadata.path.clone();

    // Duration labels to minutes, ascending by minutes.
    let mut durations: BTreeMap<u32, usize> = BTreeMap::new();
    let mut label_minutes: HashMap<String, u32> = HashMap::new();
    for row in &table.rows {
        if !label_minutes.contains_key(&row.duration) {
            let minutes = parse_duration_label(&row.duration)?;
            label_minutes.insert(row.duration.clone(), minutes);
            durations.insert(minutes, 0);
        }
    }
    for (i, slot) in durations.values_mut().enumerate() {
        *slot = i;
    }

    let placed: Vec<_> = table.rows.iter().filter(|r| r.location.is_some()).collect();
    let skipped = table.rows.len() - placed.len();
    if skipped > 0 {
        warn!(
            path = %source.display(),
            skipped = skipped,
            "Rows without geolocation cannot be placed on the grid"
        );
    }

    if placed.is_empty() {
        return Err(KostraError::EmptyArchive(format!(
            "{} has no geolocated rows",
            source.display()
        )));
    }

    let y: Vec<i64> = placed
        .iter()
        .filter_map(|r| r.location.map(|l| l.y))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let x: Vec<i64> = placed
        .iter()
        .filter_map(|r| r.location.map(|l| l.x))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let y_index: HashMap<i64, usize> = y.iter().enumerate().map(|(i, &v)| (v, i)).collect();
    let x_index: HashMap<i64, usize> = x.iter().enumerate().map(|(i, &v)| (v, i)).collect();

    let shape = (durations.len(), y.len(), x.len());
    let mut columns: Vec<GridColumn> = table
        .value_columns
        .iter()
        .map(|name| GridColumn {
            name: name.clone(),
            data: Array3::from_elem(shape, f64::NAN),
        })
        .collect();
    let mut filled = Array3::from_elem(shape, false);
    let mut lon = Array2::from_elem((y.len(), x.len()), f64::NAN);
    let mut lat = Array2::from_elem((y.len(), x.len()), f64::NAN);

    for row in placed {
        let Some(location) = row.location else {
            continue;
        };
        let minutes = label_minutes[&row.duration];
        let d = durations[&minutes];
        let (yi, xi) = (y_index[&location.y], x_index[&location.x]);

        if filled[[d, yi, xi]] {
            return Err(KostraError::DuplicateCell {
                path: source.clone(),
                duration: minutes,
                y: location.y,
                x: location.x,
            });
        }
        filled[[d, yi, xi]] = true;

        for (column, &value) in columns.iter_mut().zip(&row.values) {
            column.data[[d, yi, xi]] = value;
        }

        // Collapse the per-row lon/lat copies onto (y, x).
        collapse_coordinate(&mut lon[[yi, xi]], location.lon, &location)?;
        collapse_coordinate(&mut lat[[yi, xi]], location.lat, &location)?;
    }

    for column in &mut columns {
        mask_sentinel(&mut column.data, schema.sentinel);
    }

    let durations: Vec<u32> = durations.into_keys().collect();

    debug!(
        path = %source.display(),
        durations = ?durations,
        rows = y.len(),
        columns = x.len(),
        variables = columns.len(),
        "Built duration grid"
    );

    Ok(DurationGrid {
        source,
        is_urban_file: table.metadata.is_urban_variant,
        durations,
        y,
        x,
        columns,
        lon,
        lat,
    })
}

fn collapse_coordinate(slot: &mut f64, value: f64, location: &CellLocation) -> Result<()> {
    if slot.is_nan() {
        *slot = value;
        return Ok(());
    }
    if *slot != value {
        return Err(KostraError::InconsistentCoordinates {
            y: location.y,
            x: location.x,
        });
    }
    Ok(())
}
