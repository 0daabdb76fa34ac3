//! Dimension merger.
//!
//! Turns the per-column grids of each source table into one array per
//! variable family with a `returnPeriod` axis, concatenates those arrays
//! across tables along `duration`, and finally joins both families into a
//! single [`Dataset`] sorted by duration.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::PathBuf;

use ndarray::{s, Array2, Array4, Axis};
use tracing::{debug, info, warn};

use crate::config::ArchiveSchema;
use crate::dataset::{names, Dataset, Variable};
use crate::error::{KostraError, Result};
use crate::grid::DurationGrid;

/// Long name of both precipitation-depth variables.
const DEPTH_LONG_NAME: &str = "Bemessungsniederschlagswert";

/// Variable family of a value column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    /// Plain precipitation depth (`HN_...`)
    Plain,
    /// Urban drainage variant (`..._KOG_...`)
    Urban,
}

impl Family {
    /// Output variable name of this family.
    pub fn variable_name<'a>(&self, schema: &'a ArchiveSchema) -> &'a str {
        match self {
            Self::Plain => &schema.plain_variable,
            Self::Urban => &schema.urban_variable,
        }
    }
}

/// One family of one or more tables, indexed by (duration, returnPeriod, y, x).
#[derive(Debug, Clone, PartialEq)]
pub struct FamilyGrid {
    pub family: Family,
    /// Duration axis (minutes) in concatenation order.
    pub durations: Vec<u32>,
    /// Return-period axis (years) in source column order.
    pub return_periods: Vec<u32>,
    pub y: Vec<i64>,
    pub x: Vec<i64>,
    pub data: Array4<f64>,
    pub lon: Array2<f64>,
    pub lat: Array2<f64>,
}

impl FamilyGrid {
    /// Reorder the return-period axis ascending.
    pub fn sort_return_periods(&mut self) {
        let mut order: Vec<usize> = (0..self.return_periods.len()).collect();
        order.sort_by_key(|&i| self.return_periods[i]);
        self.data = self.data.select(Axis(1), &order);
        self.return_periods = order.iter().map(|&i| self.return_periods[i]).collect();
    }

    /// Place the grid on wider row and column axes. New cells are `NaN`.
    ///
    /// `y` and `x` must contain every row and column of the grid.
    pub fn reindex(&self, y: &[i64], x: &[i64]) -> Result<FamilyGrid> {
        if self.y == y && self.x == x {
            return Ok(self.clone());
        }

        let y_pos = axis_positions(names::Y, &self.y, y)?;
        let x_pos = axis_positions(names::X, &self.x, x)?;

        let (nd, nr) = (self.durations.len(), self.return_periods.len());
        let mut data = Array4::from_elem((nd, nr, y.len(), x.len()), f64::NAN);
        let mut lon = Array2::from_elem((y.len(), x.len()), f64::NAN);
        let mut lat = Array2::from_elem((y.len(), x.len()), f64::NAN);

        for (sy, &dy) in y_pos.iter().enumerate() {
            for (sx, &dx) in x_pos.iter().enumerate() {
                data.slice_mut(s![.., .., dy, dx])
                    .assign(&self.data.slice(s![.., .., sy, sx]));
                lon[[dy, dx]] = self.lon[[sy, sx]];
                lat[[dy, dx]] = self.lat[[sy, sx]];
            }
        }

        Ok(FamilyGrid {
            family: self.family,
            durations: self.durations.clone(),
            return_periods: self.return_periods.clone(),
            y: y.to_vec(),
            x: x.to_vec(),
            data,
            lon,
            lat,
        })
    }
}

/// Families extracted from one source table.
#[derive(Debug, Clone, PartialEq)]
pub struct FileFamilies {
    pub source: PathBuf,
    pub plain: Option<FamilyGrid>,
    pub urban: Option<FamilyGrid>,
}

/// Classify a raw column name. `None` means the column belongs to no family.
pub fn classify_column(name: &str, schema: &ArchiveSchema) -> Option<Family> {
    if name.contains(&schema.urban_marker) {
        Some(Family::Urban)
    } else if name.contains(&schema.plain_marker) {
        Some(Family::Plain)
    } else {
        None
    }
}

/// Parse the return period from a column name.
///
/// The last four characters are three digits followed by a unit letter,
/// e.g. `HN_020A` is 20 years.
pub fn parse_return_period(name: &str) -> Result<u32> {
    let chars: Vec<char> = name.chars().collect();
    if chars.len() < 4 {
        return Err(KostraError::InvalidColumnName(name.to_string()));
    }

    let suffix = &chars[chars.len() - 4..];
    let (digits, unit) = (&suffix[..3], suffix[3]);
    if !digits.iter().all(char::is_ascii_digit) || !unit.is_ascii_alphabetic() {
        return Err(KostraError::InvalidColumnName(name.to_string()));
    }

    digits
        .iter()
        .collect::<String>()
        .parse()
        .map_err(|_| KostraError::InvalidColumnName(name.to_string()))
}

/// Merge the per-return-period columns of one grid into family arrays.
pub fn merge_return_periods(grid: DurationGrid, schema: &ArchiveSchema) -> Result<FileFamilies> {
    let mut plain = Vec::new();
    let mut urban = Vec::new();

    for column in grid.columns {
        let Some(family) = classify_column(&column.name, schema) else {
            warn!(
                path = %grid.source.display(),
                column = %column.name,
                "Dropping column that matches no variable family"
            );
            continue;
        };

        if (family == Family::Urban) != grid.is_urban_file {
            warn!(
                path = %grid.source.display(),
                column = %column.name,
                urban_file = grid.is_urban_file,
                "Column family disagrees with the file name variant"
            );
        }

        let years = parse_return_period(&column.name)?;
        match family {
            Family::Plain => plain.push((years, column.data)),
            Family::Urban => urban.push((years, column.data)),
        }
    }

    type Columns = Vec<(u32, ndarray::Array3<f64>)>;
    let build = |family: Family, columns: Columns| -> Result<Option<FamilyGrid>> {
        if columns.is_empty() {
            return Ok(None);
        }

        let return_periods: Vec<u32> = columns.iter().map(|(years, _)| *years).collect();
        let mut seen = HashSet::new();
        for years in &return_periods {
            if !seen.insert(*years) {
                return Err(KostraError::coordinate_mismatch(
                    names::RETURN_PERIOD,
                    format!("{} years listed twice in {}", years, grid.source.display()),
                ));
            }
        }

        let views: Vec<_> = columns.iter().map(|(_, data)| data.view()).collect();
        let data = ndarray::stack(Axis(1), &views)
            .map_err(|e| KostraError::coordinate_mismatch(names::RETURN_PERIOD, e.to_string()))?;

        debug!(
            path = %grid.source.display(),
            family = ?family,
            return_periods = ?return_periods,
            "Merged return-period columns"
        );

        Ok(Some(FamilyGrid {
            family,
            durations: grid.durations.clone(),
            return_periods,
            y: grid.y.clone(),
            x: grid.x.clone(),
            data,
            lon: grid.lon.clone(),
            lat: grid.lat.clone(),
        }))
    };

    let plain = build(Family::Plain, plain)?;
    let urban = build(Family::Urban, urban)?;

    Ok(FileFamilies {
        source: grid.source.clone(),
        plain,
        urban,
    })
}

/// Concatenate grids of one family along `duration`, in input order.
///
/// Rows and columns are outer-joined: a cell one table lacks is `NaN` for
/// that table's durations. Return periods must be identical and lon/lat
/// must agree where both grids know them.
pub fn concat_durations(grids: Vec<FamilyGrid>) -> Result<FamilyGrid> {
    let first = grids
        .first()
        .ok_or_else(|| KostraError::EmptyArchive("no grids to concatenate".to_string()))?;
    let (family, return_periods) = (first.family, first.return_periods.clone());

    for grid in &grids[1..] {
        if grid.family != family {
            return Err(KostraError::coordinate_mismatch(
                "family",
                format!("{:?} and {:?} cannot be concatenated", family, grid.family),
            ));
        }
        check_axis(names::RETURN_PERIOD, &return_periods, &grid.return_periods)?;
    }

    let mut durations = Vec::new();
    let mut seen = HashSet::new();
    for minutes in grids.iter().flat_map(|g| g.durations.iter()) {
        if !seen.insert(*minutes) {
            return Err(KostraError::DuplicateDuration {
                variable: format!("{:?}", family),
                duration: *minutes,
            });
        }
        durations.push(*minutes);
    }

    let (y, x) = union_axes(&grids);
    let mut lon = Array2::from_elem((y.len(), x.len()), f64::NAN);
    let mut lat = Array2::from_elem((y.len(), x.len()), f64::NAN);
    let mut parts = Vec::with_capacity(grids.len());
    for grid in &grids {
        let grid = grid.reindex(&y, &x)?;
        combine_coordinate(names::LON, &mut lon, &grid.lon)?;
        combine_coordinate(names::LAT, &mut lat, &grid.lat)?;
        parts.push(grid.data);
    }

    let views: Vec<_> = parts.iter().map(|p| p.view()).collect();
    let data = ndarray::concatenate(Axis(0), &views)
        .map_err(|e| KostraError::coordinate_mismatch(names::DURATION, e.to_string()))?;

    Ok(FamilyGrid {
        family,
        durations,
        return_periods,
        y,
        x,
        data,
        lon,
        lat,
    })
}

/// Join the two families into one dataset sorted by duration.
///
/// Durations, return periods, rows and columns are outer-joined;
/// combinations a family lacks are `NaN`.
pub fn merge_families(
    plain: Option<FamilyGrid>,
    urban: Option<FamilyGrid>,
    schema: &ArchiveSchema,
) -> Result<Dataset> {
    let families: Vec<FamilyGrid> = plain.into_iter().chain(urban).collect();
    if families.is_empty() {
        return Err(KostraError::EmptyArchive(
            "no variable family found".to_string(),
        ));
    }

    let (y, x) = union_axes(&families);
    let families = families
        .iter()
        .map(|grid| grid.reindex(&y, &x))
        .collect::<Result<Vec<_>>>()?;

    let mut lon = Array2::from_elem((y.len(), x.len()), f64::NAN);
    let mut lat = Array2::from_elem((y.len(), x.len()), f64::NAN);
    let mut durations: Vec<u32> = Vec::new();
    let mut return_periods: Vec<u32> = Vec::new();
    for grid in &families {
        combine_coordinate(names::LON, &mut lon, &grid.lon)?;
        combine_coordinate(names::LAT, &mut lat, &grid.lat)?;

        for d in &grid.durations {
            if !durations.contains(d) {
                durations.push(*d);
            }
        }
        // First-seen order; return periods are not sorted here.
        for rp in &grid.return_periods {
            if !return_periods.contains(rp) {
                return_periods.push(*rp);
            }
        }
    }
    durations.sort_unstable();

    let duration_index: HashMap<u32, usize> =
        durations.iter().enumerate().map(|(i, &d)| (d, i)).collect();
    let rp_index: HashMap<u32, usize> =
        return_periods.iter().enumerate().map(|(i, &r)| (r, i)).collect();

    let mut dataset = Dataset::new();
    dataset.add_dimension(names::DURATION, durations.len())?;
    dataset.add_dimension(names::RETURN_PERIOD, return_periods.len())?;
    dataset.add_dimension(names::Y, y.len())?;
    dataset.add_dimension(names::X, x.len())?;

    let duration_values: Vec<i64> = durations.iter().map(|&d| d as i64).collect();
    let rp_values: Vec<i64> = return_periods.iter().map(|&r| r as i64).collect();
    dataset.add_coordinate(
        Variable::index_coordinate(names::DURATION, &duration_values)
            .with_attr("units", "minutes")
            .with_attr("long_name", "duration level"),
    )?;
    dataset.add_coordinate(
        Variable::index_coordinate(names::RETURN_PERIOD, &rp_values)
            .with_attr("units", "years")
            .with_attr("long_name", "return period"),
    )?;
    dataset.add_coordinate(
        Variable::index_coordinate(names::Y, &y).with_attr("long_name", "grid row"),
    )?;
    dataset.add_coordinate(
        Variable::index_coordinate(names::X, &x).with_attr("long_name", "grid column"),
    )?;
    dataset.add_coordinate(
        Variable::new(names::LON, &[names::Y, names::X], lon.into_dyn())?
            .with_attr("units", "degrees_east")
            .with_attr("standard_name", "longitude")
            .with_attr("long_name", "longitude of cell center"),
    )?;
    dataset.add_coordinate(
        Variable::new(names::LAT, &[names::Y, names::X], lat.into_dyn())?
            .with_attr("units", "degrees_north")
            .with_attr("standard_name", "latitude")
            .with_attr("long_name", "latitude of cell center"),
    )?;

    let shape = (durations.len(), return_periods.len(), y.len(), x.len());
    for grid in families {
        let mut data = Array4::from_elem(shape, f64::NAN);
        for (src_d, minutes) in grid.durations.iter().enumerate() {
            let dst_d = duration_index[minutes];
            for (src_r, years) in grid.return_periods.iter().enumerate() {
                let dst_r = rp_index[years];
                data.slice_mut(s![dst_d, dst_r, .., ..])
                    .assign(&grid.data.slice(s![src_d, src_r, .., ..]));
            }
        }

        let name = grid.family.variable_name(schema);
        dataset.add_data_var(
            Variable::new(
                name,
                &[names::DURATION, names::RETURN_PERIOD, names::Y, names::X],
                data.into_dyn(),
            )?
            .with_attr("long_name", DEPTH_LONG_NAME)
            .with_attr("units", "mm"),
        )?;
    }

    info!(
        durations = ?durations,
        return_periods = ?return_periods,
        rows = y.len(),
        columns = x.len(),
        variables = dataset.data_vars.len(),
        "Merged variable families"
    );

    Ok(dataset)
}

/// Concatenate all tables per family and join the families.
pub fn combine(files: Vec<FileFamilies>, schema: &ArchiveSchema) -> Result<Dataset> {
    let mut plain = Vec::new();
    let mut urban = Vec::new();
    for file in files {
        plain.extend(file.plain);
        urban.extend(file.urban);
    }

    let plain = if plain.is_empty() {
        None
    } else {
        Some(concat_durations(plain)?)
    };
    let urban = if urban.is_empty() {
        None
    } else {
        Some(concat_durations(urban)?)
    };

    if plain.is_none() || urban.is_none() {
        warn!(
            plain = plain.is_some(),
            urban = urban.is_some(),
            "Archive provides only one variable family"
        );
    }

    merge_families(plain, urban, schema)
}

/// Sorted union of the row and column axes of several grids.
fn union_axes(grids: &[FamilyGrid]) -> (Vec<i64>, Vec<i64>) {
    let y: BTreeSet<i64> = grids.iter().flat_map(|g| g.y.iter().copied()).collect();
    let x: BTreeSet<i64> = grids.iter().flat_map(|g| g.x.iter().copied()).collect();
    (y.into_iter().collect(), x.into_iter().collect())
}

/// Position of every `source` value within `target`.
fn axis_positions(name: &str, source: &[i64], target: &[i64]) -> Result<Vec<usize>> {
    source
        .iter()
        .map(|v| {
            target.iter().position(|t| t == v).ok_or_else(|| {
                KostraError::coordinate_mismatch(name, format!("{} is not on the target axis", v))
            })
        })
        .collect()
}

fn check_axis<T: PartialEq + std::fmt::Debug>(
    name: &str,
    expected: &[T],
    found: &[T],
) -> Result<()> {
    if expected != found {
        return Err(KostraError::coordinate_mismatch(
            name,
            format!("expected {:?}, found {:?}", expected, found),
        ));
    }
    Ok(())
}

/// Fill gaps of `target` from `other`; overlapping values must agree.
fn combine_coordinate(name: &str, target: &mut Array2<f64>, other: &Array2<f64>) -> Result<()> {
    if target.shape() != other.shape() {
        return Err(KostraError::coordinate_mismatch(
            name,
            format!("shape {:?} differs from {:?}", target.shape(), other.shape()),
        ));
    }

    for ((idx, t), &o) in target.indexed_iter_mut().zip(other.iter()) {
        if o.is_nan() {
            continue;
        }
        if t.is_nan() {
            *t = o;
        } else if *t != o {
            return Err(KostraError::coordinate_mismatch(
                name,
                format!("cell {:?} is {} in one grid and {} in another", idx, t, o),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridColumn;
    use ndarray::Array3;

    fn grid(path: &str, minutes: u32, columns: &[(&str, f64)], urban: bool) -> DurationGrid {
        DurationGrid {
            source: PathBuf::from(path),
            is_urban_file: urban,
            durations: vec![minutes],
            y: vec![0, 1],
            x: vec![0, 1, 2],
            columns: columns
                .iter()
                .map(|(name, value)| GridColumn {
                    name: name.to_string(),
                    data: Array3::from_elem((1, 2, 3), *value),
                })
                .collect(),
            lon: Array2::from_shape_fn((2, 3), |(_, x)| 6.0 + x as f64),
            lat: Array2::from_shape_fn((2, 3), |(y, _)| 50.0 + y as f64),
        }
    }

    #[test]
    fn test_classify_column() {
        let schema = ArchiveSchema::default();
        assert_eq!(classify_column("HN_005A", &schema), Some(Family::Plain));
        assert_eq!(classify_column("HN_KOG_005A", &schema), Some(Family::Urban));
        assert_eq!(classify_column("KOG_005A", &schema), Some(Family::Urban));
        assert_eq!(classify_column("UC_005A", &schema), None);
    }

    #[test]
    fn test_parse_return_period() {
        assert_eq!(parse_return_period("HN_001A").unwrap(), 1);
        assert_eq!(parse_return_period("HN_KOG_100A").unwrap(), 100);
        assert!(parse_return_period("HN").is_err());
        assert!(parse_return_period("HN_10A").is_err());
        assert!(parse_return_period("HN_0100").is_err());
    }

    #[test]
    fn test_return_period_axis_keeps_source_order() {
        let g = grid(
            "a_b_D015.csv",
            15,
            &[("HN_020A", 20.0), ("HN_001A", 1.0), ("HN_005A", 5.0)],
            false,
        );
        let families = merge_return_periods(g, &ArchiveSchema::default()).unwrap();
        let plain = families.plain.unwrap();

        assert!(families.urban.is_none());
        assert_eq!(plain.return_periods, vec![20, 1, 5]);
        assert_eq!(plain.data.shape(), &[1, 3, 2, 3]);
        assert_eq!(plain.data[[0, 1, 1, 2]], 1.0);

        let mut sorted = plain.clone();
        sorted.sort_return_periods();
        assert_eq!(sorted.return_periods, vec![1, 5, 20]);
        assert_eq!(sorted.data[[0, 2, 0, 0]], 20.0);
    }

    #[test]
    fn test_unclassified_columns_are_dropped() {
        let g = grid("a_b_D015.csv", 15, &[("HN_001A", 1.0), ("QUALITY", 0.0)], false);
        let families = merge_return_periods(g, &ArchiveSchema::default()).unwrap();
        assert_eq!(families.plain.unwrap().return_periods, vec![1]);
    }

    #[test]
    fn test_both_families_in_one_file() {
        let g = grid(
            "a_b_D015_KOG.csv",
            15,
            &[("HN_001A", 1.0), ("HN_KOG_001A", 1.5), ("HN_KOG_005A", 5.5)],
            true,
        );
        let families = merge_return_periods(g, &ArchiveSchema::default()).unwrap();
        assert_eq!(families.plain.unwrap().return_periods, vec![1]);
        assert_eq!(families.urban.unwrap().return_periods, vec![1, 5]);
    }

    #[test]
    fn test_family_column_without_suffix_is_fatal() {
        let g = grid("a_b_D015.csv", 15, &[("HN_TOTAL", 1.0)], false);
        assert!(matches!(
            merge_return_periods(g, &ArchiveSchema::default()),
            Err(KostraError::InvalidColumnName(_))
        ));
    }

    fn family(minutes: u32, rps: &[u32], value: f64) -> FamilyGrid {
        FamilyGrid {
            family: Family::Plain,
            durations: vec![minutes],
            return_periods: rps.to_vec(),
            y: vec![0, 1],
            x: vec![0, 1, 2],
            data: Array4::from_elem((1, rps.len(), 2, 3), value),
            lon: Array2::from_elem((2, 3), 6.0),
            lat: Array2::from_elem((2, 3), 50.0),
        }
    }

    #[test]
    fn test_concat_keeps_input_order() {
        let merged = concat_durations(vec![family(60, &[1, 5], 6.0), family(15, &[1, 5], 1.5)])
            .unwrap();
        assert_eq!(merged.durations, vec![60, 15]);
        assert_eq!(merged.data.shape(), &[2, 2, 2, 3]);
        assert_eq!(merged.data[[1, 0, 0, 0]], 1.5);
    }

    #[test]
    fn test_concat_rejects_return_period_mismatch() {
        let err = concat_durations(vec![family(15, &[1, 5], 1.0), family(60, &[1, 10], 1.0)])
            .unwrap_err();
        assert!(matches!(err, KostraError::CoordinateMismatch { .. }));
    }

    #[test]
    fn test_concat_rejects_duplicate_duration() {
        let err = concat_durations(vec![family(15, &[1], 1.0), family(15, &[1], 2.0)]).unwrap_err();
        assert!(matches!(err, KostraError::DuplicateDuration { duration: 15, .. }));
    }

    #[test]
    fn test_concat_outer_joins_rows_and_columns() {
        let mut other = family(60, &[1], 2.0);
        other.x = vec![0, 1, 3];
        other.y = vec![1, 2];

        let merged = concat_durations(vec![family(15, &[1], 1.0), other]).unwrap();
        assert_eq!(merged.y, vec![0, 1, 2]);
        assert_eq!(merged.x, vec![0, 1, 2, 3]);
        assert_eq!(merged.data.shape(), &[2, 1, 3, 4]);

        assert_eq!(merged.data[[0, 0, 0, 2]], 1.0);
        assert!(merged.data[[0, 0, 2, 3]].is_nan());
        assert_eq!(merged.data[[1, 0, 2, 3]], 2.0);
        assert!(merged.data[[1, 0, 0, 0]].is_nan());
        assert!(merged.data[[1, 0, 1, 2]].is_nan());

        assert_eq!(merged.lon[[2, 3]], 6.0);
        assert_eq!(merged.lon[[0, 2]], 6.0);
        assert!(merged.lon[[0, 3]].is_nan());
    }

    #[test]
    fn test_concat_rejects_conflicting_coordinates() {
        let mut other = family(60, &[1], 1.0);
        other.lon[[1, 1]] = 7.5;
        let err = concat_durations(vec![family(15, &[1], 1.0), other]).unwrap_err();
        assert!(matches!(err, KostraError::CoordinateMismatch { .. }));
    }

    #[test]
    fn test_reindex_keeps_values_and_fills_gaps() {
        let grid = family(15, &[1, 5], 3.0);
        let wide = grid.reindex(&[0, 1], &[-1, 0, 1, 2]).unwrap();
        assert_eq!(wide.data.shape(), &[1, 2, 2, 4]);
        assert!(wide.data[[0, 1, 0, 0]].is_nan());
        assert_eq!(wide.data[[0, 1, 1, 3]], 3.0);
        assert!(wide.lat[[1, 0]].is_nan());

        assert!(grid.reindex(&[0], &[0, 1, 2]).is_err());
    }

    #[test]
    fn test_merge_outer_joins_family_extents() {
        let plain = family(15, &[1], 1.0);
        let mut urban = family(15, &[1], 2.0);
        urban.family = Family::Urban;
        urban.x = vec![1, 2, 3];

        let ds = merge_families(Some(plain), Some(urban), &ArchiveSchema::default()).unwrap();
        assert_eq!(ds.coordinate("x").unwrap().values_i64(), vec![0, 1, 2, 3]);

        let hn = ds.data_var("HN").unwrap();
        assert!(hn.data[[0, 0, 0, 3]].is_nan());
        let kog = ds.data_var("HN_KOG").unwrap();
        assert!(kog.data[[0, 0, 0, 0]].is_nan());
        assert_eq!(kog.data[[0, 0, 1, 3]], 2.0);
    }

    #[test]
    fn test_merge_sorts_durations_and_outer_joins() {
        let plain = concat_durations(vec![family(60, &[1, 5], 6.0), family(15, &[1, 5], 1.5)])
            .unwrap();
        let mut urban = family(15, &[1, 5], 2.0);
        urban.family = Family::Urban;

        let ds = merge_families(Some(plain), Some(urban), &ArchiveSchema::default()).unwrap();

        assert_eq!(ds.coordinate("duration").unwrap().values_i64(), vec![15, 60]);
        assert_eq!(ds.coordinate("returnPeriod").unwrap().values_i64(), vec![1, 5]);

        let hn = ds.data_var("HN").unwrap();
        assert_eq!(hn.shape(), &[2, 2, 2, 3]);
        assert_eq!(hn.data[[0, 0, 0, 0]], 1.5);
        assert_eq!(hn.data[[1, 1, 1, 2]], 6.0);

        let kog = ds.data_var("HN_KOG").unwrap();
        assert_eq!(kog.data[[0, 1, 0, 0]], 2.0);
        assert!(kog.data[[1, 0, 0, 0]].is_nan());
        assert_eq!(kog.units(), Some("mm"));
    }

    #[test]
    fn test_merge_without_families_fails() {
        assert!(matches!(
            merge_families(None, None, &ArchiveSchema::default()),
            Err(KostraError::EmptyArchive(_))
        ));
    }
}
