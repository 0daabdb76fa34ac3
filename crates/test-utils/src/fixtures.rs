//! Synthetic KOSTRA archives.
//!
//! [`SyntheticArchive`] writes a geolocation CSV and any number of
//! per-duration tables into a temporary directory, using the file naming and
//! column layout of the real archive. Values come from
//! [`precipitation_depth`](crate::precipitation_depth).

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::generators::{cell_corners, cell_lat, cell_lon, precipitation_depth};

/// Missing-data sentinel of the archive.
pub const SENTINEL: f64 = -99.9;

/// Header of the geolocation CSV.
pub const GEO_HEADER: &str =
    "INDEX_RC;Row;Col;X_CENT_GEO;Y_CENT_GEO;X1_GEO;Y1_GEO;X2_GEO;Y2_GEO;X3_GEO;Y3_GEO;X4_GEO;Y4_GEO";

/// Description of one per-duration table.
#[derive(Debug, Clone)]
pub struct TableSpec {
    pub minutes: u32,
    /// Write the `_KOG` file name variant with urban columns
    pub urban: bool,
    /// Return periods in column order
    pub return_periods: Vec<u32>,
    /// Cells left out of the file
    pub missing_cells: Vec<(i64, i64)>,
    /// Cells written as the sentinel
    pub sentinel_cells: Vec<(i64, i64)>,
    /// Extra columns that match no variable family
    pub extra_columns: Vec<String>,
}

impl TableSpec {
    pub fn plain(minutes: u32, return_periods: &[u32]) -> Self {
        Self {
            minutes,
            urban: false,
            return_periods: return_periods.to_vec(),
            missing_cells: Vec::new(),
            sentinel_cells: Vec::new(),
            extra_columns: Vec::new(),
        }
    }

    pub fn urban(minutes: u32, return_periods: &[u32]) -> Self {
        Self {
            urban: true,
            ..Self::plain(minutes, return_periods)
        }
    }

    pub fn with_missing(mut self, row: i64, col: i64) -> Self {
        self.missing_cells.push((row, col));
        self
    }

    pub fn with_sentinel(mut self, row: i64, col: i64) -> Self {
        self.sentinel_cells.push((row, col));
        self
    }

    pub fn with_extra_column(mut self, name: &str) -> Self {
        self.extra_columns.push(name.to_string());
        self
    }

    /// File name following the archive scheme, e.g. `StatRR_KOSTRA-DWD-2020_D015_KOG.csv`.
    pub fn file_name(&self) -> String {
        let variant = if self.urban { "_KOG" } else { "" };
        format!("StatRR_KOSTRA-DWD-2020_D{:03}{}.csv", self.minutes, variant)
    }

    /// Column name of one return period.
    pub fn column_name(&self, years: u32) -> String {
        if self.urban {
            format!("HN_KOG_{:03}A", years)
        } else {
            format!("HN_{:03}A", years)
        }
    }
}

/// A geolocation table and per-duration tables in a temporary directory.
pub struct SyntheticArchive {
    dir: TempDir,
    pub rows: i64,
    pub cols: i64,
}

impl SyntheticArchive {
    /// Create an empty archive covering `rows` x `cols` cells.
    pub fn new(rows: i64, cols: i64) -> std::io::Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir()?,
            rows,
            cols,
        })
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Cell index of a grid position.
    pub fn cell_index(&self, row: i64, col: i64) -> i64 {
        (row + 1) * 1000 + col + 1
    }

    /// Write `geo.csv` covering every cell.
    pub fn write_geo_table(&self) -> std::io::Result<PathBuf> {
        self.write_geo_table_without(&[])
    }

    /// Write `geo.csv` leaving out some cells.
    pub fn write_geo_table_without(&self, skip: &[(i64, i64)]) -> std::io::Result<PathBuf> {
        let path = self.root().join("geo.csv");
        let mut file = fs::File::create(&path)?;
        writeln!(file, "{}", GEO_HEADER)?;

        for row in 0..self.rows {
            for col in 0..self.cols {
                if skip.contains(&(row, col)) {
                    continue;
                }
                let corners = cell_corners(row, col);
                write!(
                    file,
                    "{};{};{};{};{}",
                    self.cell_index(row, col),
                    row,
                    col,
                    cell_lon(col),
                    cell_lat(row)
                )?;
                for (lon, lat) in corners {
                    write!(file, ";{};{}", lon, lat)?;
                }
                writeln!(file)?;
            }
        }

        Ok(path)
    }

    /// Write one per-duration table into `tables/`.
    pub fn write_table(&self, spec: &TableSpec) -> std::io::Result<PathBuf> {
        let dir = self.root().join("tables");
        fs::create_dir_all(&dir)?;
        let path = dir.join(spec.file_name());
        let mut file = fs::File::create(&path)?;

        let mut header = vec!["INDEX_RC".to_string()];
        header.extend(spec.return_periods.iter().map(|&y| spec.column_name(y)));
        header.extend(spec.extra_columns.iter().cloned());
        writeln!(file, "{}", header.join(";"))?;

        for row in 0..self.rows {
            for col in 0..self.cols {
                if spec.missing_cells.contains(&(row, col)) {
                    continue;
                }
                let sentinel = spec.sentinel_cells.contains(&(row, col));
                let mut fields = vec![self.cell_index(row, col).to_string()];
                for &years in &spec.return_periods {
                    let value = if sentinel {
                        SENTINEL
                    } else {
                        precipitation_depth(spec.minutes, years, row, col)
                    };
                    fields.push(value.to_string());
                }
                fields.extend(spec.extra_columns.iter().map(|_| "0".to_string()));
                writeln!(file, "{}", fields.join(";"))?;
            }
        }

        Ok(path)
    }

    /// Write several tables, returning their paths in the given order.
    pub fn write_tables(&self, specs: &[TableSpec]) -> std::io::Result<Vec<PathBuf>> {
        specs.iter().map(|s| self.write_table(s)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_names() {
        assert_eq!(
            TableSpec::plain(15, &[1]).file_name(),
            "StatRR_KOSTRA-DWD-2020_D015.csv"
        );
        assert_eq!(
            TableSpec::urban(1440, &[1]).file_name(),
            "StatRR_KOSTRA-DWD-2020_D1440_KOG.csv"
        );
        assert_eq!(TableSpec::urban(5, &[20]).column_name(20), "HN_KOG_020A");
    }

    #[test]
    fn test_write_table_skips_missing_cells() {
        let archive = SyntheticArchive::new(2, 2).unwrap();
        let path = archive
            .write_table(&TableSpec::plain(60, &[1, 5]).with_missing(1, 0))
            .unwrap();

        let text = fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "INDEX_RC;HN_001A;HN_005A");
        assert_eq!(lines.len(), 4);
        assert!(!text.contains("\n2001;"));
    }

    #[test]
    fn test_geo_table_rows() {
        let archive = SyntheticArchive::new(2, 3).unwrap();
        let path = archive.write_geo_table().unwrap();
        let text = fs::read_to_string(path).unwrap();
        assert_eq!(text.lines().count(), 7);
        assert!(text.starts_with("INDEX_RC;Row;Col"));
    }
}
