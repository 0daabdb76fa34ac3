//! Conversion pipeline.
//!
//! Drives all stages for one archive: per-file table, grid and
//! return-period merging, then the cross-file merge, center coordinates,
//! bounds, encoding and global attributes.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::bounds::{annotate_bounds, fill_center_coordinates};
use crate::config::ArchiveSchema;
use crate::dataset::Dataset;
use crate::encoding::finalize_encoding;
use crate::error::{KostraError, Result};
use crate::geo::GeoTable;
use crate::grid::build_grid;
use crate::merge::{combine, merge_return_periods, FileFamilies};
use crate::table::build_flat_table;

/// Default `title` attribute of the output dataset.
pub const DEFAULT_TITLE: &str = "KOSTRA-DWD design precipitation";

/// Options for a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Run the per-file stages on the rayon thread pool
    pub parallel: bool,
    /// Attach `lon_bnds` / `lat_bnds`
    pub bounds: bool,
    /// Sort the return-period axis ascending after merging
    pub sort_return_periods: bool,
    /// Value of the `title` attribute
    pub title: String,
    /// Value of the `source` attribute. Defaults to the input file names.
    pub source: Option<String>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            parallel: false,
            bounds: true,
            sort_return_periods: false,
            title: DEFAULT_TITLE.to_string(),
            source: None,
        }
    }
}

/// Converts a set of per-duration tables into one dataset.
pub struct Pipeline<'a> {
    geo: &'a GeoTable,
    schema: ArchiveSchema,
    options: PipelineOptions,
}

impl<'a> Pipeline<'a> {
    pub fn new(geo: &'a GeoTable, schema: ArchiveSchema, options: PipelineOptions) -> Self {
        Self {
            geo,
            schema,
            options,
        }
    }

    pub fn schema(&self) -> &ArchiveSchema {
        &self.schema
    }

    /// Run all stages. Files are concatenated in the given order before the
    /// duration axis is sorted.
    pub fn run(&self, files: &[PathBuf]) -> Result<Dataset> {
        if files.is_empty() {
            return Err(KostraError::EmptyArchive(
                "no input tables were given".to_string(),
            ));
        }

        let start = Instant::now();
        info!(
            files = files.len(),
            parallel = self.options.parallel,
            "Starting conversion"
        );

        // collect::<Result<Vec<_>>>() keeps input order in both branches.
        let families: Vec<FileFamilies> = if self.options.parallel {
            files
                .par_iter()
                .map(|path| self.process_file(path))
                .collect::<Result<Vec<_>>>()?
        } else {
            files
                .iter()
                .map(|path| self.process_file(path))
                .collect::<Result<Vec<_>>>()?
        };

        let families = if self.options.sort_return_periods {
            families
                .into_iter()
                .map(|mut f| {
                    for grid in f.plain.iter_mut().chain(f.urban.iter_mut()) {
                        grid.sort_return_periods();
                    }
                    f
                })
                .collect()
        } else {
            families
        };

        let mut dataset = combine(families, &self.schema)?;
        fill_center_coordinates(&mut dataset, self.geo)?;

        if self.options.bounds {
            annotate_bounds(&mut dataset, self.geo)?;
        }
        finalize_encoding(&mut dataset, self.schema.fill_value);
        self.set_global_attributes(&mut dataset, files);

        info!(
            variables = dataset.data_vars.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Conversion complete"
        );

        Ok(dataset)
    }

    /// Table, grid and return-period stages of one file.
    fn process_file(&self, path: &Path) -> Result<FileFamilies> {
        let table = build_flat_table(path, self.geo, &self.schema)?;
        let grid = build_grid(table, &self.schema)?;
        let families = merge_return_periods(grid, &self.schema)?;

        debug!(
            path = %path.display(),
            plain = families.plain.is_some(),
            urban = families.urban.is_some(),
            "Processed table"
        );

        Ok(families)
    }

    fn set_global_attributes(&self, dataset: &mut Dataset, files: &[PathBuf]) {
        let source = self.options.source.clone().unwrap_or_else(|| {
            files
                .iter()
                .filter_map(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join(", ")
        });

        dataset.set_attr("title", self.options.title.as_str());
        dataset.set_attr("Conventions", "CF-1.8");
        dataset.set_attr("source", source);
        dataset.set_attr(
            "history",
            format!(
                "{} created by {} {}",
                Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_is_an_error() {
        let geo = GeoTable::default();
        let pipeline = Pipeline::new(&geo, ArchiveSchema::default(), PipelineOptions::default());
        assert!(matches!(pipeline.run(&[]), Err(KostraError::EmptyArchive(_))));
    }

    #[test]
    fn test_default_options() {
        let options = PipelineOptions::default();
        assert!(options.bounds);
        assert!(!options.parallel);
        assert_eq!(options.title, DEFAULT_TITLE);
    }
}
