//! Converter configuration.
//!
//! Settings are layered: built-in defaults, then an optional YAML file
//! (with `${VAR}` and `~` expansion), then `KOSTRA_*` environment variables
//! for the archive schema, then command-line flags.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use kostra_grid::pipeline::DEFAULT_TITLE;
use kostra_grid::{ArchiveSchema, PipelineOptions};
use kostra_netcdf::WriteOptions;
use serde::{Deserialize, Serialize};

/// Settings of one conversion run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    /// Directory holding the per-duration tables
    pub input_dir: Option<PathBuf>,

    /// Geolocation spreadsheet or CSV
    pub geo_table: Option<PathBuf>,

    /// Output NetCDF file
    pub output: Option<PathBuf>,

    /// Extension of table files, without the dot
    pub extension: String,

    /// Run the per-file stages in parallel
    pub parallel: bool,

    /// Attach cell corner bounds
    pub bounds: bool,

    /// Sort the return-period axis ascending
    pub sort_return_periods: bool,

    /// Deflate level 1-9, or none
    pub compression_level: Option<u8>,

    /// Global `title` attribute
    pub title: String,

    /// Archive layout
    pub schema: ArchiveSchema,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            input_dir: None,
            geo_table: None,
            output: None,
            extension: "csv".to_string(),
            parallel: false,
            bounds: true,
            sort_return_periods: false,
            compression_level: None,
            title: DEFAULT_TITLE.to_string(),
            schema: ArchiveSchema::default(),
        }
    }
}

impl ConvertConfig {
    /// Load from a YAML file, expanding `${VAR}` and `~` first.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config from {:?}", path.as_ref()))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("Failed to parse config from {:?}", path.as_ref()))
    }

    /// Parse YAML text, expanding `${VAR}` and `~` first.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let expanded = shellexpand::full(content).context("Failed to expand variables")?;
        let config: Self = serde_yaml::from_str(&expanded)?;
        Ok(config)
    }

    /// Defaults with the archive schema taken from the environment.
    pub fn from_env() -> Self {
        Self {
            schema: ArchiveSchema::from_env(),
            ..Self::default()
        }
    }

    /// Check that everything a conversion needs is present and consistent.
    pub fn validate(&self) -> Result<()> {
        if self.input_dir.is_none() {
            bail!("input directory is not set (--input-dir or input_dir)");
        }
        if self.geo_table.is_none() {
            bail!("geolocation table is not set (--geo-table or geo_table)");
        }
        if self.output.is_none() {
            bail!("output file is not set (--output or output)");
        }
        if self.extension.is_empty() || self.extension.starts_with('.') {
            bail!("extension must be given without a leading dot, got {:?}", self.extension);
        }

        self.schema
            .validate()
            .map_err(|e| anyhow::anyhow!("invalid archive schema: {}", e))?;
        self.write_options()
            .validate()
            .map_err(|e| anyhow::anyhow!("invalid output options: {}", e))?;

        Ok(())
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            parallel: self.parallel,
            bounds: self.bounds,
            sort_return_periods: self.sort_return_periods,
            title: self.title.clone(),
            source: None,
        }
    }

    pub fn write_options(&self) -> WriteOptions {
        WriteOptions {
            compression_level: self.compression_level,
        }
    }
}
