//! KOSTRA archive converter.
//!
//! Reads the per-duration tables of a KOSTRA precipitation archive and its
//! geolocation table and writes one merged NetCDF file.

mod config;
mod discovery;
mod inspect;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use config::ConvertConfig;
use kostra_grid::{GeoTable, Pipeline};
use kostra_netcdf::{read_dataset, silence_hdf5_errors, write_dataset};

#[derive(Parser, Debug)]
#[command(name = "kostra-convert")]
#[command(about = "Convert KOSTRA precipitation tables into a NetCDF dataset")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Log level
    #[arg(long, global = true, env = "KOSTRA_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert an archive directory into one NetCDF file
    Convert(ConvertArgs),
    /// Print the structure of a NetCDF file
    Inspect(InspectArgs),
}

#[derive(ClapArgs, Debug)]
struct ConvertArgs {
    /// YAML configuration file
    #[arg(short, long, env = "KOSTRA_CONFIG")]
    config: Option<PathBuf>,

    /// Directory with the per-duration tables
    #[arg(short, long, env = "KOSTRA_INPUT_DIR")]
    input_dir: Option<PathBuf>,

    /// Geolocation spreadsheet or CSV
    #[arg(short, long, env = "KOSTRA_GEO_TABLE")]
    geo_table: Option<PathBuf>,

    /// Output NetCDF file
    #[arg(short, long, env = "KOSTRA_OUTPUT")]
    output: Option<PathBuf>,

    /// Extension of table files
    #[arg(long)]
    extension: Option<String>,

    /// Worksheet holding the geolocation table
    #[arg(long)]
    geo_sheet: Option<String>,

    /// Process tables in parallel
    #[arg(long)]
    parallel: bool,

    /// Do not attach cell corner bounds
    #[arg(long)]
    no_bounds: bool,

    /// Sort the return-period axis ascending
    #[arg(long)]
    sort_return_periods: bool,

    /// Deflate level 1-9
    #[arg(long)]
    compression: Option<u8>,
}

#[derive(ClapArgs, Debug)]
struct InspectArgs {
    /// NetCDF file to inspect
    file: PathBuf,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);
    if args.log_json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }

    silence_hdf5_errors();

    match args.command {
        Command::Convert(convert_args) => convert(convert_args),
        Command::Inspect(inspect_args) => inspect_file(inspect_args),
    }
}

/// Merge file, environment and flag settings into one config.
fn resolve_config(args: ConvertArgs) -> Result<ConvertConfig> {
    let mut config = match &args.config {
        Some(path) => ConvertConfig::from_yaml(path)?,
        None => ConvertConfig::from_env(),
    };

    if args.input_dir.is_some() {
        config.input_dir = args.input_dir;
    }
    if args.geo_table.is_some() {
        config.geo_table = args.geo_table;
    }
    if args.output.is_some() {
        config.output = args.output;
    }
    if let Some(extension) = args.extension {
        config.extension = extension;
    }
    if args.geo_sheet.is_some() {
        config.schema.geo_sheet = args.geo_sheet;
    }
    if args.compression.is_some() {
        config.compression_level = args.compression;
    }
    config.parallel |= args.parallel;
    config.sort_return_periods |= args.sort_return_periods;
    if args.no_bounds {
        config.bounds = false;
    }

    config.validate()?;
    Ok(config)
}

fn convert(args: ConvertArgs) -> Result<()> {
    let config = resolve_config(args)?;

    // validate() guarantees all three paths.
    let (Some(input_dir), Some(geo_path), Some(output)) =
        (&config.input_dir, &config.geo_table, &config.output)
    else {
        anyhow::bail!("incomplete configuration");
    };

    info!(
        input_dir = %input_dir.display(),
        geo_table = %geo_path.display(),
        output = %output.display(),
        "Starting KOSTRA conversion"
    );

    let geo = GeoTable::load(geo_path, &config.schema)
        .with_context(|| format!("Failed to load geolocation table {:?}", geo_path))?;

    let files = discovery::discover_tables(input_dir, &config.extension, &[geo_path.clone()])?;

    let pipeline = Pipeline::new(&geo, config.schema.clone(), config.pipeline_options());
    let dataset = pipeline.run(&files).context("Conversion failed")?;

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory {:?}", parent))?;
    }
    write_dataset(&dataset, output, &config.write_options())
        .with_context(|| format!("Failed to write {:?}", output))?;

    info!(
        output = %output.display(),
        files = files.len(),
        variables = dataset.data_vars.len(),
        "Conversion completed"
    );

    Ok(())
}

fn inspect_file(args: InspectArgs) -> Result<()> {
    let dataset = read_dataset(&args.file)
        .with_context(|| format!("Failed to read {:?}", args.file))?;
    let summary = dataset.summary();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{}", inspect::render_text(&summary));
    }

    Ok(())
}
