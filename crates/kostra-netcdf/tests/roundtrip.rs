//! Integration test: convert a synthetic archive, write it to NetCDF and
//! read it back.

use std::path::Path;

use kostra_grid::{
    ArchiveSchema, DataType, Dataset, FillValue, GeoTable, Pipeline, PipelineOptions,
};
use kostra_netcdf::{read_dataset, write_dataset, WriteOptions};
use test_utils::{assert_approx_eq, precipitation_depth, SyntheticArchive, TableSpec};

fn convert(archive: &SyntheticArchive, specs: &[TableSpec]) -> Dataset {
    let schema = ArchiveSchema::default();
    let geo = GeoTable::load(&archive.write_geo_table().unwrap(), &schema).unwrap();
    let files = archive.write_tables(specs).unwrap();
    Pipeline::new(&geo, schema, PipelineOptions::default())
        .run(&files)
        .unwrap()
}

fn write_and_read(dataset: &Dataset, path: &Path, options: &WriteOptions) -> Dataset {
    write_dataset(dataset, path, options).unwrap();
    read_dataset(path).unwrap()
}

#[test]
fn test_roundtrip_preserves_structure() {
    let archive = SyntheticArchive::new(3, 2).unwrap();
    let original = convert(
        &archive,
        &[
            TableSpec::plain(60, &[1, 5]),
            TableSpec::plain(15, &[1, 5]),
            TableSpec::urban(15, &[1, 5]),
            TableSpec::urban(60, &[1, 5]),
        ],
    );

    let path = archive.root().join("kostra.nc");
    let read = write_and_read(&original, &path, &WriteOptions::default());

    let dims: Vec<(&str, usize)> = read
        .dimensions
        .iter()
        .map(|d| (d.name.as_str(), d.len))
        .collect();
    assert_eq!(
        dims,
        vec![("duration", 2), ("returnPeriod", 2), ("y", 3), ("x", 2), ("nv", 4)]
    );

    let duration = read.coordinate("duration").unwrap();
    assert_eq!(duration.values_i64(), vec![15, 60]);
    assert_eq!(duration.units(), Some("minutes"));
    assert_eq!(duration.dtype, DataType::Int32);
    assert_eq!(read.coordinate("returnPeriod").unwrap().units(), Some("years"));

    // Bounds are classified as coordinates through the `bounds` attribute.
    assert!(read.coordinate("lon_bnds").is_some());
    assert!(read.coordinate("lat").is_some());

    let hn = read.data_var("HN").unwrap();
    assert_eq!(hn.units(), Some("mm"));
    assert_eq!(hn.shape(), &[2, 2, 3, 2]);
    assert_eq!(hn.data[[1, 1, 2, 1]], precipitation_depth(60, 5, 2, 1));
    assert!(hn.attr_text("coordinates").is_none());
    assert_eq!(read.data_vars.len(), 2);

    assert_eq!(read.attrs["Conventions"].as_text(), Some("CF-1.8"));
}

#[test]
fn test_sentinel_is_written_as_fill_and_read_as_null() {
    let archive = SyntheticArchive::new(2, 2).unwrap();
    let original = convert(
        &archive,
        &[TableSpec::plain(15, &[1]).with_sentinel(0, 1).with_missing(1, 0)],
    );

    let path = archive.root().join("kostra.nc");
    let read = write_and_read(&original, &path, &WriteOptions::default());

    let hn = read.data_var("HN").unwrap();
    assert_eq!(hn.encoding.fill_value, FillValue::Value(1e20));
    assert!(hn.data[[0, 0, 0, 1]].is_nan());
    assert!(hn.data[[0, 0, 1, 0]].is_nan());
    assert_eq!(hn.null_count(), 2);

    // Null positions are preserved exactly.
    let before = original.data_var("HN").unwrap();
    for (a, b) in before.data.iter().zip(hn.data.iter()) {
        assert_eq!(a.is_nan(), b.is_nan());
    }

    // The absent cell still has a center coordinate.
    assert_eq!(read.coordinate("lon").unwrap().null_count(), 0);

    // Raw storage holds the fill value.
    let file = netcdf::open(&path).unwrap();
    let raw: Vec<f64> = file.variable("HN").unwrap().get_values(..).unwrap();
    assert_eq!(raw[1], 1e20);
}

#[test]
fn test_coordinates_have_no_fill_value() {
    let archive = SyntheticArchive::new(2, 2).unwrap();
    let original = convert(&archive, &[TableSpec::plain(15, &[1])]);

    let path = archive.root().join("kostra.nc");
    let read = write_and_read(&original, &path, &WriteOptions::default());

    for coord in &read.coordinates {
        assert_eq!(coord.encoding.fill_value, FillValue::None, "{}", coord.name);
    }
    let lat = read.coordinate("lat").unwrap();
    assert_approx_eq!(lat.data[[1, 0]], original.coordinate("lat").unwrap().data[[1, 0]], 1e-12);
    assert_eq!(lat.attr_text("bounds"), Some("lat_bnds"));
}

#[test]
fn test_compressed_roundtrip() {
    let archive = SyntheticArchive::new(4, 4).unwrap();
    let original = convert(&archive, &[TableSpec::plain(5, &[1, 2, 5])]);

    let path = archive.root().join("compressed.nc");
    let read = write_and_read(
        &original,
        &path,
        &WriteOptions {
            compression_level: Some(4),
        },
    );

    let a = original.data_var("HN").unwrap();
    let b = read.data_var("HN").unwrap();
    assert_eq!(a.data, b.data);
}

#[test]
fn test_read_missing_file() {
    assert!(read_dataset(Path::new("/nonexistent/kostra.nc")).is_err());
}
