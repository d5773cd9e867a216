use std::fs;
use std::path::Path;

use dfci::county::{parse_county_boundaries, CountyService, CountySpatialIndex};
use dfci::export::write_csv;
use dfci::upload::{process_upload, upload_attributes, UploadFile};
use dfci::{DfciError, LayerKind, LayerStore};
use serde_json::Value;
use shapefile::dbase::{FieldName, FieldValue, Record, TableWriterBuilder};
use shapefile::{Point, Polygon, PolygonRing};

const COUNTIES: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {
      "type": "Feature",
      "properties": { "CNTY_NM": "Travis" },
      "geometry": {
        "type": "Polygon",
        "coordinates": [[[-98.0, 30.0], [-97.0, 30.0], [-97.0, 31.0], [-98.0, 31.0], [-98.0, 30.0]]]
      }
    },
    {
      "type": "Feature",
      "properties": { "CNTY_NM": "Hays" },
      "geometry": {
        "type": "MultiPolygon",
        "coordinates": [[[[-99.0, 30.0], [-98.0, 30.0], [-98.0, 31.0], [-99.0, 31.0], [-99.0, 30.0]]]]
      }
    }
  ]
}"#;

const INLETS: &str = "name,depth,geometry\n\
Inlet A,3,POINT(-97.5 30.5)\n\
Inlet B,,POINT(-98.5 30.5)\n\
Inlet C,2,POINT(-90.0 30.5)\n\
Basin,5,\"POLYGON((-98.5 30.2, -97.5 30.2, -97.5 30.8, -98.5 30.8, -98.5 30.2))\"\n";

fn counties() -> CountyService {
    let boundaries = parse_county_boundaries(COUNTIES, "CNTY_NM").unwrap();
    CountyService::new(CountySpatialIndex::build(boundaries))
}

fn csv_upload() -> Vec<UploadFile> {
    vec![UploadFile::new("inlets.csv", INLETS.as_bytes().to_vec())]
}

fn shapefile_table() -> TableWriterBuilder {
    TableWriterBuilder::new()
        .add_character_field(FieldName::try_from("name").unwrap(), 32)
        .add_numeric_field(FieldName::try_from("depth").unwrap(), 10, 2)
}

fn dbf_record(name: Option<&str>, depth: Option<f64>) -> Record {
    let mut record = Record::default();
    record.insert("name".to_string(), FieldValue::Character(name.map(String::from)));
    record.insert("depth".to_string(), FieldValue::Numeric(depth));
    record
}

/// The .shp/.shx/.dbf files written for `stem`, as an upload bundle
fn shapefile_bundle(dir: &Path, stem: &str) -> Vec<UploadFile> {
    ["shp", "shx", "dbf"]
        .iter()
        .map(|ext| UploadFile::from_path(&dir.join(format!("{}.{}", stem, ext))).unwrap())
        .collect()
}

fn point_shapefile(dir: &Path) -> Vec<UploadFile> {
    {
        let mut writer =
            shapefile::Writer::from_path(dir.join("inlets.shp"), shapefile_table()).unwrap();
        writer
            .write_shape_and_record(&Point::new(-97.5, 30.5), &dbf_record(Some("A"), Some(3.0)))
            .unwrap();
        writer
            .write_shape_and_record(&Point::new(-98.5, 30.5), &dbf_record(None, None))
            .unwrap();
    }
    shapefile_bundle(dir, "inlets")
}

fn polygon_shapefile(dir: &Path) -> Vec<UploadFile> {
    {
        let mut writer =
            shapefile::Writer::from_path(dir.join("ponds.shp"), shapefile_table()).unwrap();
        // Outer rings are clockwise
        let pond = Polygon::new(PolygonRing::Outer(vec![
            Point::new(-97.8, 30.2),
            Point::new(-97.8, 30.8),
            Point::new(-97.2, 30.8),
            Point::new(-97.2, 30.2),
            Point::new(-97.8, 30.2),
        ]));
        writer
            .write_shape_and_record(&pond, &dbf_record(Some("Pond 1"), Some(2.5)))
            .unwrap();
    }
    shapefile_bundle(dir, "ponds")
}

fn workspace_entries(workspace: &Path) -> usize {
    fs::read_dir(workspace).map(|d| d.count()).unwrap_or(0)
}

#[test]
fn test_upload_attributes_lists_columns() {
    let workspace = tempfile::tempdir().unwrap();
    let columns = upload_attributes(workspace.path(), &csv_upload()).unwrap();
    assert_eq!(columns, vec!["name", "depth"]);
    assert_eq!(workspace_entries(workspace.path()), 0);
}

#[test]
fn test_csv_upload_tags_counties() {
    let workspace = tempfile::tempdir().unwrap();
    let store = LayerStore::temporary().unwrap();

    let report = process_upload(
        workspace.path(),
        &csv_upload(),
        "Inlets",
        &["name".to_string()],
        &counties(),
        &store,
    )
    .unwrap();

    assert_eq!(report.points, 2);
    assert_eq!(report.polygons, 1);
    assert_eq!(report.skipped_no_county, 1);
    assert_eq!(report.skipped_missing_attributes, 0);

    let points = store.points_by_layer("Inlets").unwrap();
    let mut counties: Vec<&str> = points.iter().map(|p| p.county.as_str()).collect();
    counties.sort();
    assert_eq!(counties, vec!["Hays", "Travis"]);
    assert!(points.iter().all(|p| p.approved));
    assert!(points.iter().all(|p| !p.attributes.contains_key("depth")));

    // Spans both counties; Travis comes first in the dataset
    let polygons = store.polygons_by_layer("Inlets").unwrap();
    assert_eq!(polygons.len(), 1);
    assert_eq!(polygons[0].county, "Travis");

    assert_eq!(workspace_entries(workspace.path()), 0);
}

#[test]
fn test_upload_skips_features_missing_selected_attribute() {
    let workspace = tempfile::tempdir().unwrap();
    let store = LayerStore::temporary().unwrap();

    let report = process_upload(
        workspace.path(),
        &csv_upload(),
        "Inlets",
        &["depth".to_string()],
        &counties(),
        &store,
    )
    .unwrap();

    assert_eq!(report.points, 1);
    assert_eq!(report.skipped_missing_attributes, 1);
    assert_eq!(store.points_by_county("Hays").unwrap().len(), 0);
}

#[test]
fn test_unknown_attribute_fails_and_cleans_up() {
    let workspace = tempfile::tempdir().unwrap();
    let store = LayerStore::temporary().unwrap();

    let result = process_upload(
        workspace.path(),
        &csv_upload(),
        "Inlets",
        &["material".to_string()],
        &counties(),
        &store,
    );

    assert!(matches!(result, Err(DfciError::Upload(_))));
    assert!(store.all_points().unwrap().is_empty());
    assert_eq!(workspace_entries(workspace.path()), 0);
}

#[test]
fn test_upload_without_dataset_fails_and_cleans_up() {
    let workspace = tempfile::tempdir().unwrap();
    let store = LayerStore::temporary().unwrap();
    let files = vec![UploadFile::new("readme.txt", b"no data".to_vec())];

    let result = process_upload(workspace.path(), &files, "Empty", &[], &counties(), &store);

    assert!(matches!(result, Err(DfciError::Upload(_))));
    assert_eq!(workspace_entries(workspace.path()), 0);
}

#[test]
fn test_uploaded_layer_export_and_delete() {
    let workspace = tempfile::tempdir().unwrap();
    let store = LayerStore::temporary().unwrap();
    process_upload(
        workspace.path(),
        &csv_upload(),
        "Inlets",
        &[],
        &counties(),
        &store,
    )
    .unwrap();

    let mut out = Vec::new();
    write_csv(&store.points_by_layer("Inlets").unwrap(), false, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert_eq!(text.lines().count(), 3);
    assert!(text.starts_with("layer_name,county,approved,geometry,metadata\n"));

    assert_eq!(store.delete_layer(LayerKind::Points, "Inlets").unwrap(), 2);
    assert!(store.layer_options().unwrap().points.is_empty());
    assert_eq!(store.layer_options().unwrap().polygons, vec!["Inlets"]);
}

#[test]
fn test_failed_upload_stores_nothing() {
    let workspace = tempfile::tempdir().unwrap();
    let store = LayerStore::temporary().unwrap();
    let files = vec![UploadFile::new(
        "inlets.csv",
        b"name,geometry\nInlet A,POINT(-97.5 30.5)\nInlet B,POINT(-98.5 30.5)\nBroken,POINT(-97.5\n"
            .to_vec(),
    )];

    let result = process_upload(workspace.path(), &files, "Inlets", &[], &counties(), &store);

    assert!(matches!(result, Err(DfciError::Upload(_))));
    assert!(store.all_points().unwrap().is_empty());
    assert!(store.layer_options().unwrap().points.is_empty());
    assert_eq!(workspace_entries(workspace.path()), 0);
}

#[test]
fn test_shapefile_attributes_lists_dbf_columns() {
    let source = tempfile::tempdir().unwrap();
    let workspace = tempfile::tempdir().unwrap();
    let files = point_shapefile(source.path());

    let columns = upload_attributes(workspace.path(), &files).unwrap();
    assert_eq!(columns, vec!["depth", "name"]);
    assert_eq!(workspace_entries(workspace.path()), 0);
}

#[test]
fn test_point_shapefile_upload() {
    let source = tempfile::tempdir().unwrap();
    let workspace = tempfile::tempdir().unwrap();
    let store = LayerStore::temporary().unwrap();

    let report = process_upload(
        workspace.path(),
        &point_shapefile(source.path()),
        "Inlets",
        &["name".to_string()],
        &counties(),
        &store,
    )
    .unwrap();

    // The second record has a null name
    assert_eq!(report.points, 1);
    assert_eq!(report.polygons, 0);
    assert_eq!(report.skipped_missing_attributes, 1);

    let points = store.points_by_layer("Inlets").unwrap();
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].county, "Travis");
    assert_eq!(points[0].longitude, -97.5);
    assert_eq!(points[0].latitude, 30.5);
    assert_eq!(points[0].attributes.len(), 1);
    assert_eq!(points[0].attributes["name"], Value::from("A"));
    assert!(points[0].approved);
    assert_eq!(workspace_entries(workspace.path()), 0);
}

#[test]
fn test_polygon_shapefile_upload() {
    let source = tempfile::tempdir().unwrap();
    let workspace = tempfile::tempdir().unwrap();
    let store = LayerStore::temporary().unwrap();

    let report = process_upload(
        workspace.path(),
        &polygon_shapefile(source.path()),
        "Ponds",
        &["name".to_string(), "depth".to_string()],
        &counties(),
        &store,
    )
    .unwrap();

    assert_eq!(report.points, 0);
    assert_eq!(report.polygons, 1);

    let polygons = store.polygons_by_layer("Ponds").unwrap();
    assert_eq!(polygons[0].county, "Travis");
    assert!(polygons[0].geometry.contains("POLYGON"));
    assert_eq!(polygons[0].attributes["name"], Value::from("Pond 1"));
    assert_eq!(polygons[0].attributes["depth"], Value::from(2.5));
}
