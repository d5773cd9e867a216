//! Reading staged shapefile and CSV uploads into features.

use geo::Geometry;
use serde_json::{Number, Value};
use shapefile::dbase::FieldValue;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use tracing::{info, warn};

use super::staging::StagedUpload;
use crate::error::{DfciError, Result};
use crate::geometry::parse_wkt;
use crate::models::Properties;

/// Name of the WKT column in CSV uploads
pub const GEOMETRY_COLUMN: &str = "geometry";

/// One feature read from an upload
#[derive(Debug, Clone)]
pub struct UploadedFeature {
    pub geometry: Geometry<f64>,
    pub attributes: Properties,
}

/// Contents of an upload: attribute columns plus features
#[derive(Debug, Clone, Default)]
pub struct UploadedLayer {
    /// Attribute column names, excluding the geometry column
    pub columns: Vec<String>,
    pub features: Vec<UploadedFeature>,
}

/// Read whichever supported dataset the staged upload contains.
///
/// A shapefile takes precedence over a CSV file.
pub fn read_staged(staged: &StagedUpload) -> Result<UploadedLayer> {
    if let Some(shp) = staged.shapefile() {
        return read_shapefile(shp);
    }
    if let Some(csv) = staged.csv() {
        return read_csv(csv);
    }
    Err(DfciError::Upload(
        "upload contains neither a .shp nor a .csv file".into(),
    ))
}

/// Read a shapefile and its `.dbf` attribute table
pub fn read_shapefile(path: &Path) -> Result<UploadedLayer> {
    let mut reader = shapefile::Reader::from_path(path)?;
    let mut columns = BTreeSet::new();
    let mut features = Vec::new();

    for (idx, entry) in reader.iter_shapes_and_records().enumerate() {
        let (shape, record) = entry?;

        let geometry = match Geometry::<f64>::try_from(shape) {
            Ok(g) => g,
            Err(e) => {
                warn!("Skipping shape {} without usable geometry: {}", idx, e);
                continue;
            }
        };

        let fields: HashMap<String, FieldValue> = record.into();
        let mut attributes = Properties::new();
        for (name, value) in fields {
            columns.insert(name.clone());
            attributes.insert(name, field_value_to_json(value));
        }

        features.push(UploadedFeature {
            geometry,
            attributes,
        });
    }

    info!(
        "Read {} features from shapefile {}",
        features.len(),
        path.display()
    );

    Ok(UploadedLayer {
        columns: columns.into_iter().collect(),
        features,
    })
}

/// Read a CSV file whose `geometry` column holds WKT
pub fn read_csv(path: &Path) -> Result<UploadedLayer> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();

    let geometry_idx = headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(GEOMETRY_COLUMN))
        .ok_or_else(|| DfciError::Upload(format!("CSV has no '{}' column", GEOMETRY_COLUMN)))?;

    let columns: Vec<String> = headers
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != geometry_idx)
        .map(|(_, h)| h.trim().to_string())
        .collect();

    let mut features = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let wkt = record.get(geometry_idx).unwrap_or_default();
        // Row numbers are 1-based and skip the header line
        let geometry = parse_wkt(wkt)
            .map_err(|e| DfciError::Upload(format!("row {}: {}", row + 2, e)))?;

        let mut attributes = Properties::new();
        let values = record
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != geometry_idx)
            .map(|(_, v)| v);
        for (name, value) in columns.iter().zip(values) {
            attributes.insert(name.clone(), infer_value(value));
        }

        features.push(UploadedFeature {
            geometry,
            attributes,
        });
    }

    info!("Read {} features from CSV {}", features.len(), path.display());

    Ok(UploadedLayer { columns, features })
}

/// Type a CSV cell: empty is null, then integer, float, bool, string
pub fn infer_value(raw: &str) -> Value {
    let s = raw.trim();
    if s.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return Value::from(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return float_value(f);
    }
    match s.to_ascii_lowercase().as_str() {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(s.to_string()),
    }
}

fn float_value(f: f64) -> Value {
    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}

fn field_value_to_json(value: FieldValue) -> Value {
    match value {
        FieldValue::Character(Some(s)) if s.trim().is_empty() => Value::Null,
        FieldValue::Character(Some(s)) => Value::String(s.trim_end().to_string()),
        FieldValue::Numeric(Some(n)) => float_value(n),
        FieldValue::Float(Some(f)) => float_value(f64::from(f)),
        FieldValue::Logical(Some(b)) => Value::Bool(b),
        FieldValue::Integer(i) => Value::from(i),
        FieldValue::Double(d) | FieldValue::Currency(d) => float_value(d),
        FieldValue::Memo(s) => Value::String(s),
        FieldValue::Date(Some(d)) => Value::String(format!(
            "{:04}-{:02}-{:02}",
            d.year(),
            d.month(),
            d.day()
        )),
        FieldValue::Character(None)
        | FieldValue::Numeric(None)
        | FieldValue::Float(None)
        | FieldValue::Logical(None)
        | FieldValue::Date(None) => Value::Null,
        other => Value::String(format!("{:?}", other)),
    }
}
