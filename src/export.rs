//! GeoJSON and CSV exports of stored features.

use geojson::{feature::Id, Feature, FeatureCollection};
use serde_json::Value;
use std::collections::BTreeSet;
use std::io::Write;
use tracing::warn;

use crate::error::Result;
use crate::geometry::{parse_wkt, to_geojson_geometry};
use crate::models::{PointRecord, PolygonRecord, Properties};

/// Common view over point and polygon records for export
pub trait ExportRecord {
    fn id(&self) -> u64;
    fn layer_name(&self) -> &str;
    fn county(&self) -> &str;
    fn approved(&self) -> bool;
    fn created_at(&self) -> String;
    fn attributes(&self) -> &Properties;
    fn metadata(&self) -> &Properties;
    fn geometry(&self) -> Option<geo::Geometry<f64>>;
    fn wkt(&self) -> String;
}

impl ExportRecord for PointRecord {
    fn id(&self) -> u64 {
        self.id
    }
    fn layer_name(&self) -> &str {
        &self.layer_name
    }
    fn county(&self) -> &str {
        &self.county
    }
    fn approved(&self) -> bool {
        self.approved
    }
    fn created_at(&self) -> String {
        self.created_at.to_rfc3339()
    }
    fn attributes(&self) -> &Properties {
        &self.attributes
    }
    fn metadata(&self) -> &Properties {
        &self.metadata
    }
    fn geometry(&self) -> Option<geo::Geometry<f64>> {
        Some(self.point().into())
    }
    fn wkt(&self) -> String {
        format!("POINT({} {})", self.longitude, self.latitude)
    }
}

impl ExportRecord for PolygonRecord {
    fn id(&self) -> u64 {
        self.id
    }
    fn layer_name(&self) -> &str {
        &self.layer_name
    }
    fn county(&self) -> &str {
        &self.county
    }
    fn approved(&self) -> bool {
        self.approved
    }
    fn created_at(&self) -> String {
        self.created_at.to_rfc3339()
    }
    fn attributes(&self) -> &Properties {
        &self.attributes
    }
    fn metadata(&self) -> &Properties {
        &self.metadata
    }
    fn geometry(&self) -> Option<geo::Geometry<f64>> {
        match parse_wkt(&self.geometry) {
            Ok(g) => Some(g),
            Err(e) => {
                warn!("Polygon {} has unreadable geometry: {}", self.id, e);
                None
            }
        }
    }
    fn wkt(&self) -> String {
        self.geometry.clone()
    }
}

/// Build a FeatureCollection; attributes are flattened into the properties
pub fn to_feature_collection<R: ExportRecord>(records: &[R]) -> FeatureCollection {
    let features = records
        .iter()
        .map(|r| {
            let mut properties = Properties::new();
            properties.insert("id".into(), Value::from(r.id()));
            properties.insert("layer_name".into(), Value::from(r.layer_name()));
            properties.insert("county".into(), Value::from(r.county()));
            properties.insert("approved".into(), Value::from(r.approved()));
            properties.insert("created_at".into(), Value::from(r.created_at()));
            properties.insert("metadata".into(), Value::Object(r.metadata().clone()));
            for (key, value) in r.attributes() {
                properties
                    .entry(key.clone())
                    .or_insert_with(|| value.clone());
            }

            Feature {
                bbox: None,
                geometry: r.geometry().as_ref().map(to_geojson_geometry),
                id: Some(Id::Number(r.id().into())),
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

pub fn to_geojson_string<R: ExportRecord>(records: &[R]) -> Result<String> {
    Ok(serde_json::to_string(&to_feature_collection(records))?)
}

/// Write records as CSV: fixed columns, then one column per attribute key
pub fn write_csv<R: ExportRecord, W: Write>(records: &[R], include_id: bool, out: W) -> Result<()> {
    let attribute_keys: BTreeSet<&str> = records
        .iter()
        .flat_map(|r| r.attributes().keys().map(String::as_str))
        .collect();

    let mut writer = csv::Writer::from_writer(out);

    let mut header: Vec<&str> = Vec::new();
    if include_id {
        header.push("id");
    }
    header.extend(["layer_name", "county", "approved", "geometry", "metadata"]);
    header.extend(attribute_keys.iter().copied());
    writer.write_record(&header)?;

    for r in records {
        let mut row: Vec<String> = Vec::with_capacity(header.len());
        if include_id {
            row.push(r.id().to_string());
        }
        row.push(r.layer_name().to_string());
        row.push(r.county().to_string());
        row.push(r.approved().to_string());
        row.push(r.wkt());
        row.push(Value::Object(r.metadata().clone()).to_string());
        for key in &attribute_keys {
            row.push(r.attributes().get(*key).map(cell).unwrap_or_default());
        }
        writer.write_record(&row)?;
    }

    writer.flush()?;
    Ok(())
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
