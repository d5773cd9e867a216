//! Turning an uploaded layer into approved, county-tagged records.

use geo::Geometry;
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

use super::reader::{read_staged, UploadedFeature};
use super::staging::StagedUpload;
use super::UploadFile;
use crate::county::CountyService;
use crate::error::{DfciError, Result};
use crate::geometry::to_wkt;
use crate::models::{NewPoint, NewPolygon, Properties};
use crate::store::LayerStore;

/// Outcome of processing one upload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UploadReport {
    pub points: usize,
    pub polygons: usize,
    pub skipped_no_county: usize,
    pub skipped_missing_attributes: usize,
}

/// Attribute column names of an upload, for the attribute picker
pub fn upload_attributes(workspace: &Path, files: &[UploadFile]) -> Result<Vec<String>> {
    let staged = StagedUpload::stage(workspace, files)?;
    let layer = read_staged(&staged)?;
    Ok(layer.columns)
}

/// Store every feature of an upload under `layer_name`.
///
/// Each feature keeps only the selected `attributes`; features without a
/// county or with a missing selected attribute are skipped. Stored records
/// are approved and written in one transaction, so a failed upload stores
/// nothing.
pub fn process_upload(
    workspace: &Path,
    files: &[UploadFile],
    layer_name: &str,
    attributes: &[String],
    counties: &CountyService,
    store: &LayerStore,
) -> Result<UploadReport> {
    let staged = StagedUpload::stage(workspace, files)?;
    let layer = read_staged(&staged)?;

    if let Some(missing) = attributes.iter().find(|a| !layer.columns.contains(a)) {
        return Err(DfciError::Upload(format!(
            "attribute '{}' is not in the upload (columns: {})",
            missing,
            layer.columns.join(", ")
        )));
    }

    let mut report = UploadReport::default();
    let mut points = Vec::new();
    let mut polygons = Vec::new();

    // Nothing is written until every feature has been converted
    for (idx, feature) in layer.features.into_iter().enumerate() {
        let county = match counties.assign(&feature.geometry) {
            Ok(c) => c,
            Err(DfciError::NoCounty) => {
                warn!("Feature {} of '{}' is outside every county", idx, layer_name);
                report.skipped_no_county += 1;
                continue;
            }
            Err(e) => return Err(e),
        };

        let Some(selected) = select_attributes(&feature, attributes) else {
            report.skipped_missing_attributes += 1;
            continue;
        };

        match feature.geometry {
            Geometry::Point(p) => points.push((
                NewPoint {
                    layer_name: layer_name.to_string(),
                    latitude: p.y(),
                    longitude: p.x(),
                    attributes: selected,
                    metadata: Properties::new(),
                },
                county,
            )),
            geometry => polygons.push((
                NewPolygon {
                    layer_name: layer_name.to_string(),
                    geometry: to_wkt(&geometry)?,
                    attributes: selected,
                    metadata: Properties::new(),
                },
                county,
            )),
        }
    }

    report.points = points.len();
    report.polygons = polygons.len();
    store.insert_all(points, polygons, true)?;
    store.flush()?;
    info!(
        "Upload '{}': {} points, {} polygons, {} outside counties, {} missing attributes",
        layer_name,
        report.points,
        report.polygons,
        report.skipped_no_county,
        report.skipped_missing_attributes
    );

    Ok(report)
}

/// Selected attributes of a feature, or None if any is missing or null
fn select_attributes(feature: &UploadedFeature, attributes: &[String]) -> Option<Properties> {
    let mut selected = Properties::new();
    for name in attributes {
        match feature.attributes.get(name) {
            Some(v) if !v.is_null() => {
                selected.insert(name.clone(), v.clone());
            }
            _ => return None,
        }
    }
    Some(selected)
}
