//! County boundary extraction from a WFS GeoJSON response.

use geo::MultiPolygon;
use geojson::{FeatureCollection, GeoJson};
use tracing::{debug, info, warn};

use crate::error::{DfciError, Result};
use crate::geometry::{as_multipolygon, from_geojson_geometry};

/// A single county polygon with its name
#[derive(Debug, Clone)]
pub struct CountyBoundary {
    pub name: String,
    pub geometry: MultiPolygon<f64>,
}

impl CountyBoundary {
    pub fn new(name: impl Into<String>, geometry: MultiPolygon<f64>) -> Self {
        Self {
            name: name.into(),
            geometry,
        }
    }

    /// Get the bounding box of this boundary
    pub fn bbox(&self) -> Option<(f64, f64, f64, f64)> {
        use geo::BoundingRect;
        self.geometry
            .bounding_rect()
            .map(|rect| (rect.min().x, rect.min().y, rect.max().x, rect.max().y))
    }
}

/// Extract county boundaries from a GeoJSON FeatureCollection
///
/// `name_field` is the feature property carrying the county name. Features
/// without a name or without an areal geometry are skipped.
pub fn parse_county_boundaries(text: &str, name_field: &str) -> Result<Vec<CountyBoundary>> {
    let collection = match text.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(fc) => fc,
        _ => {
            return Err(DfciError::Geometry(
                "county response is not a FeatureCollection".into(),
            ))
        }
    };

    let boundaries = extract_boundaries(collection, name_field);
    info!("Found {} county boundaries", boundaries.len());
    Ok(boundaries)
}

fn extract_boundaries(collection: FeatureCollection, name_field: &str) -> Vec<CountyBoundary> {
    let mut boundaries = Vec::with_capacity(collection.features.len());

    for (idx, feature) in collection.features.into_iter().enumerate() {
        let name = match feature
            .property(name_field)
            .and_then(|v| v.as_str())
            .map(str::trim)
        {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => {
                warn!("County feature {} has no '{}' property", idx, name_field);
                continue;
            }
        };

        let Some(geometry) = feature.geometry else {
            warn!("County {} has no geometry", name);
            continue;
        };

        let geometry = match from_geojson_geometry(geometry) {
            Ok(g) => g,
            Err(e) => {
                warn!("Could not convert geometry for county {}: {}", name, e);
                continue;
            }
        };

        match as_multipolygon(geometry) {
            Some(mp) => boundaries.push(CountyBoundary::new(name, mp)),
            None => debug!("County {} has a non-areal geometry, skipping", name),
        }
    }

    boundaries
}

#[cfg(test)]
mod tests {
    use super::*;

    const COUNTIES: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "properties": {"CNTY_NM": "Travis"},
             "geometry": {"type": "Polygon",
                          "coordinates": [[[0,0],[1,0],[1,1],[0,1],[0,0]]]}},
            {"type": "Feature", "properties": {"CNTY_NM": "Hays"},
             "geometry": {"type": "MultiPolygon",
                          "coordinates": [[[[1,0],[2,0],[2,1],[1,1],[1,0]]]]}},
            {"type": "Feature", "properties": {"OTHER": "x"},
             "geometry": {"type": "Polygon",
                          "coordinates": [[[5,5],[6,5],[6,6],[5,5]]]}},
            {"type": "Feature", "properties": {"CNTY_NM": "Line"},
             "geometry": {"type": "LineString", "coordinates": [[0,0],[1,1]]}}
        ]
    }"#;

    #[test]
    fn test_parse_skips_unnamed_and_non_areal() {
        let boundaries = parse_county_boundaries(COUNTIES, "CNTY_NM").unwrap();
        let names: Vec<&str> = boundaries.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["Travis", "Hays"]);
    }

    #[test]
    fn test_bbox() {
        let boundaries = parse_county_boundaries(COUNTIES, "CNTY_NM").unwrap();
        assert_eq!(boundaries[1].bbox(), Some((1.0, 0.0, 2.0, 1.0)));
    }

    #[test]
    fn test_rejects_bare_geometry() {
        let err = parse_county_boundaries(r#"{"type":"Point","coordinates":[0,0]}"#, "CNTY_NM");
        assert!(err.is_err());
    }
}
