//! Geometry conversions between WKT, GeoJSON and `geo` types.

use geo::{BoundingRect, Geometry, MultiPolygon, Rect};
use geojson::GeoJson;
use geozero::{wkt::Wkt, ToGeo, ToWkt};
use rstar::AABB;

use crate::error::{DfciError, Result};

/// Parse a WKT string into a geometry
pub fn parse_wkt(wkt: &str) -> Result<Geometry<f64>> {
    Wkt(wkt.trim())
        .to_geo()
        .map_err(|e| DfciError::Wkt(format!("{}: {}", e, truncate(wkt, 64))))
}

/// Serialize a geometry as WKT
pub fn to_wkt(geometry: &Geometry<f64>) -> Result<String> {
    geometry
        .to_wkt()
        .map_err(|e| DfciError::Wkt(e.to_string()))
}

/// Convert a GeoJSON geometry into a `geo` geometry
pub fn from_geojson_geometry(geometry: geojson::Geometry) -> Result<Geometry<f64>> {
    Ok(geometry.try_into()?)
}

/// Convert a `geo` geometry into a GeoJSON geometry
pub fn to_geojson_geometry(geometry: &Geometry<f64>) -> geojson::Geometry {
    geojson::Geometry::new(geojson::Value::from(geometry))
}

/// Extract the first geometry of a GeoJSON document.
///
/// Accepts a bare geometry, a feature or a feature collection.
pub fn first_geojson_geometry(text: &str) -> Result<Geometry<f64>> {
    let geojson: GeoJson = text.parse()?;
    let geometry = match geojson {
        GeoJson::Geometry(g) => Some(g),
        GeoJson::Feature(f) => f.geometry,
        GeoJson::FeatureCollection(fc) => fc.features.into_iter().find_map(|f| f.geometry),
    };

    let geometry =
        geometry.ok_or_else(|| DfciError::Geometry("GeoJSON contains no geometry".into()))?;
    from_geojson_geometry(geometry)
}

/// Areal geometries as a MultiPolygon; anything else yields None
pub fn as_multipolygon(geometry: Geometry<f64>) -> Option<MultiPolygon<f64>> {
    match geometry {
        Geometry::MultiPolygon(mp) => Some(mp),
        Geometry::Polygon(p) => Some(MultiPolygon::new(vec![p])),
        Geometry::Rect(r) => Some(MultiPolygon::new(vec![r.to_polygon()])),
        Geometry::Triangle(t) => Some(MultiPolygon::new(vec![t.to_polygon()])),
        _ => None,
    }
}

/// Bounding-box envelope for R-tree queries
pub fn envelope<G>(geometry: &G) -> Option<AABB<[f64; 2]>>
where
    G: BoundingRect<f64, Output = Option<Rect<f64>>>,
{
    geometry
        .bounding_rect()
        .map(|rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]))
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wkt_polygon() {
        let geometry = parse_wkt("POLYGON((0 0, 1 0, 1 1, 0 1, 0 0))").unwrap();
        assert!(matches!(geometry, Geometry::Polygon(_)));
        assert!(as_multipolygon(geometry).is_some());
    }

    #[test]
    fn test_parse_wkt_rejects_garbage() {
        assert!(matches!(parse_wkt("POLYGON((0 0, 1"), Err(DfciError::Wkt(_))));
    }

    #[test]
    fn test_point_is_not_areal() {
        let geometry = parse_wkt("POINT(-97.5 30.2)").unwrap();
        assert!(as_multipolygon(geometry).is_none());
    }

    #[test]
    fn test_first_geometry_of_feature_collection() {
        let text = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {}, "geometry": null},
                {"type": "Feature", "properties": {},
                 "geometry": {"type": "Point", "coordinates": [-97.0, 31.0]}}
            ]
        }"#;
        let geometry = first_geojson_geometry(text).unwrap();
        match geometry {
            Geometry::Point(p) => {
                assert_eq!(p.x(), -97.0);
                assert_eq!(p.y(), 31.0);
            }
            other => panic!("unexpected geometry {:?}", other),
        }
    }

    #[test]
    fn test_envelope_of_polygon() {
        let geometry = parse_wkt("POLYGON((2 3, 5 3, 5 7, 2 7, 2 3))").unwrap();
        let env = envelope(&geometry).unwrap();
        assert_eq!(env.lower(), [2.0, 3.0]);
        assert_eq!(env.upper(), [5.0, 7.0]);
    }
}
