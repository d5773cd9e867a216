//! County assignment for uploaded geometries.

use geo::Geometry;
use tracing::debug;

use super::CountySpatialIndex;
use crate::error::{DfciError, Result};
use crate::geometry::parse_wkt;

/// Assigns counties to geometries
pub struct CountyService {
    index: CountySpatialIndex,
}

impl CountyService {
    /// Create a new county service from a spatial index
    pub fn new(index: CountySpatialIndex) -> Self {
        Self { index }
    }

    /// County containing the point, if any
    pub fn county_for_point(&self, lon: f64, lat: f64) -> Option<String> {
        let hits = self.index.containing_point(lon, lat);
        debug!(
            "County lookup at ({}, {}): {} candidates",
            lon,
            lat,
            hits.len()
        );
        hits.first().map(|b| b.name.clone())
    }

    /// County for any geometry.
    ///
    /// Points use containment; every other geometry uses intersection and
    /// takes the first county in dataset order.
    pub fn assign(&self, geometry: &Geometry<f64>) -> Result<String> {
        if let Geometry::Point(p) = geometry {
            return self
                .county_for_point(p.x(), p.y())
                .ok_or(DfciError::NoCounty);
        }

        let hits = self.index.intersecting(geometry);
        if hits.len() > 1 {
            debug!(
                "Geometry intersects {} counties, keeping {}",
                hits.len(),
                hits[0].name
            );
        }
        hits.first()
            .map(|b| b.name.clone())
            .ok_or(DfciError::NoCounty)
    }

    /// County for a WKT geometry
    pub fn county_for_wkt(&self, wkt: &str) -> Result<String> {
        let geometry = parse_wkt(wkt)?;
        self.assign(&geometry)
    }

    /// County names in dataset order, for pick-lists
    pub fn county_options(&self) -> Vec<String> {
        self.index.boundaries().map(|b| b.name.clone()).collect()
    }

    /// Get the spatial index (for stats/debugging)
    pub fn index(&self) -> &CountySpatialIndex {
        &self.index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::county::CountyBoundary;
    use geo::{polygon, MultiPolygon};

    fn service() -> CountyService {
        let travis = polygon![
            (x: -98.0, y: 30.0),
            (x: -97.0, y: 30.0),
            (x: -97.0, y: 31.0),
            (x: -98.0, y: 31.0),
            (x: -98.0, y: 30.0),
        ];
        let hays = polygon![
            (x: -99.0, y: 30.0),
            (x: -98.0, y: 30.0),
            (x: -98.0, y: 31.0),
            (x: -99.0, y: 31.0),
            (x: -99.0, y: 30.0),
        ];
        CountyService::new(CountySpatialIndex::build(vec![
            CountyBoundary::new("Travis", MultiPolygon::new(vec![travis])),
            CountyBoundary::new("Hays", MultiPolygon::new(vec![hays])),
        ]))
    }

    #[test]
    fn test_point_strictly_inside() {
        let service = service();
        assert_eq!(service.county_for_point(-97.5, 30.5), Some("Travis".to_string()));
        assert_eq!(service.county_for_point(-98.5, 30.5), Some("Hays".to_string()));
    }

    #[test]
    fn test_point_outside_all_counties() {
        let service = service();
        assert_eq!(service.county_for_point(-90.0, 30.5), None);
        let err = service.assign(&geo::Point::new(-90.0, 30.5).into());
        assert!(matches!(err, Err(DfciError::NoCounty)));
    }

    #[test]
    fn test_polygon_in_one_county() {
        let service = service();
        let county = service
            .county_for_wkt("POLYGON((-97.8 30.2, -97.2 30.2, -97.2 30.8, -97.8 30.8, -97.8 30.2))")
            .unwrap();
        assert_eq!(county, "Travis");
    }

    #[test]
    fn test_polygon_spanning_two_counties_takes_first() {
        let service = service();
        let county = service
            .county_for_wkt("POLYGON((-98.5 30.2, -97.5 30.2, -97.5 30.8, -98.5 30.8, -98.5 30.2))")
            .unwrap();
        assert_eq!(county, "Travis");
    }

    #[test]
    fn test_county_options_in_dataset_order() {
        assert_eq!(service().county_options(), vec!["Travis", "Hays"]);
    }
}
