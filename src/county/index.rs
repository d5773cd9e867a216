//! Spatial index for county lookups.

use geo::{Contains, Geometry, Intersects, Point};
use rstar::{RTree, RTreeObject, AABB};
use std::sync::Arc;
use tracing::info;

use super::CountyBoundary;
use crate::geometry::envelope;

/// Wrapper for R-tree indexing of county boundaries
#[derive(Clone)]
pub struct IndexedCounty {
    pub boundary: Arc<CountyBoundary>,
    /// Position in the reference dataset, used to pick the first match
    ordinal: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedCounty {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

impl IndexedCounty {
    pub fn new(ordinal: usize, boundary: Arc<CountyBoundary>) -> Option<Self> {
        let (min_x, min_y, max_x, max_y) = boundary.bbox()?;
        Some(Self {
            boundary,
            ordinal,
            envelope: AABB::from_corners([min_x, min_y], [max_x, max_y]),
        })
    }
}

/// Spatial index for county boundaries using R-tree
pub struct CountySpatialIndex {
    tree: RTree<IndexedCounty>,
    /// Boundaries in dataset order
    ordered: Vec<Arc<CountyBoundary>>,
}

impl CountySpatialIndex {
    /// Build spatial index from county boundaries
    pub fn build(boundaries: Vec<CountyBoundary>) -> Self {
        info!(
            "Building spatial index for {} county boundaries...",
            boundaries.len()
        );

        let ordered: Vec<Arc<CountyBoundary>> = boundaries.into_iter().map(Arc::new).collect();

        let indexed: Vec<IndexedCounty> = ordered
            .iter()
            .enumerate()
            .filter_map(|(i, b)| IndexedCounty::new(i, Arc::clone(b)))
            .collect();

        let tree = RTree::bulk_load(indexed);
        info!("Spatial index built with {} entries", tree.size());

        Self { tree, ordered }
    }

    /// Find all counties containing a point, in dataset order
    pub fn containing_point(&self, lon: f64, lat: f64) -> Vec<Arc<CountyBoundary>> {
        let point = Point::new(lon, lat);
        let query_envelope = AABB::from_point([lon, lat]);

        let mut hits: Vec<&IndexedCounty> = self
            .tree
            .locate_in_envelope_intersecting(&query_envelope)
            .filter(|ic| ic.boundary.geometry.contains(&point))
            .collect();

        hits.sort_by_key(|ic| ic.ordinal);
        hits.into_iter().map(|ic| Arc::clone(&ic.boundary)).collect()
    }

    /// Find all counties intersecting a geometry, in dataset order
    pub fn intersecting(&self, geometry: &Geometry<f64>) -> Vec<Arc<CountyBoundary>> {
        let Some(query_envelope) = envelope(geometry) else {
            return Vec::new();
        };

        let mut hits: Vec<&IndexedCounty> = self
            .tree
            .locate_in_envelope_intersecting(&query_envelope)
            .filter(|ic| geometry.intersects(&ic.boundary.geometry))
            .collect();

        hits.sort_by_key(|ic| ic.ordinal);
        hits.into_iter().map(|ic| Arc::clone(&ic.boundary)).collect()
    }

    /// Get total number of indexed boundaries
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Iterate over all boundaries in dataset order
    pub fn boundaries(&self) -> impl Iterator<Item = &Arc<CountyBoundary>> {
        self.ordered.iter()
    }
}
