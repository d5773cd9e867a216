//! County assignment.
//!
//! Loads county boundaries from the map server's WFS endpoint and assigns
//! counties to points (containment) and other geometries (intersection)
//! using an R-tree spatial index.

mod boundary;
mod index;
mod service;
mod wfs;

pub use boundary::{parse_county_boundaries, CountyBoundary};
pub use index::CountySpatialIndex;
pub use service::CountyService;
pub use wfs::CountyFetcher;
