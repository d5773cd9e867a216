//! dfci - Drainage & flood-control infrastructure layer toolkit
//!
//! Tags uploaded point/polygon layers with their county, keeps them in a
//! local layer store with an approval workflow, exports them, and publishes
//! SLD styles to a GeoServer-compatible map server.

pub mod config;
pub mod county;
pub mod error;
pub mod export;
pub mod geometry;
pub mod models;
pub mod store;
pub mod style;
pub mod upload;

pub use config::Config;
pub use error::{DfciError, Result};
pub use models::{Endpoint, LayerKind, PointRecord, PolygonRecord};
pub use store::LayerStore;
