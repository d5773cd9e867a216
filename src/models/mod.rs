//! Core data models for stored layers.

pub mod endpoint;
pub mod feature;

pub use endpoint::{Endpoint, EndpointOption, EndpointType, NewEndpoint};
pub use feature::{
    LayerKind, LayerOptions, NewPoint, NewPolygon, PointRecord, PolygonRecord, Properties,
    RecordUpdate,
};
