//! Point and polygon records stored per layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-form attribute/metadata mapping attached to a record
pub type Properties = Map<String, Value>;

/// Kind of feature layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    Points,
    Polygons,
}

impl std::fmt::Display for LayerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayerKind::Points => write!(f, "points"),
            LayerKind::Polygons => write!(f, "polygons"),
        }
    }
}

impl std::str::FromStr for LayerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "points" | "point" => Ok(LayerKind::Points),
            "polygons" | "polygon" => Ok(LayerKind::Polygons),
            other => Err(format!("unknown layer kind '{}'", other)),
        }
    }
}

/// A stored point feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointRecord {
    pub id: u64,
    pub layer_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub county: String,
    pub approved: bool,
    #[serde(default)]
    pub attributes: Properties,
    #[serde(default)]
    pub metadata: Properties,
    pub created_at: DateTime<Utc>,
}

impl PointRecord {
    pub fn point(&self) -> geo::Point<f64> {
        geo::Point::new(self.longitude, self.latitude)
    }
}

/// A stored polygon feature. The geometry is kept as WKT.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolygonRecord {
    pub id: u64,
    pub layer_name: String,
    pub geometry: String,
    pub county: String,
    pub approved: bool,
    #[serde(default)]
    pub attributes: Properties,
    #[serde(default)]
    pub metadata: Properties,
    pub created_at: DateTime<Utc>,
}

/// Input for adding a single point to a layer
#[derive(Debug, Clone, Default)]
pub struct NewPoint {
    pub layer_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub attributes: Properties,
    pub metadata: Properties,
}

/// Input for adding a single polygon to a layer
#[derive(Debug, Clone, Default)]
pub struct NewPolygon {
    pub layer_name: String,
    /// WKT geometry in geographic coordinates
    pub geometry: String,
    pub attributes: Properties,
    pub metadata: Properties,
}

/// Partial update applied by the approval/edit operations
#[derive(Debug, Clone, Default)]
pub struct RecordUpdate {
    pub approved: Option<bool>,
    pub attributes: Option<Properties>,
    pub metadata: Option<Properties>,
}

impl RecordUpdate {
    pub fn approve() -> Self {
        Self {
            approved: Some(true),
            ..Default::default()
        }
    }

    pub(crate) fn apply(
        self,
        approved: &mut bool,
        attributes: &mut Properties,
        metadata: &mut Properties,
    ) {
        if let Some(a) = self.approved {
            *approved = a;
        }
        if let Some(attrs) = self.attributes {
            *attributes = attrs;
        }
        if let Some(meta) = self.metadata {
            *metadata = meta;
        }
    }
}

/// Distinct layer names per kind
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerOptions {
    pub points: Vec<String>,
    pub polygons: Vec<String>,
}
