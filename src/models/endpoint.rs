//! External WMS/WFS layer references.

use serde::{Deserialize, Serialize};

use super::Properties;

/// Protocol of an external layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointType {
    Wms,
    Wfs,
}

impl std::fmt::Display for EndpointType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EndpointType::Wms => write!(f, "wms"),
            EndpointType::Wfs => write!(f, "wfs"),
        }
    }
}

impl std::str::FromStr for EndpointType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "wms" => Ok(EndpointType::Wms),
            "wfs" => Ok(EndpointType::Wfs),
            other => Err(format!("unknown endpoint type '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub id: u64,
    pub layer_name: String,
    pub layer_type: EndpointType,
    pub url: String,
    /// For WMS endpoints this holds the request parameters, notably `LAYERS`
    #[serde(default)]
    pub metadata: Properties,
}

#[derive(Debug, Clone)]
pub struct NewEndpoint {
    pub layer_name: String,
    pub layer_type: EndpointType,
    pub url: String,
    pub metadata: Properties,
}

/// Entry shown in the endpoint pick-list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointOption {
    pub layer_name: String,
    pub layer_type: EndpointType,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legend_url: Option<String>,
    pub meta: Properties,
}
