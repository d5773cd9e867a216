//! WMS GetLegendGraphic URLs for stored layers and external endpoints.

use serde::Serialize;
use serde_json::Value;

use super::sld::style_name;
use crate::models::{Endpoint, EndpointOption, EndpointType, LayerKind, LayerOptions};

const LEGEND_QUERY: &str = "?REQUEST=GetLegendGraphic&VERSION=1.0.0&FORMAT=image/png&\
                            WIDTH=20&HEIGHT=20&LEGEND_OPTIONS=forceLabels:on;";

/// Legend entry for a stored layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegendOption {
    pub url: String,
    pub style: String,
}

/// Legend URL of a stored layer rendered with its own style
pub fn layer_legend_url(wms_url: &str, workspace: &str, kind: LayerKind, layer_name: &str) -> String {
    format!(
        "{}{}&LAYER={}:{}&STYLE={}",
        wms_url,
        LEGEND_QUERY,
        workspace,
        kind,
        style_name(layer_name)
    )
}

/// Legend entries for every stored layer, polygons first
pub fn legend_options(wms_url: &str, workspace: &str, layers: &LayerOptions) -> Vec<LegendOption> {
    let kinds = [
        (LayerKind::Polygons, &layers.polygons),
        (LayerKind::Points, &layers.points),
    ];

    kinds
        .iter()
        .flat_map(|(kind, names)| {
            names.iter().map(move |name| LegendOption {
                url: layer_legend_url(wms_url, workspace, *kind, name),
                style: style_name(name),
            })
        })
        .collect()
}

/// Legend URL of a WMS endpoint, taken from its `LAYERS` metadata entry
pub fn endpoint_legend_url(endpoint: &Endpoint) -> Option<String> {
    if endpoint.layer_type != EndpointType::Wms {
        return None;
    }
    let layer = endpoint.metadata.get("LAYERS").and_then(Value::as_str)?;
    Some(format!("{}{}&LAYER={}", endpoint.url, LEGEND_QUERY, layer))
}

/// Pick-list entries for the configured endpoints
pub fn endpoint_options(endpoints: &[Endpoint]) -> Vec<EndpointOption> {
    endpoints
        .iter()
        .map(|e| EndpointOption {
            layer_name: e.layer_name.clone(),
            layer_type: e.layer_type,
            url: e.url.clone(),
            legend_url: endpoint_legend_url(e),
            meta: e.metadata.clone(),
        })
        .collect()
}
