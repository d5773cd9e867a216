//! Layer styling.
//!
//! Renders SLD documents for point, polygon and line layers and publishes
//! them to the map server's REST API.

mod legend;
mod params;
mod publisher;
mod sld;

pub use legend::{endpoint_legend_url, endpoint_options, layer_legend_url, legend_options, LegendOption};
pub use params::{
    parse_line_symbol, HexColor, LineDecoration, LineStyle, MarkSymbol, PointStyle, PolygonStyle,
    StyleParams,
};
pub use publisher::{GeoServerClient, PublishOutcome};
pub use sld::{render, style_name, StyleDocument};

use crate::error::Result;

/// Render a layer's style and push it to the map server
pub async fn publish_layer_style(
    client: &GeoServerClient,
    layer_name: &str,
    params: &StyleParams,
    exists: Option<bool>,
) -> Result<StyleDocument> {
    let doc = render(layer_name, params)?;
    client.publish(&doc, exists).await?;
    Ok(doc)
}
