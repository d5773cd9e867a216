//! SLD 1.0.0 document templates for point, polygon and line layers.

use std::fmt;

use super::params::{LineStyle, PointStyle, PolygonStyle, StyleParams};
use crate::error::Result;

const SLD_ROOT: &str = concat!(
    "<StyledLayerDescriptor version=\"1.0.0\"\n",
    "\txsi:schemaLocation=\"http://www.opengis.net/sld http://schemas.opengis.net/sld/1.0.0/StyledLayerDescriptor.xsd\"\n",
    "\txmlns=\"http://www.opengis.net/sld\" xmlns:ogc=\"http://www.opengis.net/ogc\"\n",
    "\txmlns:xlink=\"http://www.w3.org/1999/xlink\" xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\">",
);

/// Root of line documents, which use the `sld:` prefix throughout
const SLD_PREFIXED_ROOT: &str = concat!(
    "<sld:StyledLayerDescriptor xmlns=\"http://www.opengis.net/sld\"\n",
    "\txmlns:sld=\"http://www.opengis.net/sld\" xmlns:ogc=\"http://www.opengis.net/ogc\"\n",
    "\txmlns:gml=\"http://www.opengis.net/gml\" version=\"1.0.0\">",
);

/// Layer name every line document is registered under
const LINE_LAYER_NAME: &str = "Default Styler";

/// Tab-indented XML builder; `prefix` is prepended to every SLD tag
struct SldWriter {
    out: String,
    prefix: &'static str,
    depth: usize,
}

impl SldWriter {
    fn new(encoding: &str, prefix: &'static str, root: &str) -> Self {
        let mut writer = Self {
            out: format!("<?xml version=\"1.0\" encoding=\"{}\"?>\n", encoding),
            prefix,
            depth: 0,
        };
        writer.line(root);
        writer.depth = 1;
        writer
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.out.push('\t');
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn open(&mut self, tag: &str) {
        self.line(&format!("<{}{}>", self.prefix, tag));
        self.depth += 1;
    }

    fn close(&mut self, tag: &str) {
        self.depth = self.depth.saturating_sub(1);
        self.line(&format!("</{}{}>", self.prefix, tag));
    }

    fn element(&mut self, tag: &str, value: impl fmt::Display) {
        self.line(&format!("<{p}{t}>{v}</{p}{t}>", p = self.prefix, t = tag, v = value));
    }

    fn css(&mut self, name: &str, value: impl fmt::Display) {
        self.line(&format!(
            "<{p}CssParameter name=\"{n}\">{v}</{p}CssParameter>",
            p = self.prefix,
            n = name,
            v = value
        ));
    }

    fn finish(mut self) -> String {
        self.depth = 0;
        self.line(&format!("</{}StyledLayerDescriptor>", self.prefix));
        self.out
    }
}

/// A generated style ready to publish
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleDocument {
    /// Normalised style name, also the `.sld` file stem on the server
    pub name: String,
    pub layer_name: String,
    pub body: String,
}

impl StyleDocument {
    pub fn file_name(&self) -> String {
        format!("{}.sld", self.name)
    }
}

/// Style name derived from a layer name: lowercased, spaces as `_`
pub fn style_name(layer_name: &str) -> String {
    layer_name.replace(' ', "_").to_lowercase()
}

/// Render the SLD document for a layer
pub fn render(layer_name: &str, params: &StyleParams) -> Result<StyleDocument> {
    params.validate()?;

    let title = escape_xml(layer_name);
    let body = match params {
        StyleParams::Point(p) => point_sld(&title, p),
        StyleParams::Polygon(p) => polygon_sld(&title, p),
        StyleParams::Line(l) => line_sld(&title, l),
    };

    Ok(StyleDocument {
        name: style_name(layer_name),
        layer_name: layer_name.to_string(),
        body,
    })
}

/// NamedLayer, UserStyle, FeatureTypeStyle and Rule shared by point and polygon documents
fn open_rule(w: &mut SldWriter, title: &str) {
    w.open("NamedLayer");
    w.element("Name", title);
    w.open("UserStyle");
    w.element("Title", title);
    w.open("FeatureTypeStyle");
    w.open("Rule");
    w.element("Title", title);
}

fn close_rule(w: &mut SldWriter) {
    w.close("Rule");
    w.close("FeatureTypeStyle");
    w.close("UserStyle");
    w.close("NamedLayer");
}

fn point_sld(title: &str, p: &PointStyle) -> String {
    let mut w = SldWriter::new("ISO-8859-1", "", SLD_ROOT);
    open_rule(&mut w, title);

    w.open("PointSymbolizer");
    w.open("Graphic");
    w.open("Mark");
    w.element("WellKnownName", escape_xml(&p.symbol.to_string()));
    w.open("Fill");
    w.css("fill", &p.fill);
    w.close("Fill");
    w.open("Stroke");
    w.css("stroke", &p.stroke);
    w.css("stroke-width", p.stroke_width);
    w.close("Stroke");
    w.close("Mark");
    w.element("Size", p.size);
    w.close("Graphic");
    w.close("PointSymbolizer");

    close_rule(&mut w);
    w.finish()
}

fn polygon_sld(title: &str, p: &PolygonStyle) -> String {
    let mut w = SldWriter::new("ISO-8859-1", "", SLD_ROOT);
    open_rule(&mut w, title);

    w.open("PolygonSymbolizer");
    w.open("Fill");
    w.css("fill", &p.fill);
    w.css("fill-opacity", p.fill_opacity);
    w.close("Fill");
    w.open("Stroke");
    w.css("stroke", &p.stroke);
    w.css("stroke-width", p.stroke_width);
    w.close("Stroke");
    w.close("PolygonSymbolizer");

    close_rule(&mut w);
    w.finish()
}

fn line_sld(title: &str, l: &LineStyle) -> String {
    let mut w = SldWriter::new("UTF-8", "sld:", SLD_PREFIXED_ROOT);
    w.open("NamedLayer");
    w.element("Name", LINE_LAYER_NAME);
    w.open("UserStyle");
    w.element("Name", title);
    w.element("Title", title);
    w.open("FeatureTypeStyle");
    w.element("Name", title);
    w.open("Rule");
    w.element("Title", title);

    // Decorative marks go first so the base stroke renders on top
    if let Some(d) = &l.decoration {
        w.open("LineSymbolizer");
        w.open("Stroke");
        w.open("GraphicStroke");
        w.open("Graphic");
        w.open("Mark");
        w.element("WellKnownName", escape_xml(&d.symbol.to_string()));
        w.open("Fill");
        w.css("fill", &l.stroke);
        w.close("Fill");
        w.close("Mark");
        w.open("Size");
        w.line(&format!("<ogc:Literal>{}</ogc:Literal>", d.size));
        w.close("Size");
        w.close("Graphic");
        w.close("GraphicStroke");
        w.css("stroke-dasharray", escape_xml(&d.dash_array));
        w.close("Stroke");
        w.close("LineSymbolizer");
    }

    w.open("LineSymbolizer");
    w.open("Stroke");
    w.css("stroke", &l.stroke);
    if let Some(dash) = l.dash_array.as_deref().filter(|s| !s.trim().is_empty()) {
        w.css("stroke-dasharray", escape_xml(dash));
    }
    if let Some(offset) = l.dash_offset.as_deref().filter(|s| !s.trim().is_empty()) {
        w.css("stroke-dashoffset", escape_xml(offset));
    }
    w.css("stroke-width", l.stroke_width);
    w.close("Stroke");
    w.close("LineSymbolizer");

    w.close("Rule");
    w.close("FeatureTypeStyle");
    w.close("UserStyle");
    w.close("NamedLayer");
    w.finish()
}

pub(crate) fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::params::{LineDecoration, MarkSymbol};

    fn point_params() -> StyleParams {
        StyleParams::Point(PointStyle {
            symbol: MarkSymbol::Circle,
            size: 8.0,
            fill: "1f78b4".parse().unwrap(),
            stroke: "#000000".parse().unwrap(),
            stroke_width: 1.5,
        })
    }

    fn line_params(decoration: Option<LineDecoration>) -> StyleParams {
        StyleParams::Line(LineStyle {
            stroke: "33a02c".parse().unwrap(),
            stroke_width: 2.0,
            dash_array: Some("5 2".into()),
            dash_offset: Some(String::new()),
            decoration,
        })
    }

    #[test]
    fn test_style_name() {
        assert_eq!(style_name("Storm Drain Inlets"), "storm_drain_inlets");
    }

    #[test]
    fn test_render_is_deterministic() {
        let a = render("Storm Drains", &point_params()).unwrap();
        let b = render("Storm Drains", &point_params()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.name, "storm_drains");
        assert_eq!(a.file_name(), "storm_drains.sld");
    }

    #[test]
    fn test_point_document_content() {
        let doc = render("Outfalls", &point_params()).unwrap();
        assert!(doc.body.starts_with("<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>\n"));
        assert!(doc.body.contains("<WellKnownName>circle</WellKnownName>"));
        assert!(doc.body.contains("<CssParameter name=\"fill\">#1f78b4</CssParameter>"));
        assert!(doc.body.contains("<CssParameter name=\"stroke-width\">1.5</CssParameter>"));
        assert!(doc.body.contains("<Size>8</Size>"));
        assert!(doc.body.ends_with("</StyledLayerDescriptor>\n"));
    }

    #[test]
    fn test_polygon_document_content() {
        let params = StyleParams::Polygon(PolygonStyle {
            fill: "e31a1c".parse().unwrap(),
            fill_opacity: 0.4,
            stroke: "000".parse().unwrap(),
            stroke_width: 0.5,
        });
        let doc = render("Detention Ponds", &params).unwrap();
        assert!(doc.body.contains("<PolygonSymbolizer>"));
        assert!(doc.body.contains("<CssParameter name=\"fill-opacity\">0.4</CssParameter>"));
        assert!(doc.body.contains("<CssParameter name=\"stroke\">#000</CssParameter>"));
    }

    #[test]
    fn test_line_without_decoration_is_balanced() {
        let doc = render("Channels", &line_params(None)).unwrap();
        assert_eq!(doc.body.matches("<sld:LineSymbolizer>").count(), 1);
        assert_eq!(doc.body.matches("</sld:LineSymbolizer>").count(), 1);
        assert!(doc.body.contains("<sld:CssParameter name=\"stroke-dasharray\">5 2</sld:CssParameter>"));
        assert!(!doc.body.contains("stroke-dashoffset"));
    }

    #[test]
    fn test_line_with_decoration() {
        let doc = render(
            "Levees",
            &line_params(Some(LineDecoration {
                symbol: MarkSymbol::Triangle,
                size: 4.0,
                dash_array: "4 12".into(),
            })),
        )
        .unwrap();
        assert_eq!(doc.body.matches("<sld:LineSymbolizer>").count(), 2);
        assert_eq!(doc.body.matches("</sld:LineSymbolizer>").count(), 2);
        assert!(doc.body.contains("<ogc:Literal>4</ogc:Literal>"));
        assert!(doc.body.contains("<sld:WellKnownName>triangle</sld:WellKnownName>"));
    }

    #[test]
    fn test_line_document_uses_prefixed_layout() {
        let doc = render("Channels", &line_params(None)).unwrap();
        assert!(doc
            .body
            .starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<sld:StyledLayerDescriptor "));
        assert!(doc.body.contains("\t<sld:NamedLayer>\n\t\t<sld:Name>Default Styler</sld:Name>\n"));
        assert!(doc.body.contains("<sld:Title>Channels</sld:Title>"));
        assert!(!doc.body.contains("<Stroke>"));
        assert!(doc.body.ends_with("</sld:StyledLayerDescriptor>\n"));
    }

    #[test]
    fn test_layer_name_is_escaped() {
        let doc = render("Pumps & Gates", &point_params()).unwrap();
        assert!(doc.body.contains("<Name>Pumps &amp; Gates</Name>"));
        assert_eq!(doc.name, "pumps_&_gates");
    }
}
