//! Styling parameters accepted by the SLD templates.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DfciError;

/// Hex colour without the leading `#`, as `rrggbb` or `rgb`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor(String);

impl HexColor {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for HexColor {
    type Err = DfciError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim().trim_start_matches('#');
        let valid_len = digits.len() == 6 || digits.len() == 3;
        if !valid_len || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(DfciError::Style(format!("invalid hex colour '{}'", s)));
        }
        Ok(HexColor(digits.to_string()))
    }
}

impl TryFrom<String> for HexColor {
    type Error = DfciError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HexColor> for String {
    fn from(color: HexColor) -> Self {
        color.0
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// SLD well-known mark names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkSymbol {
    Square,
    Circle,
    Triangle,
    Star,
    Cross,
    X,
    /// Vendor marks such as `shape://vertline`
    Other(String),
}

impl FromStr for MarkSymbol {
    type Err = DfciError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.to_ascii_lowercase().as_str() {
            "" => Err(DfciError::Style("empty mark symbol".into())),
            "square" => Ok(MarkSymbol::Square),
            "circle" => Ok(MarkSymbol::Circle),
            "triangle" => Ok(MarkSymbol::Triangle),
            "star" => Ok(MarkSymbol::Star),
            "cross" => Ok(MarkSymbol::Cross),
            "x" => Ok(MarkSymbol::X),
            _ => Ok(MarkSymbol::Other(s.to_string())),
        }
    }
}

impl fmt::Display for MarkSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkSymbol::Square => write!(f, "square"),
            MarkSymbol::Circle => write!(f, "circle"),
            MarkSymbol::Triangle => write!(f, "triangle"),
            MarkSymbol::Star => write!(f, "star"),
            MarkSymbol::Cross => write!(f, "cross"),
            MarkSymbol::X => write!(f, "x"),
            MarkSymbol::Other(name) => write!(f, "{}", name),
        }
    }
}

/// Parse a line decoration symbol; `none` means no decoration
pub fn parse_line_symbol(s: &str) -> Result<Option<MarkSymbol>, DfciError> {
    if s.trim().eq_ignore_ascii_case("none") {
        Ok(None)
    } else {
        s.parse().map(Some)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointStyle {
    pub symbol: MarkSymbol,
    pub size: f64,
    pub fill: HexColor,
    pub stroke: HexColor,
    pub stroke_width: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolygonStyle {
    pub fill: HexColor,
    pub fill_opacity: f64,
    pub stroke: HexColor,
    pub stroke_width: f64,
}

/// Mark repeated along a line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineDecoration {
    pub symbol: MarkSymbol,
    pub size: f64,
    /// Spacing of the repeated marks, e.g. `4 8`
    pub dash_array: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineStyle {
    pub stroke: HexColor,
    pub stroke_width: f64,
    pub dash_array: Option<String>,
    pub dash_offset: Option<String>,
    pub decoration: Option<LineDecoration>,
}

/// Parameters for one of the three geometry kinds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StyleParams {
    Point(PointStyle),
    Polygon(PolygonStyle),
    Line(LineStyle),
}

impl StyleParams {
    /// Reject values the map server would silently misrender
    pub fn validate(&self) -> Result<(), DfciError> {
        let check = |name: &str, value: f64| {
            if value.is_finite() && value >= 0.0 {
                Ok(())
            } else {
                Err(DfciError::Style(format!("{} must be >= 0, got {}", name, value)))
            }
        };

        match self {
            StyleParams::Point(p) => {
                check("size", p.size)?;
                check("stroke width", p.stroke_width)
            }
            StyleParams::Polygon(p) => {
                check("stroke width", p.stroke_width)?;
                check("fill opacity", p.fill_opacity)?;
                if p.fill_opacity > 1.0 {
                    return Err(DfciError::Style(format!(
                        "fill opacity must be <= 1, got {}",
                        p.fill_opacity
                    )));
                }
                Ok(())
            }
            StyleParams::Line(l) => {
                check("stroke width", l.stroke_width)?;
                if let Some(d) = &l.decoration {
                    check("symbol size", d.size)?;
                }
                Ok(())
            }
        }
    }
}
