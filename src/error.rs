//! Error type shared by the library modules.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DfciError>;

#[derive(Debug, Error)]
pub enum DfciError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("map server returned {status} for {url}: {body}")]
    MapServer {
        status: u16,
        url: String,
        body: String,
    },

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("invalid GeoJSON: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("invalid WKT geometry: {0}")]
    Wkt(String),

    #[error("unsupported geometry: {0}")]
    Geometry(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("shapefile error: {0}")]
    Shapefile(#[from] shapefile::Error),

    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("no county found for geometry")]
    NoCounty,

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: u64 },

    #[error("invalid style parameter: {0}")]
    Style(String),

    #[error("invalid upload: {0}")]
    Upload(String),
}
