//! County boundary fetcher for the map server's WFS endpoint.

use reqwest::Client;
use std::time::Duration;
use tracing::info;
use url::Url;

use super::{parse_county_boundaries, CountyBoundary, CountyService, CountySpatialIndex};
use crate::config::GeoServerConfig;
use crate::error::{DfciError, Result};

const USER_AGENT: &str = "dfci/0.1 (drainage flood-control infrastructure)";

/// Fetches the county reference layer as GeoJSON
pub struct CountyFetcher {
    client: Client,
    wfs_url: String,
    type_name: String,
    name_field: String,
}

impl CountyFetcher {
    pub fn new(config: &GeoServerConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            wfs_url: config.wfs_url.clone(),
            type_name: config.county_layer.clone(),
            name_field: config.county_name_field.clone(),
        })
    }

    /// WFS GetFeature request URL for the county layer
    pub fn request_url(&self) -> Result<Url> {
        Ok(Url::parse_with_params(
            &self.wfs_url,
            &[
                ("version", "1.0.0"),
                ("request", "GetFeature"),
                ("typeNames", self.type_name.as_str()),
                ("outputFormat", "application/json"),
            ],
        )?)
    }

    /// Fetch and parse all county boundaries
    pub async fn fetch_boundaries(&self) -> Result<Vec<CountyBoundary>> {
        info!("Fetching counties '{}' from {}", self.type_name, self.wfs_url);

        let url = self.request_url()?;
        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DfciError::MapServer {
                status: status.as_u16(),
                url: url.to_string(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let text = response.text().await?;
        parse_county_boundaries(&text, &self.name_field)
    }

    /// Fetch counties and build a ready-to-use lookup service
    pub async fn load_service(&self) -> Result<CountyService> {
        let boundaries = self.fetch_boundaries().await?;
        Ok(CountyService::new(CountySpatialIndex::build(boundaries)))
    }
}
