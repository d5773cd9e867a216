//! GeoServer REST client for registering and uploading styles.

use reqwest::{header, Client, Method, Request, StatusCode};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use super::sld::{escape_xml, StyleDocument};
use crate::config::GeoServerConfig;
use crate::error::{DfciError, Result};

const SLD_CONTENT_TYPE: &str = "application/vnd.ogc.sld+xml";
const XML_CONTENT_TYPE: &str = "text/xml";

/// What a publish call did on the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Created,
    Updated,
}

/// Client for the map server's `styles` REST resource
pub struct GeoServerClient {
    client: Client,
    rest_url: Url,
    username: String,
    password: String,
}

impl GeoServerClient {
    pub fn new(config: &GeoServerConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            rest_url: Url::parse(&config.rest_url)?,
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    /// REST URL with `segments` appended; each segment is percent-encoded
    fn resource(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.rest_url.clone();
        url.path_segments_mut()
            .map_err(|_| DfciError::Config(format!("invalid REST URL {}", self.rest_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn style_url(&self, doc: &StyleDocument) -> Result<Url> {
        self.resource(&["styles", &doc.file_name()])
    }

    /// Whether the style is already registered
    pub async fn style_exists(&self, name: &str) -> Result<bool> {
        let url = self.resource(&["styles", &format!("{}.sld", name)])?;
        let response = self
            .client
            .get(url.clone())
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(DfciError::MapServer {
                status: status.as_u16(),
                url: url.to_string(),
                body: response.text().await.unwrap_or_default(),
            }),
        }
    }

    /// Requests needed to publish `doc`: a create call when the style is
    /// absent, followed by the body upload
    pub fn build_requests(&self, doc: &StyleDocument, exists: bool) -> Result<Vec<Request>> {
        let mut requests = Vec::with_capacity(2);

        if !exists {
            let payload = format!(
                "<style><name>{}</name><filename>{}</filename></style>",
                escape_xml(&doc.name),
                escape_xml(&doc.file_name())
            );
            requests.push(
                self.client
                    .request(Method::POST, self.resource(&["styles"])?)
                    .basic_auth(&self.username, Some(&self.password))
                    .header(header::CONTENT_TYPE, XML_CONTENT_TYPE)
                    .body(payload)
                    .build()?,
            );
        }

        requests.push(
            self.client
                .request(Method::PUT, self.style_url(doc)?)
                .basic_auth(&self.username, Some(&self.password))
                .header(header::CONTENT_TYPE, SLD_CONTENT_TYPE)
                .body(doc.body.clone())
                .build()?,
        );

        Ok(requests)
    }

    /// Register (if needed) and upload a style document.
    ///
    /// `exists` skips the existence check when the caller already knows.
    pub async fn publish(&self, doc: &StyleDocument, exists: Option<bool>) -> Result<PublishOutcome> {
        let exists = match exists {
            Some(e) => e,
            None => self.style_exists(&doc.name).await?,
        };

        for request in self.build_requests(doc, exists)? {
            let method = request.method().clone();
            let url = request.url().to_string();
            debug!("{} {}", method, url);

            let response = self.client.execute(request).await?;
            let status = response.status();
            if !status.is_success() {
                return Err(DfciError::MapServer {
                    status: status.as_u16(),
                    url,
                    body: response.text().await.unwrap_or_default(),
                });
            }
        }

        let outcome = if exists {
            PublishOutcome::Updated
        } else {
            PublishOutcome::Created
        };
        info!("Published style '{}' ({:?})", doc.name, outcome);
        Ok(outcome)
    }
}
