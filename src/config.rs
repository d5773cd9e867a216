use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{DfciError, Result};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub geoserver: GeoServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeoServerConfig {
    pub wfs_url: String,
    pub wms_url: String,
    /// REST API root, e.g. `http://host:8080/geoserver/rest/`
    pub rest_url: String,
    /// Workspace the point/polygon layers are published under
    #[serde(default = "default_workspace")]
    pub workspace: String,
    pub username: String,
    pub password: String,
    #[serde(default = "default_county_layer")]
    pub county_layer: String,
    #[serde(default = "default_county_name_field")]
    pub county_name_field: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    /// Scratch space for staged uploads and metadata documents
    #[serde(default = "default_workspace_dir")]
    pub workspace_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            workspace_dir: default_workspace_dir(),
        }
    }
}

fn default_workspace() -> String {
    "glo_dfci".to_string()
}

fn default_county_layer() -> String {
    "glo_vli:TexasCounties".to_string()
}

fn default_county_name_field() -> String {
    "CNTY_NM".to_string()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("dfci.db")
}

fn default_workspace_dir() -> PathBuf {
    PathBuf::from("workspace")
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            DfciError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(content)
            .map_err(|e| DfciError::Config(format!("failed to parse config: {}", e)))?;

        // REST root is kept in directory form
        if !config.geoserver.rest_url.ends_with('/') {
            config.geoserver.rest_url.push('/');
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_rest_url_normalisation() {
        let config = Config::from_toml(
            r#"
            [geoserver]
            wfs_url = "http://localhost:8080/geoserver/wfs"
            wms_url = "http://localhost:8080/geoserver/wms"
            rest_url = "http://localhost:8080/geoserver/rest"
            username = "admin"
            password = "geoserver"
            "#,
        )
        .unwrap();

        assert_eq!(
            config.geoserver.rest_url,
            "http://localhost:8080/geoserver/rest/"
        );
        assert_eq!(config.geoserver.county_name_field, "CNTY_NM");
        assert_eq!(config.geoserver.workspace, "glo_dfci");
        assert_eq!(config.storage.db_path, PathBuf::from("dfci.db"));
    }

    #[test]
    fn test_missing_section_is_config_error() {
        let err = Config::from_toml("[storage]\ndb_path = \"x.db\"").unwrap_err();
        assert!(matches!(err, DfciError::Config(_)));
    }
}
