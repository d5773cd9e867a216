//! Upload processing.
//!
//! Uploaded shapefile bundles or WKT CSV files are staged into a temporary
//! directory, read into features, tagged with their county and stored.
//! The staging directory never outlives the call.

mod process;
mod reader;
mod staging;

pub use process::{process_upload, upload_attributes, UploadReport};
pub use reader::{
    infer_value, read_csv, read_shapefile, UploadedFeature, UploadedLayer, GEOMETRY_COLUMN,
};
pub use staging::{save_meta_file, StagedUpload};

use std::path::Path;

use crate::error::Result;

/// A file received from a client
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Read a file from disk, keeping only its file name
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self { name, bytes })
    }
}
