//! Temporary on-disk staging of uploaded files.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{Builder, TempDir};
use tracing::debug;

use super::UploadFile;
use crate::error::{DfciError, Result};

/// Files of one upload written into a private temporary directory.
///
/// The directory and its contents are removed when this value is dropped.
pub struct StagedUpload {
    dir: TempDir,
    shapefile: Option<PathBuf>,
    csv: Option<PathBuf>,
}

impl StagedUpload {
    /// Write `files` into a fresh directory under `workspace`
    pub fn stage(workspace: &Path, files: &[UploadFile]) -> Result<Self> {
        fs::create_dir_all(workspace)?;
        let dir = Builder::new().prefix("dfci-upload-").tempdir_in(workspace)?;
        debug!("Staging {} files in {}", files.len(), dir.path().display());

        let mut shapefile = None;
        let mut csv = None;

        for file in files {
            let name = safe_file_name(&file.name)?;
            let path = dir.path().join(name);
            fs::write(&path, &file.bytes)?;

            match extension(&path).as_deref() {
                Some("shp") => shapefile = Some(path),
                Some("csv") => csv = Some(path),
                _ => {}
            }
        }

        Ok(Self {
            dir,
            shapefile,
            csv,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn shapefile(&self) -> Option<&Path> {
        self.shapefile.as_deref()
    }

    pub fn csv(&self) -> Option<&Path> {
        self.csv.as_deref()
    }
}

/// Write a metadata document into the workspace, returning its stored name
pub fn save_meta_file(workspace: &Path, file: &UploadFile) -> Result<String> {
    let name = safe_file_name(&file.name)?;
    let dir = workspace.join("meta");
    fs::create_dir_all(&dir)?;
    fs::write(dir.join(name), &file.bytes)?;
    Ok(name.to_string())
}

/// Strip any directory components a client may have sent
fn safe_file_name(name: &str) -> Result<&str> {
    Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty() && *n != "." && *n != "..")
        .ok_or_else(|| DfciError::Upload(format!("invalid file name '{}'", name)))
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_detects_kinds_and_cleans_up() {
        let workspace = tempfile::tempdir().unwrap();
        let files = vec![
            UploadFile::new("../../etc/drains.csv", b"geometry\n".to_vec()),
            UploadFile::new("readme.txt", b"hello".to_vec()),
        ];

        let staged_path;
        {
            let staged = StagedUpload::stage(workspace.path(), &files).unwrap();
            staged_path = staged.path().to_path_buf();
            assert!(staged_path.starts_with(workspace.path()));
            assert_eq!(staged.csv().unwrap(), staged_path.join("drains.csv"));
            assert!(staged.shapefile().is_none());
        }

        assert!(!staged_path.exists());
    }

    #[test]
    fn test_rejects_empty_name() {
        assert!(safe_file_name("..").is_err());
        assert!(safe_file_name("").is_err());
        assert_eq!(safe_file_name("dir/layer.shp").unwrap(), "layer.shp");
    }

    #[test]
    fn test_save_meta_file() {
        let workspace = tempfile::tempdir().unwrap();
        let name = save_meta_file(
            workspace.path(),
            &UploadFile::new("inspection.pdf", b"%PDF".to_vec()),
        )
        .unwrap();
        assert_eq!(name, "inspection.pdf");
        assert!(workspace.path().join("meta").join("inspection.pdf").exists());
    }
}
