//! Persistent layer store backed by sled.
//!
//! Points, polygons and endpoints live in separate trees as JSON documents
//! keyed by their big-endian id, so iteration returns records in id order.

mod endpoints;
mod features;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::transaction::TransactionError;
use sled::{Db, Tree};
use std::path::Path;
use tracing::info;

use crate::error::{DfciError, Result};

const POINTS_TREE: &str = "points";
const POLYGONS_TREE: &str = "polygons";
const ENDPOINTS_TREE: &str = "endpoints";

/// Handle to the layer database
#[derive(Clone)]
pub struct LayerStore {
    db: Db,
    points: Tree,
    polygons: Tree,
    endpoints: Tree,
}

impl LayerStore {
    /// Open (or create) the store at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening layer store at {}", path.display());
        Self::from_db(sled::open(path)?)
    }

    /// In-memory store that disappears on drop
    pub fn temporary() -> Result<Self> {
        Self::from_db(sled::Config::new().temporary(true).open()?)
    }

    fn from_db(db: Db) -> Result<Self> {
        Ok(Self {
            points: db.open_tree(POINTS_TREE)?,
            polygons: db.open_tree(POLYGONS_TREE)?,
            endpoints: db.open_tree(ENDPOINTS_TREE)?,
            db,
        })
    }

    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }

    fn next_id(&self) -> Result<u64> {
        // generate_id starts at 0; keep ids 1-based for display
        Ok(self.db.generate_id()? + 1)
    }
}

fn put<T: Serialize>(tree: &Tree, id: u64, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec(value)?;
    tree.insert(id.to_be_bytes(), bytes)?;
    Ok(())
}

fn get<T: DeserializeOwned>(tree: &Tree, id: u64) -> Result<Option<T>> {
    match tree.get(id.to_be_bytes())? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

/// Serialize records up front so a transaction only copies bytes
fn encode_rows<'a, T, I>(records: I) -> Result<Vec<([u8; 8], Vec<u8>)>>
where
    T: Serialize + 'a,
    I: IntoIterator<Item = (u64, &'a T)>,
{
    records
        .into_iter()
        .map(|(id, record)| -> Result<_> { Ok((id.to_be_bytes(), serde_json::to_vec(record)?)) })
        .collect()
}

fn transaction_error(err: TransactionError<()>) -> DfciError {
    match err {
        TransactionError::Storage(e) => DfciError::Storage(e),
        TransactionError::Abort(()) => DfciError::Storage(sled::Error::Unsupported(
            "transaction aborted".into(),
        )),
    }
}

fn remove(tree: &Tree, id: u64) -> Result<bool> {
    Ok(tree.remove(id.to_be_bytes())?.is_some())
}

/// All records of a tree matching `keep`, in id order
fn scan<T, F>(tree: &Tree, mut keep: F) -> Result<Vec<T>>
where
    T: DeserializeOwned,
    F: FnMut(&T) -> bool,
{
    let mut out = Vec::new();
    for entry in tree.iter() {
        let (_, bytes) = entry?;
        let record: T = serde_json::from_slice(&bytes)?;
        if keep(&record) {
            out.push(record);
        }
    }
    Ok(out)
}
