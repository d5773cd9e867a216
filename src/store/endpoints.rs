use tracing::info;

use super::{put, remove, scan, LayerStore};
use crate::error::{DfciError, Result};
use crate::models::{Endpoint, NewEndpoint};

impl LayerStore {
    pub fn add_endpoint(&self, new: NewEndpoint) -> Result<Endpoint> {
        let endpoint = Endpoint {
            id: self.next_id()?,
            layer_name: new.layer_name,
            layer_type: new.layer_type,
            url: new.url,
            metadata: new.metadata,
        };
        put(&self.endpoints, endpoint.id, &endpoint)?;
        info!(
            "Added {} endpoint '{}' ({})",
            endpoint.layer_type, endpoint.layer_name, endpoint.url
        );
        Ok(endpoint)
    }

    pub fn delete_endpoint(&self, id: u64) -> Result<()> {
        if !remove(&self.endpoints, id)? {
            return Err(DfciError::NotFound {
                kind: "endpoint",
                id,
            });
        }
        Ok(())
    }

    pub fn endpoints(&self) -> Result<Vec<Endpoint>> {
        scan(&self.endpoints, |_: &Endpoint| true)
    }
}
