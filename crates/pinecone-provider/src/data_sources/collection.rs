//! `pinecone_collection` data source

use crate::error::{ResourceError, ResourceKind};
use pinecone_core::ControlPlane;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Attributes exposed for an existing collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionDataModel {
    /// `datasource-pinecone_collection-{environment}/{name}`
    pub id: String,
    pub name: String,
    pub dimension: u32,
}

/// Looks up a collection by name without managing it
#[derive(Clone)]
pub struct CollectionDataSource {
    client: Arc<dyn ControlPlane>,
}

impl CollectionDataSource {
    pub const TYPE_NAME: &'static str = "pinecone_collection";

    pub fn new(client: Arc<dyn ControlPlane>) -> Self {
        Self { client }
    }

    pub async fn read(&self, name: &str) -> Result<CollectionDataModel, ResourceError> {
        debug!(name, "CollectionDataSource::read");

        let description = self
            .client
            .describe_collection(name)
            .await
            .map_err(|source| ResourceError::Read {
                kind: ResourceKind::Collection,
                source,
            })?;

        info!(name, dimension = description.dimension, "DescribeCollection OK");

        Ok(CollectionDataModel {
            id: format!(
                "datasource-{}-{}/{}",
                Self::TYPE_NAME,
                self.client.environment(),
                description.name
            ),
            name: description.name,
            dimension: description.dimension,
        })
    }
}
