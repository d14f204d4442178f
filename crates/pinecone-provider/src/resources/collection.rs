//! `pinecone_collection` resource
//!
//! Collections are static snapshots of an index. Every attribute is
//! fixed at creation, so there is no in-place update.

use crate::error::{ResourceError, ResourceKind};
use crate::readiness::ReadinessPoller;
use pinecone_core::{
    CollectionDescription, ControlPlane, CreateCollectionRequest, ProvisioningStatus,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

const KIND: ResourceKind = ResourceKind::Collection;

/// Desired collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionPlan {
    pub name: String,

    /// Index to snapshot
    pub source: String,
}

/// Collection attributes as recorded after an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionState {
    /// `{environment}/{name}`
    pub id: String,
    pub name: String,
    /// Unknown after import; the service does not report it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub dimension: u32,
    pub size: u64,
    pub vector_count: u64,
    pub status: String,
}

impl CollectionState {
    fn from_description(
        id: String,
        source: Option<String>,
        description: CollectionDescription,
    ) -> Self {
        Self {
            id,
            name: description.name,
            source,
            dimension: description.dimension,
            size: description.size,
            vector_count: description.vector_count,
            status: description.status,
        }
    }
}

/// Controller for `pinecone_collection`
#[derive(Clone)]
pub struct CollectionResource {
    client: Arc<dyn ControlPlane>,
    poller: ReadinessPoller,
}

impl CollectionResource {
    pub const TYPE_NAME: &'static str = "pinecone_collection";

    pub fn new(client: Arc<dyn ControlPlane>, poller: ReadinessPoller) -> Self {
        Self { client, poller }
    }

    fn id_for(&self, name: &str) -> String {
        format!("{}/{name}", self.client.environment())
    }

    /// State recorded while the snapshot is still being built; size and
    /// counts are filled in by the next read
    pub fn pending_state(&self, plan: &CollectionPlan, status: &str) -> CollectionState {
        CollectionState {
            id: self.id_for(&plan.name),
            name: plan.name.clone(),
            source: Some(plan.source.clone()),
            dimension: 0,
            size: 0,
            vector_count: 0,
            status: status.to_string(),
        }
    }

    /// Create the collection and wait until the snapshot is ready
    pub async fn create(&self, plan: &CollectionPlan) -> Result<CollectionState, ResourceError> {
        debug!(name = %plan.name, source = %plan.source, "CollectionResource::create");

        let request = CreateCollectionRequest {
            name: plan.name.clone(),
            source: plan.source.clone(),
        };
        request
            .validate()
            .map_err(|source| ResourceError::Validation { kind: KIND, source })?;

        let response = self
            .client
            .create_collection(&request)
            .await
            .map_err(|source| ResourceError::Create { kind: KIND, source })?;

        let description = self
            .poller
            .wait_for_collection(self.client.as_ref(), &plan.name)
            .await
            .map_err(|source| ResourceError::Poll { kind: KIND, source })?;

        info!(name = %plan.name, response = %response, "CreateCollection OK");

        Ok(CollectionState::from_description(
            self.id_for(&plan.name),
            Some(plan.source.clone()),
            description,
        ))
    }

    /// Refresh state from the service; `None` when the collection no longer exists
    pub async fn read(
        &self,
        state: &CollectionState,
    ) -> Result<Option<CollectionState>, ResourceError> {
        debug!(name = %state.name, "CollectionResource::read");

        match self.client.describe_collection(&state.name).await {
            Ok(description) => {
                info!(name = %state.name, status = %description.status, "DescribeCollection OK");
                Ok(Some(CollectionState::from_description(
                    state.id.clone(),
                    state.source.clone(),
                    description,
                )))
            }
            Err(e) if e.is_not_found() => {
                warn!(name = %state.name, "Collection no longer exists, removing from state");
                Ok(None)
            }
            Err(source) => Err(ResourceError::Read { kind: KIND, source }),
        }
    }

    /// Collections cannot change; any difference forces replacement
    pub fn update(
        &self,
        prior: &CollectionState,
        plan: &CollectionPlan,
    ) -> Result<CollectionState, ResourceError> {
        let attribute = if prior.name != plan.name {
            Some("name")
        } else if prior
            .source
            .as_deref()
            .is_some_and(|source| source != plan.source)
        {
            Some("source")
        } else {
            None
        };

        match attribute {
            Some(attribute) => Err(ResourceError::RequiresReplacement {
                kind: KIND,
                name: prior.name.clone(),
                attribute,
            }),
            None => Ok(CollectionState {
                source: Some(plan.source.clone()),
                ..prior.clone()
            }),
        }
    }

    /// Delete the collection; a collection that is already gone counts as deleted
    pub async fn delete(&self, state: &CollectionState) -> Result<(), ResourceError> {
        debug!(name = %state.name, "CollectionResource::delete");

        match self.client.delete_collection(&state.name).await {
            Ok(response) => {
                info!(name = %state.name, response = %response, "DeleteCollection OK");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                warn!(name = %state.name, "Collection already deleted");
                Ok(())
            }
            Err(source) => Err(ResourceError::Delete { kind: KIND, source }),
        }
    }

    /// Adopt an existing collection by name or `{environment}/{name}`,
    /// waiting for it to become ready first
    pub async fn import(&self, id: &str) -> Result<CollectionState, ResourceError> {
        debug!(id, "CollectionResource::import");

        let prefix = format!("{}/", self.client.environment());
        let name = id.strip_prefix(&prefix).unwrap_or(id);

        let description = match self.client.describe_collection(name).await {
            Ok(description) if description.status_snapshot().is_ready() => description,
            Ok(_) => self
                .poller
                .wait_for_collection(self.client.as_ref(), name)
                .await
                .map_err(|source| ResourceError::Poll { kind: KIND, source })?,
            Err(source) => return Err(ResourceError::Import { kind: KIND, source }),
        };

        info!(name, status = %description.status, "ImportCollection OK");

        Ok(CollectionState::from_description(
            self.id_for(&description.name),
            None,
            description,
        ))
    }
}
