//! `pinecone_index` resource
//!
//! Create submits the index and blocks until it reports ready; the
//! remaining operations map one-to-one onto controller calls.
//!
//! Author: hephaex@gmail.com

use crate::error::{ResourceError, ResourceKind};
use crate::readiness::ReadinessPoller;
use pinecone_core::{
    ConfigureIndexRequest, ControlPlane, CreateIndexRequest, IndexDatabase, Metric,
    DEFAULT_POD_TYPE,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

const KIND: ResourceKind = ResourceKind::Index;

/// Desired index configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexPlan {
    /// Index name, at most 45 characters
    pub name: String,

    /// Dimension of the vectors stored in the index
    pub dimension: u32,

    #[serde(default)]
    pub metric: Metric,

    #[serde(default = "default_count")]
    pub replicas: u32,

    /// Number of pods, including replicas; fixed at creation
    #[serde(default = "default_count")]
    pub pods: u32,

    #[serde(default = "default_pod_type")]
    pub pod_type: String,

    /// Collection to seed the index from
    #[serde(default)]
    pub source_collection: Option<String>,
}

fn default_count() -> u32 {
    1
}

fn default_pod_type() -> String {
    DEFAULT_POD_TYPE.to_string()
}

impl IndexPlan {
    pub fn new(name: impl Into<String>, dimension: u32) -> Self {
        Self {
            name: name.into(),
            dimension,
            metric: Metric::default(),
            replicas: 1,
            pods: 1,
            pod_type: DEFAULT_POD_TYPE.to_string(),
            source_collection: None,
        }
    }

    fn to_request(&self) -> CreateIndexRequest {
        CreateIndexRequest {
            name: self.name.clone(),
            dimension: self.dimension,
            metric: self.metric,
            pods: self.pods,
            replicas: self.replicas,
            pod_type: self.pod_type.clone(),
            source_collection: self
                .source_collection
                .clone()
                .filter(|source| !source.is_empty()),
        }
    }
}

/// Index attributes as recorded after an operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexState {
    /// `{environment}/{name}`
    pub id: String,
    pub name: String,
    pub dimension: u32,
    pub metric: Metric,
    pub replicas: u32,
    pub pods: u32,
    pub pod_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_collection: Option<String>,
}

impl IndexState {
    fn from_plan(id: String, plan: &IndexPlan) -> Self {
        Self {
            id,
            name: plan.name.clone(),
            dimension: plan.dimension,
            metric: plan.metric,
            replicas: plan.replicas,
            pods: plan.pods,
            pod_type: plan.pod_type.clone(),
            source_collection: plan.source_collection.clone(),
        }
    }

    fn refresh(&mut self, database: &IndexDatabase) {
        self.name = database.name.clone();
        self.dimension = database.dimension;
        self.metric = database.metric;
        self.replicas = database.replicas;
        self.pods = database.pods;
        self.pod_type = database.pod_type.clone();
    }
}

/// Controller for `pinecone_index`
#[derive(Clone)]
pub struct IndexResource {
    client: Arc<dyn ControlPlane>,
    poller: ReadinessPoller,
}

impl IndexResource {
    pub const TYPE_NAME: &'static str = "pinecone_index";

    pub fn new(client: Arc<dyn ControlPlane>, poller: ReadinessPoller) -> Self {
        Self { client, poller }
    }

    fn id_for(&self, name: &str) -> String {
        format!("{}/{name}", self.client.environment())
    }

    /// State recorded for `plan` before the service has confirmed it
    pub fn planned_state(&self, plan: &IndexPlan) -> IndexState {
        IndexState::from_plan(self.id_for(&plan.name), plan)
    }

    /// Create the index and wait for it to become ready
    pub async fn create(&self, plan: &IndexPlan) -> Result<IndexState, ResourceError> {
        debug!(name = %plan.name, dimension = plan.dimension, "IndexResource::create");

        let request = plan.to_request();
        request
            .validate()
            .map_err(|source| ResourceError::Validation { kind: KIND, source })?;

        let response = self
            .client
            .create_index(&request)
            .await
            .map_err(|source| ResourceError::Create { kind: KIND, source })?;

        let description = self
            .poller
            .wait_for_index(self.client.as_ref(), &plan.name)
            .await
            .map_err(|source| ResourceError::Poll { kind: KIND, source })?;

        info!(
            name = %plan.name,
            response = %response,
            host = ?description.status.host,
            "CreateIndex OK"
        );

        Ok(self.planned_state(plan))
    }

    /// Refresh state from the service; `None` when the index no longer exists
    pub async fn read(&self, state: &IndexState) -> Result<Option<IndexState>, ResourceError> {
        debug!(name = %state.name, "IndexResource::read");

        let description = match self.client.describe_index(&state.name).await {
            Ok(description) => description,
            Err(e) if e.is_not_found() => {
                warn!(name = %state.name, "Index no longer exists, removing from state");
                return Ok(None);
            }
            Err(source) => return Err(ResourceError::Read { kind: KIND, source }),
        };

        info!(name = %state.name, state = %description.status.state, "DescribeIndex OK");

        let mut refreshed = state.clone();
        refreshed.refresh(&description.database);
        Ok(Some(refreshed))
    }

    /// Scale replicas or change pod type in place
    pub async fn update(
        &self,
        prior: &IndexState,
        plan: &IndexPlan,
    ) -> Result<IndexState, ResourceError> {
        debug!(name = %plan.name, "IndexResource::update");

        let replaced = |attribute: &'static str| ResourceError::RequiresReplacement {
            kind: KIND,
            name: prior.name.clone(),
            attribute,
        };
        if prior.name != plan.name {
            return Err(replaced("name"));
        }
        if prior.dimension != plan.dimension {
            return Err(replaced("dimension"));
        }
        if prior.metric != plan.metric {
            return Err(replaced("metric"));
        }
        if prior.source_collection != plan.source_collection {
            return Err(replaced("source_collection"));
        }
        if prior.pods != plan.pods {
            return Err(replaced("pods"));
        }

        plan.to_request()
            .validate()
            .map_err(|source| ResourceError::Validation { kind: KIND, source })?;

        let request = ConfigureIndexRequest {
            replicas: (prior.replicas != plan.replicas).then_some(plan.replicas),
            pod_type: (prior.pod_type != plan.pod_type).then(|| plan.pod_type.clone()),
        };

        if request.is_empty() {
            debug!(name = %plan.name, "No scalable attributes changed, skipping ConfigureIndex");
        } else {
            let response = self
                .client
                .configure_index(&plan.name, &request)
                .await
                .map_err(|source| ResourceError::Update { kind: KIND, source })?;
            info!(name = %plan.name, response = %response, "ConfigureIndex OK");
        }

        Ok(IndexState::from_plan(prior.id.clone(), plan))
    }

    /// Delete the index; an index that is already gone counts as deleted
    pub async fn delete(&self, state: &IndexState) -> Result<(), ResourceError> {
        debug!(name = %state.name, "IndexResource::delete");

        match self.client.delete_index(&state.name).await {
            Ok(response) => {
                info!(name = %state.name, response = %response, "DeleteIndex OK");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                warn!(name = %state.name, "Index already deleted");
                Ok(())
            }
            Err(source) => Err(ResourceError::Delete { kind: KIND, source }),
        }
    }

    /// Adopt an existing index
    ///
    /// `id` is either the index name or `{environment}/{name}`. The index
    /// is waited on until ready before its state is recorded.
    pub async fn import(&self, id: &str) -> Result<IndexState, ResourceError> {
        debug!(id, "IndexResource::import");

        let prefix = format!("{}/", self.client.environment());
        let name = id.strip_prefix(&prefix).unwrap_or(id);

        let description = match self.client.describe_index(name).await {
            Ok(description) if description.status.is_ready() => description,
            Ok(_) => self
                .poller
                .wait_for_index(self.client.as_ref(), name)
                .await
                .map_err(|source| ResourceError::Poll { kind: KIND, source })?,
            Err(source) => return Err(ResourceError::Import { kind: KIND, source }),
        };

        info!(name, "ImportIndex OK");

        let database = description.database;
        Ok(IndexState {
            id: self.id_for(&database.name),
            name: database.name,
            dimension: database.dimension,
            metric: database.metric,
            replicas: database.replicas,
            pods: database.pods,
            pod_type: database.pod_type,
            source_collection: None,
        })
    }
}
