//! In-memory control plane for tests
//!
//! Resources report `Initializing` for a configurable number of describe
//! calls after creation and `Ready` afterwards. Failures can be injected
//! for create and describe calls.

use async_trait::async_trait;
use pinecone_core::{
    CollectionDescription, ConfigureIndexRequest, ControlPlane, CreateCollectionRequest,
    CreateIndexRequest, IndexDatabase, IndexDescription, PineconeError, Result, StatusSnapshot,
    READY_STATE,
};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

const PROVISIONING_STATE: &str = "Initializing";

struct TrackedIndex {
    database: IndexDatabase,
    describes: usize,
}

struct TrackedCollection {
    description: CollectionDescription,
    describes: usize,
}

#[derive(Default)]
struct Inner {
    indexes: BTreeMap<String, TrackedIndex>,
    collections: BTreeMap<String, TrackedCollection>,
    describe_calls: usize,
    create_failure: Option<String>,
    describe_failure: Option<String>,
    configure_requests: Vec<(String, ConfigureIndexRequest)>,
}

/// Fake `ControlPlane` backed by maps
pub struct InMemoryControlPlane {
    environment: String,
    provisioning_polls: usize,
    inner: Mutex<Inner>,
}

impl InMemoryControlPlane {
    pub fn new(environment: impl Into<String>) -> Self {
        Self {
            environment: environment.into(),
            provisioning_polls: 0,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Report `Initializing` for the first `polls` describes of each resource
    pub fn with_provisioning_polls(mut self, polls: usize) -> Self {
        self.provisioning_polls = polls;
        self
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make every subsequent create call fail with a 500
    pub fn fail_creates(&self, message: impl Into<String>) {
        self.inner().create_failure = Some(message.into());
    }

    /// Make every subsequent describe call fail with a 500
    pub fn fail_describes(&self, message: impl Into<String>) {
        self.inner().describe_failure = Some(message.into());
    }

    /// Seed an index that already exists and is ready
    pub fn insert_index(&self, database: IndexDatabase) {
        let describes = self.provisioning_polls;
        self.inner()
            .indexes
            .insert(database.name.clone(), TrackedIndex { database, describes });
    }

    /// Seed a collection that already exists and is ready
    pub fn insert_collection(&self, description: CollectionDescription) {
        let describes = self.provisioning_polls;
        self.inner().collections.insert(
            description.name.clone(),
            TrackedCollection {
                description,
                describes,
            },
        );
    }

    pub fn contains_index(&self, name: &str) -> bool {
        self.inner().indexes.contains_key(name)
    }

    pub fn contains_collection(&self, name: &str) -> bool {
        self.inner().collections.contains_key(name)
    }

    /// Total describe calls across indexes and collections
    pub fn describe_calls(&self) -> usize {
        self.inner().describe_calls
    }

    pub fn configure_requests(&self) -> Vec<(String, ConfigureIndexRequest)> {
        self.inner().configure_requests.clone()
    }

    fn state_after(&self, describes: usize) -> &'static str {
        if describes > self.provisioning_polls {
            READY_STATE
        } else {
            PROVISIONING_STATE
        }
    }
}

fn server_error(message: &str) -> PineconeError {
    PineconeError::Api {
        status: 500,
        message: message.to_string(),
    }
}

fn conflict(name: &str) -> PineconeError {
    PineconeError::Api {
        status: 409,
        message: format!("'{name}' already exists"),
    }
}

#[async_trait]
impl ControlPlane for InMemoryControlPlane {
    fn environment(&self) -> &str {
        &self.environment
    }

    async fn create_index(&self, request: &CreateIndexRequest) -> Result<String> {
        let mut inner = self.inner();
        if let Some(message) = &inner.create_failure {
            return Err(server_error(message));
        }
        if inner.indexes.contains_key(&request.name) {
            return Err(conflict(&request.name));
        }

        let database = IndexDatabase {
            name: request.name.clone(),
            dimension: request.dimension,
            metric: request.metric,
            replicas: request.replicas,
            pods: request.pods,
            shards: 1,
            pod_type: request.pod_type.clone(),
        };
        inner.indexes.insert(
            request.name.clone(),
            TrackedIndex {
                database,
                describes: 0,
            },
        );
        Ok("index created".to_string())
    }

    async fn describe_index(&self, name: &str) -> Result<IndexDescription> {
        let mut inner = self.inner();
        inner.describe_calls += 1;
        if let Some(message) = &inner.describe_failure {
            return Err(server_error(message));
        }

        let tracked = inner
            .indexes
            .get_mut(name)
            .ok_or_else(|| PineconeError::NotFound(format!("index '{name}'")))?;
        tracked.describes += 1;
        let describes = tracked.describes;
        let database = tracked.database.clone();

        let state = self.state_after(describes);
        let mut status = StatusSnapshot::new(state, state == READY_STATE);
        status.host = Some(format!("{name}-test.svc.{}.pinecone.io", self.environment));
        status.port = Some(433);

        Ok(IndexDescription { database, status })
    }

    async fn configure_index(&self, name: &str, request: &ConfigureIndexRequest) -> Result<String> {
        let mut inner = self.inner();
        let tracked = inner
            .indexes
            .get_mut(name)
            .ok_or_else(|| PineconeError::NotFound(format!("index '{name}'")))?;
        if let Some(replicas) = request.replicas {
            tracked.database.replicas = replicas;
        }
        if let Some(pod_type) = &request.pod_type {
            tracked.database.pod_type = pod_type.clone();
        }
        inner
            .configure_requests
            .push((name.to_string(), request.clone()));
        Ok("index configured".to_string())
    }

    async fn delete_index(&self, name: &str) -> Result<String> {
        self.inner()
            .indexes
            .remove(name)
            .map(|_| "index deleted".to_string())
            .ok_or_else(|| PineconeError::NotFound(format!("index '{name}'")))
    }

    async fn list_indexes(&self) -> Result<Vec<String>> {
        Ok(self.inner().indexes.keys().cloned().collect())
    }

    async fn create_collection(&self, request: &CreateCollectionRequest) -> Result<String> {
        let mut inner = self.inner();
        if let Some(message) = &inner.create_failure {
            return Err(server_error(message));
        }
        if inner.collections.contains_key(&request.name) {
            return Err(conflict(&request.name));
        }
        let dimension = inner
            .indexes
            .get(&request.source)
            .map(|tracked| tracked.database.dimension)
            .ok_or_else(|| PineconeError::Api {
                status: 400,
                message: format!("source index '{}' does not exist", request.source),
            })?;

        inner.collections.insert(
            request.name.clone(),
            TrackedCollection {
                description: CollectionDescription {
                    name: request.name.clone(),
                    size: 3_126_700,
                    status: PROVISIONING_STATE.to_string(),
                    dimension,
                    vector_count: 0,
                },
                describes: 0,
            },
        );
        Ok("collection created".to_string())
    }

    async fn describe_collection(&self, name: &str) -> Result<CollectionDescription> {
        let mut inner = self.inner();
        inner.describe_calls += 1;
        if let Some(message) = &inner.describe_failure {
            return Err(server_error(message));
        }

        let tracked = inner
            .collections
            .get_mut(name)
            .ok_or_else(|| PineconeError::NotFound(format!("collection '{name}'")))?;
        tracked.describes += 1;
        let describes = tracked.describes;

        let mut description = tracked.description.clone();
        description.status = self.state_after(describes).to_string();
        Ok(description)
    }

    async fn delete_collection(&self, name: &str) -> Result<String> {
        self.inner()
            .collections
            .remove(name)
            .map(|_| "collection deleted".to_string())
            .ok_or_else(|| PineconeError::NotFound(format!("collection '{name}'")))
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        Ok(self.inner().collections.keys().cloned().collect())
    }
}
