//! Pinecone Core - Domain models, traits, and shared types
//!
//! This crate defines the core abstractions used by the provider:
//! - Control-plane models (indexes, collections, provisioning status)
//! - The `ControlPlane` trait implemented by service clients
//! - Common error types
//! - Configuration management

pub mod config;

pub use config::{AppConfig, ClientConfig, ConfigError, LoggingConfig, PollingConfig};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for control-plane operations
#[derive(Error, Debug)]
pub enum PineconeError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Pinecone API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PineconeError {
    /// Whether the service reported the resource as missing
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<ConfigError> for PineconeError {
    fn from(err: ConfigError) -> Self {
        Self::ConfigError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PineconeError>;

// ============================================================================
// Provisioning Status
// ============================================================================

/// The `state` value the service reports once provisioning has finished
pub const READY_STATE: &str = "Ready";

/// Maximum length of an index name
pub const MAX_INDEX_NAME_LEN: usize = 45;

/// One observed reading of a resource's provisioning status
///
/// `state` and `ready` come from the same response but are reported
/// independently; either one is enough to consider the resource ready.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// Free-text status code, e.g. "Initializing" or "Ready"
    #[serde(default)]
    pub state: String,

    /// Terminal readiness flag
    #[serde(default)]
    pub ready: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Pods still being scheduled
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub waiting: Vec<String>,

    /// Pods that failed to start
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub crashed: Vec<String>,
}

impl StatusSnapshot {
    pub fn new(state: impl Into<String>, ready: bool) -> Self {
        Self {
            state: state.into(),
            ready,
            ..Default::default()
        }
    }

    /// Terminal when `state == "Ready"` OR `ready == true`
    pub fn is_ready(&self) -> bool {
        self.state == READY_STATE || self.ready
    }
}

/// Anything that carries a provisioning status the poller can wait on
pub trait ProvisioningStatus {
    fn status_snapshot(&self) -> StatusSnapshot;
}

impl ProvisioningStatus for StatusSnapshot {
    fn status_snapshot(&self) -> StatusSnapshot {
        self.clone()
    }
}

// ============================================================================
// Index Models
// ============================================================================

/// Distance metric used for similarity search
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Euclidean,
    #[default]
    Cosine,
    DotProduct,
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Euclidean => write!(f, "euclidean"),
            Self::Cosine => write!(f, "cosine"),
            Self::DotProduct => write!(f, "dotproduct"),
        }
    }
}

impl std::str::FromStr for Metric {
    type Err = PineconeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "euclidean" => Ok(Self::Euclidean),
            "cosine" => Ok(Self::Cosine),
            "dotproduct" => Ok(Self::DotProduct),
            _ => Err(PineconeError::ValidationError(format!(
                "unknown metric '{s}', expected one of 'euclidean', 'cosine', 'dotproduct'"
            ))),
        }
    }
}

/// Default pod type for new indexes
pub const DEFAULT_POD_TYPE: &str = "p1.x1";

/// Index configuration as reported by `describe_index`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDatabase {
    pub name: String,
    pub dimension: u32,
    #[serde(default)]
    pub metric: Metric,
    #[serde(default = "default_count")]
    pub replicas: u32,
    #[serde(default = "default_count")]
    pub pods: u32,
    #[serde(default = "default_count")]
    pub shards: u32,
    #[serde(default = "default_pod_type")]
    pub pod_type: String,
}

fn default_count() -> u32 {
    1
}

fn default_pod_type() -> String {
    DEFAULT_POD_TYPE.to_string()
}

/// Full `describe_index` response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDescription {
    pub database: IndexDatabase,
    pub status: StatusSnapshot,
}

impl ProvisioningStatus for IndexDescription {
    fn status_snapshot(&self) -> StatusSnapshot {
        self.status.clone()
    }
}

/// Body of a create-index call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateIndexRequest {
    pub name: String,
    pub dimension: u32,
    pub metric: Metric,
    pub pods: u32,
    pub replicas: u32,
    pub pod_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_collection: Option<String>,
}

impl CreateIndexRequest {
    /// Create a request with the service defaults for everything but name and dimension
    pub fn new(name: impl Into<String>, dimension: u32) -> Self {
        Self {
            name: name.into(),
            dimension,
            metric: Metric::default(),
            pods: 1,
            replicas: 1,
            pod_type: DEFAULT_POD_TYPE.to_string(),
            source_collection: None,
        }
    }

    /// Reject requests the service would refuse
    pub fn validate(&self) -> Result<()> {
        validate_index_name(&self.name)?;
        if self.dimension == 0 {
            return Err(PineconeError::ValidationError(
                "dimension must be greater than zero".to_string(),
            ));
        }
        if self.pods == 0 || self.replicas == 0 {
            return Err(PineconeError::ValidationError(
                "pods and replicas must be at least 1".to_string(),
            ));
        }
        if self.pod_type.trim().is_empty() {
            return Err(PineconeError::ValidationError(
                "pod_type must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Check an index name against the service's naming rules
pub fn validate_index_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(PineconeError::ValidationError(
            "index name must not be empty".to_string(),
        ));
    }
    if name.chars().count() > MAX_INDEX_NAME_LEN {
        return Err(PineconeError::ValidationError(format!(
            "index name '{name}' exceeds {MAX_INDEX_NAME_LEN} characters"
        )));
    }
    Ok(())
}

/// Body of a configure-index call; only the scalable settings can change
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigureIndexRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod_type: Option<String>,
}

impl ConfigureIndexRequest {
    pub fn is_empty(&self) -> bool {
        self.replicas.is_none() && self.pod_type.is_none()
    }
}

// ============================================================================
// Collection Models
// ============================================================================

/// Full `describe_collection` response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionDescription {
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub dimension: u32,
    #[serde(default)]
    pub vector_count: u64,
}

// Collections only report a state string, never a ready flag.
impl ProvisioningStatus for CollectionDescription {
    fn status_snapshot(&self) -> StatusSnapshot {
        StatusSnapshot::new(self.status.clone(), false)
    }
}

/// Body of a create-collection call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateCollectionRequest {
    pub name: String,
    /// Name of the index the collection is snapshotted from
    pub source: String,
}

impl CreateCollectionRequest {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(PineconeError::ValidationError(
                "collection name must not be empty".to_string(),
            ));
        }
        if self.source.trim().is_empty() {
            return Err(PineconeError::ValidationError(
                "collection source index must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Service Client Trait
// ============================================================================

/// Operations exposed by the vector database control API
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Environment the client talks to (e.g. "us-west4-gcp-free")
    fn environment(&self) -> &str;

    /// Submit an index creation; returns the service's acknowledgement
    async fn create_index(&self, request: &CreateIndexRequest) -> Result<String>;

    async fn describe_index(&self, name: &str) -> Result<IndexDescription>;

    async fn configure_index(&self, name: &str, request: &ConfigureIndexRequest)
        -> Result<String>;

    async fn delete_index(&self, name: &str) -> Result<String>;

    async fn list_indexes(&self) -> Result<Vec<String>>;

    async fn create_collection(&self, request: &CreateCollectionRequest) -> Result<String>;

    async fn describe_collection(&self, name: &str) -> Result<CollectionDescription>;

    async fn delete_collection(&self, name: &str) -> Result<String>;

    async fn list_collections(&self) -> Result<Vec<String>>;
}

// ============================================================================
// Tests
// ============================================================================
