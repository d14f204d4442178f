//! Resource controller errors
//!
//! Each variant maps onto a diagnostic: `summary()` is the short headline
//! and `Display` carries the detail.

use crate::readiness::ReadinessError;
use pinecone_core::PineconeError;
use thiserror::Error;

/// Kind of managed resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Index,
    Collection,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Index => write!(f, "index"),
            Self::Collection => write!(f, "collection"),
        }
    }
}

/// Errors surfaced by the provider and its resource controllers
#[derive(Error, Debug)]
pub enum ResourceError {
    #[error("Missing provider configuration: {}", .0.join(", "))]
    MissingConfiguration(Vec<&'static str>),

    #[error("Invalid provider configuration: {0}")]
    InvalidConfiguration(#[source] PineconeError),

    #[error("Invalid {kind} configuration: {source}")]
    Validation {
        kind: ResourceKind,
        #[source]
        source: PineconeError,
    },

    #[error("Failed to create {kind}: {source}")]
    Create {
        kind: ResourceKind,
        #[source]
        source: PineconeError,
    },

    /// The create call was accepted; only the readiness wait failed
    #[error("{kind} was created but did not become ready: {source}")]
    Poll {
        kind: ResourceKind,
        #[source]
        source: ReadinessError,
    },

    #[error("Failed to describe {kind}: {source}")]
    Read {
        kind: ResourceKind,
        #[source]
        source: PineconeError,
    },

    #[error("Failed to update {kind}: {source}")]
    Update {
        kind: ResourceKind,
        #[source]
        source: PineconeError,
    },

    #[error("Failed to delete {kind}: {source}")]
    Delete {
        kind: ResourceKind,
        #[source]
        source: PineconeError,
    },

    #[error("Failed to import {kind}: {source}")]
    Import {
        kind: ResourceKind,
        #[source]
        source: PineconeError,
    },

    #[error("Changing '{attribute}' of {kind} '{name}' requires replacing it")]
    RequiresReplacement {
        kind: ResourceKind,
        name: String,
        attribute: &'static str,
    },
}

impl ResourceError {
    /// Short diagnostic headline
    pub fn summary(&self) -> String {
        match self {
            Self::MissingConfiguration(attributes) => attributes
                .iter()
                .map(|attribute| format!("Missing ({attribute})"))
                .collect::<Vec<_>>()
                .join(", "),
            Self::InvalidConfiguration(_) => "Invalid provider configuration".to_string(),
            Self::Validation { kind, .. } => format!("Invalid {kind} configuration"),
            Self::Create { kind, .. } => format!("Failed to create {kind}"),
            Self::Poll { kind, .. } => format!("Failed to poll {kind}"),
            Self::Read { kind, .. } => format!("Failed to describe {kind}"),
            Self::Update { kind, .. } => format!("Failed to update {kind}"),
            Self::Delete { kind, .. } => format!("Failed to delete {kind}"),
            Self::Import { kind, .. } => format!("Failed to import {kind}"),
            Self::RequiresReplacement { kind, .. } => format!("Cannot update {kind} in place"),
        }
    }

    /// Creation succeeded but waiting for readiness was abandoned
    pub fn is_still_provisioning(&self) -> bool {
        match self {
            Self::Poll { source, .. } => source.is_still_provisioning(),
            _ => false,
        }
    }
}
