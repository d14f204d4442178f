//! Pinecone Provider - Readiness polling and resource controllers
//!
//! This crate drives the lifecycle of Pinecone resources:
//! - `ReadinessPoller`: waits until a freshly created resource reports ready
//! - Resource controllers for indexes and collections
//! - A read-only collection data source
//! - Provider configuration and credential resolution
//!
//! Author: hephaex@gmail.com

pub mod data_sources;
pub mod error;
pub mod provider;
pub mod readiness;
pub mod resources;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use data_sources::{CollectionDataModel, CollectionDataSource};
pub use error::{ResourceError, ResourceKind};
pub use provider::{ConfiguredProvider, PineconeProvider, ProviderModel, PROVIDER_TYPE_NAME};
pub use readiness::{PollOutcome, ReadinessError, ReadinessPoller, DEFAULT_POLL_INTERVAL};
pub use resources::{
    CollectionPlan, CollectionResource, CollectionState, IndexPlan, IndexResource, IndexState,
};
