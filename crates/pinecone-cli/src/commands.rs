//! Subcommand handlers
//!
//! Each handler runs one controller operation and prints the result as
//! pretty JSON on stdout.

use anyhow::Context;
use pinecone_core::ControlPlane;
use pinecone_provider::{
    CollectionPlan, CollectionState, ConfiguredProvider, IndexPlan, IndexState, ReadinessError,
    ResourceError,
};
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;
use std::process::ExitCode;
use tracing::warn;

/// Exit status when a readiness wait was abandoned
pub const STILL_PROVISIONING_EXIT: u8 = 3;

/// How a command ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Done,
    /// The wait was abandoned; the resource may still become ready
    StillProvisioning,
}

impl Outcome {
    pub fn exit_code(self) -> ExitCode {
        match self {
            Self::Done => ExitCode::SUCCESS,
            Self::StillProvisioning => ExitCode::from(STILL_PROVISIONING_EXIT),
        }
    }
}

/// Turn a controller error into a CLI error headed by its summary
pub fn diagnostic(err: ResourceError) -> anyhow::Error {
    let summary = err.summary();
    anyhow::Error::new(err).context(summary)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<Outcome> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(Outcome::Done)
}

fn load_state<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read state file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse state file {}", path.display()))
}

/// Print the result; after an abandoned wait print `partial` instead, if any
fn finish<T, F>(result: Result<T, ResourceError>, partial: F) -> anyhow::Result<Outcome>
where
    T: Serialize,
    F: FnOnce(&ResourceError) -> Option<T>,
{
    match result {
        Ok(value) => print_json(&value),
        Err(err) if err.is_still_provisioning() => {
            warn!(error = %err, "Gave up waiting; the resource is still provisioning");
            if let Some(state) = partial(&err) {
                print_json(&state)?;
            }
            Ok(Outcome::StillProvisioning)
        }
        Err(err) => Err(diagnostic(err)),
    }
}

fn last_state(err: &ResourceError) -> &str {
    match err {
        ResourceError::Poll {
            source: ReadinessError::TimedOut { last_state, .. },
            ..
        } => last_state,
        _ => "",
    }
}

// ============================================================================
// Index
// ============================================================================

pub async fn index_create(
    provider: &ConfiguredProvider,
    plan: &IndexPlan,
) -> anyhow::Result<Outcome> {
    let resource = provider.index_resource();
    finish(resource.create(plan).await, |_| {
        Some(resource.planned_state(plan))
    })
}

pub async fn index_read(provider: &ConfiguredProvider, path: &Path) -> anyhow::Result<Outcome> {
    let state: IndexState = load_state(path)?;
    match provider
        .index_resource()
        .read(&state)
        .await
        .map_err(diagnostic)?
    {
        Some(refreshed) => print_json(&refreshed),
        None => {
            warn!(name = %state.name, "Index no longer exists");
            print_json(&serde_json::Value::Null)
        }
    }
}

pub async fn index_update(
    provider: &ConfiguredProvider,
    path: &Path,
    replicas: Option<u32>,
    pod_type: Option<String>,
) -> anyhow::Result<Outcome> {
    let prior: IndexState = load_state(path)?;
    let plan = IndexPlan {
        name: prior.name.clone(),
        dimension: prior.dimension,
        metric: prior.metric,
        replicas: replicas.unwrap_or(prior.replicas),
        pods: prior.pods,
        pod_type: pod_type.unwrap_or_else(|| prior.pod_type.clone()),
        source_collection: prior.source_collection.clone(),
    };
    finish(provider.index_resource().update(&prior, &plan).await, |_| None)
}

pub async fn index_delete(provider: &ConfiguredProvider, path: &Path) -> anyhow::Result<Outcome> {
    let state: IndexState = load_state(path)?;
    provider
        .index_resource()
        .delete(&state)
        .await
        .map_err(diagnostic)?;
    Ok(Outcome::Done)
}

pub async fn index_import(provider: &ConfiguredProvider, id: &str) -> anyhow::Result<Outcome> {
    finish(provider.index_resource().import(id).await, |_| None)
}

pub async fn index_list(provider: &ConfiguredProvider) -> anyhow::Result<Outcome> {
    let names = provider
        .client()
        .list_indexes()
        .await
        .context("Failed to list indexes")?;
    print_json(&names)
}

pub async fn index_wait(provider: &ConfiguredProvider, name: &str) -> anyhow::Result<Outcome> {
    let result = provider
        .poller()
        .wait_for_index(provider.client().as_ref(), name)
        .await;

    match result {
        Ok(description) => print_json(&description),
        Err(err) if err.is_still_provisioning() => {
            warn!(error = %err, "Gave up waiting; the index is still provisioning");
            Ok(Outcome::StillProvisioning)
        }
        Err(err) => Err(err).context("Failed to poll index"),
    }
}

// ============================================================================
// Collection
// ============================================================================

pub async fn collection_create(
    provider: &ConfiguredProvider,
    plan: &CollectionPlan,
) -> anyhow::Result<Outcome> {
    let resource = provider.collection_resource();
    finish(resource.create(plan).await, |err| {
        Some(resource.pending_state(plan, last_state(err)))
    })
}

pub async fn collection_read(
    provider: &ConfiguredProvider,
    path: &Path,
) -> anyhow::Result<Outcome> {
    let state: CollectionState = load_state(path)?;
    match provider
        .collection_resource()
        .read(&state)
        .await
        .map_err(diagnostic)?
    {
        Some(refreshed) => print_json(&refreshed),
        None => {
            warn!(name = %state.name, "Collection no longer exists");
            print_json(&serde_json::Value::Null)
        }
    }
}

pub async fn collection_delete(
    provider: &ConfiguredProvider,
    path: &Path,
) -> anyhow::Result<Outcome> {
    let state: CollectionState = load_state(path)?;
    provider
        .collection_resource()
        .delete(&state)
        .await
        .map_err(diagnostic)?;
    Ok(Outcome::Done)
}

pub async fn collection_import(
    provider: &ConfiguredProvider,
    id: &str,
) -> anyhow::Result<Outcome> {
    finish(provider.collection_resource().import(id).await, |_| None)
}

pub async fn collection_list(provider: &ConfiguredProvider) -> anyhow::Result<Outcome> {
    let names = provider
        .client()
        .list_collections()
        .await
        .context("Failed to list collections")?;
    print_json(&names)
}

// ============================================================================
// Data sources
// ============================================================================

pub async fn data_collection(
    provider: &ConfiguredProvider,
    name: &str,
) -> anyhow::Result<Outcome> {
    let model = provider
        .collection_data_source()
        .read(name)
        .await
        .map_err(diagnostic)?;
    print_json(&model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pinecone_core::{IndexDatabase, Metric, PineconeError};
    use pinecone_provider::testing::InMemoryControlPlane;
    use pinecone_provider::{ReadinessPoller, ResourceKind};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    fn cancelled_provider(plane: &Arc<InMemoryControlPlane>) -> ConfiguredProvider {
        let token = CancellationToken::new();
        token.cancel();
        ConfiguredProvider::new(plane.clone(), ReadinessPoller::new(Duration::ZERO))
            .with_cancellation(token)
    }

    #[test]
    fn test_diagnostic_leads_with_summary() {
        let err = diagnostic(ResourceError::Create {
            kind: ResourceKind::Index,
            source: PineconeError::Api {
                status: 400,
                message: "quota".to_string(),
            },
        });

        assert_eq!(err.to_string(), "Failed to create index");
        assert!(format!("{err:#}").contains("quota"));
    }

    #[test]
    fn test_abandoned_wait_reports_partial_state() {
        let result: Result<IndexState, ResourceError> = Err(ResourceError::Poll {
            kind: ResourceKind::Index,
            source: ReadinessError::TimedOut {
                name: "docs".to_string(),
                waited: Duration::from_secs(60),
                last_state: "Initializing".to_string(),
            },
        });

        let mut asked = None;
        let outcome = finish(result, |err| {
            asked = Some(last_state(err).to_string());
            None
        })
        .unwrap();

        assert_eq!(outcome, Outcome::StillProvisioning);
        assert_eq!(asked.as_deref(), Some("Initializing"));
    }

    #[test]
    fn test_exit_codes_are_distinct() {
        assert_eq!(Outcome::Done.exit_code(), ExitCode::SUCCESS);
        assert_ne!(Outcome::StillProvisioning.exit_code(), ExitCode::SUCCESS);
        assert_ne!(Outcome::StillProvisioning.exit_code(), ExitCode::FAILURE);
    }

    #[tokio::test]
    async fn test_cancelled_index_create_is_still_provisioning() {
        let plane = Arc::new(InMemoryControlPlane::new("local").with_provisioning_polls(5));
        let provider = cancelled_provider(&plane);

        let outcome = index_create(&provider, &IndexPlan::new("docs", 8))
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::StillProvisioning);
        assert!(plane.contains_index("docs"));
    }

    #[tokio::test]
    async fn test_cancelled_collection_create_is_still_provisioning() {
        let plane = Arc::new(InMemoryControlPlane::new("local").with_provisioning_polls(5));
        plane.insert_index(IndexDatabase {
            name: "docs".to_string(),
            dimension: 8,
            metric: Metric::Cosine,
            replicas: 1,
            pods: 1,
            shards: 1,
            pod_type: "p1.x1".to_string(),
        });
        let provider = cancelled_provider(&plane);
        let plan = CollectionPlan {
            name: "snap".to_string(),
            source: "docs".to_string(),
        };

        let outcome = collection_create(&provider, &plan).await.unwrap();

        assert_eq!(outcome, Outcome::StillProvisioning);
        assert!(plane.contains_collection("snap"));
    }

    #[tokio::test]
    async fn test_failed_create_is_an_error() {
        let plane = Arc::new(InMemoryControlPlane::new("local"));
        plane.fail_creates("quota exceeded");
        let provider = cancelled_provider(&plane);

        let err = index_create(&provider, &IndexPlan::new("docs", 8))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Failed to create index");
    }

    #[test]
    fn test_load_state_reads_saved_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        std::fs::write(
            &path,
            r#"{"id":"gcp/docs","name":"docs","dimension":8,"metric":"cosine",
                "replicas":1,"pods":1,"pod_type":"p1.x1"}"#,
        )
        .unwrap();

        let state: IndexState = load_state(&path).unwrap();
        assert_eq!(state.name, "docs");
        assert_eq!(state.source_collection, None);
    }

    #[test]
    fn test_load_state_missing_file() {
        let err = load_state::<IndexState>(Path::new("/nonexistent/state.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read state file"));
    }
}
