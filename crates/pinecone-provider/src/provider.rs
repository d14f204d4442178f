//! Provider configuration
//!
//! Resolves credentials from the provider block and the environment,
//! builds the shared control-plane client and hands it to the resource
//! controllers.
//!
//! Author: hephaex@gmail.com

use crate::data_sources::CollectionDataSource;
use crate::error::ResourceError;
use crate::readiness::ReadinessPoller;
use crate::resources::{CollectionResource, IndexResource};
use pinecone_client::PineconeClient;
use pinecone_core::{AppConfig, ClientConfig, ControlPlane};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Provider type name; resource and data source names are prefixed with it
pub const PROVIDER_TYPE_NAME: &str = "pinecone";

/// Values set explicitly in the provider block
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderModel {
    /// API key; falls back to PINECONE_API_KEY
    pub apikey: Option<String>,

    /// Project environment; falls back to PINECONE_ENVIRONMENT
    pub environment: Option<String>,
}

impl std::fmt::Debug for ProviderModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderModel")
            .field("apikey", &self.apikey.as_ref().map(|_| "***"))
            .field("environment", &self.environment)
            .finish()
    }
}

/// Entry point: metadata, registry and configuration
#[derive(Debug, Clone)]
pub struct PineconeProvider {
    version: String,
}

impl PineconeProvider {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        PROVIDER_TYPE_NAME
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Resource types implemented by the provider
    pub fn resource_types(&self) -> Vec<&'static str> {
        vec![IndexResource::TYPE_NAME, CollectionResource::TYPE_NAME]
    }

    /// Data sources implemented by the provider
    pub fn data_source_types(&self) -> Vec<&'static str> {
        vec![CollectionDataSource::TYPE_NAME]
    }

    /// Merge provider-block values over `defaults`, requiring both credentials
    pub fn resolve_client_config(
        model: &ProviderModel,
        defaults: &ClientConfig,
    ) -> Result<ClientConfig, ResourceError> {
        let explicit = |value: &Option<String>| value.clone().filter(|v| !v.trim().is_empty());

        let mut resolved = defaults.clone();
        if let Some(apikey) = explicit(&model.apikey) {
            resolved.api_key = Some(apikey);
        }
        if let Some(environment) = explicit(&model.environment) {
            resolved.environment = Some(environment);
        }

        let mut missing = Vec::new();
        if explicit(&resolved.api_key).is_none() {
            missing.push("apikey");
        }
        if explicit(&resolved.environment).is_none() {
            missing.push("environment");
        }
        if !missing.is_empty() {
            return Err(ResourceError::MissingConfiguration(missing));
        }

        Ok(resolved)
    }

    /// Build the client shared by all resources and data sources
    pub fn configure(
        &self,
        model: &ProviderModel,
        config: &AppConfig,
    ) -> Result<ConfiguredProvider, ResourceError> {
        info!(version = %self.version, "Configuring client");

        let client_config = Self::resolve_client_config(model, &config.client)?;
        debug!(client = ?client_config, "Creating client");

        let client = PineconeClient::from_config(&client_config)
            .map_err(ResourceError::InvalidConfiguration)?;

        info!(environment = client.environment(), success = true, "Configured client");

        Ok(ConfiguredProvider::new(
            Arc::new(client),
            ReadinessPoller::from_config(&config.polling),
        ))
    }
}

/// A configured provider: the client plus the polling policy
#[derive(Clone)]
pub struct ConfiguredProvider {
    client: Arc<dyn ControlPlane>,
    poller: ReadinessPoller,
}

impl ConfiguredProvider {
    pub fn new(client: Arc<dyn ControlPlane>, poller: ReadinessPoller) -> Self {
        Self { client, poller }
    }

    /// Abort readiness waits when `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.poller = self.poller.with_cancellation(token);
        self
    }

    pub fn client(&self) -> &Arc<dyn ControlPlane> {
        &self.client
    }

    pub fn poller(&self) -> &ReadinessPoller {
        &self.poller
    }

    pub fn index_resource(&self) -> IndexResource {
        IndexResource::new(self.client.clone(), self.poller.clone())
    }

    pub fn collection_resource(&self) -> CollectionResource {
        CollectionResource::new(self.client.clone(), self.poller.clone())
    }

    pub fn collection_data_source(&self) -> CollectionDataSource {
        CollectionDataSource::new(self.client.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn env_defaults() -> ClientConfig {
        ClientConfig {
            api_key: Some("env-key".to_string()),
            environment: Some("us-west4-gcp-free".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_registry() {
        let provider = PineconeProvider::new("test");
        assert_eq!(provider.type_name(), "pinecone");
        assert_eq!(provider.version(), "test");
        assert_eq!(
            provider.resource_types(),
            vec!["pinecone_index", "pinecone_collection"]
        );
        assert_eq!(provider.data_source_types(), vec!["pinecone_collection"]);
    }

    #[test]
    fn test_environment_values_used_when_block_is_empty() {
        let resolved =
            PineconeProvider::resolve_client_config(&ProviderModel::default(), &env_defaults())
                .unwrap();
        assert_eq!(resolved.api_key.as_deref(), Some("env-key"));
        assert_eq!(resolved.environment.as_deref(), Some("us-west4-gcp-free"));
    }

    #[test]
    fn test_block_values_override_environment() {
        let model = ProviderModel {
            apikey: Some("block-key".to_string()),
            environment: Some("eu-west1-gcp".to_string()),
        };
        let resolved = PineconeProvider::resolve_client_config(&model, &env_defaults()).unwrap();
        assert_eq!(resolved.api_key.as_deref(), Some("block-key"));
        assert_eq!(resolved.environment.as_deref(), Some("eu-west1-gcp"));
    }

    #[test]
    fn test_missing_credentials_reported_together() {
        let model = ProviderModel {
            apikey: Some(String::new()),
            environment: None,
        };
        let err = PineconeProvider::resolve_client_config(&model, &ClientConfig::default())
            .unwrap_err();

        match err {
            ResourceError::MissingConfiguration(missing) => {
                assert_eq!(missing, vec!["apikey", "environment"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_configure_builds_poller_from_config() {
        let mut config = AppConfig::default();
        config.client = env_defaults();
        config.polling.interval_secs = 2;
        config.polling.timeout_secs = Some(30);

        let configured = PineconeProvider::new("test")
            .configure(&ProviderModel::default(), &config)
            .unwrap();

        assert_eq!(configured.client().environment(), "us-west4-gcp-free");
        assert_eq!(configured.poller().interval(), Duration::from_secs(2));
        assert_eq!(configured.poller().max_wait(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_model_debug_masks_api_key() {
        let model = ProviderModel {
            apikey: Some("pc-secret".to_string()),
            environment: None,
        };
        assert!(!format!("{model:?}").contains("pc-secret"));
    }
}
