//! Pinecone Client - HTTP binding for the control plane
//!
//! Implements `ControlPlane` against the controller REST API
//! (`https://controller.{environment}.pinecone.io`).
//!
//! Author: hephaex@gmail.com

use async_trait::async_trait;
use pinecone_core::{
    ClientConfig, CollectionDescription, ConfigureIndexRequest, ControlPlane,
    CreateCollectionRequest, CreateIndexRequest, IndexDescription, PineconeError, Result,
};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

const API_KEY_HEADER: &str = "Api-Key";
const INDEXES: &str = "databases";
const COLLECTIONS: &str = "collections";

/// Control-plane API client
#[derive(Clone)]
pub struct PineconeClient {
    client: Client,
    api_key: String,
    environment: String,
    base_url: String,
}

impl PineconeClient {
    /// Create a client for the hosted controller of `environment`
    pub fn new(api_key: impl Into<String>, environment: impl Into<String>) -> Result<Self> {
        let environment = environment.into();
        let base_url = format!("https://controller.{environment}.pinecone.io");
        Self::build(api_key.into(), environment, base_url, Duration::from_secs(30))
    }

    /// Create from config
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_ref()
            .ok_or_else(|| PineconeError::ConfigError("Pinecone API key required".to_string()))?;
        let environment = config.environment.clone().ok_or_else(|| {
            PineconeError::ConfigError("Pinecone environment required".to_string())
        })?;
        let base_url = config.base_url()?;

        Self::build(
            api_key.clone(),
            environment,
            base_url,
            config.request_timeout(),
        )
    }

    fn build(
        api_key: String,
        environment: String,
        base_url: String,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PineconeError::Http(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            environment,
            base_url,
        })
    }

    /// Set custom base URL (for proxies or a local fake controller)
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build `{base_url}/{segments...}`, percent-encoding each segment
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            PineconeError::ConfigError(format!("invalid controller URL '{}': {e}", self.base_url))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                PineconeError::ConfigError(format!(
                    "controller URL '{}' cannot carry a path",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder> {
        Ok(self
            .client
            .request(method, self.endpoint(segments)?)
            .header(API_KEY_HEADER, &self.api_key))
    }

    /// Request addressing a single named resource
    fn named_request(&self, method: Method, kind: &str, name: &str) -> Result<RequestBuilder> {
        check_path_name(name)?;
        self.request(method, &[kind, name])
    }

    async fn send(&self, request: RequestBuilder, what: &str) -> Result<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| PineconeError::Http(format!("{what} request failed: {e}")))?;

        let status = response.status();
        debug!(%status, what, "Controller responded");

        if status == StatusCode::NOT_FOUND {
            return Err(PineconeError::NotFound(what.to_string()));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PineconeError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }

    async fn send_text(&self, request: RequestBuilder, what: &str) -> Result<String> {
        let response = self
            .send(request.header("accept", "text/plain"), what)
            .await?;

        response
            .text()
            .await
            .map_err(|e| PineconeError::InvalidResponse(format!("{what}: {e}")))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        what: &str,
    ) -> Result<T> {
        let response = self
            .send(request.header("accept", "application/json"), what)
            .await?;

        response
            .json()
            .await
            .map_err(|e| PineconeError::InvalidResponse(format!("{what}: {e}")))
    }
}

// Dot segments would be normalised away and address the parent path.
fn check_path_name(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." {
        return Err(PineconeError::ValidationError(format!(
            "'{name}' is not a valid resource name"
        )));
    }
    Ok(())
}

#[async_trait]
impl ControlPlane for PineconeClient {
    fn environment(&self) -> &str {
        &self.environment
    }

    async fn create_index(&self, request: &CreateIndexRequest) -> Result<String> {
        let what = format!("index '{}'", request.name);
        self.send_text(self.request(Method::POST, &[INDEXES])?.json(request), &what)
            .await
    }

    async fn describe_index(&self, name: &str) -> Result<IndexDescription> {
        self.send_json(
            self.named_request(Method::GET, INDEXES, name)?,
            &format!("index '{name}'"),
        )
        .await
    }

    async fn configure_index(
        &self,
        name: &str,
        request: &ConfigureIndexRequest,
    ) -> Result<String> {
        self.send_text(
            self.named_request(Method::PATCH, INDEXES, name)?.json(request),
            &format!("index '{name}'"),
        )
        .await
    }

    async fn delete_index(&self, name: &str) -> Result<String> {
        self.send_text(
            self.named_request(Method::DELETE, INDEXES, name)?,
            &format!("index '{name}'"),
        )
        .await
    }

    async fn list_indexes(&self) -> Result<Vec<String>> {
        self.send_json(self.request(Method::GET, &[INDEXES])?, "index list")
            .await
    }

    async fn create_collection(&self, request: &CreateCollectionRequest) -> Result<String> {
        let what = format!("collection '{}'", request.name);
        self.send_text(
            self.request(Method::POST, &[COLLECTIONS])?.json(request),
            &what,
        )
        .await
    }

    async fn describe_collection(&self, name: &str) -> Result<CollectionDescription> {
        self.send_json(
            self.named_request(Method::GET, COLLECTIONS, name)?,
            &format!("collection '{name}'"),
        )
        .await
    }

    async fn delete_collection(&self, name: &str) -> Result<String> {
        self.send_text(
            self.named_request(Method::DELETE, COLLECTIONS, name)?,
            &format!("collection '{name}'"),
        )
        .await
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        self.send_json(self.request(Method::GET, &[COLLECTIONS])?, "collection list")
            .await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hosted_base_url() {
        let client = PineconeClient::new("key", "us-west4-gcp-free").unwrap();
        assert_eq!(
            client.base_url(),
            "https://controller.us-west4-gcp-free.pinecone.io"
        );
        assert_eq!(client.environment(), "us-west4-gcp-free");
    }

    #[test]
    fn test_from_config_requires_credentials() {
        let config = ClientConfig {
            environment: Some("us-west4-gcp-free".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            PineconeClient::from_config(&config),
            Err(PineconeError::ConfigError(_))
        ));

        let config = ClientConfig {
            api_key: Some("key".to_string()),
            ..Default::default()
        };
        assert!(PineconeClient::from_config(&config).is_err());
    }

    #[test]
    fn test_names_are_encoded_as_one_segment() {
        let client = PineconeClient::new("key", "local")
            .unwrap()
            .with_base_url("http://127.0.0.1:7000");

        let url = client.endpoint(&[INDEXES, "a/b?c#d"]).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:7000/databases/a%2Fb%3Fc%23d");
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);

        let url = client.endpoint(&[COLLECTIONS]).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:7000/collections");
    }

    #[test]
    fn test_dot_segment_names_are_rejected() {
        for name in ["", ".", ".."] {
            assert!(matches!(
                check_path_name(name),
                Err(PineconeError::ValidationError(_))
            ));
        }
        assert!(check_path_name("docs.v2").is_ok());
    }

    #[test]
    fn test_from_config_uses_controller_override() {
        let config = ClientConfig {
            api_key: Some("key".to_string()),
            environment: Some("local".to_string()),
            controller_url: Some("http://127.0.0.1:7000/".to_string()),
            ..Default::default()
        };
        let client = PineconeClient::from_config(&config).unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:7000");
    }
}
