//! Tracking Service Client
//!
//! A small, typed client for the Weights & Biases GraphQL API, limited to
//! what the crawler needs: enumerating running jobs of a project and reading
//! their most recent log lines.
//!
//! # Example
//!
//! ```no_run
//! use crawler_client::WandbClient;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = WandbClient::new("https://api.wandb.ai/graphql");
//!
//!     for job in client.list_running_jobs("my-team", "my-project").await? {
//!         let lines = client.fetch_log_lines("my-team", "my-project", &job.id, 100).await?;
//!         println!("{}: {} lines", job.owner_key(), lines.len());
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
mod graphql;
mod logs;
mod runs;

// Re-export commonly used types
pub use crawler_core::domain::job::Job;
pub use crawler_core::domain::log::LogLine;
pub use error::{ClientError, Result};

use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::graphql::{GraphQlRequest, GraphQlResponse};

/// Public GraphQL endpoint of the hosted service
pub const DEFAULT_ENDPOINT: &str = "https://api.wandb.ai/graphql";

/// Username the service expects alongside an API key in basic auth
const API_KEY_USER: &str = "api";

/// HTTP client for the tracking service GraphQL API
#[derive(Debug, Clone)]
pub struct WandbClient {
    /// GraphQL endpoint URL
    endpoint: String,
    /// HTTP client instance
    client: Client,
    /// API key, sent as basic auth when present
    api_key: Option<String>,
}

impl WandbClient {
    /// Create a new client for the given GraphQL endpoint
    ///
    /// # Example
    /// ```
    /// use crawler_client::WandbClient;
    ///
    /// let client = WandbClient::new("https://api.wandb.ai/graphql");
    /// ```
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_client(endpoint, Client::new())
    }

    /// Create a new client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(endpoint: impl Into<String>, client: Client) -> Self {
        let endpoint = endpoint.into();
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            client,
            api_key: None,
        }
    }

    /// Authenticate requests with an API key
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        let api_key = api_key.into();
        self.api_key = (!api_key.is_empty()).then_some(api_key);
        self
    }

    /// Get the GraphQL endpoint URL
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Whether requests carry credentials
    pub fn is_authenticated(&self) -> bool {
        self.api_key.is_some()
    }

    // =============================================================================
    // Request Handling
    // =============================================================================

    /// Execute a GraphQL operation and deserialize its `data` payload
    async fn query<V, T>(&self, operation_name: &str, query: &str, variables: V) -> Result<T>
    where
        V: Serialize,
        T: DeserializeOwned,
    {
        let request = GraphQlRequest {
            operation_name,
            query,
            variables,
        };

        let mut builder = self.client.post(&self.endpoint).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.basic_auth(API_KEY_USER, Some(key));
        }

        let response = builder.send().await?;
        let envelope: GraphQlResponse<T> = self.handle_response(response).await?;
        envelope.into_data()
    }

    /// Handle an API response and deserialize JSON
    ///
    /// This method checks the status code and returns an appropriate error if
    /// the request failed, or deserializes the response body if successful.
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }
}
