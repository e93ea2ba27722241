//! HTTP client for the admin pipeline API.
//!
//! All requests go to `{base_url}/api/v1/admin/pipeline/{id}/...`, where the
//! base URL is read from the [`EnvironmentContext`] at call time.

mod error;
mod response;

pub use error::ApiError;
pub use response::{error_message_from_body, GENERIC_FAILURE};

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::credentials::CredentialStore;
use crate::environment::EnvironmentContext;
use crate::models::{BookListResponse, BookStatus, PipelineReport, PipelineRunStatus};

/// Header marking requests as coming from the admin console.
pub const ADMIN_MODE_HEADER: &str = "X-Admin-Mode";

const PIPELINE_PATH: &str = "/api/v1/admin/pipeline";

/// Operations the poller needs from the pipeline API.
#[async_trait]
pub trait PipelineApi: Send + Sync {
    async fn get_status(&self, run_id: &str) -> Result<PipelineRunStatus, ApiError>;

    async fn get_books(&self, run_id: &str) -> Result<Vec<BookStatus>, ApiError>;

    async fn get_report(&self, run_id: &str) -> Result<PipelineReport, ApiError>;

    /// Ask the server to stop the run. Says nothing about whether it stopped.
    async fn cancel(&self, run_id: &str) -> Result<(), ApiError>;
}

/// reqwest-backed admin API client.
#[derive(Clone)]
pub struct AdminClient {
    client: Client,
    environment: Arc<EnvironmentContext>,
    credentials: Arc<CredentialStore>,
}

impl AdminClient {
    pub fn new(
        environment: Arc<EnvironmentContext>,
        credentials: Arc<CredentialStore>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .user_agent(concat!("libradmin/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(|e| ApiError::Network(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            environment,
            credentials,
        })
    }

    pub fn environment(&self) -> &EnvironmentContext {
        &self.environment
    }

    /// URL for a pipeline endpoint of `run_id` in the current environment.
    pub fn pipeline_url(&self, run_id: &str, endpoint: &str) -> String {
        format!(
            "{}{}/{}/{}",
            self.environment.base_url(),
            PIPELINE_PATH,
            urlencoding::encode(run_id),
            endpoint
        )
    }

    /// Send a request with the admin headers and fail on non-2xx.
    async fn send(&self, method: Method, url: &str) -> Result<Response, ApiError> {
        let mut request = self
            .client
            .request(method.clone(), url)
            .header(ADMIN_MODE_HEADER, "true");

        match self.credentials.token() {
            Some(token) => request = request.bearer_auth(token),
            None => warn!(url, "No admin token configured; sending unauthenticated request"),
        }

        let start = Instant::now();
        let response = request.send().await?;
        let status = response.status();
        debug!(
            method = %method,
            url,
            status = status.as_u16(),
            elapsed = ?start.elapsed(),
            "Admin API request"
        );

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Http {
            status: status.as_u16(),
            message: error_message_from_body(&body),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        let response = self.send(Method::GET, url).await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[async_trait]
impl PipelineApi for AdminClient {
    async fn get_status(&self, run_id: &str) -> Result<PipelineRunStatus, ApiError> {
        self.get_json(&self.pipeline_url(run_id, "status")).await
    }

    async fn get_books(&self, run_id: &str) -> Result<Vec<BookStatus>, ApiError> {
        let list: BookListResponse = self.get_json(&self.pipeline_url(run_id, "books")).await?;
        Ok(list.books)
    }

    async fn get_report(&self, run_id: &str) -> Result<PipelineReport, ApiError> {
        self.get_json(&self.pipeline_url(run_id, "report")).await
    }

    async fn cancel(&self, run_id: &str) -> Result<(), ApiError> {
        self.send(Method::POST, &self.pipeline_url(run_id, "cancel"))
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::{Environment, EnvironmentUrls, SwitchRequest};

    fn client() -> AdminClient {
        let env = EnvironmentContext::new(
            EnvironmentUrls {
                local: "http://localhost:8000/".to_string(),
                production: "https://api.example-reader.com".to_string(),
            },
            Environment::Local,
        );
        AdminClient::new(
            Arc::new(env),
            Arc::new(CredentialStore::fixed(None)),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_pipeline_url_encodes_run_id() {
        let client = client();
        assert_eq!(
            client.pipeline_url("run 1/2", "status"),
            "http://localhost:8000/api/v1/admin/pipeline/run%201%2F2/status"
        );
    }

    #[test]
    fn test_pipeline_url_follows_environment_switch() {
        let client = client();
        assert!(client.pipeline_url("abc", "books").starts_with("http://localhost:8000/"));

        let SwitchRequest::NeedsConfirmation(pending) = client
            .environment()
            .request_switch(Environment::Production)
            .unwrap()
        else {
            panic!("expected confirmation");
        };
        pending.confirm(client.environment()).unwrap();

        assert_eq!(
            client.pipeline_url("abc", "books"),
            "https://api.example-reader.com/api/v1/admin/pipeline/abc/books"
        );
    }

    #[test]
    fn test_http_error_display_includes_status() {
        let err = ApiError::Http {
            status: 500,
            message: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 500: boom");
        assert_eq!(err.status(), Some(500));
    }
}
