//! Backend HTTP Client
//!
//! `reqwest` implementation of [`BackendClient`]. One pooled client is
//! shared by every request the edge forwards.

use reqwest::Client;

use crate::application::config::EdgeConfig;
use crate::domain::backend::{BackendClient, CallOutcome};
use crate::domain::entity::exchange::{BackendResponse, RequestDescriptor};
use crate::error::{EdgeError, EdgeResult};

/// Pooled HTTP client bound to the backend base URL
#[derive(Clone)]
pub struct ReqwestBackendClient {
    client: Client,
    base_url: String,
}

impl ReqwestBackendClient {
    pub fn new(config: &EdgeConfig) -> EdgeResult<Self> {
        let client = Client::builder()
            .connect_timeout(config.backend_connect_timeout)
            .timeout(config.backend_timeout)
            .pool_idle_timeout(std::time::Duration::from_secs(90))
            .build()
            .map_err(|e| EdgeError::Internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.backend_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl BackendClient for ReqwestBackendClient {
    async fn call(&self, bearer: Option<&str>, request: &RequestDescriptor) -> CallOutcome {
        let mut builder = self
            .client
            .request(request.method().clone(), self.url(request.path()))
            .headers(platform::headers::forwardable_request(request.headers()))
            .body(request.body().clone());

        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(
                    method = %request.method(),
                    path = request.path(),
                    error = %e,
                    "Backend request failed"
                );
                return CallOutcome::Unreachable(e.to_string());
            }
        };

        let status = response.status();
        let headers = platform::headers::forwardable_response(response.headers());

        // A body cut off mid-stream is a transport failure
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(path = request.path(), error = %e, "Backend response body failed");
                return CallOutcome::Unreachable(e.to_string());
            }
        };

        tracing::debug!(
            method = %request.method(),
            path = request.path(),
            status = status.as_u16(),
            "Backend call completed"
        );

        CallOutcome::from_response(BackendResponse::new(status, body).with_headers(headers))
    }
}
