//! HTTP client for the confession API.
//!
//! Configuration is via environment variables:
//! - `CONFESS_SERVER_URL` - Base URL (default: `http://localhost:3000/api`)

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::api::ErrorResponse;
use crate::models::*;
use crate::store::{ConfessionStore, StoreError};

/// Default URL for local development.
pub const DEFAULT_URL: &str = "http://localhost:3000/api";

/// HTTP client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {}", .0.error)]
    BadRequest(ErrorResponse),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),
}

impl From<ClientError> for StoreError {
    fn from(e: ClientError) -> Self {
        match e {
            ClientError::NotFound(id) => StoreError::NotFound(id),
            ClientError::BadRequest(body) if !body.fields.is_empty() => {
                StoreError::Validation(ValidationError {
                    fields: body.fields,
                })
            }
            other => StoreError::Transport(other.to_string()),
        }
    }
}

/// HTTP client for the confession API.
#[derive(Debug, Clone)]
pub struct ConfessionClient {
    base_url: String,
    client: Client,
}

impl ConfessionClient {
    /// Create client from environment variables.
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("CONFESS_SERVER_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
        Self::new(base_url)
    }

    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Base URL with `segments` appended, each percent-encoded.
    fn url(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url =
            Url::parse(&self.base_url).map_err(|e| ClientError::InvalidUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
        resource: &str,
    ) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let body = response.text().await.unwrap_or_default();
        match status {
            StatusCode::NOT_FOUND => Err(ClientError::NotFound(resource.to_string())),
            StatusCode::BAD_REQUEST => Err(ClientError::BadRequest(
                serde_json::from_str(&body).unwrap_or(ErrorResponse {
                    error: body,
                    fields: Vec::new(),
                }),
            )),
            _ => Err(ClientError::Server(format!("{}: {}", status, body))),
        }
    }

    pub async fn create_confession(
        &self,
        input: &CreateConfessionInput,
    ) -> Result<ConfessionRecord, ClientError> {
        let response = self
            .client
            .post(self.url(&["confessions"])?)
            .json(input)
            .send()
            .await?;
        self.handle_response(response, "confession").await
    }

    pub async fn get_confession(&self, id: &str) -> Result<ConfessionRecord, ClientError> {
        // Dot segments are dropped when the URL is built and can never name a record.
        if matches!(id, "" | "." | "..") {
            return Err(ClientError::NotFound(id.to_string()));
        }
        let response = self
            .client
            .get(self.url(&["confessions", id])?)
            .send()
            .await?;
        self.handle_response(response, id).await
    }
}

#[async_trait]
impl ConfessionStore for ConfessionClient {
    async fn create(&self, input: CreateConfessionInput) -> Result<ConfessionRecord, StoreError> {
        // Blank fields never leave the client.
        input.validate()?;
        Ok(self.create_confession(&input).await?)
    }

    async fn get(&self, id: &str) -> Result<ConfessionRecord, StoreError> {
        Ok(self.get_confession(id).await?)
    }
}
