//! HTTP client for the remote document manager.
//!
//! The manager owns document content and serves live editing sessions. We
//! only ever fetch or drop content and mint edit tickets.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

#[derive(Debug, Error)]
pub enum DocManagerError {
    #[error("document not found in document manager")]
    NotFound,

    #[error("document manager unavailable: {0}")]
    Unavailable(String),

    #[error("document manager returned {status}")]
    Upstream { status: u16 },

    #[error("unexpected document manager response: {0}")]
    Decode(String),

    #[error("document manager misconfigured: {0}")]
    Config(String),
}

impl From<reqwest::Error> for DocManagerError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() || e.is_connect() {
            DocManagerError::Unavailable(e.to_string())
        } else if e.is_decode() {
            DocManagerError::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            DocManagerError::Upstream {
                status: status.as_u16(),
            }
        } else {
            DocManagerError::Unavailable(e.to_string())
        }
    }
}

/// Short-lived credential for one editing session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditTicket {
    pub ticket: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct TicketRequest {
    user_id: String,
}

#[derive(Clone)]
pub struct DocManagerClient {
    http: reqwest::Client,
    base_url: Url,
    api_token: Option<String>,
}

impl DocManagerClient {
    /// Build a client for `base_url` with a per-request `timeout`.
    pub fn new(
        base_url: &str,
        api_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, DocManagerError> {
        let mut base_url =
            Url::parse(base_url).map_err(|e| DocManagerError::Config(format!("base url: {e}")))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(DocManagerError::Config(format!(
                "unsupported scheme {}",
                base_url.scheme()
            )));
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DocManagerError::Config(format!("http client: {e}")))?;
        Ok(Self {
            http,
            base_url,
            api_token,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, DocManagerError> {
        self.base_url
            .join(path)
            .map_err(|e| DocManagerError::Config(format!("endpoint {path}: {e}")))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, DocManagerError> {
        let response = self.authorize(request).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(DocManagerError::NotFound),
            status if status.is_success() => Ok(response),
            status => Err(DocManagerError::Upstream {
                status: status.as_u16(),
            }),
        }
    }

    /// Fetch the stored content of a document. The format is opaque here.
    pub async fn get_document_content(
        &self,
        document_id: i64,
    ) -> Result<serde_json::Value, DocManagerError> {
        let url = self.endpoint(&format!("api/documents/{document_id}"))?;
        let response = self.send(self.http.get(url)).await?;
        Ok(response.json().await?)
    }

    pub async fn delete_document(&self, document_id: i64) -> Result<(), DocManagerError> {
        let url = self.endpoint(&format!("api/documents/{document_id}"))?;
        self.send(self.http.delete(url)).await?;
        debug!(document_id, "document content dropped");
        Ok(())
    }

    /// Mint a ticket scoped to `(document_id, user_id)`.
    ///
    /// Every call yields a new ticket; do not retry on failure.
    pub async fn issue_ticket(
        &self,
        document_id: i64,
        user_id: i64,
    ) -> Result<EditTicket, DocManagerError> {
        let url = self.endpoint(&format!("api/documents/{document_id}/ticket"))?;
        let body = TicketRequest {
            user_id: user_id.to_string(),
        };
        let response = self.send(self.http.post(url).json(&body)).await?;
        let ticket: EditTicket = response.json().await?;
        debug!(document_id, user_id, expires_at = %ticket.expires_at, "edit ticket issued");
        Ok(ticket)
    }

    /// Websocket URL of the editing session for `ticket`.
    pub fn edit_endpoint(&self, ticket: &str) -> Result<Url, DocManagerError> {
        let mut url = self.endpoint("edit")?;
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme)
            .map_err(|()| DocManagerError::Config(format!("cannot use {scheme} scheme")))?;
        url.query_pairs_mut().append_pair("ticket", ticket);
        Ok(url)
    }
}
