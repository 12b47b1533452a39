//! Lookup Gateway
//!
//! One outbound GET per lookup against the configured base endpoint:
//! `GET <base><urlencoded identifier>`. No retries, no caching.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use crate::record::LookupRecord;

const MEMBER_LIST_FIELD: &str = "memberDetailsList";

/// Lookup failures. `Display` carries full detail for logs;
/// [`LookupError::user_message`] is what a chat user sees.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("Transport error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Upstream timed out after {0:?}")]
    Timeout(Duration),

    #[error("Upstream returned HTTP {0}")]
    HttpStatus(u16),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Record not found")]
    NotFound,
}

impl LookupError {
    /// Description safe to show to the user
    pub fn user_message(&self) -> String {
        match self {
            LookupError::Transport(_) => "The lookup service could not be reached.".to_string(),
            LookupError::Timeout(_) => "The lookup service took too long to respond.".to_string(),
            LookupError::HttpStatus(status) => {
                format!("The lookup service returned an error (HTTP {}).", status)
            }
            LookupError::MalformedResponse(_) => {
                "The lookup service sent a response that could not be read.".to_string()
            }
            LookupError::NotFound => "No record was found for this number.".to_string(),
        }
    }
}

/// Source of family records. Callers validate the identifier first.
#[async_trait]
pub trait LookupGateway: Send + Sync {
    async fn fetch_family_record(&self, identifier: &str) -> Result<LookupRecord, LookupError>;
}

/// reqwest-backed gateway
#[derive(Clone)]
pub struct HttpLookupGateway {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpLookupGateway {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("rationbot/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            timeout,
        })
    }

    /// Request URL for an identifier
    pub fn url_for(&self, identifier: &str) -> String {
        format!("{}{}", self.base_url, urlencoding::encode(identifier))
    }
}

#[async_trait]
impl LookupGateway for HttpLookupGateway {
    async fn fetch_family_record(&self, identifier: &str) -> Result<LookupRecord, LookupError> {
        let url = self.url_for(identifier);

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LookupError::Timeout(self.timeout)
                } else {
                    LookupError::Transport(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!("Lookup upstream returned {}", status);
            return Err(LookupError::HttpStatus(status.as_u16()));
        }

        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                LookupError::Timeout(self.timeout)
            } else {
                LookupError::Transport(e)
            }
        })?;
        debug!("Lookup upstream body: {} bytes", body.len());

        parse_record(&body)
    }
}

/// Parse an upstream body into a record.
///
/// Anything that is not JSON is malformed; JSON without a member list means
/// the identifier is unknown upstream.
pub fn parse_record(body: &[u8]) -> Result<LookupRecord, LookupError> {
    let value: serde_json::Value = serde_json::from_slice(body)
        .map_err(|e| LookupError::MalformedResponse(e.to_string()))?;

    let has_members = value
        .get(MEMBER_LIST_FIELD)
        .map(|v| !v.is_null())
        .unwrap_or(false);
    if !has_members {
        return Err(LookupError::NotFound);
    }

    serde_json::from_value(value).map_err(|e| LookupError::MalformedResponse(e.to_string()))
}
