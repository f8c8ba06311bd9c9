//! HTTP health probe for a node's REST API.

use crate::error::{Result, ValidationError};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// Status and body of one probe request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResponse {
    pub status: u16,
    pub body: String,
}

#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// GET `url`. Any HTTP status is a response; only transport failures are
    /// errors.
    async fn get(&self, url: &str) -> Result<ProbeResponse>;
}

/// [`HealthProbe`] over `reqwest` with a per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpHealthProbe {
    client: reqwest::Client,
}

impl HttpHealthProbe {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HealthProbe for HttpHealthProbe {
    async fn get(&self, url: &str) -> Result<ProbeResponse> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ValidationError::Probe {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(ProbeResponse { status, body })
    }
}

/// The `ledger_version` marker of a node API payload.
///
/// Accepts a non-negative JSON integer or a string of ASCII digits; anything
/// else, including an unparsable body, yields `None`.
pub fn ledger_version(body: &str) -> Option<u64> {
    let payload: Value = serde_json::from_str(body).ok()?;
    match payload.get("ledger_version")? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) => {
            s.parse().ok()
        }
        _ => None,
    }
}
