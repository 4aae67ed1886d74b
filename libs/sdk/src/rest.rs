//! Gateway Local API over HTTP
//!
//! Every endpoint is a JSON POST. A 400 response carries a diagnostic body
//! for the caller; every other status is parsed as the success document.

use iofog_config::{ClientConfig, Transport};
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::error::{RestError, SdkError};

/// Response of a Local API call
#[derive(Debug, Clone, PartialEq)]
pub enum RestOutcome {
    Success(Value),
    /// HTTP 400 with the raw response body
    BadRequest(String),
}

/// HTTP client bound to one gateway
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl RestClient {
    pub fn new(config: ClientConfig, request_timeout: Duration) -> Result<Self, SdkError> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(SdkError::HttpClient)?;
        Ok(Self { http, config })
    }

    /// POST `body` to the endpoint at `path`
    pub async fn post(&self, path: &str, body: &Value) -> Result<RestOutcome, RestError> {
        let url = self.config.url(Transport::Http, path);
        debug!("POST {}", url);

        let transport = |source| RestError::Transport {
            url: url.clone(),
            source,
        };
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(transport)?;
        let status = response.status();
        let text = response.text().await.map_err(transport)?;

        if status == StatusCode::BAD_REQUEST {
            return Ok(RestOutcome::BadRequest(text));
        }
        serde_json::from_str(&text)
            .map(RestOutcome::Success)
            .map_err(|e| RestError::InvalidBody {
                url: url.clone(),
                status: status.as_u16(),
                reason: e.to_string(),
            })
    }
}
