//! External offer validator client.
//!
//! The validator is a black-box classifier: it receives a reduced projection
//! of each candidate (title, price, url) and answers with `valid`/`rejected`
//! partitions. Any failure to reach it or to read its answer is
//! [`Error::ValidatorUnavailable`]; the coordinator decides how to degrade.

use std::time::Duration;

use async_trait::async_trait;
use offerscout_core::{AppConfig, Error, NormalizedOffer, OfferProjection, Query, ValidationDecision};
use reqwest::header;
use serde::Serialize;

#[async_trait]
pub trait OfferValidator: Send + Sync {
    async fn validate(&self, query: &Query, candidates: &[NormalizedOffer]) -> Result<ValidationDecision, Error>;
}

#[derive(Debug, Serialize)]
struct ValidationRequest<'a> {
    query: &'a str,
    candidates: Vec<OfferProjection>,
}

/// Validator reached over HTTP with bearer authentication.
#[derive(Debug, Clone)]
pub struct HttpValidator {
    http: reqwest::Client,
    url: String,
    api_key: String,
}

impl HttpValidator {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("validator client: {e}")))?;
        Ok(Self { http, url: url.into(), api_key: api_key.into() })
    }

    /// The configured validator, if any.
    pub fn from_config(config: &AppConfig) -> Result<Option<Self>, Error> {
        let credentials = config.validator_credentials().map_err(|e| Error::Config(e.to_string()))?;
        credentials
            .map(|(url, key)| Self::new(url, key, config.validator_timeout()))
            .transpose()
    }
}

#[async_trait]
impl OfferValidator for HttpValidator {
    async fn validate(&self, query: &Query, candidates: &[NormalizedOffer]) -> Result<ValidationDecision, Error> {
        let body = ValidationRequest {
            query: query.raw(),
            candidates: candidates.iter().map(NormalizedOffer::projection).collect(),
        };

        tracing::debug!(query = %query, candidates = body.candidates.len(), "validating offers");

        let response = self
            .http
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .header(header::ACCEPT, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::ValidatorUnavailable("validator timed out".into())
                } else {
                    Error::ValidatorUnavailable(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::ValidatorUnavailable(format!("validator answered HTTP {}", status.as_u16())));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::ValidatorUnavailable(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| Error::ValidatorUnavailable(format!("unreadable verdict: {e}")))
    }
}
