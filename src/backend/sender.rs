use crate::bulk::Batch;
use crate::config::{ConfigError, GatewayConfig, backend_endpoint, parse_backend_url};
use log::{debug, warn};
use reqwest::Url;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use std::time::{Duration, Instant};

const MAX_ERROR_BODY: usize = 512;

/// What the backend made of a successfully delivered batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub fragments: usize,
    pub status: u16,
    pub elapsed: Duration,
    /// Top-level `errors` flag of the bulk response, when it could be read.
    pub item_errors: Option<bool>,
}

/// Result of one flush attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    Success(DeliveryReport),
    /// The batch was not written; the next batch may still succeed.
    TransientFailure(String),
    /// No batch can ever be delivered with the current configuration.
    FatalFailure(String),
}

impl FlushOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, FlushOutcome::Success(_))
    }
}

/// Destination for flushed batches.
#[rocket::async_trait]
pub trait BulkBackend: Send + Sync {
    async fn send(&self, batch: Batch) -> FlushOutcome;
}

#[derive(Debug, Deserialize)]
struct BulkResponseSummary {
    errors: bool,
}

/// Delivers batches with one `POST <base>/_bulk` each.
#[derive(Clone)]
pub struct HttpBackend {
    http: reqwest::Client,
    endpoint: Result<Url, ConfigError>,
}

impl HttpBackend {
    pub fn new(config: &GatewayConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(config.backend_timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent("bulk-gateway/0.1")
            .build()?;

        let endpoint = parse_backend_url(&config.backend_url)
            .and_then(|base| backend_endpoint(&base, "/_bulk"));

        Ok(Self { http, endpoint })
    }

    pub fn endpoint(&self) -> Option<&Url> {
        self.endpoint.as_ref().ok()
    }
}

#[rocket::async_trait]
impl BulkBackend for HttpBackend {
    async fn send(&self, batch: Batch) -> FlushOutcome {
        let endpoint = match &self.endpoint {
            Ok(url) => url.clone(),
            Err(err) => return FlushOutcome::FatalFailure(err.to_string()),
        };

        let fragments = batch.len();
        let started = Instant::now();
        let response = match self
            .http
            .post(endpoint)
            .header(CONTENT_TYPE, "application/json")
            .body(batch.into_payload())
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) if err.is_builder() => {
                return FlushOutcome::FatalFailure(format!("cannot build bulk request: {err}"));
            }
            Err(err) => {
                return FlushOutcome::TransientFailure(format!("bulk request failed: {err}"));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return FlushOutcome::TransientFailure(format!(
                "backend returned status {status}: {}",
                truncate(&body, MAX_ERROR_BODY)
            ));
        }

        let item_errors = match response.bytes().await {
            Ok(body) => serde_json::from_slice::<BulkResponseSummary>(&body)
                .ok()
                .map(|summary| summary.errors),
            Err(err) => {
                debug!("could not read bulk response body: {}", err);
                None
            }
        };

        if item_errors == Some(true) {
            warn!(
                "backend accepted batch of {} fragments but reported item errors",
                fragments
            );
        }

        FlushOutcome::Success(DeliveryReport {
            fragments,
            status: status.as_u16(),
            elapsed: started.elapsed(),
            item_errors,
        })
    }
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
