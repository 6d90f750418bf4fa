use crate::config::{ConfigError, GatewayConfig, backend_endpoint, parse_backend_url};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Url};
use std::time::Duration;
use thiserror::Error;

/// Request headers copied onto proxied requests.
pub const FORWARDED_HEADERS: [&str; 3] = ["content-type", "accept", "authorization"];

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("invalid proxy configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("unsupported method {0}")]
    Method(String),
    #[error("backend request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Backend answer relayed to the client as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxiedResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

/// Passes read traffic straight through to the backend.
#[derive(Clone)]
pub struct ProxyClient {
    http: reqwest::Client,
    base: Url,
}

impl ProxyClient {
    pub fn new(config: &GatewayConfig) -> Result<Self, ProxyError> {
        let base = parse_backend_url(&config.backend_url)?;
        let http = reqwest::Client::builder()
            .timeout(config.backend_timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent("bulk-gateway/0.1")
            .build()?;

        Ok(Self { http, base })
    }

    pub async fn forward(
        &self,
        method: &str,
        path_and_query: &str,
        headers: &[(String, String)],
        body: Option<Vec<u8>>,
    ) -> Result<ProxiedResponse, ProxyError> {
        let method = Method::from_bytes(method.as_bytes())
            .map_err(|_| ProxyError::Method(method.to_string()))?;
        let url = backend_endpoint(&self.base, path_and_query)?;

        let mut header_map = HeaderMap::new();
        for (name, value) in headers {
            let Ok(name) = HeaderName::from_bytes(name.as_bytes()) else {
                continue;
            };
            if let Ok(value) = value.parse::<HeaderValue>() {
                header_map.insert(name, value);
            }
        }

        let mut request = self.http.request(method, url).headers(header_map);
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?.to_vec();

        Ok(ProxiedResponse {
            status,
            content_type,
            body,
        })
    }
}
