//! Pass-through of everything the write routes do not claim.

use crate::backend::{FORWARDED_HEADERS, ProxiedResponse, ProxyClient};
use crate::config::GatewayConfig;
use crate::error::ApiError;
use crate::routes::helpers::read_body;
use rocket::data::Data;
use rocket::http::Status;
use rocket::http::uri::Origin;
use rocket::request::{FromRequest, Outcome};
use rocket::response::{self, Responder};
use rocket::{Request, Response, State, delete, get, post, put};
use std::convert::Infallible;
use std::io::Cursor;

/// Client headers relayed to the backend.
pub struct ForwardedHeaders(Vec<(String, String)>);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for ForwardedHeaders {
    type Error = Infallible;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let headers = FORWARDED_HEADERS
            .iter()
            .filter_map(|name| {
                request
                    .headers()
                    .get_one(name)
                    .map(|value| (name.to_string(), value.to_string()))
            })
            .collect();

        Outcome::Success(ForwardedHeaders(headers))
    }
}

impl<'r> Responder<'r, 'static> for ProxiedResponse {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let mut response = Response::build();
        response
            .status(Status::new(self.status))
            .sized_body(self.body.len(), Cursor::new(self.body));
        if let Some(content_type) = self.content_type {
            response.raw_header("Content-Type", content_type);
        }
        response.ok()
    }
}

async fn forward(
    method: &str,
    origin: &Origin<'_>,
    headers: ForwardedHeaders,
    body: Data<'_>,
    proxy: &ProxyClient,
    config: &GatewayConfig,
) -> Result<ProxiedResponse, ApiError> {
    let body = read_body(body, config.max_body_bytes).await?;
    let body = (!body.is_empty()).then_some(body);

    Ok(proxy
        .forward(method, &origin.to_string(), &headers.0, body)
        .await?)
}

// Rank 100 sits below every write and gateway route. Search, count and
// scroll requests carry their query in the body even on GET and DELETE.
#[get("/<_..>", data = "<body>", rank = 100)]
pub async fn proxy_get(
    origin: &Origin<'_>,
    headers: ForwardedHeaders,
    body: Data<'_>,
    proxy: &State<ProxyClient>,
    config: &State<GatewayConfig>,
) -> Result<ProxiedResponse, ApiError> {
    forward("GET", origin, headers, body, proxy, config).await
}

#[post("/<_..>", data = "<body>", rank = 100)]
pub async fn proxy_post(
    origin: &Origin<'_>,
    headers: ForwardedHeaders,
    body: Data<'_>,
    proxy: &State<ProxyClient>,
    config: &State<GatewayConfig>,
) -> Result<ProxiedResponse, ApiError> {
    forward("POST", origin, headers, body, proxy, config).await
}

#[put("/<_..>", data = "<body>", rank = 100)]
pub async fn proxy_put(
    origin: &Origin<'_>,
    headers: ForwardedHeaders,
    body: Data<'_>,
    proxy: &State<ProxyClient>,
    config: &State<GatewayConfig>,
) -> Result<ProxiedResponse, ApiError> {
    forward("PUT", origin, headers, body, proxy, config).await
}

#[delete("/<_..>", data = "<body>", rank = 100)]
pub async fn proxy_delete(
    origin: &Origin<'_>,
    headers: ForwardedHeaders,
    body: Data<'_>,
    proxy: &State<ProxyClient>,
    config: &State<GatewayConfig>,
) -> Result<ProxiedResponse, ApiError> {
    forward("DELETE", origin, headers, body, proxy, config).await
}
