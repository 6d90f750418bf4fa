//! Bulk submissions at cluster, index and type scope.
//!
//! The body is split into individual operations, each formatted on its own,
//! and the whole submission is queued all-or-nothing.

use crate::batch::Accumulator;
use crate::bulk::{format, parse_bulk};
use crate::config::GatewayConfig;
use crate::error::ApiError;
use crate::models::AcceptedResponse;
use crate::routes::helpers::read_body;
use crate::routes::params::{IndexName, TypeName};
use rocket::data::Data;
use rocket::response::status::Accepted;
use rocket::serde::json::Json;
use rocket::{State, post, put};
use std::sync::Arc;

type BulkResult = Result<Accepted<Json<AcceptedResponse>>, ApiError>;

#[post("/_bulk", data = "<body>")]
pub async fn post_cluster_bulk(
    body: Data<'_>,
    accumulator: &State<Arc<Accumulator>>,
    config: &State<GatewayConfig>,
) -> BulkResult {
    submit_bulk(body, None, None, accumulator, config).await
}

#[put("/_bulk", data = "<body>")]
pub async fn put_cluster_bulk(
    body: Data<'_>,
    accumulator: &State<Arc<Accumulator>>,
    config: &State<GatewayConfig>,
) -> BulkResult {
    submit_bulk(body, None, None, accumulator, config).await
}

#[post("/<index>/_bulk", data = "<body>")]
pub async fn post_index_bulk(
    index: IndexName,
    body: Data<'_>,
    accumulator: &State<Arc<Accumulator>>,
    config: &State<GatewayConfig>,
) -> BulkResult {
    submit_bulk(body, Some(&*index), None, accumulator, config).await
}

#[put("/<index>/_bulk", data = "<body>")]
pub async fn put_index_bulk(
    index: IndexName,
    body: Data<'_>,
    accumulator: &State<Arc<Accumulator>>,
    config: &State<GatewayConfig>,
) -> BulkResult {
    submit_bulk(body, Some(&*index), None, accumulator, config).await
}

#[post("/<index>/<doc_type>/_bulk", data = "<body>")]
pub async fn post_type_bulk(
    index: IndexName,
    doc_type: TypeName,
    body: Data<'_>,
    accumulator: &State<Arc<Accumulator>>,
    config: &State<GatewayConfig>,
) -> BulkResult {
    submit_bulk(body, Some(&*index), Some(&*doc_type), accumulator, config).await
}

#[put("/<index>/<doc_type>/_bulk", data = "<body>")]
pub async fn put_type_bulk(
    index: IndexName,
    doc_type: TypeName,
    body: Data<'_>,
    accumulator: &State<Arc<Accumulator>>,
    config: &State<GatewayConfig>,
) -> BulkResult {
    submit_bulk(body, Some(&*index), Some(&*doc_type), accumulator, config).await
}

async fn submit_bulk(
    body: Data<'_>,
    default_index: Option<&str>,
    default_type: Option<&str>,
    accumulator: &Accumulator,
    config: &GatewayConfig,
) -> BulkResult {
    let raw = read_body(body, config.max_body_bytes).await?;
    let operations = parse_bulk(&raw, default_index, default_type)?;
    if operations.is_empty() {
        return Err(ApiError::BadRequest(
            "bulk body contains no operations".to_string(),
        ));
    }

    let fragments: Vec<_> = operations.iter().map(format).collect();
    let accepted = fragments.len();
    accumulator.enqueue_all(fragments)?;

    log::debug!("queued bulk submission of {} operations", accepted);
    Ok(Accepted(Json(AcceptedResponse { accepted })))
}
