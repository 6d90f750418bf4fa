//! Gateway health and buffering statistics.

use crate::batch::Accumulator;
use crate::models::{GatewayStatsResponse, HealthResponse};
use rocket::State;
use rocket::get;
use rocket::http::Status;
use rocket::serde::json::Json;
use std::sync::Arc;

/// Healthy while writes are being accepted; 503 once the flush scheduler has
/// stopped for good.
#[get("/_gateway/health")]
pub fn health_check(accumulator: &State<Arc<Accumulator>>) -> (Status, Json<HealthResponse>) {
    if accumulator.is_closed() {
        (
            Status::ServiceUnavailable,
            Json(HealthResponse {
                status: "stopped".to_string(),
            }),
        )
    } else {
        (
            Status::Ok,
            Json(HealthResponse {
                status: "ok".to_string(),
            }),
        )
    }
}

#[get("/_gateway/stats")]
pub fn gateway_stats(accumulator: &State<Arc<Accumulator>>) -> Json<GatewayStatsResponse> {
    Json(GatewayStatsResponse::new(
        accumulator.len(),
        accumulator.capacity(),
        accumulator.threshold(),
        accumulator.stats().snapshot(),
    ))
}
