use bulk_gateway::batch::Accumulator;
use bulk_gateway::models::{GatewayStatsResponse, HealthResponse};
use bulk_gateway::test_support::TestRocketBuilder;
use rocket::http::Status;
use std::sync::Arc;

#[test]
fn health_endpoint_returns_ok() {
    let client = TestRocketBuilder::new().blocking_client();

    let response = client.get("/_gateway/health").dispatch();
    assert_eq!(response.status(), Status::Ok);

    let payload: HealthResponse = response.into_json().expect("valid JSON payload");
    assert_eq!(payload.status, "ok");
}

#[test]
fn health_reports_stopped_once_buffer_closes() {
    let accumulator = Arc::new(Accumulator::new(8, 4));
    let client = TestRocketBuilder::new()
        .manage_accumulator(accumulator.clone())
        .blocking_client();

    accumulator.close();

    let response = client.get("/_gateway/health").dispatch();
    assert_eq!(response.status(), Status::ServiceUnavailable);
    let payload: HealthResponse = response.into_json().expect("valid JSON payload");
    assert_eq!(payload.status, "stopped");
}

#[test]
fn stats_reflect_queued_and_rejected_writes() {
    let accumulator = Arc::new(Accumulator::new(2, 2));
    let client = TestRocketBuilder::new()
        .manage_accumulator(accumulator.clone())
        .blocking_client();

    for id in 1..=3 {
        client.delete(format!("/logs/entry/{id}")).dispatch();
    }

    let response = client.get("/_gateway/stats").dispatch();
    assert_eq!(response.status(), Status::Ok);

    let stats: GatewayStatsResponse = response.into_json().expect("valid JSON payload");
    assert_eq!(stats.queue_length, 2);
    assert_eq!(stats.capacity, 2);
    assert_eq!(stats.flush_threshold, 2);
    assert_eq!(stats.fragments_accepted, 2);
    assert_eq!(stats.fragments_rejected, 1);
    assert_eq!(stats.batches_sent, 0);
    assert!(stats.last_flush_at.is_none());
}
