//! Helpers shared by the integration tests.

/// URL of a local port nothing is listening on.
#[allow(dead_code)]
pub async fn closed_port_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind throwaway listener");
    let addr = listener.local_addr().expect("listener address");
    drop(listener);
    format!("http://{addr}")
}

/// Bulk response body with the given top-level `errors` flag.
#[allow(dead_code)]
pub fn bulk_response(errors: bool) -> String {
    format!(r#"{{"took":3,"errors":{errors},"items":[]}}"#)
}
