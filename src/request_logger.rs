use rocket::fairing::{Fairing, Info, Kind};
use rocket::{Data, Request, Response};
use std::time::Instant;

/// Fairing to log one line per HTTP request with timing and whether the
/// request was buffered for bulk delivery or relayed to the backend
pub struct RequestLogger;

fn route_kind(request: &Request<'_>) -> &'static str {
    let Some(route) = request.route() else {
        return "unrouted";
    };

    match route.name.as_deref() {
        Some(name) if name.starts_with("proxy_") => "proxied",
        Some("health_check" | "gateway_stats") => "gateway",
        Some(_) => "buffered",
        None => "unnamed",
    }
}

#[rocket::async_trait]
impl Fairing for RequestLogger {
    fn info(&self) -> Info {
        Info {
            name: "Request Logger",
            kind: Kind::Request | Kind::Response,
        }
    }

    async fn on_request(&self, request: &mut Request<'_>, _: &mut Data<'_>) {
        request.local_cache(Instant::now);
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        let duration = request.local_cache(Instant::now).elapsed();
        let status = response.status();
        let kind = route_kind(request);

        if status.code >= 500 {
            log::warn!(
                "{} {} -> {} [{}] ({:.2}ms)",
                request.method(),
                request.uri(),
                status.code,
                kind,
                duration.as_secs_f64() * 1000.0
            );
        } else {
            log::info!(
                "{} {} -> {} [{}] ({:.2}ms)",
                request.method(),
                request.uri(),
                status.code,
                kind,
                duration.as_secs_f64() * 1000.0
            );
        }
    }
}
