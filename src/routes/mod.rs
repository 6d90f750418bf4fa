//! HTTP route handlers.
//!
//! Writes (`documents`, `bulk`) are formatted and queued for the next flush;
//! `health` reports on the gateway itself; everything else falls through to
//! the `proxy` handlers and reaches the backend untouched.

pub mod bulk;
pub mod documents;
pub mod health;
pub(crate) mod helpers;
pub mod params;
pub mod proxy;

use rocket::{Route, routes};

/// Every route the gateway serves, ready to mount at `/`.
pub fn gateway_routes() -> Vec<Route> {
    routes![
        // Gateway routes
        health::health_check,
        health::gateway_stats,
        // Document writes
        documents::put_document,
        documents::post_document,
        documents::delete_document,
        // Bulk submissions
        bulk::post_cluster_bulk,
        bulk::put_cluster_bulk,
        bulk::post_index_bulk,
        bulk::put_index_bulk,
        bulk::post_type_bulk,
        bulk::put_type_bulk,
        // Read pass-through
        proxy::proxy_get,
        proxy::proxy_post,
        proxy::proxy_put,
        proxy::proxy_delete,
    ]
}
