//! Backend clients: bulk delivery of flushed batches and read pass-through.

pub mod proxy;
pub mod sender;

pub use proxy::{FORWARDED_HEADERS, ProxiedResponse, ProxyClient, ProxyError};
pub use sender::{BulkBackend, DeliveryReport, FlushOutcome, HttpBackend};
