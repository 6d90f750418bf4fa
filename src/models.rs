use crate::batch::{SchedulerState, StatsSnapshot};
use serde::{Deserialize, Serialize};

/// Returned by every write route: the operations were queued for the next
/// flush, not yet written to the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AcceptedResponse {
    pub accepted: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayStatsResponse {
    #[serde(rename = "queueLength")]
    pub queue_length: usize,
    pub capacity: usize,
    #[serde(rename = "flushThreshold")]
    pub flush_threshold: usize,
    pub scheduler: SchedulerState,
    #[serde(rename = "fragmentsAccepted")]
    pub fragments_accepted: u64,
    #[serde(rename = "fragmentsRejected")]
    pub fragments_rejected: u64,
    #[serde(rename = "batchesSent")]
    pub batches_sent: u64,
    #[serde(rename = "batchesFailed")]
    pub batches_failed: u64,
    #[serde(rename = "fragmentsDelivered")]
    pub fragments_delivered: u64,
    #[serde(rename = "fragmentsDropped")]
    pub fragments_dropped: u64,
    #[serde(rename = "lastFlushAt")]
    pub last_flush_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl GatewayStatsResponse {
    pub fn new(
        queue_length: usize,
        capacity: usize,
        flush_threshold: usize,
        snapshot: StatsSnapshot,
    ) -> Self {
        Self {
            queue_length,
            capacity,
            flush_threshold,
            scheduler: snapshot.state,
            fragments_accepted: snapshot.fragments_accepted,
            fragments_rejected: snapshot.fragments_rejected,
            batches_sent: snapshot.batches_sent,
            batches_failed: snapshot.batches_failed,
            fragments_delivered: snapshot.fragments_delivered,
            fragments_dropped: snapshot.fragments_dropped,
            last_flush_at: snapshot.last_flush_at,
        }
    }
}
