use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

/// Where the flush loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    Idle,
    Flushing,
    Stopped,
}

impl SchedulerState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => SchedulerState::Flushing,
            2 => SchedulerState::Stopped,
            _ => SchedulerState::Idle,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            SchedulerState::Idle => 0,
            SchedulerState::Flushing => 1,
            SchedulerState::Stopped => 2,
        }
    }
}

/// Counters shared by the write handlers and the flush loop.
#[derive(Debug, Default)]
pub struct GatewayStats {
    state: AtomicU8,
    fragments_accepted: AtomicU64,
    fragments_rejected: AtomicU64,
    batches_sent: AtomicU64,
    batches_failed: AtomicU64,
    fragments_delivered: AtomicU64,
    fragments_dropped: AtomicU64,
    last_flush_at: Mutex<Option<DateTime<Utc>>>,
}

/// Point-in-time copy of [`GatewayStats`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub state: SchedulerState,
    pub fragments_accepted: u64,
    pub fragments_rejected: u64,
    pub batches_sent: u64,
    pub batches_failed: u64,
    pub fragments_delivered: u64,
    pub fragments_dropped: u64,
    pub last_flush_at: Option<DateTime<Utc>>,
}

impl GatewayStats {
    pub fn state(&self) -> SchedulerState {
        SchedulerState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn set_state(&self, state: SchedulerState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }

    pub fn record_accepted(&self, count: usize) {
        self.fragments_accepted
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_rejected(&self, count: usize) {
        self.fragments_rejected
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_delivered(&self, count: usize) {
        self.batches_sent.fetch_add(1, Ordering::Relaxed);
        self.fragments_delivered
            .fetch_add(count as u64, Ordering::Relaxed);
        *self.last_flush_at.lock() = Some(Utc::now());
    }

    pub fn record_dropped(&self, count: usize) {
        self.batches_failed.fetch_add(1, Ordering::Relaxed);
        self.fragments_dropped
            .fetch_add(count as u64, Ordering::Relaxed);
        *self.last_flush_at.lock() = Some(Utc::now());
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            state: self.state(),
            fragments_accepted: self.fragments_accepted.load(Ordering::Relaxed),
            fragments_rejected: self.fragments_rejected.load(Ordering::Relaxed),
            batches_sent: self.batches_sent.load(Ordering::Relaxed),
            batches_failed: self.batches_failed.load(Ordering::Relaxed),
            fragments_delivered: self.fragments_delivered.load(Ordering::Relaxed),
            fragments_dropped: self.fragments_dropped.load(Ordering::Relaxed),
            last_flush_at: *self.last_flush_at.lock(),
        }
    }
}
