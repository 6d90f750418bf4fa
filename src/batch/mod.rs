//! Write coalescing: the bounded accumulator and the flush loop that drains it.

pub mod accumulator;
pub mod scheduler;
pub mod stats;

pub use accumulator::{Accumulator, EnqueueError};
pub use scheduler::{FlushScheduler, FlushTrigger, SchedulerError};
pub use stats::{GatewayStats, SchedulerState, StatsSnapshot};
