use super::accumulator::Accumulator;
use super::stats::SchedulerState;
use crate::backend::{BulkBackend, FlushOutcome};
use crate::bulk::Batch;
use log::{debug, error, info, warn};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("backend delivery is impossible: {0}")]
    Fatal(String),
}

/// What caused a drain of the accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushTrigger {
    Timer,
    Threshold,
    Shutdown,
}

impl fmt::Display for FlushTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FlushTrigger::Timer => "timer",
            FlushTrigger::Threshold => "threshold",
            FlushTrigger::Shutdown => "shutdown",
        };
        f.write_str(label)
    }
}

/// Drains the accumulator on a fixed cadence or when the size threshold is
/// reached, whichever comes first, and hands each batch to the backend.
///
/// Only one batch is ever in flight. Ticks follow an absolute schedule, so a
/// slow backend call does not push later ticks back; handlers keep filling
/// the next batch meanwhile.
pub struct FlushScheduler<B> {
    accumulator: Arc<Accumulator>,
    backend: B,
    interval: Duration,
    shutdown: CancellationToken,
}

impl<B: BulkBackend + 'static> FlushScheduler<B> {
    pub fn new(accumulator: Arc<Accumulator>, backend: B, interval: Duration) -> Self {
        Self {
            accumulator,
            backend,
            interval,
            shutdown: CancellationToken::new(),
        }
    }

    /// Token that stops the loop after one final drain and flush.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn spawn(self) -> JoinHandle<Result<(), SchedulerError>> {
        tokio::spawn(self.run())
    }

    /// Run until shutdown or a fatal backend failure.
    pub async fn run(self) -> Result<(), SchedulerError> {
        info!(
            "flush scheduler started (interval {:?}, threshold {}, capacity {})",
            self.interval,
            self.accumulator.threshold(),
            self.accumulator.capacity()
        );

        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            let trigger = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                _ = self.accumulator.threshold_reached() => FlushTrigger::Threshold,
                _ = ticker.tick() => FlushTrigger::Timer,
            };

            if trigger == FlushTrigger::Threshold && !self.accumulator.at_threshold() {
                continue;
            }

            if let Err(err) = self.flush(trigger).await {
                error!("flush scheduler stopping: {}", err);
                self.accumulator.close();
                let stranded = self.accumulator.try_dequeue_all().len();
                if stranded > 0 {
                    self.accumulator.stats().record_dropped(stranded);
                    warn!("dropped {} fragments queued behind the failed batch", stranded);
                }
                self.accumulator.stats().set_state(SchedulerState::Stopped);
                return Err(err);
            }
        }

        info!("flush scheduler shutting down, draining pending writes");
        self.accumulator.close();
        let result = self.flush(FlushTrigger::Shutdown).await;
        self.accumulator.stats().set_state(SchedulerState::Stopped);
        result
    }

    async fn flush(&self, trigger: FlushTrigger) -> Result<(), SchedulerError> {
        let fragments = self.accumulator.try_dequeue_all();
        if fragments.is_empty() {
            return Ok(());
        }

        let batch = Batch::from(fragments);
        let count = batch.len();
        let bytes = batch.byte_len();
        let stats = self.accumulator.stats();

        debug!("flushing {} fragments ({} bytes) on {}", count, bytes, trigger);
        stats.set_state(SchedulerState::Flushing);
        let outcome = self.backend.send(batch).await;
        stats.set_state(SchedulerState::Idle);

        match outcome {
            FlushOutcome::Success(report) => {
                stats.record_delivered(count);
                debug!(
                    "delivered {} fragments in {:.2}ms (status {})",
                    report.fragments,
                    report.elapsed.as_secs_f64() * 1000.0,
                    report.status
                );
                Ok(())
            }
            FlushOutcome::TransientFailure(reason) => {
                stats.record_dropped(count);
                warn!("dropping batch of {} fragments: {}", count, reason);
                Ok(())
            }
            FlushOutcome::FatalFailure(reason) => {
                stats.record_dropped(count);
                Err(SchedulerError::Fatal(reason))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DeliveryReport;
    use crate::bulk::{BulkFragment, WriteOperation, format};
    use parking_lot::Mutex;

    #[derive(Default)]
    struct ScriptedBackend {
        outcomes: Mutex<Vec<FlushOutcome>>,
        batches: Mutex<Vec<Vec<BulkFragment>>>,
    }

    #[rocket::async_trait]
    impl BulkBackend for Arc<ScriptedBackend> {
        async fn send(&self, batch: Batch) -> FlushOutcome {
            let count = batch.len();
            self.batches.lock().push(batch.fragments().to_vec());
            self.outcomes.lock().pop().unwrap_or(FlushOutcome::Success(DeliveryReport {
                fragments: count,
                status: 200,
                elapsed: Duration::ZERO,
                item_errors: Some(false),
            }))
        }
    }

    fn fragment(id: usize) -> BulkFragment {
        format(&WriteOperation::index("logs", "entry", id.to_string(), "{}"))
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_flushes_pending_writes() {
        let acc = Arc::new(Accumulator::new(10, 10));
        let backend = Arc::new(ScriptedBackend::default());
        let scheduler = FlushScheduler::new(acc.clone(), backend.clone(), Duration::from_secs(60));
        let token = scheduler.shutdown_token();
        let handle = scheduler.spawn();

        acc.enqueue(fragment(1)).expect("capacity available");
        token.cancel();

        assert_eq!(handle.await.expect("scheduler task"), Ok(()));
        assert_eq!(backend.batches.lock().as_slice(), &[vec![fragment(1)]]);
        assert!(acc.is_closed());
        assert_eq!(acc.stats().state(), SchedulerState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_outcome_stops_loop_and_closes_buffer() {
        let acc = Arc::new(Accumulator::new(10, 1));
        let backend = Arc::new(ScriptedBackend::default());
        backend
            .outcomes
            .lock()
            .push(FlushOutcome::FatalFailure("bad url".into()));

        let handle =
            FlushScheduler::new(acc.clone(), backend.clone(), Duration::from_secs(60)).spawn();
        acc.enqueue(fragment(1)).expect("capacity available");

        assert_eq!(
            handle.await.expect("scheduler task"),
            Err(SchedulerError::Fatal("bad url".into()))
        );
        assert!(acc.is_closed());
        assert_eq!(acc.stats().snapshot().fragments_dropped, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_outcome_keeps_running() {
        let acc = Arc::new(Accumulator::new(10, 1));
        let backend = Arc::new(ScriptedBackend::default());
        backend
            .outcomes
            .lock()
            .push(FlushOutcome::TransientFailure("503".into()));

        let scheduler = FlushScheduler::new(acc.clone(), backend.clone(), Duration::from_secs(60));
        let token = scheduler.shutdown_token();
        let handle = scheduler.spawn();

        acc.enqueue(fragment(1)).expect("capacity available");
        tokio::time::sleep(Duration::from_millis(10)).await;
        acc.enqueue(fragment(2)).expect("capacity available");
        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel();

        assert_eq!(handle.await.expect("scheduler task"), Ok(()));
        assert_eq!(
            backend.batches.lock().as_slice(),
            &[vec![fragment(1)], vec![fragment(2)]]
        );
        let snapshot = acc.stats().snapshot();
        assert_eq!(snapshot.batches_failed, 1);
        assert_eq!(snapshot.batches_sent, 1);
    }
}
