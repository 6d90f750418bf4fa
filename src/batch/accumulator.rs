use super::stats::GatewayStats;
use crate::bulk::BulkFragment;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Notify;

/// Why a fragment was not accepted for batching.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum EnqueueError {
    #[error("write buffer is full ({capacity} pending documents)")]
    Full { capacity: usize },
    #[error("write buffer is closed, the flush scheduler has stopped")]
    Closed,
}

#[derive(Debug, Default)]
struct Pending {
    fragments: VecDeque<BulkFragment>,
    closed: bool,
}

/// Bounded buffer of formatted fragments between flushes.
///
/// Any number of handlers enqueue; the flush scheduler drains everything at
/// once. The queue never holds more than `capacity` fragments.
#[derive(Debug)]
pub struct Accumulator {
    pending: Mutex<Pending>,
    capacity: usize,
    threshold: usize,
    threshold_reached: Notify,
    stats: Arc<GatewayStats>,
}

impl Accumulator {
    pub fn new(capacity: usize, threshold: usize) -> Self {
        Self {
            pending: Mutex::new(Pending {
                fragments: VecDeque::with_capacity(threshold.min(capacity)),
                closed: false,
            }),
            capacity,
            threshold: threshold.max(1),
            threshold_reached: Notify::new(),
            stats: Arc::new(GatewayStats::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn stats(&self) -> &Arc<GatewayStats> {
        &self.stats
    }

    pub fn len(&self) -> usize {
        self.pending.lock().fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.pending.lock().closed
    }

    /// Whether enough fragments are pending for a size-triggered flush.
    pub fn at_threshold(&self) -> bool {
        self.len() >= self.threshold
    }

    pub fn enqueue(&self, fragment: BulkFragment) -> Result<(), EnqueueError> {
        self.enqueue_all(vec![fragment])
    }

    /// Enqueue a group of fragments in order, all or nothing.
    pub fn enqueue_all(&self, fragments: Vec<BulkFragment>) -> Result<(), EnqueueError> {
        let count = fragments.len();
        let result = {
            let mut pending = self.pending.lock();
            if pending.closed {
                Err(EnqueueError::Closed)
            } else if pending.fragments.len() + count > self.capacity {
                Err(EnqueueError::Full {
                    capacity: self.capacity,
                })
            } else {
                pending.fragments.extend(fragments);
                Ok(pending.fragments.len())
            }
        };

        match result {
            Ok(len) => {
                self.stats.record_accepted(count);
                if len >= self.threshold {
                    self.threshold_reached.notify_one();
                }
                Ok(())
            }
            Err(err) => {
                self.stats.record_rejected(count);
                Err(err)
            }
        }
    }

    /// Remove and return everything currently pending, oldest first.
    pub fn try_dequeue_all(&self) -> Vec<BulkFragment> {
        let mut pending = self.pending.lock();
        Vec::from(std::mem::take(&mut pending.fragments))
    }

    /// Refuse further fragments. Pending fragments stay drainable.
    pub fn close(&self) {
        self.pending.lock().closed = true;
    }

    /// Resolves once an enqueue has pushed the queue to the flush threshold.
    ///
    /// A wake-up may be stale by the time it is observed; callers re-check
    /// [`Accumulator::at_threshold`].
    pub async fn threshold_reached(&self) {
        self.threshold_reached.notified().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bulk::{WriteOperation, format};
    use std::collections::HashMap;
    use std::thread;

    fn fragment(id: usize) -> BulkFragment {
        format(&WriteOperation::delete("logs", "entry", id.to_string()))
    }

    #[test]
    fn dequeue_returns_everything_in_order() {
        let acc = Accumulator::new(10, 5);
        for id in 0..3 {
            acc.enqueue(fragment(id)).expect("capacity available");
        }

        let drained = acc.try_dequeue_all();
        assert_eq!(drained, vec![fragment(0), fragment(1), fragment(2)]);
        assert!(acc.is_empty());
        assert!(acc.try_dequeue_all().is_empty());
    }

    #[test]
    fn rejects_enqueue_at_capacity() {
        let acc = Accumulator::new(3, 3);
        for id in 0..3 {
            acc.enqueue(fragment(id)).expect("capacity available");
        }

        assert_eq!(
            acc.enqueue(fragment(3)),
            Err(EnqueueError::Full { capacity: 3 })
        );
        assert_eq!(acc.len(), 3);

        acc.try_dequeue_all();
        acc.enqueue(fragment(4)).expect("space after drain");
    }

    #[test]
    fn group_enqueue_is_all_or_nothing() {
        let acc = Accumulator::new(4, 4);
        acc.enqueue(fragment(0)).expect("capacity available");

        let group: Vec<_> = (1..5).map(fragment).collect();
        assert_eq!(
            acc.enqueue_all(group),
            Err(EnqueueError::Full { capacity: 4 })
        );
        assert_eq!(acc.len(), 1);

        let snapshot = acc.stats().snapshot();
        assert_eq!(snapshot.fragments_accepted, 1);
        assert_eq!(snapshot.fragments_rejected, 4);
    }

    #[test]
    fn closed_accumulator_refuses_but_still_drains() {
        let acc = Accumulator::new(4, 4);
        acc.enqueue(fragment(0)).expect("capacity available");
        acc.close();

        assert_eq!(acc.enqueue(fragment(1)), Err(EnqueueError::Closed));
        assert_eq!(acc.try_dequeue_all(), vec![fragment(0)]);
        assert!(acc.is_closed());
    }

    #[test]
    fn concurrent_producers_lose_nothing() {
        const PRODUCERS: usize = 8;
        const PER_PRODUCER: usize = 250;

        let acc = Arc::new(Accumulator::new(PRODUCERS * PER_PRODUCER, 100));
        let mut drained = Vec::new();

        let handles: Vec<_> = (0..PRODUCERS)
            .map(|producer| {
                let acc = Arc::clone(&acc);
                thread::spawn(move || {
                    for seq in 0..PER_PRODUCER {
                        acc.enqueue(fragment(producer * PER_PRODUCER + seq))
                            .expect("capacity sized for every producer");
                    }
                })
            })
            .collect();

        while handles.iter().any(|handle| !handle.is_finished()) {
            drained.extend(acc.try_dequeue_all());
            thread::yield_now();
        }
        for handle in handles {
            handle.join().expect("producer thread");
        }
        drained.extend(acc.try_dequeue_all());

        assert_eq!(drained.len(), PRODUCERS * PER_PRODUCER);
        let mut seen: HashMap<&str, usize> = HashMap::new();
        for fragment in &drained {
            *seen.entry(fragment.as_str()).or_default() += 1;
        }
        assert_eq!(seen.len(), PRODUCERS * PER_PRODUCER);
        assert!(seen.values().all(|count| *count == 1));

        // Each producer's own fragments keep their relative order.
        for producer in 0..PRODUCERS {
            let ids: Vec<usize> = drained
                .iter()
                .filter_map(|fragment| {
                    let parsed: serde_json::Value =
                        serde_json::from_str(fragment.as_str().trim_end()).ok()?;
                    parsed["delete"]["_id"].as_str()?.parse().ok()
                })
                .filter(|id| id / PER_PRODUCER == producer)
                .collect();
            assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
        }
    }

    #[tokio::test]
    async fn reaching_threshold_wakes_waiter() {
        let acc = Arc::new(Accumulator::new(10, 2));
        let waiter = {
            let acc = Arc::clone(&acc);
            tokio::spawn(async move { acc.threshold_reached().await })
        };

        acc.enqueue(fragment(0)).expect("capacity available");
        acc.enqueue(fragment(1)).expect("capacity available");

        tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
            .await
            .expect("woken before timeout")
            .expect("waiter task");
        assert!(acc.at_threshold());
    }
}
