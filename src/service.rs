use crate::backend::BulkBackend;
use crate::batch::{FlushScheduler, SchedulerError};
use parking_lot::Mutex;
use rocket::fairing::AdHoc;
use rocket::{Build, Rocket, Shutdown};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Owns the flush scheduler across the Rocket lifecycle: built on ignite,
/// started on liftoff, drained on shutdown.
pub struct FlushService<B> {
    shutdown: CancellationToken,
    pending: Mutex<Option<FlushScheduler<B>>>,
    task: Mutex<Option<JoinHandle<Result<(), SchedulerError>>>>,
}

impl<B: BulkBackend + 'static> FlushService<B> {
    pub fn new(scheduler: FlushScheduler<B>) -> Self {
        Self {
            shutdown: scheduler.shutdown_token(),
            pending: Mutex::new(Some(scheduler)),
            task: Mutex::new(None),
        }
    }

    /// Spawn the scheduler. A fatal stop asks Rocket to shut down, since the
    /// gateway can no longer deliver anything it accepts.
    pub fn start(&self, server: Shutdown) {
        let scheduler = self.pending.lock().take();
        let Some(scheduler) = scheduler else {
            log::warn!("flush scheduler already started");
            return;
        };

        let handle = tokio::spawn(async move {
            let result = scheduler.run().await;
            if let Err(err) = &result {
                log::error!("flush scheduler terminated: {}; shutting down", err);
                server.notify();
            }
            result
        });

        *self.task.lock() = Some(handle);
    }

    /// Stop the scheduler and wait for its final drain and flush.
    pub async fn stop(&self) {
        self.shutdown.cancel();

        let handle = self.task.lock().take();
        let Some(handle) = handle else {
            return;
        };

        match handle.await {
            Ok(Ok(())) => log::info!("flush scheduler stopped cleanly"),
            Ok(Err(err)) => log::error!("flush scheduler stopped with error: {}", err),
            Err(err) => log::error!("flush scheduler task failed: {}", err),
        }
    }
}

/// Start the managed [`FlushService<B>`] on liftoff and drain it on shutdown.
pub fn attach_flush_lifecycle<B: BulkBackend + 'static>(rocket: Rocket<Build>) -> Rocket<Build> {
    rocket
        .attach(AdHoc::on_liftoff("Spawn Flush Scheduler", |rocket| {
            Box::pin(async move {
                match rocket.state::<FlushService<B>>() {
                    Some(service) => service.start(rocket.shutdown()),
                    None => log::error!("failed to spawn flush scheduler: service not managed"),
                }
            })
        }))
        // Final drain and flush before the process exits
        .attach(AdHoc::on_shutdown("Drain Write Buffer", |rocket| {
            Box::pin(async move {
                if let Some(service) = rocket.state::<FlushService<B>>() {
                    service.stop().await;
                }
            })
        }))
}
