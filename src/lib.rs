pub mod backend;
pub mod batch;
pub mod bulk;
pub mod config;
pub mod error;
pub mod models;
pub mod request_logger;
pub mod routes;
pub mod service;

use crate::backend::{HttpBackend, ProxyClient};
use crate::batch::{Accumulator, FlushScheduler};
use crate::config::GatewayConfig;
use crate::request_logger::RequestLogger;
use crate::service::{FlushService, attach_flush_lifecycle};
use env_logger::Env;
use rocket::fairing::AdHoc;
use rocket::http::Method;
use rocket::{Build, Rocket};
use rocket_cors::{AllowedOrigins, CorsOptions};
use std::sync::{Arc, Once};

static LOGGER: Once = Once::new();

fn init_logger() {
    LOGGER.call_once(|| {
        let _ = env_logger::Builder::from_env(
            Env::default().default_filter_or("info,rocket::server=warn,rocket::request=warn"),
        )
        .try_init();
    });
}

/// Build the gateway from environment configuration.
pub fn rocket() -> Rocket<Build> {
    rocket_with_config(GatewayConfig::from_env())
}

pub fn rocket_with_config(config: GatewayConfig) -> Rocket<Build> {
    init_logger();

    // Configure CORS
    let cors = CorsOptions::default()
        .allowed_origins(AllowedOrigins::all())
        .allowed_methods(
            vec![
                Method::Get,
                Method::Head,
                Method::Post,
                Method::Put,
                Method::Delete,
            ]
            .into_iter()
            .map(From::from)
            .collect(),
        )
        .allow_credentials(true)
        .to_cors()
        .expect("Error creating CORS");

    let rocket = rocket::build()
        .attach(RequestLogger)
        .attach(cors)
        // Refuse to start with a configuration that can never deliver a batch
        .attach(AdHoc::try_on_ignite(
            "Gateway Configuration",
            move |rocket| async move {
                if let Err(err) = config.validate() {
                    log::error!("invalid gateway configuration: {}", err);
                    return Err(rocket);
                }

                let backend = match HttpBackend::new(&config) {
                    Ok(backend) => backend,
                    Err(err) => {
                        log::error!("failed to build bulk client: {}", err);
                        return Err(rocket);
                    }
                };
                let proxy = match ProxyClient::new(&config) {
                    Ok(proxy) => proxy,
                    Err(err) => {
                        log::error!("failed to build proxy client: {}", err);
                        return Err(rocket);
                    }
                };

                let accumulator = Arc::new(Accumulator::new(config.capacity, config.flush_threshold));
                let scheduler =
                    FlushScheduler::new(accumulator.clone(), backend, config.flush_interval);

                log::info!(
                    "buffering writes for {} (every {:?} or {} documents, capacity {})",
                    config.backend_url,
                    config.flush_interval,
                    config.flush_threshold,
                    config.capacity
                );

                Ok(rocket
                    .manage(config)
                    .manage(accumulator)
                    .manage(proxy)
                    .manage(FlushService::new(scheduler)))
            },
        ))
        .mount("/", routes::gateway_routes());

    attach_flush_lifecycle::<HttpBackend>(rocket)
}

#[cfg_attr(not(test), allow(dead_code))]
pub mod test_support {
    use crate::backend::{BulkBackend, DeliveryReport, FlushOutcome, ProxyClient};
    use crate::batch::Accumulator;
    use crate::bulk::Batch;
    use crate::config::GatewayConfig;
    use crate::routes::gateway_routes;
    use parking_lot::Mutex;
    use rocket::config::LogLevel;
    use rocket::figment::Figment;
    use rocket::local::asynchronous::Client as AsyncClient;
    use rocket::local::blocking::Client;
    use rocket::{Build, Rocket};
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::watch;

    /// Configuration with small, test-friendly limits.
    pub fn test_config(backend_url: &str) -> GatewayConfig {
        GatewayConfig {
            backend_url: backend_url.to_string(),
            flush_interval: Duration::from_millis(200),
            flush_threshold: 4,
            capacity: 8,
            backend_timeout: Duration::from_secs(5),
            max_body_bytes: 64 * 1024,
        }
    }

    /// Rocket settings for tests: random port, logging disabled.
    pub fn test_figment() -> Figment {
        rocket::Config::figment()
            .merge(("port", 0))
            .merge(("log_level", LogLevel::Off))
            .merge(("cli_colors", false))
    }

    /// Builder for constructing Rocket instances tailored for integration tests.
    ///
    /// Local clients never lift off, so no flush scheduler runs; tests drain
    /// the managed accumulator directly or drive a scheduler of their own.
    pub struct TestRocketBuilder {
        figment: Figment,
        config: GatewayConfig,
        accumulator: Option<Arc<Accumulator>>,
    }

    impl Default for TestRocketBuilder {
        fn default() -> Self {
            Self::new()
        }
    }

    impl TestRocketBuilder {
        /// Start a builder with sensible defaults: random port, logging disabled.
        pub fn new() -> Self {
            Self {
                figment: test_figment(),
                config: test_config("http://127.0.0.1:9"),
                accumulator: None,
            }
        }

        pub fn with_config(mut self, config: GatewayConfig) -> Self {
            self.config = config;
            self
        }

        /// Share an accumulator with the test instead of creating one.
        pub fn manage_accumulator(mut self, accumulator: Arc<Accumulator>) -> Self {
            self.accumulator = Some(accumulator);
            self
        }

        /// Finish building the Rocket instance.
        pub fn build(self) -> Rocket<Build> {
            let accumulator = self.accumulator.unwrap_or_else(|| {
                Arc::new(Accumulator::new(
                    self.config.capacity,
                    self.config.flush_threshold,
                ))
            });
            let proxy = ProxyClient::new(&self.config).expect("valid proxy configuration");

            rocket::custom(self.figment)
                .mount("/", gateway_routes())
                .manage(self.config)
                .manage(accumulator)
                .manage(proxy)
        }

        /// Convenience helper to produce a blocking local client.
        pub fn blocking_client(self) -> Client {
            Client::tracked(self.build()).expect("valid Rocket instance")
        }

        /// Convenience helper to produce an asynchronous local client.
        pub async fn async_client(self) -> AsyncClient {
            AsyncClient::tracked(self.build())
                .await
                .expect("valid Rocket instance")
        }
    }

    struct Recorded {
        batches: Mutex<Vec<Vec<String>>>,
        outcomes: Mutex<VecDeque<FlushOutcome>>,
        delay: Mutex<Duration>,
        calls: watch::Sender<usize>,
    }

    /// In-memory [`BulkBackend`] that records every batch it is handed.
    ///
    /// Outcomes queued with [`RecordingBackend::push_outcome`] are returned in
    /// order; once they run out every send succeeds.
    #[derive(Clone)]
    pub struct RecordingBackend {
        inner: Arc<Recorded>,
    }

    impl Default for RecordingBackend {
        fn default() -> Self {
            Self::new()
        }
    }

    impl RecordingBackend {
        pub fn new() -> Self {
            let (calls, _) = watch::channel(0);
            Self {
                inner: Arc::new(Recorded {
                    batches: Mutex::new(Vec::new()),
                    outcomes: Mutex::new(VecDeque::new()),
                    delay: Mutex::new(Duration::ZERO),
                    calls,
                }),
            }
        }

        pub fn push_outcome(&self, outcome: FlushOutcome) {
            self.inner.outcomes.lock().push_back(outcome);
        }

        /// Make every send take `delay` before answering.
        pub fn set_delay(&self, delay: Duration) {
            *self.inner.delay.lock() = delay;
        }

        /// Fragments of every batch received so far, in arrival order.
        pub fn batches(&self) -> Vec<Vec<String>> {
            self.inner.batches.lock().clone()
        }

        pub fn calls(&self) -> usize {
            *self.inner.calls.borrow()
        }

        /// Wait until at least `count` sends have started.
        pub async fn wait_for_calls(&self, count: usize) {
            let mut calls = self.inner.calls.subscribe();
            let _ = calls.wait_for(|seen| *seen >= count).await;
        }
    }

    #[rocket::async_trait]
    impl BulkBackend for RecordingBackend {
        async fn send(&self, batch: Batch) -> FlushOutcome {
            let fragments: Vec<String> = batch
                .fragments()
                .iter()
                .map(|fragment| fragment.as_str().to_string())
                .collect();
            let count = fragments.len();
            self.inner.batches.lock().push(fragments);
            self.inner.calls.send_modify(|calls| *calls += 1);

            let delay = *self.inner.delay.lock();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let scripted = self.inner.outcomes.lock().pop_front();
            scripted.unwrap_or(FlushOutcome::Success(DeliveryReport {
                fragments: count,
                status: 200,
                elapsed: delay,
                item_errors: Some(false),
            }))
        }
    }
}
