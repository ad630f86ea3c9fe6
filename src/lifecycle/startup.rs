//! Startup orchestration.
//!
//! # Order
//! 1. Validate configuration
//! 2. Connect the content store (fails fast when unreachable)
//! 3. Repository, capture writer, id generator, correlation engine
//! 4. Bind both listeners, then start serving
//!
//! # Shutdown order
//! 1. Stop accepting on both listeners
//! 2. Drain the capture queue (bounded by `capture.drain_timeout_secs`)
//! 3. Close the store pool

use axum::http::HeaderName;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::capture::{CaptureWriter, CorrelationEngine, EngineSettings, IdGenerator, WriterSettings};
use crate::config::validation::validate_config;
use crate::config::{ConfigError, RecorderConfig};
use crate::error::RecorderError;
use crate::lifecycle::shutdown::Shutdown;
use crate::observability::metrics;
use crate::proxy::{ExchangeHooks, ProxyServer};
use crate::query::{QueryServer, QueryService};
use crate::repository::Repository;
use crate::resilience::retries::RetryPolicy;
use crate::store::{self, ContentStore};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("{0}")]
    Config(ConfigError),

    #[error("content store: {0}")]
    Store(#[from] RecorderError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid header name '{0}'")]
    Header(String),
}

/// A running recorder.
pub struct RecorderHandle {
    proxy_addr: SocketAddr,
    query_addr: SocketAddr,
    engine: Arc<CorrelationEngine>,
    repository: Repository,
    store: Arc<dyn ContentStore>,
    shutdown: Shutdown,
    servers: Vec<JoinHandle<Result<(), std::io::Error>>>,
    writer_task: JoinHandle<()>,
    drain_timeout: std::time::Duration,
}

/// Entry point for running the recorder.
pub struct Recorder;

impl Recorder {
    pub async fn start(config: RecorderConfig) -> Result<RecorderHandle, StartupError> {
        validate_config(&config).map_err(|errors| StartupError::Config(ConfigError::Validation(errors)))?;

        let store = store::connect(&config.store).await?;
        let repository = Repository::new(
            Arc::clone(&store),
            config.store.key_prefix.clone(),
            config.capture.ttl(),
        );

        let (writer, writer_task) = CaptureWriter::spawn(repository.clone(), writer_settings(&config));
        let ids = IdGenerator::from_setting(&config.capture.instance_id);
        if let Some(instance) = ids.instance() {
            tracing::info!(instance, "Exchange ids carry instance suffix");
        }
        let engine = Arc::new(CorrelationEngine::new(ids, writer, engine_settings(&config)?));

        let proxy_listener = bind(&config.proxy.bind_address).await?;
        let query_listener = bind(&config.query.bind_address).await?;
        let proxy_addr = local_addr(&proxy_listener, &config.proxy.bind_address)?;
        let query_addr = local_addr(&query_listener, &config.query.bind_address)?;

        if config.observability.metrics_enabled {
            match config.observability.metrics_address.parse() {
                Ok(addr) => metrics::init_metrics(addr),
                Err(_) => tracing::error!(
                    metrics_address = %config.observability.metrics_address,
                    "Failed to parse metrics address"
                ),
            }
        }

        let shutdown = Shutdown::new();
        let hooks: Arc<dyn ExchangeHooks> = engine.clone();
        let proxy = ProxyServer::new(&config.proxy, hooks);
        let query = QueryServer::new(&config.query, QueryService::new(repository.clone()));
        let servers = vec![
            tokio::spawn(proxy.run(proxy_listener, shutdown.subscribe())),
            tokio::spawn(query.run(query_listener, shutdown.subscribe())),
        ];

        tracing::info!(
            proxy = %proxy_addr,
            server = %query_addr,
            ttl_secs = config.capture.ttl_secs,
            key_header = %config.capture.key_header,
            "Recorder started"
        );

        Ok(RecorderHandle {
            proxy_addr,
            query_addr,
            engine,
            repository,
            store,
            shutdown,
            servers,
            writer_task,
            drain_timeout: config.capture.drain_timeout(),
        })
    }
}

impl RecorderHandle {
    pub fn proxy_addr(&self) -> SocketAddr {
        self.proxy_addr
    }

    pub fn query_addr(&self) -> SocketAddr {
        self.query_addr
    }

    pub fn engine(&self) -> &Arc<CorrelationEngine> {
        &self.engine
    }

    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    /// Wait until every capture write queued so far has reached the store.
    pub async fn flush(&self) {
        self.engine.writer().flush().await;
    }

    /// Stop both listeners, drain pending writes, release the store.
    pub async fn shutdown(self) {
        tracing::info!("Shutting down");
        self.shutdown.trigger();
        for server in self.servers {
            match server.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::error!(error = %e, "Server exited with error"),
                Err(e) => tracing::error!(error = %e, "Server task failed"),
            }
        }

        if self.engine.writer().drain(self.drain_timeout).await {
            tracing::info!("Capture queue drained");
        }
        self.writer_task.abort();
        self.store.close().await;
        tracing::info!("Shutdown complete");
    }
}

fn writer_settings(config: &RecorderConfig) -> WriterSettings {
    WriterSettings {
        queue_capacity: config.capture.queue_capacity,
        workers: config.capture.workers,
        content_ttl: config.capture.ttl(),
        retry: RetryPolicy {
            max_attempts: config.capture.max_attempts,
            attempt_timeout: config.capture.write_timeout(),
            base_delay_ms: config.capture.base_delay_ms,
            max_delay_ms: config.capture.max_delay_ms,
        },
    }
}

fn engine_settings(config: &RecorderConfig) -> Result<EngineSettings, StartupError> {
    let header = |name: &str| {
        HeaderName::try_from(name).map_err(|_| StartupError::Header(name.to_string()))
    };
    Ok(EngineSettings {
        key_header: header(&config.capture.key_header)?,
        tag_header: header(&config.capture.tag_header)?,
        verbose: config.capture.verbose,
    })
}

async fn bind(address: &str) -> Result<TcpListener, StartupError> {
    TcpListener::bind(address).await.map_err(|source| StartupError::Bind {
        address: address.to_string(),
        source,
    })
}

fn local_addr(listener: &TcpListener, address: &str) -> Result<SocketAddr, StartupError> {
    listener.local_addr().map_err(|source| StartupError::Bind {
        address: address.to_string(),
        source,
    })
}
