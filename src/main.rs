//! Request recorder.
//!
//! ```text
//!   client ──HTTP_PROXY──▶ proxy listener ──▶ upstream
//!                              │ tag + capture
//!                              ▼
//!                        capture queue ──▶ content store (Redis / memory)
//!                                               ▲
//!   tests / tooling ──▶ query listener ─────────┘
//!                        /requests /metadata /body /health /version
//! ```

use clap::Parser;
use std::path::PathBuf;

use request_recorder::config::{resolve_config, CliOverrides};
use request_recorder::lifecycle::{wait_for_signal, Recorder};
use request_recorder::observability::logging::init_logging;

#[derive(Parser, Debug)]
#[command(name = "request-recorder")]
#[command(about = "HTTP proxy that records exchanges for later inspection", version)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Proxy listen address or port
    #[arg(long, value_name = "ADDR")]
    proxy: Option<String>,

    /// Query server listen address or port
    #[arg(long, value_name = "ADDR")]
    server: Option<String>,

    /// Store address (`host:port`, `redis://...` or `memory`)
    #[arg(long = "redis-addr", value_name = "ADDR")]
    redis_addr: Option<String>,

    /// Expiry of recorded entries in seconds
    #[arg(long = "redis-ttl", value_name = "SECS")]
    redis_ttl: Option<u64>,

    /// Header carrying the correlation key
    #[arg(long, value_name = "HEADER")]
    key: Option<String>,

    /// Log every capture at info level
    #[arg(long = "proxy-verbose")]
    proxy_verbose: bool,

    /// Suffix for exchange ids (`auto` picks one at random)
    #[arg(long = "instance-id", value_name = "ID")]
    instance_id: Option<String>,

    /// Log level for this crate
    #[arg(long = "log-level", value_name = "LEVEL")]
    log_level: Option<String>,
}

impl Args {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            proxy_addr: self.proxy.clone(),
            server_addr: self.server.clone(),
            store_addr: self.redis_addr.clone(),
            ttl_secs: self.redis_ttl,
            key_header: self.key.clone(),
            verbose: self.proxy_verbose,
            instance_id: self.instance_id.clone(),
            log_level: self.log_level.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match resolve_config(args.config.as_deref(), &args.overrides()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return Err(e.into());
        }
    };
    init_logging(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        proxy = %config.proxy.bind_address,
        server = %config.query.bind_address,
        store = %config.store.address,
        "request-recorder starting"
    );

    let handle = Recorder::start(config).await?;
    wait_for_signal().await;
    handle.shutdown().await;
    Ok(())
}
