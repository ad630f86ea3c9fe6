//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON lines)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Exchange ids appear as a structured field on every capture event
//! - Capture write failures are visible here and nowhere else
//! - Metrics are cheap (atomic increments) and off the data path's critical section

pub mod logging;
pub mod metrics;
