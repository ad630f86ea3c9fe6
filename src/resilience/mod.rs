//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Store write from the capture queue:
//!     → timeouts.rs (bound each attempt)
//!     → On transient failure: retries.rs (retry with backoff.rs delays)
//!     → On final failure: logged and counted, never surfaced to the client
//! ```
//!
//! # Design Decisions
//! - Every store call on the write path has a deadline
//! - Only `StoreUnavailable` is retried; decode and input errors are final
//! - Jittered backoff prevents thundering herd against a recovering store

pub mod backoff;
pub mod retries;
pub mod timeouts;
