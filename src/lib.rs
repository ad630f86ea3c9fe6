//! HTTP recording proxy library.
//!
//! Traffic sent through the proxy is tagged with an exchange id, indexed by
//! (correlation key, host+path, method) and stored with an expiry; the query
//! server reads it back.

pub mod capture;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod observability;
pub mod proxy;
pub mod query;
pub mod repository;
pub mod resilience;
pub mod store;

pub use config::RecorderConfig;
pub use error::RecorderError;
pub use lifecycle::{Recorder, RecorderHandle, Shutdown};
