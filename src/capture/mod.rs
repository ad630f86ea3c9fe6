//! Capture subsystem (correlation engine).
//!
//! # Data Flow
//! ```text
//! proxy hook: request sent
//!     → id.rs (exchange id from clock + session [+ instance])
//!     → engine.rs (index key, tag request, snapshot)
//!     → writer.rs (bounded queue → retried, deadline-bound store writes)
//!     → Repository
//!
//! proxy hook: response received
//!     → engine.rs (recover tag from sent request, snapshot)
//!     → writer.rs → Repository
//! ```
//!
//! # Design Decisions
//! - No engine-local mutable state; concurrent safety comes from the store
//! - Capture never fails the proxied exchange
//! - A response whose request carried no tag is skipped, not an error

pub mod engine;
pub mod headers;
pub mod id;
pub mod writer;

pub use engine::{CorrelationEngine, EngineSettings};
pub use id::{ExchangeId, IdGenerator, SessionId};
pub use writer::{CaptureWriter, WriteJob, WriterSettings};
