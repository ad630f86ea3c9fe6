//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validate config → Store → Repository → Writer → Engine → Listeners
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain capture queue → Close store
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Fail fast: an unreachable store or unbindable address aborts startup
//! - Listeners start last (traffic only when capture is ready)
//! - Drain has a deadline: pending writes past it are abandoned and logged

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use signals::wait_for_signal;
pub use startup::{Recorder, RecorderHandle, StartupError};
