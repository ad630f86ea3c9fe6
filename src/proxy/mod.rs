//! Intercepting proxy subsystem.
//!
//! # Data Flow
//! ```text
//! client (HTTP_PROXY=...)
//!     → server.rs (accept, session token per connection)
//!     → forward.rs (resolve upstream target, strip hop-by-hop headers)
//!     → hooks.rs: on_request_sent (recorder tags + captures)
//!     → upstream round trip (hyper client)
//!     → hooks.rs: on_response_received (recorder captures)
//!     → client
//!
//! CONNECT → tunnel.rs (opaque splice, not recorded)
//! ```

pub mod forward;
pub mod hooks;
pub mod server;
pub mod session;
pub mod tunnel;

pub use hooks::{ExchangeHooks, NoopHooks, SentRequest};
pub use server::ProxyServer;
pub use session::ProxySession;
