//! HTTP surface.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (router, middleware stack)
//!     → request.rs (correlation id, API version check)
//!     → handlers.rs (body extraction, orchestrator call)
//!     → response.rs (envelope rendering, status mapping)
//!     → client
//! ```

pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestContext, API_VERSION_HEADER, CORRELATION_HEADER};
pub use response::ResponseEnvelope;
pub use server::HttpServer;
