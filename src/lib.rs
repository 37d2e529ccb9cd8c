//! CV generation orchestrator.
//!
//! A backend-for-frontend that accepts a lightweight CV generation request,
//! hydrates the referenced student, template, role and JD objects from the
//! data service, assembles a validated Stage-0 payload and hands it to the
//! generation service, wrapping every outcome in one response envelope.

// Core subsystems
pub mod config;
pub mod error;
pub mod http;
pub mod orchestrator;
pub mod upstream;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::ServiceConfig;
pub use error::ApiError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use orchestrator::Orchestrator;
