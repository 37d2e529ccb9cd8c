//! Clients for the data and generation services.
//!
//! Both services sit behind object-safe traits ([`DataApi`],
//! [`GenerationApi`]) so the pipeline can be driven by in-process fakes.

pub mod data;
pub mod error;
pub mod generation;

pub use data::{DataApi, Entity, HttpDataApi, HydratedObject, Hydrator, UpstreamData};
pub use error::UpstreamError;
pub use generation::{GenerationApi, GenerationInvoker, HttpGenerationApi};
