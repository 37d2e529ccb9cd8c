//! CV generation pipeline: request normalization, Stage-0 assembly and the
//! orchestration service tying hydration and generation together.

pub mod cv;
pub mod normalizer;
pub mod service;
pub mod stage0;
pub mod taxonomy;
pub mod types;

pub use cv::GeneratedCv;
pub use service::{Orchestrator, Outcome};
pub use stage0::Stage0Payload;
pub use types::{Document, Language, LanguageTone, NormalizedRequest, PassThrough, Section};
