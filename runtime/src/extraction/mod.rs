//! Structured plan extraction and post-processing.

pub mod client;
pub mod dedup;
pub mod prompt;
pub mod sanitize;

pub use client::{OpenAiExtractor, PlanExtractor};
pub use prompt::ExtractionOutput;
