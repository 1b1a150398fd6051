//! studypulse-core — Quiz model, question generation, scoring and analytics.
//!
//! This crate defines the data model, repository and provider traits, and the
//! pure logic (chunking, LLM output parsing, scoring, analytics) that the rest
//! of StudyPulse builds on.

pub mod chunker;
pub mod error;
pub mod generation;
pub mod model;
pub mod parser;
pub mod pdf;
pub mod scoring;
pub mod service;
pub mod statistics;
pub mod store;
pub mod traits;

pub use error::{ProviderError, StudyError};
pub use service::StudyService;
pub use store::Storage;
