//! Core traits and types for mythos
//!
//! This crate defines the fundamental types shared by the retrieval pipeline:
//! fragments, vectors, distance metrics, the error taxonomy, and the
//! capability-facing interfaces for the embedding and generation services.
//! Services are always passed in explicitly, so tests can substitute
//! deterministic fakes for the network clients.

pub mod embedding;
pub mod error;
pub mod llm;
pub mod types;

pub use embedding::EmbeddingProvider;
pub use error::{Error, Result};
pub use llm::{GenerationConfig, GenerationResult, LLMProvider};
pub use types::*;
