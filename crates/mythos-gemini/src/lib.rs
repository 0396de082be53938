//! Gemini integration for mythos
//!
//! This crate provides the Gemini implementation of the `EmbeddingProvider`
//! and `LLMProvider` traits over the public REST API.

mod client;
mod config;


pub use client::GeminiClient;
pub use config::{
    normalize_model_id, GeminiConfig, DEFAULT_API_URL, DEFAULT_EMBED_MODEL,
    DEFAULT_GENERATION_MODEL, DEFAULT_TIMEOUT_SECS,
};

// Re-export core types for convenience
pub use mythos_core::{
    EmbeddingProvider, Error, GenerationConfig, GenerationResult, LLMProvider, Result,
};
