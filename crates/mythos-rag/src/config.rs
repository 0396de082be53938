//! Retrieval pipeline configuration

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use mythos_core::{DistanceMetric, Error, Result};

use crate::chunker::DEFAULT_CHUNK_SIZE;

pub const DEFAULT_TOP_K: usize = 5;
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_INDEX_DIR: &str = "mythos_index";

/// Settings for building and querying an index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagConfig {
    pub data_dir: PathBuf,
    pub index_dir: PathBuf,
    pub chunk_size: usize,
    pub top_k: usize,
    pub metric: DistanceMetric,
    pub embed_concurrency: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            index_dir: PathBuf::from(DEFAULT_INDEX_DIR),
            chunk_size: DEFAULT_CHUNK_SIZE,
            top_k: DEFAULT_TOP_K,
            metric: DistanceMetric::Euclidean,
            embed_concurrency: 1,
        }
    }
}

impl RagConfig {
    /// Create configuration from environment variables, falling back to defaults
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let config = Self {
            data_dir: lookup("MYTHOS_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            index_dir: lookup("MYTHOS_INDEX_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.index_dir),
            chunk_size: parse_count(&lookup, "MYTHOS_CHUNK_SIZE", defaults.chunk_size)?,
            top_k: parse_count(&lookup, "MYTHOS_TOP_K", defaults.top_k)?,
            metric: match lookup("MYTHOS_METRIC") {
                Some(raw) => DistanceMetric::parse(&raw)?,
                None => defaults.metric,
            },
            embed_concurrency: parse_count(
                &lookup,
                "MYTHOS_EMBED_CONCURRENCY",
                defaults.embed_concurrency,
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::Configuration("chunk size must be at least 1".to_string()));
        }
        if self.top_k == 0 {
            return Err(Error::Configuration("top_k must be at least 1".to_string()));
        }
        if self.embed_concurrency == 0 {
            return Err(Error::Configuration(
                "embedding concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_count<F>(lookup: &F, key: &str, default: usize) -> Result<usize>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse::<usize>().map_err(|_| {
            Error::Configuration(format!("{} must be a positive integer, got '{}'", key, raw))
        }),
        None => Ok(default),
    }
}
