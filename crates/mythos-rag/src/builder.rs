//! Building an index artifact from source documents

use futures::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use mythos_core::{
    DistanceMetric, EmbeddingProvider, Error, Result, SourceDocument, Vector,
};

use crate::artifact::IndexArtifact;
use crate::chunker::{chunk, DEFAULT_CHUNK_SIZE};
use crate::index::FragmentIndex;

/// What to do when embedding a single fragment fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailurePolicy {
    /// Abort the whole build; nothing is produced
    #[default]
    Abort,
    /// Leave the fragment out and record the failure in the report
    Skip,
}

/// How fragments are sent to the embedding service during a build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingPolicy {
    /// Maximum number of embedding requests in flight
    pub concurrency: usize,
    pub on_failure: FailurePolicy,
}

impl Default for EmbeddingPolicy {
    fn default() -> Self {
        Self {
            concurrency: 1,
            on_failure: FailurePolicy::Abort,
        }
    }
}

/// A fragment that could not be embedded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FragmentFailure {
    pub document: String,
    /// Position of the fragment in chunking order, before failures were removed
    pub position: usize,
    pub error: String,
}

/// Summary of a finished build
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildReport {
    pub documents: usize,
    pub fragments: usize,
    pub indexed: usize,
    pub failures: Vec<FragmentFailure>,
}

/// Turns documents into an index artifact: chunk, embed, index
pub struct IndexBuilder<E: EmbeddingProvider> {
    embedder: Arc<E>,
    chunk_size: usize,
    metric: DistanceMetric,
    policy: EmbeddingPolicy,
}

struct PendingFragment<'a> {
    document: &'a str,
    text: String,
}

impl<E: EmbeddingProvider> IndexBuilder<E> {
    /// Create a builder with the default chunk size, metric and policy
    pub fn new(embedder: Arc<E>) -> Self {
        Self {
            embedder,
            chunk_size: DEFAULT_CHUNK_SIZE,
            metric: DistanceMetric::default(),
            policy: EmbeddingPolicy::default(),
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_policy(mut self, policy: EmbeddingPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Chunk every document in order, embed each fragment and index the result.
    ///
    /// Fragment positions follow document order, then chunk order within a
    /// document. Under [`FailurePolicy::Abort`] the first embedding failure
    /// is returned and no artifact is produced.
    pub async fn build(
        &self,
        documents: &[SourceDocument],
    ) -> Result<(IndexArtifact, BuildReport)> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidArgument(
                "chunk size must be greater than zero".to_string(),
            ));
        }

        let mut pending = Vec::new();
        for document in documents {
            for text in chunk(&document.text, self.chunk_size)? {
                pending.push(PendingFragment {
                    document: &document.name,
                    text,
                });
            }
        }

        tracing::info!(
            "chunked {} documents into {} fragments (size {})",
            documents.len(),
            pending.len(),
            self.chunk_size
        );

        let concurrency = self.policy.concurrency.max(1);
        let embeddings = stream::iter(pending.iter())
            .map(|fragment| self.embedder.embed(&fragment.text))
            .buffered(concurrency);

        let results: Vec<Result<Vector>> = match self.policy.on_failure {
            FailurePolicy::Abort => embeddings
                .try_collect::<Vec<Vector>>()
                .await?
                .into_iter()
                .map(Ok)
                .collect(),
            FailurePolicy::Skip => embeddings.collect().await,
        };

        let mut report = BuildReport {
            documents: documents.len(),
            fragments: pending.len(),
            ..Default::default()
        };

        let mut entries = Vec::with_capacity(pending.len());
        let mut first_error = None;
        for (position, (fragment, result)) in pending.into_iter().zip(results).enumerate() {
            match result {
                Ok(vector) => entries.push((fragment.text, vector)),
                Err(e) => {
                    tracing::warn!(
                        "skipping fragment {} of {}: {}",
                        position,
                        fragment.document,
                        e
                    );
                    report.failures.push(FragmentFailure {
                        document: fragment.document.to_string(),
                        position,
                        error: e.to_string(),
                    });
                    first_error.get_or_insert(e);
                }
            }
        }

        if entries.is_empty() {
            if let Some(e) = first_error {
                return Err(Error::EmbeddingUnavailable(format!(
                    "every fragment failed to embed; first error: {}",
                    e
                )));
            }
        }

        let mut index = FragmentIndex::new(self.metric);
        index.extend(entries)?;
        report.indexed = index.len();

        tracing::info!(
            "indexed {} of {} fragments ({} failed)",
            report.indexed,
            report.fragments,
            report.failures.len()
        );

        let artifact = IndexArtifact::new(index, self.embedder.model_id(), self.chunk_size);
        Ok((artifact, report))
    }
}
