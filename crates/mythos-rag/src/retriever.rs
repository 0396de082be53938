//! Top-k retrieval of fragments for a query

use std::sync::Arc;

use mythos_core::{EmbeddingProvider, Error, Result, RetrievedFragment};

use crate::index::FragmentIndex;

/// Embeds queries and looks up the nearest fragments in a loaded index
pub struct Retriever<E: EmbeddingProvider> {
    embedder: Arc<E>,
    index: Arc<FragmentIndex>,
}

impl<E: EmbeddingProvider> Retriever<E> {
    pub fn new(embedder: Arc<E>, index: Arc<FragmentIndex>) -> Self {
        Self { embedder, index }
    }

    pub fn index(&self) -> &FragmentIndex {
        &self.index
    }

    /// The `k` fragments closest to `query`, most similar first.
    ///
    /// Arguments are checked before the embedding service is called. An
    /// empty index answers with no fragments and no remote call.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedFragment>> {
        if k == 0 {
            return Err(Error::InvalidArgument(
                "k must be greater than zero".to_string(),
            ));
        }
        if query.trim().is_empty() {
            return Err(Error::InvalidArgument("query is empty".to_string()));
        }

        let Some(dimension) = self.index.dimension() else {
            tracing::debug!("index is empty, nothing to retrieve");
            return Ok(Vec::new());
        };

        let query_vector = self.embedder.embed(query).await?;
        if query_vector.len() != dimension {
            return Err(Error::DimensionMismatch {
                expected: dimension,
                found: query_vector.len(),
            });
        }

        let hits = self.index.search(&query_vector, k)?;
        tracing::debug!(k, hits = hits.len(), "retrieved fragments");
        Ok(hits)
    }
}
