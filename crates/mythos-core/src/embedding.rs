//! Embedding provider trait

use async_trait::async_trait;

use crate::{Result, Vector};

/// Trait for embedding services (e.g., Gemini, a local model, a test fake)
///
/// One call embeds one text. Implementations report every failure as
/// [`Error::EmbeddingUnavailable`](crate::Error::EmbeddingUnavailable) and
/// never retry.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Vector>;

    /// Embed several texts, one vector per text in input order.
    ///
    /// The first failure aborts the batch.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vector>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    /// Identifier of the embedding model, stored alongside built indexes
    fn model_id(&self) -> &str;
}
