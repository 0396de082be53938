//! RAG pipeline: retrieve, assemble, generate

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use mythos_core::{EmbeddingProvider, LLMProvider, Result, RetrievedFragment};

use crate::config::DEFAULT_TOP_K;
use crate::context::{assemble, PromptTemplate};
use crate::index::FragmentIndex;
use crate::retriever::Retriever;

/// A generated answer with the fragments it was grounded on
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<RetrievedFragment>,
}

/// Answers questions from a loaded index with an embedding and a generation service
pub struct RagPipeline<E: EmbeddingProvider, G: LLMProvider> {
    retriever: Retriever<E>,
    generator: Arc<G>,
    template: PromptTemplate,
    top_k: usize,
}

impl<E: EmbeddingProvider, G: LLMProvider> RagPipeline<E, G> {
    /// Create a new pipeline over `index`
    pub fn new(embedder: Arc<E>, generator: Arc<G>, index: Arc<FragmentIndex>) -> Self {
        Self {
            retriever: Retriever::new(embedder, index),
            generator,
            template: PromptTemplate::default(),
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn retriever(&self) -> &Retriever<E> {
        &self.retriever
    }

    /// Build the grounded prompt for `query` without generating
    pub async fn prepare(&self, query: &str) -> Result<(String, Vec<RetrievedFragment>)> {
        let sources = self.retriever.retrieve(query, self.top_k).await?;
        let fragments: Vec<_> = sources.iter().map(|s| s.fragment.clone()).collect();
        let context = assemble(&fragments);
        Ok((self.template.render(&context, query), sources))
    }

    /// Answer one question; any failure is terminal for this question only
    pub async fn ask(&self, query: &str) -> Result<Answer> {
        let (prompt, sources) = self.prepare(query).await?;

        tracing::info!(
            "answering with {} context fragments via {}",
            sources.len(),
            self.generator.model_id()
        );

        let result = self.generator.generate(&prompt).await?;
        Ok(Answer {
            text: result.text,
            sources,
        })
    }

    /// Get statistics about the pipeline
    pub fn stats(&self) -> serde_json::Value {
        let index = self.retriever.index();
        json!({
            "fragments": index.len(),
            "dimension": index.dimension(),
            "metric": index.metric().as_str(),
            "top_k": self.top_k,
            "generation_model": self.generator.model_id(),
        })
    }
}
