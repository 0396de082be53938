//! Retrieval pipeline for mythos
//!
//! Chunking, the exact vector index, the on-disk index artifact, the index
//! builder, top-k retrieval, context assembly, and the question-answering
//! pipeline that ties them together.

mod artifact;
mod builder;
mod chunker;
mod config;
mod context;
mod document;
mod engine;
mod index;
mod retriever;
mod store;


pub use artifact::{ArtifactManifest, IndexArtifact};
pub use builder::{BuildReport, EmbeddingPolicy, FailurePolicy, FragmentFailure, IndexBuilder};
pub use chunker::{chunk, DEFAULT_CHUNK_SIZE};
pub use config::{RagConfig, DEFAULT_DATA_DIR, DEFAULT_INDEX_DIR, DEFAULT_TOP_K};
pub use context::{assemble, PromptTemplate, DEFAULT_INSTRUCTIONS, DEFAULT_PERSONA};
pub use document::{load_documents, DocumentFormat};
pub use engine::{Answer, RagPipeline};
pub use index::{FragmentIndex, VectorIndex};
pub use retriever::Retriever;
pub use store::{IndexStore, FRAGMENTS_FILE, VECTORS_FILE};

// Re-export core types for convenience
pub use mythos_core::{
    DistanceMetric, EmbeddingProvider, Error, Fragment, LLMProvider, Result, RetrievedFragment,
    SourceDocument, Vector,
};
