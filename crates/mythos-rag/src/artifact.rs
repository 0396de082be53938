//! The index artifact: fragment index plus the metadata it was built with

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use mythos_core::{DistanceMetric, Error, Fragment, Result};

use crate::index::FragmentIndex;

/// Build metadata persisted with every artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    /// Shared by both artifact files; a differing id means they were not written together
    pub build_id: Uuid,
    pub embedding_model: String,
    pub metric: DistanceMetric,
    pub dimension: usize,
    pub count: usize,
    pub chunk_size: usize,
    pub created_at: DateTime<Utc>,
}

/// A built fragment index together with its manifest
#[derive(Debug, Clone, PartialEq)]
pub struct IndexArtifact {
    manifest: ArtifactManifest,
    index: FragmentIndex,
}

impl IndexArtifact {
    /// Stamp a freshly built index with a new build id
    pub fn new(index: FragmentIndex, embedding_model: impl Into<String>, chunk_size: usize) -> Self {
        let manifest = ArtifactManifest {
            build_id: Uuid::new_v4(),
            embedding_model: embedding_model.into(),
            metric: index.metric(),
            dimension: index.dimension().unwrap_or(0),
            count: index.len(),
            chunk_size,
            created_at: Utc::now(),
        };
        Self { manifest, index }
    }

    /// Reassemble a loaded artifact, checking the manifest against the index
    pub fn from_parts(manifest: ArtifactManifest, index: FragmentIndex) -> Result<Self> {
        if manifest.count != index.len() {
            return Err(Error::IndexCorrupt(format!(
                "manifest records {} fragments but {} were loaded",
                manifest.count,
                index.len()
            )));
        }

        if let Some(d) = index.dimension() {
            if d != manifest.dimension {
                return Err(Error::IndexCorrupt(format!(
                    "manifest records dimension {} but vectors have dimension {}",
                    manifest.dimension, d
                )));
            }
        }

        if manifest.metric != index.metric() {
            return Err(Error::IndexCorrupt(format!(
                "manifest records metric {} but index uses {}",
                manifest.metric,
                index.metric()
            )));
        }

        Ok(Self { manifest, index })
    }

    pub fn manifest(&self) -> &ArtifactManifest {
        &self.manifest
    }

    pub fn index(&self) -> &FragmentIndex {
        &self.index
    }

    pub fn fragments(&self) -> &[Fragment] {
        self.index.fragments()
    }

    pub fn into_index(self) -> FragmentIndex {
        self.index
    }

    /// Refuse to query with a different embedding model than the one used to build
    pub fn ensure_model(&self, model: &str) -> Result<()> {
        if self.manifest.embedding_model != model {
            return Err(Error::ModelMismatch {
                expected: self.manifest.embedding_model.clone(),
                found: model.to_string(),
            });
        }
        Ok(())
    }
}
