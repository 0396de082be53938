//! On-disk persistence of index artifacts
//!
//! An artifact is a directory holding two files that are only meaningful as
//! a pair:
//!
//! * `vectors.json`: the manifest plus every vector, base64-encoded
//!   little-endian `f32` rows in insertion order;
//! * `fragments.json`: the fragment texts in the same order, with an md5
//!   checksum over them.
//!
//! Both files carry the same build id. They are written into a staging
//! directory which then replaces the artifact directory with a rename, so a
//! reader never sees one half of a new build next to one half of an old one.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use mythos_core::{DistanceMetric, Error, Result};

use crate::artifact::{ArtifactManifest, IndexArtifact};
use crate::index::{FragmentIndex, VectorIndex};

pub const VECTORS_FILE: &str = "vectors.json";
pub const FRAGMENTS_FILE: &str = "fragments.json";
const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct VectorsFile {
    format_version: u32,
    build_id: Uuid,
    embedding_model: String,
    metric: DistanceMetric,
    dimension: usize,
    count: usize,
    chunk_size: usize,
    created_at: DateTime<Utc>,
    data: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct FragmentsFile {
    build_id: Uuid,
    checksum: String,
    fragments: Vec<String>,
}

/// Reads and writes the index artifact at one location
#[derive(Debug, Clone)]
pub struct IndexStore {
    location: PathBuf,
}

impl IndexStore {
    pub fn new(location: impl Into<PathBuf>) -> Self {
        Self {
            location: location.into(),
        }
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Whether an artifact directory is present (it may still be corrupt)
    pub fn exists(&self) -> bool {
        self.location.join(VECTORS_FILE).is_file() || self.location.join(FRAGMENTS_FILE).is_file()
    }

    /// Write both halves of the artifact, replacing any previous artifact
    pub fn save(&self, artifact: &IndexArtifact) -> Result<()> {
        let name = self.location.file_name().ok_or_else(|| {
            Error::InvalidArgument(format!(
                "index location '{}' has no directory name",
                self.location.display()
            ))
        })?;
        let parent = match self.location.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)?;

        let manifest = artifact.manifest();
        let index = artifact.index();
        let texts: Vec<String> = index.fragments().iter().map(|f| f.text.clone()).collect();

        let vectors = VectorsFile {
            format_version: FORMAT_VERSION,
            build_id: manifest.build_id,
            embedding_model: manifest.embedding_model.clone(),
            metric: manifest.metric,
            dimension: manifest.dimension,
            count: manifest.count,
            chunk_size: manifest.chunk_size,
            created_at: manifest.created_at,
            data: encode_vectors(index.vectors().as_flat()),
        };
        let fragments = FragmentsFile {
            build_id: manifest.build_id,
            checksum: checksum(&texts),
            fragments: texts,
        };

        let staging = tempfile::Builder::new()
            .prefix(".mythos-staging-")
            .tempdir_in(&parent)?;
        fs::write(
            staging.path().join(VECTORS_FILE),
            serde_json::to_vec(&vectors)?,
        )?;
        fs::write(
            staging.path().join(FRAGMENTS_FILE),
            serde_json::to_vec_pretty(&fragments)?,
        )?;

        if self.location.exists() {
            if !self.location.is_dir() {
                return Err(Error::InvalidArgument(format!(
                    "index location '{}' exists and is not a directory",
                    self.location.display()
                )));
            }

            let backup = parent.join(format!(
                ".{}.old-{}",
                name.to_string_lossy(),
                Uuid::new_v4().simple()
            ));
            fs::rename(&self.location, &backup)?;

            if let Err(e) = fs::rename(staging.path(), &self.location) {
                fs::rename(&backup, &self.location)?;
                return Err(e.into());
            }

            if let Err(e) = fs::remove_dir_all(&backup) {
                tracing::warn!("failed to remove previous index at {}: {}", backup.display(), e);
            }
        } else {
            fs::rename(staging.path(), &self.location)?;
        }

        tracing::info!(
            "saved index artifact {} ({} fragments, dimension {}) to {}",
            manifest.build_id,
            manifest.count,
            manifest.dimension,
            self.location.display()
        );
        Ok(())
    }

    /// Read both halves of the artifact and verify they belong together
    pub fn load(&self) -> Result<IndexArtifact> {
        if !self.location.is_dir() {
            return Err(Error::Io(std::io::Error::new(
                ErrorKind::NotFound,
                format!("no index artifact at '{}'", self.location.display()),
            )));
        }

        let vectors: VectorsFile = read_part(&self.location.join(VECTORS_FILE))?;
        let fragments: FragmentsFile = read_part(&self.location.join(FRAGMENTS_FILE))?;

        if vectors.format_version != FORMAT_VERSION {
            return Err(Error::IndexCorrupt(format!(
                "unsupported artifact format version {}",
                vectors.format_version
            )));
        }

        if vectors.build_id != fragments.build_id {
            return Err(Error::IndexCorrupt(format!(
                "vectors belong to build {} but fragments to build {}",
                vectors.build_id, fragments.build_id
            )));
        }

        if checksum(&fragments.fragments) != fragments.checksum {
            return Err(Error::IndexCorrupt(
                "fragment checksum does not match fragment texts".to_string(),
            ));
        }

        let data = decode_vectors(&vectors.data)?;
        let index = VectorIndex::from_flat(vectors.metric, vectors.dimension, data)?;
        if index.len() != vectors.count {
            return Err(Error::IndexCorrupt(format!(
                "manifest records {} vectors but {} were decoded",
                vectors.count,
                index.len()
            )));
        }

        let fragment_index = FragmentIndex::from_parts(index, fragments.fragments)?;
        let manifest = ArtifactManifest {
            build_id: vectors.build_id,
            embedding_model: vectors.embedding_model,
            metric: vectors.metric,
            dimension: vectors.dimension,
            count: vectors.count,
            chunk_size: vectors.chunk_size,
            created_at: vectors.created_at,
        };

        let artifact = IndexArtifact::from_parts(manifest, fragment_index)?;
        tracing::info!(
            "loaded index artifact {} ({} fragments) from {}",
            artifact.manifest().build_id,
            artifact.manifest().count,
            self.location.display()
        );
        Ok(artifact)
    }
}

fn read_part<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path).map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            Error::IndexCorrupt(format!("missing artifact file {}", path.display()))
        } else {
            Error::Io(e)
        }
    })?;

    serde_json::from_slice(&bytes)
        .map_err(|e| Error::IndexCorrupt(format!("unreadable {}: {}", path.display(), e)))
}

fn encode_vectors(values: &[f32]) -> String {
    let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
    STANDARD.encode(bytes)
}

fn decode_vectors(encoded: &str) -> Result<Vec<f32>> {
    let bytes = STANDARD
        .decode(encoded)
        .map_err(|e| Error::IndexCorrupt(format!("vector data is not valid base64: {}", e)))?;

    if bytes.len() % 4 != 0 {
        return Err(Error::IndexCorrupt(format!(
            "vector data length {} is not a whole number of f32 values",
            bytes.len()
        )));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

/// md5 over the length-prefixed fragment texts
fn checksum(texts: &[String]) -> String {
    let mut context = md5::Context::new();
    for text in texts {
        context.consume((text.len() as u64).to_le_bytes());
        context.consume(text.as_bytes());
    }
    format!("{:x}", context.compute())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_artifact() -> IndexArtifact {
        let mut index = FragmentIndex::new(DistanceMetric::Euclidean);
        index
            .extend(vec![
                ("Solon reformed the laws of Athens.".to_string(), vec![0.0, 0.0]),
                ("Lycurgus shaped Sparta.".to_string(), vec![10.0, 0.0]),
                ("Thebes rose under Epaminondas.".to_string(), vec![0.0, 10.0]),
            ])
            .unwrap();
        IndexArtifact::new(index, "text-embedding-004", 500)
    }

    #[test]
    fn test_round_trip() {
        let dir = tempdir().unwrap();
        let store = IndexStore::new(dir.path().join("index"));
        let artifact = sample_artifact();

        assert!(!store.exists());
        store.save(&artifact).unwrap();
        assert!(store.exists());

        let loaded = store.load().unwrap();
        assert_eq!(loaded, artifact);
        assert_eq!(loaded.index().vectors().row(2), Some(&[0.0, 10.0][..]));
    }

    #[test]
    fn test_round_trip_empty() {
        let dir = tempdir().unwrap();
        let store = IndexStore::new(dir.path().join("empty"));
        let artifact = IndexArtifact::new(FragmentIndex::new(DistanceMetric::Cosine), "m", 500);

        store.save(&artifact).unwrap();
        let loaded = store.load().unwrap();
        assert!(loaded.index().is_empty());
        assert_eq!(loaded.index().metric(), DistanceMetric::Cosine);
    }

    #[test]
    fn test_save_replaces_previous_artifact() {
        let dir = tempdir().unwrap();
        let store = IndexStore::new(dir.path().join("index"));

        store.save(&sample_artifact()).unwrap();
        let second = sample_artifact();
        store.save(&second).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.manifest().build_id, second.manifest().build_id);

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("index")]);
    }

    #[test]
    fn test_load_missing_location() {
        let dir = tempdir().unwrap();
        let store = IndexStore::new(dir.path().join("nowhere"));
        assert!(matches!(store.load(), Err(Error::Io(_))));
    }

    #[test]
    fn test_load_missing_half() {
        let dir = tempdir().unwrap();
        let store = IndexStore::new(dir.path().join("index"));
        store.save(&sample_artifact()).unwrap();
        fs::remove_file(store.location().join(FRAGMENTS_FILE)).unwrap();

        assert!(matches!(store.load(), Err(Error::IndexCorrupt(_))));
    }

    #[test]
    fn test_load_five_vectors_four_fragments() {
        let dir = tempdir().unwrap();
        let store = IndexStore::new(dir.path().join("index"));

        let mut index = FragmentIndex::new(DistanceMetric::Euclidean);
        for i in 0..5 {
            index.push(format!("fragment {}", i), vec![i as f32, 0.0]).unwrap();
        }
        store.save(&IndexArtifact::new(index, "m", 500)).unwrap();

        // Drop the last fragment but keep the file self-consistent
        let path = store.location().join(FRAGMENTS_FILE);
        let mut fragments: FragmentsFile =
            serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        fragments.fragments.pop();
        fragments.checksum = checksum(&fragments.fragments);
        fs::write(&path, serde_json::to_vec(&fragments).unwrap()).unwrap();

        let err = store.load().unwrap_err();
        assert!(matches!(err, Error::IndexCorrupt(ref msg) if msg == "5 vectors but 4 fragments"));
    }

    #[test]
    fn test_load_rejects_mixed_builds() {
        let dir = tempdir().unwrap();
        let first = IndexStore::new(dir.path().join("first"));
        let second = IndexStore::new(dir.path().join("second"));
        first.save(&sample_artifact()).unwrap();
        second.save(&sample_artifact()).unwrap();

        fs::copy(
            second.location().join(FRAGMENTS_FILE),
            first.location().join(FRAGMENTS_FILE),
        )
        .unwrap();

        let err = first.load().unwrap_err();
        assert!(matches!(err, Error::IndexCorrupt(ref msg) if msg.contains("build")));
    }

    #[test]
    fn test_load_rejects_tampered_text() {
        let dir = tempdir().unwrap();
        let store = IndexStore::new(dir.path().join("index"));
        store.save(&sample_artifact()).unwrap();

        let path = store.location().join(FRAGMENTS_FILE);
        let mut fragments: FragmentsFile =
            serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        fragments.fragments[0] = "Draco wrote harsh laws.".to_string();
        fs::write(&path, serde_json::to_vec(&fragments).unwrap()).unwrap();

        assert!(matches!(store.load(), Err(Error::IndexCorrupt(_))));
    }

    #[test]
    fn test_load_rejects_truncated_vectors() {
        let dir = tempdir().unwrap();
        let store = IndexStore::new(dir.path().join("index"));
        store.save(&sample_artifact()).unwrap();

        let path = store.location().join(VECTORS_FILE);
        let mut vectors: VectorsFile = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        vectors.data = encode_vectors(&[0.0, 0.0, 10.0]);
        fs::write(&path, serde_json::to_vec(&vectors).unwrap()).unwrap();

        assert!(matches!(store.load(), Err(Error::IndexCorrupt(_))));
    }

    #[test]
    fn test_load_rejects_garbage() {
        let dir = tempdir().unwrap();
        let store = IndexStore::new(dir.path().join("index"));
        store.save(&sample_artifact()).unwrap();
        fs::write(store.location().join(VECTORS_FILE), b"{not json").unwrap();

        assert!(matches!(store.load(), Err(Error::IndexCorrupt(_))));
    }

    #[test]
    fn test_vector_encoding() {
        let values = vec![1.5, -0.25, f32::MAX, 0.0];
        assert_eq!(decode_vectors(&encode_vectors(&values)).unwrap(), values);
        assert!(matches!(
            decode_vectors("AAA="),
            Err(Error::IndexCorrupt(_))
        ));
        assert!(matches!(
            decode_vectors("***"),
            Err(Error::IndexCorrupt(_))
        ));
    }
}
