//! Common types used across the mythos retrieval pipeline

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Error, Result};

/// A fixed-dimension embedding
pub type Vector = Vec<f32>;

/// A piece of source text used as a retrieval unit.
///
/// `index` is the fragment's position in the global fragment sequence and
/// always equals the row of its vector in the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    pub index: usize,
    pub text: String,
}

impl Fragment {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }
}

/// A fragment returned by retrieval together with its distance to the query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedFragment {
    pub fragment: Fragment,
    pub distance: f32,
}

/// Raw text of one source document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    /// File name or other handle the text was read from
    pub name: String,
    pub text: String,
}

impl SourceDocument {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

/// Distance used to rank stored vectors against a query.
///
/// Smaller is always closer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// Squared Euclidean distance on the raw vectors
    #[default]
    Euclidean,
    /// `1 - cosine similarity`; a zero vector is at distance 1 from everything
    Cosine,
}

impl DistanceMetric {
    /// Distance between two vectors of equal length
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            DistanceMetric::Euclidean => a
                .iter()
                .zip(b.iter())
                .map(|(x, y)| (x - y) * (x - y))
                .sum(),
            DistanceMetric::Cosine => {
                let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
                let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
                let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

                if norm_a == 0.0 || norm_b == 0.0 {
                    return 1.0;
                }

                1.0 - dot / (norm_a * norm_b)
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DistanceMetric::Euclidean => "euclidean",
            DistanceMetric::Cosine => "cosine",
        }
    }

    /// Parse from string
    pub fn parse(s: &str) -> Result<DistanceMetric> {
        match s.trim().to_lowercase().as_str() {
            "euclidean" | "l2" => Ok(DistanceMetric::Euclidean),
            "cosine" | "cos" => Ok(DistanceMetric::Cosine),
            other => Err(Error::Configuration(format!(
                "unknown distance metric '{}', expected 'euclidean' or 'cosine'",
                other
            ))),
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_euclidean_is_squared() {
        let d = DistanceMetric::Euclidean.distance(&[0.0, 0.0], &[3.0, 4.0]);
        assert_eq!(d, 25.0);
    }

    #[test]
    fn test_cosine_distance() {
        let metric = DistanceMetric::Cosine;
        assert!(metric.distance(&[1.0, 0.0], &[2.0, 0.0]).abs() < 1e-6);
        assert!((metric.distance(&[1.0, 0.0], &[0.0, 1.0]) - 1.0).abs() < 1e-6);
        assert!((metric.distance(&[1.0, 0.0], &[-1.0, 0.0]) - 2.0).abs() < 1e-6);
        assert_eq!(metric.distance(&[0.0, 0.0], &[1.0, 1.0]), 1.0);
    }

    #[test]
    fn test_metric_parse() {
        assert_eq!(DistanceMetric::parse("L2").unwrap(), DistanceMetric::Euclidean);
        assert_eq!(DistanceMetric::parse(" cosine ").unwrap(), DistanceMetric::Cosine);
        assert!(matches!(
            DistanceMetric::parse("manhattan"),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_metric_serde_lowercase() {
        let json = serde_json::to_string(&DistanceMetric::Cosine).unwrap();
        assert_eq!(json, "\"cosine\"");
        let parsed: DistanceMetric = serde_json::from_str("\"euclidean\"").unwrap();
        assert_eq!(parsed, DistanceMetric::Euclidean);
    }
}
