//! Exact nearest-neighbour index and the fragment index built on top of it

use std::cmp::Ordering;

use mythos_core::{DistanceMetric, Error, Fragment, Result, RetrievedFragment, Vector};

/// Append-only collection of fixed-dimension vectors with exact k-NN search.
///
/// Rows are stored contiguously in insertion order. The dimension is fixed by
/// the first vector ever added.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorIndex {
    metric: DistanceMetric,
    dimension: Option<usize>,
    data: Vec<f32>,
    rows: usize,
}

impl VectorIndex {
    /// Create an empty index; the dimension is taken from the first `add`
    pub fn new(metric: DistanceMetric) -> Self {
        Self {
            metric,
            dimension: None,
            data: Vec::new(),
            rows: 0,
        }
    }

    /// Rebuild an index from a flat row-major buffer
    pub fn from_flat(metric: DistanceMetric, dimension: usize, data: Vec<f32>) -> Result<Self> {
        if dimension == 0 {
            if !data.is_empty() {
                return Err(Error::IndexCorrupt(
                    "vector data present but dimension is zero".to_string(),
                ));
            }
            return Ok(Self::new(metric));
        }

        if data.len() % dimension != 0 {
            return Err(Error::IndexCorrupt(format!(
                "{} values do not divide into rows of dimension {}",
                data.len(),
                dimension
            )));
        }

        let rows = data.len() / dimension;
        Ok(Self {
            metric,
            dimension: if rows == 0 { None } else { Some(dimension) },
            data,
            rows,
        })
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Dimension of the stored vectors, `None` until the first row is added
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// All vectors, row-major
    pub fn as_flat(&self) -> &[f32] {
        &self.data
    }

    pub fn row(&self, i: usize) -> Option<&[f32]> {
        let d = self.dimension?;
        if i >= self.rows {
            return None;
        }
        Some(&self.data[i * d..(i + 1) * d])
    }

    /// Append vectors in order.
    ///
    /// Every vector is checked before any is appended, so a failed call
    /// leaves the index untouched.
    pub fn add(&mut self, vectors: &[Vector]) -> Result<()> {
        let Some(first) = vectors.first() else {
            return Ok(());
        };

        let expected = self.dimension.unwrap_or(first.len());
        if expected == 0 {
            return Err(Error::InvalidArgument(
                "cannot index zero-length vectors".to_string(),
            ));
        }

        for vector in vectors {
            if vector.len() != expected {
                return Err(Error::DimensionMismatch {
                    expected,
                    found: vector.len(),
                });
            }
        }

        self.data.reserve(vectors.len() * expected);
        for vector in vectors {
            self.data.extend_from_slice(vector);
        }
        self.rows += vectors.len();
        self.dimension = Some(expected);

        Ok(())
    }

    /// The `k` rows nearest to `query`, as `(row, distance)` pairs sorted by
    /// ascending distance with ties going to the lower row.
    ///
    /// An empty index yields no rows whatever the query; `k` larger than the
    /// index yields every row.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
        let Some(d) = self.dimension else {
            return Ok(Vec::new());
        };

        if query.len() != d {
            return Err(Error::DimensionMismatch {
                expected: d,
                found: query.len(),
            });
        }

        let mut scored: Vec<(usize, f32)> = self
            .data
            .chunks_exact(d)
            .enumerate()
            .map(|(row, vector)| (row, self.metric.distance(query, vector)))
            .collect();

        scored.sort_by(|a, b| match a.1.total_cmp(&b.1) {
            Ordering::Equal => a.0.cmp(&b.0),
            other => other,
        });
        scored.truncate(k);

        Ok(scored)
    }
}

/// The vector index and the fragment sequence owned as one unit.
///
/// Row `i` of the index is always the vector of `fragments[i]`, and
/// `fragments[i].index == i`.
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentIndex {
    vectors: VectorIndex,
    fragments: Vec<Fragment>,
}

impl FragmentIndex {
    pub fn new(metric: DistanceMetric) -> Self {
        Self {
            vectors: VectorIndex::new(metric),
            fragments: Vec::new(),
        }
    }

    /// Pair an existing index with its fragment texts, rejecting any mismatch
    pub fn from_parts(vectors: VectorIndex, texts: Vec<String>) -> Result<Self> {
        if vectors.len() != texts.len() {
            return Err(Error::IndexCorrupt(format!(
                "{} vectors but {} fragments",
                vectors.len(),
                texts.len()
            )));
        }

        if let Some(i) = texts.iter().position(|t| t.is_empty()) {
            return Err(Error::IndexCorrupt(format!("fragment {} is empty", i)));
        }

        let fragments = texts
            .into_iter()
            .enumerate()
            .map(|(i, text)| Fragment::new(i, text))
            .collect();

        Ok(Self { vectors, fragments })
    }

    /// Append fragments with their vectors; texts and vectors pair up in order
    pub fn extend(&mut self, entries: Vec<(String, Vector)>) -> Result<()> {
        if let Some((i, _)) = entries.iter().enumerate().find(|(_, (t, _))| t.is_empty()) {
            return Err(Error::InvalidArgument(format!(
                "fragment {} has empty text",
                self.fragments.len() + i
            )));
        }

        let (texts, vectors): (Vec<String>, Vec<Vector>) = entries.into_iter().unzip();
        self.vectors.add(&vectors)?;

        let start = self.fragments.len();
        self.fragments.extend(
            texts
                .into_iter()
                .enumerate()
                .map(|(i, text)| Fragment::new(start + i, text)),
        );

        Ok(())
    }

    pub fn push(&mut self, text: impl Into<String>, vector: Vector) -> Result<()> {
        self.extend(vec![(text.into(), vector)])
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn dimension(&self) -> Option<usize> {
        self.vectors.dimension()
    }

    pub fn metric(&self) -> DistanceMetric {
        self.vectors.metric()
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    pub fn vectors(&self) -> &VectorIndex {
        &self.vectors
    }

    /// The `k` fragments nearest to `query`, closest first
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<RetrievedFragment>> {
        let hits = self.vectors.search(query, k)?;

        hits.into_iter()
            .map(|(row, distance)| {
                let fragment = self.fragments.get(row).cloned().ok_or_else(|| {
                    Error::IndexCorrupt(format!("row {} has no fragment", row))
                })?;
                Ok(RetrievedFragment { fragment, distance })
            })
            .collect()
    }
}
