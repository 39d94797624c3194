//! Sparse term-space representations: TF-IDF vectorizer plus the SVD and NMF
//! factorizers fitted on top of its document-term matrix.

use crate::error::{ensure_dimension, Result};
use ndarray::{Array1, Array2, ArrayBase, Data, Ix2};

pub mod nmf;
pub mod svd;
pub mod vectorizer;

pub use nmf::Nmf;
pub use svd::TruncatedSvd;
pub use vectorizer::TfidfVectorizer;

pub type TermId = u32;

/// Sparse vector with strictly increasing term ids and no explicit zeros.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseVector {
    dim: usize,
    indices: Vec<TermId>,
    values: Vec<f32>,
}

impl SparseVector {
    pub fn empty(dim: usize) -> Self {
        Self { dim, indices: Vec::new(), values: Vec::new() }
    }

    /// Builds from (term, weight) pairs in any order; zero weights are dropped.
    pub fn from_pairs(dim: usize, mut pairs: Vec<(TermId, f32)>) -> Self {
        pairs.sort_by_key(|(t, _)| *t);
        pairs.retain(|(_, w)| *w != 0.0);
        let (indices, values) = pairs.into_iter().unzip();
        Self { dim, indices, values }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TermId, f32)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }

    pub fn norm(&self) -> f32 {
        self.values.iter().map(|v| v * v).sum::<f32>().sqrt()
    }

    pub fn normalized(mut self) -> Self {
        let n = self.norm();
        if n > 0.0 {
            for v in &mut self.values {
                *v /= n;
            }
        }
        self
    }

    pub fn dot(&self, other: &SparseVector) -> Result<f32> {
        ensure_dimension(self.dim, other.dim)?;
        let (mut i, mut j, mut acc) = (0, 0, 0.0f32);
        while i < self.indices.len() && j < other.indices.len() {
            match self.indices[i].cmp(&other.indices[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    acc += self.values[i] * other.values[j];
                    i += 1;
                    j += 1;
                }
            }
        }
        Ok(acc)
    }

    pub fn cosine(&self, other: &SparseVector) -> Result<f32> {
        let dot = self.dot(other)?;
        let denom = self.norm() * other.norm();
        Ok(if denom == 0.0 { 0.0 } else { dot / denom })
    }

    /// Σ weight·vector over vectors sharing one dimensionality.
    pub fn weighted_sum<'a, I>(dim: usize, parts: I) -> Result<Self>
    where
        I: IntoIterator<Item = (f32, &'a SparseVector)>,
    {
        let mut acc: std::collections::BTreeMap<TermId, f32> = std::collections::BTreeMap::new();
        for (weight, vec) in parts {
            ensure_dimension(dim, vec.dim)?;
            if weight == 0.0 {
                continue;
            }
            for (t, v) in vec.iter() {
                *acc.entry(t).or_insert(0.0) += weight * v;
            }
        }
        Ok(Self::from_pairs(dim, acc.into_iter().collect()))
    }
}

/// Row-sparse document-term matrix, one row per document in corpus order.
#[derive(Debug, Clone)]
pub struct SparseMatrix {
    n_cols: usize,
    rows: Vec<SparseVector>,
}

impl SparseMatrix {
    pub fn new(n_cols: usize, rows: Vec<SparseVector>) -> Result<Self> {
        for row in &rows {
            ensure_dimension(n_cols, row.dim())?;
        }
        Ok(Self { n_cols, rows })
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    pub fn rows(&self) -> &[SparseVector] {
        &self.rows
    }

    pub fn row(&self, i: usize) -> &SparseVector {
        &self.rows[i]
    }

    pub fn nnz(&self) -> usize {
        self.rows.iter().map(SparseVector::nnz).sum()
    }

    pub fn sum(&self) -> f32 {
        self.rows.iter().flat_map(|r| r.values.iter()).sum()
    }

    pub fn frobenius_sq(&self) -> f32 {
        self.rows.iter().flat_map(|r| r.values.iter()).map(|v| v * v).sum()
    }

    /// self · b, where b is `n_cols × k`.
    pub fn mul_dense<S: Data<Elem = f32>>(&self, b: &ArrayBase<S, Ix2>) -> Array2<f32> {
        assert_eq!(self.n_cols, b.nrows(), "sparse·dense shape mismatch");
        let mut out = Array2::zeros((self.rows.len(), b.ncols()));
        for (r, row) in self.rows.iter().enumerate() {
            let mut out_row = out.row_mut(r);
            for (t, v) in row.iter() {
                out_row.scaled_add(v, &b.row(t as usize));
            }
        }
        out
    }

    /// selfᵀ · y, where y is `n_rows × k`.
    pub fn tmul_dense<S: Data<Elem = f32>>(&self, y: &ArrayBase<S, Ix2>) -> Array2<f32> {
        assert_eq!(self.rows.len(), y.nrows(), "sparseᵀ·dense shape mismatch");
        let mut out = Array2::zeros((self.n_cols, y.ncols()));
        for (r, row) in self.rows.iter().enumerate() {
            let y_row = y.row(r);
            for (t, v) in row.iter() {
                out.row_mut(t as usize).scaled_add(v, &y_row);
            }
        }
        out
    }
}

/// Projects one sparse vector through a `dim × k` matrix (q · m).
pub(crate) fn project(q: &SparseVector, m: &Array2<f32>) -> Result<Vec<f32>> {
    ensure_dimension(m.nrows(), q.dim())?;
    let mut out = Array1::<f32>::zeros(m.ncols());
    for (t, v) in q.iter() {
        out.scaled_add(v, &m.row(t as usize));
    }
    Ok(out.to_vec())
}
