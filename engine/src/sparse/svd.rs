use super::{project, SparseMatrix, SparseVector};
use crate::error::{Result, SearchError};
use crate::linalg::{orthonormalize_columns, random_uniform, symmetric_eigen};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Truncated SVD of a document-term matrix.
///
/// Right singular vectors are found by subspace iteration on `AᵀA` and then
/// rotated by a Rayleigh–Ritz step so components come out ordered by singular
/// value. Documents are represented as `A·V`, queries as `q·V`.
#[derive(Debug, Clone)]
pub struct TruncatedSvd {
    /// `n_terms × k`, orthonormal columns.
    components: Array2<f32>,
    singular_values: Vec<f32>,
    explained_variance_ratio: Vec<f32>,
}

impl TruncatedSvd {
    pub fn fit_transform(matrix: &SparseMatrix, n_components: usize, iterations: usize, seed: u64) -> Result<(Self, Array2<f32>)> {
        let k = n_components.min(matrix.n_rows()).min(matrix.n_cols());
        if k == 0 {
            return Err(SearchError::Initialization(format!(
                "svd needs a non-empty matrix, got {}x{}",
                matrix.n_rows(),
                matrix.n_cols()
            )));
        }
        if k < n_components {
            tracing::warn!(requested = n_components, used = k, "svd components clamped to matrix rank bound");
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let mut v = random_uniform(matrix.n_cols(), k, -1.0, 1.0, &mut rng);
        orthonormalize_columns(&mut v);
        for _ in 0..iterations {
            let y = matrix.mul_dense(&v);
            v = matrix.tmul_dense(&y);
            orthonormalize_columns(&mut v);
        }

        let y = matrix.mul_dense(&v);
        let (eigenvalues, rotation) = symmetric_eigen(&y.t().dot(&y));
        let components = v.dot(&rotation);
        let doc_vectors = y.dot(&rotation);

        let singular_values: Vec<f32> = eigenvalues.iter().map(|e| e.max(0.0).sqrt()).collect();
        let total = matrix.frobenius_sq();
        let explained_variance_ratio = eigenvalues
            .iter()
            .map(|e| if total > 0.0 { e.max(0.0) / total } else { 0.0 })
            .collect();

        tracing::info!(components = k, iterations, top_singular_value = singular_values[0], "fitted truncated svd");
        Ok((Self { components, singular_values, explained_variance_ratio }, doc_vectors))
    }

    pub fn n_components(&self) -> usize {
        self.components.ncols()
    }

    pub fn n_features(&self) -> usize {
        self.components.nrows()
    }

    pub fn singular_values(&self) -> &[f32] {
        &self.singular_values
    }

    /// Share of the matrix's squared Frobenius norm captured per component.
    pub fn explained_variance_ratio(&self) -> &[f32] {
        &self.explained_variance_ratio
    }

    pub fn transform(&self, q: &SparseVector) -> Result<Vec<f32>> {
        project(q, &self.components)
    }
}
