use super::{SparseMatrix, SparseVector};
use crate::error::{ensure_dimension, Result, SearchError};
use crate::linalg::random_uniform;
use ndarray::{Array1, Array2, Zip};
use rand::rngs::StdRng;
use rand::SeedableRng;

const EPS: f32 = 1e-9;

/// Non-negative matrix factorization `A ≈ W·H` fitted with Lee–Seung
/// multiplicative updates on the Frobenius loss.
#[derive(Debug, Clone)]
pub struct Nmf {
    /// `k × n_terms`
    components: Array2<f32>,
    /// H·Hᵀ, cached for query projection
    gram: Array2<f32>,
    projection_iterations: usize,
    reconstruction_error: f32,
}

impl Nmf {
    /// Returns the model and W (`n_docs × k`), the document representations.
    pub fn fit_transform(
        matrix: &SparseMatrix,
        n_components: usize,
        max_iterations: usize,
        tolerance: f32,
        seed: u64,
    ) -> Result<(Self, Array2<f32>)> {
        let k = n_components.min(matrix.n_rows()).min(matrix.n_cols());
        if k == 0 {
            return Err(SearchError::Initialization(format!(
                "nmf needs a non-empty matrix, got {}x{}",
                matrix.n_rows(),
                matrix.n_cols()
            )));
        }
        if k < n_components {
            tracing::warn!(requested = n_components, used = k, "nmf components clamped to matrix rank bound");
        }

        let cells = (matrix.n_rows() * matrix.n_cols()) as f32;
        let scale = (matrix.sum() / cells / k as f32).sqrt().max(EPS);
        let mut rng = StdRng::seed_from_u64(seed);
        let mut w = random_uniform(matrix.n_rows(), k, 0.01 * scale, scale, &mut rng);
        let mut h = random_uniform(k, matrix.n_cols(), 0.01 * scale, scale, &mut rng);

        let a_norm = matrix.frobenius_sq();
        let mut prev_loss = f32::INFINITY;
        let mut loss = prev_loss;
        let mut iterations = 0;
        for it in 0..max_iterations {
            iterations = it + 1;

            // H <- H ∘ (WᵀA) / (WᵀW·H)
            let at_w = matrix.tmul_dense(&w);
            let denom = w.t().dot(&w).dot(&h);
            Zip::from(&mut h)
                .and(&at_w.t())
                .and(&denom)
                .for_each(|h, &n, &d| *h *= n / (d + EPS));

            // W <- W ∘ (A·Hᵀ) / (W·H·Hᵀ)
            let a_ht = matrix.mul_dense(&h.t());
            let h_ht = h.dot(&h.t());
            let denom = w.dot(&h_ht);
            Zip::from(&mut w)
                .and(&a_ht)
                .and(&denom)
                .for_each(|w, &n, &d| *w *= n / (d + EPS));

            if iterations % 10 == 0 || iterations == max_iterations {
                // ||A - WH||² = ||A||² - 2·⟨W, A·Hᵀ⟩ + ⟨WᵀW, H·Hᵀ⟩
                let cross = (&w * &a_ht).sum();
                let quad = (&w.t().dot(&w) * &h_ht).sum();
                loss = (a_norm - 2.0 * cross + quad).max(0.0);
                if prev_loss.is_finite() && (prev_loss - loss) / prev_loss.max(EPS) < tolerance {
                    break;
                }
                prev_loss = loss;
            }
        }

        let gram = h.dot(&h.t());
        let reconstruction_error = loss.sqrt();
        tracing::info!(components = k, iterations, reconstruction_error, "fitted nmf");
        Ok((Self { components: h, gram, projection_iterations: max_iterations, reconstruction_error }, w))
    }

    pub fn n_components(&self) -> usize {
        self.components.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.components.ncols()
    }

    pub fn reconstruction_error(&self) -> f32 {
        self.reconstruction_error
    }

    /// Non-negative coefficients `w` minimizing `||q - w·H||` with H held fixed.
    pub fn transform(&self, q: &SparseVector) -> Result<Vec<f32>> {
        ensure_dimension(self.n_features(), q.dim())?;
        let k = self.n_components();
        let mut numer = Array1::<f32>::zeros(k);
        for (t, v) in q.iter() {
            numer.scaled_add(v, &self.components.column(t as usize));
        }
        if numer.iter().all(|&n| n <= 0.0) {
            return Ok(vec![0.0; k]);
        }

        let mut w = Array1::from_elem(k, 1.0 / k as f32);
        for _ in 0..self.projection_iterations {
            let denom = self.gram.t().dot(&w);
            Zip::from(&mut w)
                .and(&numer)
                .and(&denom)
                .for_each(|w, &n, &d| *w *= n / (d + EPS));
        }
        Ok(w.to_vec())
    }
}
