//! Dense helpers on top of `ndarray` used by the latent factorizers and the
//! dense embedding store. All matrices are row-major `Array2<f32>`.

use ndarray::{Array2, ArrayView1, Axis};
use rand::Rng;

pub fn random_uniform<R: Rng>(rows: usize, cols: usize, lo: f32, hi: f32, rng: &mut R) -> Array2<f32> {
    Array2::from_shape_fn((rows, cols), |_| rng.gen_range(lo..hi))
}

/// Modified Gram–Schmidt over columns. Columns that collapse numerically
/// (rank deficiency) are zeroed.
pub fn orthonormalize_columns(m: &mut Array2<f32>) {
    for j in 0..m.ncols() {
        for p in 0..j {
            let basis = m.column(p).to_owned();
            let proj = m.column(j).dot(&basis);
            m.column_mut(j).scaled_add(-proj, &basis);
        }
        let norm = m.column(j).dot(&m.column(j)).sqrt();
        let scale = if norm > 1e-10 { 1.0 / norm } else { 0.0 };
        m.column_mut(j).mapv_inplace(|v| v * scale);
    }
}

/// Eigen-decomposition of a small symmetric matrix by cyclic Jacobi rotations.
/// Returns eigenvalues sorted in descending order and the matching
/// eigenvectors as columns.
pub fn symmetric_eigen(m: &Array2<f32>) -> (Vec<f32>, Array2<f32>) {
    let n = m.nrows();
    assert_eq!(n, m.ncols(), "symmetric_eigen needs a square matrix");
    let mut a: Array2<f64> = m.mapv(f64::from);
    let mut v: Array2<f64> = Array2::eye(n);

    for _sweep in 0..100 {
        let off: f64 = a
            .indexed_iter()
            .filter(|((i, j), _)| i != j)
            .map(|(_, x)| x * x)
            .sum();
        if off < 1e-18 {
            break;
        }
        for p in 0..n {
            for q in (p + 1)..n {
                let apq = a[[p, q]];
                if apq.abs() < 1e-30 {
                    continue;
                }
                let theta = (a[[q, q]] - a[[p, p]]) / (2.0 * apq);
                let t = if theta == 0.0 {
                    1.0
                } else {
                    theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt())
                };
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;
                rotate(&mut a, Axis(1), p, q, c, s);
                rotate(&mut a, Axis(0), p, q, c, s);
                rotate(&mut v, Axis(1), p, q, c, s);
            }
        }
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&x, &y| a[[y, y]].total_cmp(&a[[x, x]]));
    let values = order.iter().map(|&i| a[[i, i]] as f32).collect();
    let vectors = Array2::from_shape_fn((n, n), |(r, c)| v[[r, order[c]]] as f32);
    (values, vectors)
}

/// Applies a Givens rotation to lanes `p` and `q` along `axis`.
fn rotate(m: &mut Array2<f64>, axis: Axis, p: usize, q: usize, c: f64, s: f64) {
    let lane_p = m.index_axis(axis, p).to_owned();
    let lane_q = m.index_axis(axis, q).to_owned();
    m.index_axis_mut(axis, p).assign(&(&lane_p * c - &lane_q * s));
    m.index_axis_mut(axis, q).assign(&(&lane_p * s + &lane_q * c));
}

/// Cosine similarity of equal-length vectors; 0 when either side is a zero vector.
pub fn cosine(a: ArrayView1<'_, f32>, b: ArrayView1<'_, f32>) -> f32 {
    let (na, nb) = (a.dot(&a).sqrt(), b.dot(&b).sqrt());
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    a.dot(&b) / (na * nb)
}
