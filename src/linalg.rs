//! Dense linear algebra helpers
//!
//! Matrices are held as `ndarray` arrays throughout the crate; decompositions
//! go through `nalgebra`, which these helpers bridge.

use nalgebra::DMatrix;
use ndarray::{Array1, Array2, ArrayView2};

use crate::error::{Result, RuvError};

/// Relative pivot size below which a cross-product matrix counts as singular
const PIVOT_TOLERANCE: f64 = 1e-12;

/// Singular values below `s_max * RANK_TOLERANCE` do not count towards the rank
pub const RANK_TOLERANCE: f64 = 1e-10;

/// Copy an ndarray view into an nalgebra matrix
pub fn to_dmatrix(a: ArrayView2<f64>) -> DMatrix<f64> {
    let (nrows, ncols) = a.dim();
    DMatrix::from_fn(nrows, ncols, |i, j| a[[i, j]])
}

/// Copy an nalgebra matrix into an ndarray array
pub fn from_dmatrix(m: &DMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn((m.nrows(), m.ncols()), |(i, j)| m[(i, j)])
}

/// Thin SVD with singular values sorted in decreasing order
#[derive(Debug, Clone)]
pub struct SortedSvd {
    /// Left singular vectors (rows x r)
    pub u: Array2<f64>,
    /// Singular values, decreasing (length r)
    pub singular_values: Array1<f64>,
    /// Right singular vectors as columns (cols x r)
    pub v: Array2<f64>,
}

impl SortedSvd {
    /// Numerical rank: singular values above `s_max * RANK_TOLERANCE`
    pub fn rank(&self) -> usize {
        let s_max = self.max_singular_value();
        if s_max <= 0.0 || !s_max.is_finite() {
            return 0;
        }
        let tol = s_max * RANK_TOLERANCE;
        self.singular_values.iter().filter(|&&s| s > tol).count()
    }

    /// Largest singular value (0 for an empty decomposition)
    pub fn max_singular_value(&self) -> f64 {
        self.singular_values.get(0).copied().unwrap_or(0.0)
    }
}

/// Thin SVD of `a`, singular triplets ordered by decreasing singular value
pub fn sorted_svd(a: ArrayView2<f64>, operation: &str) -> Result<SortedSvd> {
    let (nrows, ncols) = a.dim();
    if nrows == 0 || ncols == 0 {
        return Err(RuvError::InvalidInput {
            reason: format!("{}: cannot decompose an empty {}x{} matrix", operation, nrows, ncols),
        });
    }
    if a.iter().any(|v| !v.is_finite()) {
        return Err(RuvError::NumericalInstability {
            operation: operation.to_string(),
            details: "matrix contains non-finite values".to_string(),
        });
    }

    let svd = to_dmatrix(a).svd(true, true);
    let (u, v_t) = match (svd.u, svd.v_t) {
        (Some(u), Some(v_t)) => (u, v_t),
        _ => {
            return Err(RuvError::NumericalInstability {
                operation: operation.to_string(),
                details: "SVD did not return singular vectors".to_string(),
            })
        }
    };

    let s = svd.singular_values;
    let mut order: Vec<usize> = (0..s.len()).collect();
    order.sort_by(|&i, &j| s[j].partial_cmp(&s[i]).unwrap_or(std::cmp::Ordering::Equal));

    let r = order.len();
    let mut u_sorted = Array2::zeros((nrows, r));
    let mut v_sorted = Array2::zeros((ncols, r));
    let mut s_sorted = Array1::zeros(r);
    for (dst, &src) in order.iter().enumerate() {
        s_sorted[dst] = s[src];
        for i in 0..nrows {
            u_sorted[[i, dst]] = u[(i, src)];
        }
        for j in 0..ncols {
            v_sorted[[j, dst]] = v_t[(src, j)];
        }
    }

    Ok(SortedSvd {
        u: u_sorted,
        singular_values: s_sorted,
        v: v_sorted,
    })
}

/// Solve `(XᵀX) B = XᵀY` for B via Cholesky (ordinary least squares)
///
/// `x` is n x p, `y` is n x m; returns p x m coefficients.
pub fn least_squares(x: ArrayView2<f64>, y: ArrayView2<f64>, operation: &str) -> Result<Array2<f64>> {
    if x.nrows() != y.nrows() {
        return Err(RuvError::InvalidInput {
            reason: format!(
                "{}: design has {} rows but response has {}",
                operation,
                x.nrows(),
                y.nrows()
            ),
        });
    }

    let xm = to_dmatrix(x);
    let ym = to_dmatrix(y);
    let xtx = xm.transpose() * &xm;
    let xty = xm.transpose() * ym;

    let scale = xtx.diagonal().iter().fold(0.0f64, |acc, &d| acc.max(d.abs()));
    let chol = xtx.cholesky().ok_or_else(|| RuvError::NumericalInstability {
        operation: operation.to_string(),
        details: "cross-product matrix is singular or not positive definite".to_string(),
    })?;

    // Cholesky can succeed on a singular matrix through rounding; reject tiny pivots
    let min_pivot = chol.l().diagonal().iter().fold(f64::INFINITY, |acc, &d| acc.min(d * d));
    if !(min_pivot > scale * PIVOT_TOLERANCE) {
        return Err(RuvError::NumericalInstability {
            operation: operation.to_string(),
            details: format!(
                "cross-product matrix is numerically singular (pivot {:.3e}, scale {:.3e})",
                min_pivot, scale
            ),
        });
    }
    let coef = chol.solve(&xty);

    if coef.iter().any(|v| !v.is_finite()) {
        return Err(RuvError::NumericalInstability {
            operation: operation.to_string(),
            details: "least-squares solution contains non-finite values".to_string(),
        });
    }

    Ok(from_dmatrix(&coef))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_sorted_svd_reconstructs() {
        let a = array![[3.0, 1.0, 0.5], [1.0, 2.0, 0.0], [0.0, 1.0, 4.0], [2.0, 0.0, 1.0]];
        let svd = sorted_svd(a.view(), "test").unwrap();

        for w in svd.singular_values.windows(2) {
            assert!(w[0] >= w[1]);
        }
        assert_eq!(svd.rank(), 3);

        let s = Array2::from_diag(&svd.singular_values);
        let rebuilt = svd.u.dot(&s).dot(&svd.v.t());
        for (x, y) in rebuilt.iter().zip(a.iter()) {
            assert_abs_diff_eq!(x, y, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_rank_deficient() {
        let a = array![[1.0, 2.0], [2.0, 4.0], [3.0, 6.0]];
        let svd = sorted_svd(a.view(), "test").unwrap();
        assert_eq!(svd.rank(), 1);
    }

    #[test]
    fn test_least_squares_exact_fit() {
        let x = array![[1.0, 0.0], [1.0, 1.0], [1.0, 2.0], [1.0, 3.0]];
        let y = array![[1.0], [3.0], [5.0], [7.0]];
        let b = least_squares(x.view(), y.view(), "test").unwrap();
        assert_abs_diff_eq!(b[[0, 0]], 1.0, epsilon = 1e-10);
        assert_abs_diff_eq!(b[[1, 0]], 2.0, epsilon = 1e-10);
    }

    #[test]
    fn test_least_squares_singular() {
        let x = array![[1.0, 2.0], [2.0, 4.0]];
        let y = array![[1.0], [2.0]];
        let err = least_squares(x.view(), y.view(), "test").unwrap_err();
        assert!(matches!(err, RuvError::NumericalInstability { .. }));
    }
}
