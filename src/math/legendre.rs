//! Legendre polynomial basis for the continuum fit.
//!
//! Each spectral section represents its unabsorbed continuum as a truncated
//! Legendre series on the normalised abscissa `xi` in `[-1, 1]`. The
//! coefficients are obtained from a weighted least-squares solve of small
//! dimension (typically 1 to 8 columns), so SVD is used for robustness even
//! when the design matrix is nearly rank deficient.

use nalgebra::{DMatrix, DVector};

/// Fills `out` with `P_0(xi) .. P_{p-1}(xi)` using the three-term
/// recurrence `(k+1) P_{k+1} = (2k+1) xi P_k - k P_{k-1}`.
///
/// # Panics
/// Panics if `out` is empty.
pub fn basis_row(xi: f64, out: &mut [f64]) {
    out[0] = 1.0;
    if out.len() > 1 {
        out[1] = xi;
    }
    for k in 2..out.len() {
        let km = (k - 1) as f64;
        out[k] = ((2.0 * km + 1.0) * xi * out[k - 1] - km * out[k - 2]) / (km + 1.0);
    }
}

/// Evaluates the Legendre series with the given coefficients at `xi`.
pub fn evaluate(coefficients: &[f64], xi: f64) -> f64 {
    let mut row = vec![0.0; coefficients.len()];
    basis_row(xi, &mut row);
    coefficients.iter().zip(row.iter()).map(|(a, p)| a * p).sum()
}

/// Solves the weighted least-squares problem
/// `minimize sum_i w_i (y_i - sum_k a_k P_k(xi_i))^2`
/// for the `p` series coefficients.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly or
/// if there are fewer observations than coefficients.
pub fn fit_weighted(xi: &[f64], y: &[f64], w: &[f64], p: usize) -> Option<Vec<f64>> {
    let n = xi.len();
    if p == 0 || n < p || y.len() != n || w.len() != n {
        return None;
    }

    let mut xw = DMatrix::<f64>::zeros(n, p);
    let mut yw = DVector::<f64>::zeros(n);
    let mut row = vec![0.0; p];

    for i in 0..n {
        basis_row(xi[i], &mut row);
        let sw = w[i].sqrt();

        for k in 0..p {
            xw[(i, k)] = row[k] * sw;
        }
        yw[i] = y[i] * sw;
    }

    let svd = xw.svd(true, true);

    // Relax the rank tolerance stepwise for nearly collinear bases.
    for &tol in &[1.0e-10, 1.0e-8, 1.0e-6] {
        if let Ok(a) = svd.solve(&yw, tol) {
            if a.iter().all(|v| v.is_finite()) {
                return Some(a.iter().copied().collect());
            }
        }
    }

    None
}
