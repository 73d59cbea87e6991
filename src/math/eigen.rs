//! Symmetric eigenproblem solver.
//!
//! The evolution strategy refreshes its mutation basis by factoring the
//! covariance matrix into eigenvalues and an orthonormal rotation. The
//! solver is constructed once per problem dimension and reused across
//! generations; results are made deterministic by sorting eigenvalues in
//! ascending order (ties broken by input position) and fixing each
//! eigenvector's sign.

use nalgebra::{DMatrix, DVector};

use crate::error::AppError;

/// Solves symmetric eigenproblems of a fixed dimension.
#[derive(Debug, Clone)]
pub struct EigenSolver {
    n: usize,
}

impl EigenSolver {
    /// Creates a new solver for `n x n` problems.
    pub fn new(n: usize) -> Self {
        Self { n }
    }

    pub fn dimension(&self) -> usize {
        self.n
    }

    /// Factors a symmetric matrix `A` into eigenvalues `w` (ascending) and
    /// an orthonormal eigenvector matrix `Z` with `A Z = Z diag(w)`.
    ///
    /// Only the upper triangle of `A` is read; the lower triangle is
    /// mirrored before factorisation.
    pub fn decompose(&self, a: &DMatrix<f64>) -> Result<(DVector<f64>, DMatrix<f64>), AppError> {
        if a.nrows() != self.n || a.ncols() != self.n {
            return Err(AppError::invalid_argument(format!(
                "especia: Error: expected a {0} x {0} matrix, got {1} x {2}",
                self.n,
                a.nrows(),
                a.ncols()
            )));
        }
        if self.n == 0 {
            return Err(AppError::invalid_argument(
                "especia: Error: empty eigenproblem",
            ));
        }
        if a.iter().any(|x| !x.is_finite()) {
            return Err(AppError::invalid_argument(
                "especia: Error: non-finite matrix element",
            ));
        }

        let mut sym = DMatrix::<f64>::zeros(self.n, self.n);
        for i in 0..self.n {
            for j in i..self.n {
                sym[(i, j)] = a[(i, j)];
                sym[(j, i)] = a[(i, j)];
            }
        }

        let eigen = nalgebra::SymmetricEigen::try_new(sym, f64::EPSILON, 300 * self.n)
            .ok_or_else(|| {
                AppError::numeric("especia: Error: the eigenvalue iteration failed to converge")
            })?;

        // Ascending eigenvalue order with a deterministic tie break.
        let mut order: Vec<usize> = (0..self.n).collect();
        order.sort_by(|&i, &j| {
            eigen.eigenvalues[i]
                .partial_cmp(&eigen.eigenvalues[j])
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(i.cmp(&j))
        });

        let mut w = DVector::<f64>::zeros(self.n);
        let mut z = DMatrix::<f64>::zeros(self.n, self.n);

        for (k, &i) in order.iter().enumerate() {
            w[k] = eigen.eigenvalues[i];

            let column = eigen.eigenvectors.column(i);

            // Fix the sign: the component of largest magnitude is positive.
            let mut pivot = 0;
            for r in 1..self.n {
                if column[r].abs() > column[pivot].abs() {
                    pivot = r;
                }
            }
            let sign = if column[pivot] < 0.0 { -1.0 } else { 1.0 };

            for r in 0..self.n {
                z[(r, k)] = sign * column[r];
            }
        }

        Ok((w, z))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::rng::{Mt19937_64, UniformSource};

    fn random_symmetric(n: usize, seed: u64) -> DMatrix<f64> {
        let mut mt = Mt19937_64::new(seed);
        let mut a = DMatrix::<f64>::zeros(n, n);
        for i in 0..n {
            for j in i..n {
                let x = 2.0 * mt.uniform() - 1.0;
                a[(i, j)] = x;
                a[(j, i)] = x;
            }
        }
        a
    }

    #[test]
    fn reconstructs_the_input_matrix() {
        let n = 12;
        let a = random_symmetric(n, 31_415);
        let solver = EigenSolver::new(n);

        let (w, z) = solver.decompose(&a).unwrap();

        let residual = &a * &z - &z * DMatrix::from_diagonal(&w);
        assert!(residual.norm() < 1.0e-10 * a.norm(), "{}", residual.norm());
    }

    #[test]
    fn eigenvectors_are_orthonormal() {
        let n = 12;
        let a = random_symmetric(n, 27_182);
        let solver = EigenSolver::new(n);

        let (_, z) = solver.decompose(&a).unwrap();

        let gram = z.transpose() * &z - DMatrix::<f64>::identity(n, n);
        assert!(gram.norm() < 1.0e-10, "{}", gram.norm());
    }

    #[test]
    fn eigenvalues_are_ascending() {
        let n = 12;
        let a = random_symmetric(n, 16_180);
        let solver = EigenSolver::new(n);

        let (w, _) = solver.decompose(&a).unwrap();

        for k in 1..n {
            assert!(w[k - 1] <= w[k]);
        }
    }

    #[test]
    fn two_by_two_eigenvalues() {
        let a = DMatrix::from_row_slice(2, 2, &[2.0, 1.0, 1.0, 2.0]);
        let solver = EigenSolver::new(2);

        let (w, _) = solver.decompose(&a).unwrap();

        assert!((w[0] - 1.0).abs() < 1.0e-12);
        assert!((w[1] - 3.0).abs() < 1.0e-12);
    }

    #[test]
    fn decomposition_is_deterministic() {
        let n = 8;
        let a = random_symmetric(n, 14_142);
        let solver = EigenSolver::new(n);

        let (w1, z1) = solver.decompose(&a).unwrap();
        let (w2, z2) = solver.decompose(&a).unwrap();

        assert_eq!(w1, w2);
        assert_eq!(z1, z2);
    }

    #[test]
    fn rejects_mismatched_dimensions() {
        let a = DMatrix::<f64>::zeros(3, 3);
        let solver = EigenSolver::new(4);

        assert!(solver.decompose(&a).is_err());
    }

    #[test]
    fn reads_only_the_upper_triangle() {
        let upper = DMatrix::from_row_slice(2, 2, &[2.0, 1.0, -999.0, 2.0]);
        let full = DMatrix::from_row_slice(2, 2, &[2.0, 1.0, 1.0, 2.0]);
        let solver = EigenSolver::new(2);

        let (w_upper, _) = solver.decompose(&upper).unwrap();
        let (w_full, _) = solver.decompose(&full).unwrap();

        assert_eq!(w_upper, w_full);
    }
}
