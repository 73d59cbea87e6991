//! Numerical building blocks: physical constants, random deviates, the
//! symmetric eigensolver, the Legendre continuum basis, and the dispersion
//! formulas for air/vacuum wavelength conversion.

pub mod constants;
pub mod dispersion;
pub mod eigen;
pub mod legendre;
pub mod rng;

pub use eigen::EigenSolver;
pub use rng::{Mt19937_64, NormalDeviate, Pcg32, UniformSource};

/// The square of a number.
#[inline]
pub fn sq(x: f64) -> f64 {
    x * x
}
