//! Line-profile family.
//!
//! Every absorption line contributes an optical-depth profile `f(lambda)`
//! parameterised by a fixed-size group of the model's parameter vector.
//! Three profile kinds are provided:
//!
//! - [`IntergalacticDoppler`]: a truncated Gaussian (6 parameters)
//! - [`ManyMultiplet`]: a Doppler profile with a relativistic correction to
//!   probe the variation of the fine-structure constant (8 parameters)
//! - [`IntergalacticVoigt`]: a damped profile using a pseudo-Voigt
//!   approximation (7 parameters)
//!
//! The profile type is selected at compile time (one binary per kind), so
//! superpositions dispatch statically.

pub mod doppler;
pub mod voigt;

pub use doppler::{IntergalacticDoppler, ManyMultiplet};
pub use voigt::{ExtendedPseudoVoigt, IntergalacticVoigt, PseudoVoigt};

use crate::math::constants::{PI, SQRT_OF_PI};
use crate::math::sq;

/// An absorption-line profile over wavelength.
pub trait Profile: Send + Sync {
    /// The number of parameters per line.
    const PARAMETER_COUNT: usize;

    /// Whether the profile carries a fine-structure variation parameter
    /// (adds the corresponding column to the line table).
    const HAS_ALPHA_VARIATION: bool = false;

    /// Creates a new profile from its parameter group.
    ///
    /// # Panics
    /// Panics if `q` is shorter than [`Profile::PARAMETER_COUNT`].
    fn new(q: &[f64]) -> Self;

    /// Returns the optical depth contributed at `wavelength` (Angstrom).
    fn evaluate(&self, wavelength: f64) -> f64;
}

/// The superposition of many profiles of one kind.
pub struct Superposition<P: Profile> {
    profiles: Vec<P>,
}

impl<P: Profile> Superposition<P> {
    /// Creates a superposition of `n` profiles from consecutive parameter
    /// groups in `q`.
    ///
    /// # Panics
    /// Panics if `q` is shorter than `n * P::PARAMETER_COUNT`.
    pub fn new(n: usize, q: &[f64]) -> Self {
        let mut profiles = Vec::with_capacity(n);
        for k in 0..n {
            profiles.push(P::new(&q[k * P::PARAMETER_COUNT..]));
        }
        Self { profiles }
    }

    /// Returns the total optical depth at `wavelength` (Angstrom).
    pub fn value(&self, wavelength: f64) -> f64 {
        self.profiles.iter().map(|p| p.evaluate(wavelength)).sum()
    }
}

/// The unit-area Gaussian with width `gamma`.
#[inline]
pub fn gaussian(x: f64, gamma: f64) -> f64 {
    (1.0 / (SQRT_OF_PI * gamma)) * (-sq(x / gamma)).exp()
}

/// The unit-area Lorentzian with width `gamma`.
#[inline]
pub fn lorentzian(x: f64, gamma: f64) -> f64 {
    1.0 / ((PI * gamma) * (1.0 + sq(x / gamma)))
}

/// The unit-area irrational shape used in the extended pseudo-Voigt
/// approximation.
#[inline]
pub fn irrational(x: f64, gamma: f64) -> f64 {
    1.0 / ((2.0 * gamma) * (1.0 + sq(x / gamma)).powf(1.5))
}

/// The unit-area squared hyperbolic secant used in the extended
/// pseudo-Voigt approximation.
#[inline]
pub fn sech_squared(x: f64, gamma: f64) -> f64 {
    1.0 / (2.0 * gamma * sq((x / gamma).cosh()))
}

/// Truncates a profile shape beyond `c` widths from the center.
#[inline]
pub fn truncate<F: Fn(f64, f64) -> f64>(f: F, x: f64, b: f64, c: f64) -> f64 {
    if x.abs() < c * b {
        f(x, b)
    } else {
        0.0
    }
}
