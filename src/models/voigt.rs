//! Pseudo-Voigt approximations and the damped line profile built on them.
//!
//! The Voigt function is the convolution of a Gaussian and a Lorentzian.
//! Both approximations here follow
//!
//! T. Ida, M. Ando, H. Toraya (2000).
//!   *Extended pseudo-Voigt function for approximating the Voigt profile.*
//!   J. Appl. Cryst., 33, 1311, ISSN 0021-8898.
//!
//! The mixing-weight polynomials are part of the published parameterisation
//! and are reproduced coefficient for coefficient.

use std::f64::consts::{LN_2, SQRT_2};

use crate::math::constants::{
    ELECTRIC_CONSTANT, ELECTRON_MASS, ELEMENTARY_CHARGE, PI, SPEED_OF_LIGHT,
};

use super::{gaussian, irrational, lorentzian, sech_squared, Profile};

/// An approximation to the Voigt function, parameterised by the widths of
/// its Gaussian and Lorentzian constituents.
pub trait VoigtApproximation: Send + Sync {
    /// Creates a new approximation from the Gaussian width `b` and the
    /// Lorentzian width `d` (arbitrary unit).
    fn new(b: f64, d: f64) -> Self;

    /// Returns the value of the approximation at `x` (same unit as the
    /// widths).
    fn value(&self, x: f64) -> f64;
}

/// The pseudo-Voigt approximation: a Gaussian and a Lorentzian of matched
/// half widths, mixed linearly.
pub struct PseudoVoigt {
    gamma_g: f64,
    gamma_l: f64,
    eta: f64,
}

impl VoigtApproximation for PseudoVoigt {
    fn new(b: f64, d: f64) -> Self {
        let c_g = 2.0 * LN_2.sqrt();
        let c_l = 2.0;

        let u = (c_g * b) / (c_l * d);
        let r = 1.0
            / (1.0 + u * (0.07842 + u * (4.47163 + u * (2.42843 + u * (u + 2.69269))))).powf(0.2);

        Self {
            gamma_g: (c_l * d) / (c_g * r),
            gamma_l: (c_l * d) / (c_l * r),
            eta: r * (1.36603 - r * (0.47719 - r * 0.11116)),
        }
    }

    fn value(&self, x: f64) -> f64 {
        (1.0 - self.eta) * gaussian(x, self.gamma_g) + self.eta * lorentzian(x, self.gamma_l)
    }
}

/// The extended pseudo-Voigt approximation, which adds an irrational and a
/// squared-hyperbolic-secant shape to reduce the peak error by an order of
/// magnitude.
pub struct ExtendedPseudoVoigt {
    gamma_g: f64,
    gamma_l: f64,
    gamma_i: f64,
    gamma_p: f64,
    eta_l: f64,
    eta_i: f64,
    eta_p: f64,
}

impl VoigtApproximation for ExtendedPseudoVoigt {
    fn new(b: f64, d: f64) -> Self {
        let c_g = 2.0 * LN_2.sqrt();
        let c_l = 2.0;
        let c_i = 2.0 * (2.0_f64.powf(2.0 / 3.0) - 1.0).sqrt();
        let c_p = 2.0 * (SQRT_2 + 1.0).ln();

        let u = c_g * b + c_l * d;
        let r = c_l * d / u;

        Self {
            gamma_g: u * poly_w_g(r) / c_g,
            gamma_l: u * poly_w_l(r) / c_l,
            gamma_i: u * poly_w_i(r) / c_i,
            gamma_p: u * poly_w_p(r) / c_p,
            eta_l: poly_eta_l(r),
            eta_i: poly_eta_i(r),
            eta_p: poly_eta_p(r),
        }
    }

    fn value(&self, x: f64) -> f64 {
        (1.0 - self.eta_l - self.eta_i - self.eta_p) * gaussian(x, self.gamma_g)
            + self.eta_l * lorentzian(x, self.gamma_l)
            + self.eta_i * irrational(x, self.gamma_i)
            + self.eta_p * sech_squared(x, self.gamma_p)
    }
}

/// An univariate polynomial of degree 6 in Horner form.
#[inline]
#[allow(clippy::too_many_arguments)]
fn poly(x: f64, h0: f64, h1: f64, h2: f64, h3: f64, h4: f64, h5: f64, h6: f64) -> f64 {
    h0 + x * (h1 + x * (h2 + x * (h3 + x * (h4 + x * (h5 + x * h6)))))
}

fn poly_w_g(r: f64) -> f64 {
    1.0 - r * poly(r, 0.66000, 0.15021, -1.24984, 4.74052, -9.48291, 8.48252, -2.95553)
}

fn poly_w_l(r: f64) -> f64 {
    1.0 - (1.0 - r) * poly(r, -0.42179, -1.25693, 10.30003, -23.45651, 29.14158, -16.50453, 3.19974)
}

fn poly_w_i(r: f64) -> f64 {
    poly(r, 1.19913, 1.43021, -15.36331, 47.06071, -73.61822, 57.92559, -17.80614)
}

fn poly_w_p(r: f64) -> f64 {
    poly(r, 1.10186, -0.47745, -0.68688, 2.76622, -4.55466, 4.05475, -1.26571)
}

fn poly_eta_l(r: f64) -> f64 {
    r * (1.0 + (1.0 - r) * poly(r, -0.30165, -1.38927, 9.31550, -24.10743, 34.96491, -21.18862, 3.70290))
}

fn poly_eta_i(r: f64) -> f64 {
    (r * (1.0 - r)) * poly(r, 0.25437, -0.14107, 3.23653, -11.09215, 22.10544, -24.12407, 9.76947)
}

fn poly_eta_p(r: f64) -> f64 {
    (r * (1.0 - r)) * poly(r, 1.01579, 1.50429, -9.21815, 23.59717, -39.71134, 32.83023, -10.02142)
}

/// The speed of light (km s-1).
const C0: f64 = 1.0E-03 * SPEED_OF_LIGHT;

/// The amplitude factor relating oscillator strength, column density, and
/// wavelength (Angstrom, cm-2) to optical depth.
const C1: f64 = 1.0E-06 * ELEMENTARY_CHARGE * ELEMENTARY_CHARGE
    / (4.0 * ELECTRIC_CONSTANT * ELECTRON_MASS * SPEED_OF_LIGHT * SPEED_OF_LIGHT);

/// The factor converting a damping constant (s-1) and a wavelength product
/// (Angstrom squared) into a Lorentzian width (Angstrom).
const C2: f64 = 1.0E-10 / (4.0 * PI * SPEED_OF_LIGHT);

/// The Voigt profile to model damped intergalactic absorption lines,
/// generic over the approximation strategy.
///
/// Parameters (in positional order):
///
/// - `q[0]` the rest wavelength (Angstrom)
/// - `q[1]` the oscillator strength
/// - `q[2]` the cosmological redshift
/// - `q[3]` the radial velocity (km s-1)
/// - `q[4]` the line broadening velocity (km s-1)
/// - `q[5]` the decadic logarithm of the particle column number density (cm-2)
/// - `q[6]` the damping constant (s-1)
pub struct IntergalacticVoigt<A: VoigtApproximation> {
    /// The central wavelength (Angstrom).
    c: f64,
    /// The amplitude.
    a: f64,
    approximation: A,
}

impl<A: VoigtApproximation> Profile for IntergalacticVoigt<A> {
    const PARAMETER_COUNT: usize = 7;

    fn new(q: &[f64]) -> Self {
        let c = q[0] * (1.0 + q[2]) * (1.0 + q[3] / C0);
        Self {
            c,
            a: C1 * q[1] * 10.0_f64.powf(q[5]) * (q[0] * c),
            approximation: A::new(q[4] * c / C0, C2 * q[6] * (q[0] * c)),
        }
    }

    fn evaluate(&self, wavelength: f64) -> f64 {
        self.a * self.approximation.value(wavelength - self.c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::quadrature::integrate;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn pseudo_voigt_has_unit_area() {
        for &(b, d) in &[(1.0, 1.0), (2.0, 0.5), (0.5, 2.0)] {
            let pv = PseudoVoigt::new(b, d);
            let area = integrate(|x| pv.value(x), 2_000.0 * (b + d), 400_000);
            assert!((area - 1.0).abs() < 1.0e-6, "({b}, {d}): area {area}");
        }
    }

    #[test]
    fn pseudo_voigt_gaussian_limit() {
        let b = 1.0;
        let pv = PseudoVoigt::new(b, 1.0e-9 * b);
        let peak = gaussian(0.0, b);

        for i in 0..200 {
            let x = -5.0 + 0.05 * f64::from(i);
            assert!(
                (pv.value(x) - gaussian(x, b)).abs() < 1.0e-6 * peak,
                "x = {x}"
            );
        }
    }

    #[test]
    fn pseudo_voigt_lorentzian_limit() {
        let d = 1.0;
        let pv = PseudoVoigt::new(1.0e-9 * d, d);
        let peak = lorentzian(0.0, d);

        for i in 0..200 {
            let x = -5.0 + 0.05 * f64::from(i);
            assert!(
                (pv.value(x) - lorentzian(x, d)).abs() < 1.0e-6 * peak,
                "x = {x}"
            );
        }
    }

    #[test]
    fn extended_pseudo_voigt_has_unit_area() {
        for &(b, d) in &[(1.0, 1.0), (2.0, 0.5), (0.5, 2.0)] {
            let epv = ExtendedPseudoVoigt::new(b, d);
            let area = integrate(|x| epv.value(x), 2_000.0 * (b + d), 400_000);
            assert!((area - 1.0).abs() < 1.0e-6, "({b}, {d}): area {area}");
        }
    }

    #[test]
    fn extended_pseudo_voigt_pure_limits() {
        let epv = ExtendedPseudoVoigt::new(1.0, 0.0);
        for i in 0..100 {
            let x = -4.0 + 0.08 * f64::from(i);
            assert_abs_diff_eq!(epv.value(x), gaussian(x, 1.0), epsilon = 1.0e-12);
        }

        let epv = ExtendedPseudoVoigt::new(0.0, 1.0);
        for i in 0..100 {
            let x = -4.0 + 0.08 * f64::from(i);
            assert_abs_diff_eq!(epv.value(x), lorentzian(x, 1.0), epsilon = 1.0e-12);
        }
    }

    #[test]
    fn mixing_polynomials_match_tabulated_values() {
        // Endpoint values follow directly from the published coefficients.
        assert_relative_eq!(poly_w_g(0.0), 1.0);
        assert_relative_eq!(poly_w_g(1.0), 0.65503, epsilon = 1.0e-10);
        assert_relative_eq!(poly_w_l(0.0), 1.42179, epsilon = 1.0e-10);
        assert_relative_eq!(poly_w_l(1.0), 1.0);
        assert_relative_eq!(poly_w_i(0.0), 1.19913);
        assert_relative_eq!(poly_w_p(0.0), 1.10186);
        assert_relative_eq!(poly_eta_l(0.0), 0.0);
        assert_relative_eq!(poly_eta_l(1.0), 1.0);
        assert_relative_eq!(poly_eta_i(0.0), 0.0);
        assert_relative_eq!(poly_eta_i(1.0), 0.0);
        assert_relative_eq!(poly_eta_p(0.0), 0.0);
        assert_relative_eq!(poly_eta_p(1.0), 0.0);
    }

    #[test]
    fn voigt_profile_with_negligible_damping_is_gaussian() {
        let q = [1215.67, 0.4164, 2.0, 0.0, 25.0, 13.5, 1.0e-3];
        let voigt = IntergalacticVoigt::<PseudoVoigt>::new(&q);

        let c = 1215.67 * 3.0;
        let b = 25.0 * c / C0;
        let a = C1 * 0.4164 * 10.0_f64.powf(13.5) * (1215.67 * c);
        let peak = a * gaussian(0.0, b);

        for i in 0..100 {
            let x = c - 2.0 * b + 0.04 * b * f64::from(i);
            assert!(
                (voigt.evaluate(x) - a * gaussian(x - c, b)).abs() < 1.0e-6 * peak,
                "x = {x}"
            );
        }
    }
}
