//! Doppler profiles for intergalactic absorption lines.

use crate::math::constants::{
    ELECTRIC_CONSTANT, ELECTRON_MASS, ELEMENTARY_CHARGE, MICRO, SPEED_OF_LIGHT,
};

use super::{gaussian, truncate, Profile};

/// The speed of light (km s-1).
const C0: f64 = 1.0E-03 * SPEED_OF_LIGHT;

/// The amplitude factor relating oscillator strength, column density, and
/// wavelength (Angstrom, cm-2) to optical depth.
const C1: f64 = 1.0E-06 * ELEMENTARY_CHARGE * ELEMENTARY_CHARGE
    / (4.0 * ELECTRIC_CONSTANT * ELECTRON_MASS * SPEED_OF_LIGHT * SPEED_OF_LIGHT);

/// The Doppler profile to model intergalactic absorption lines.
///
/// Parameters (in positional order):
///
/// - `q[0]` the rest wavelength (Angstrom)
/// - `q[1]` the oscillator strength
/// - `q[2]` the cosmological redshift
/// - `q[3]` the radial velocity (km s-1)
/// - `q[4]` the line broadening velocity (km s-1)
/// - `q[5]` the decadic logarithm of the particle column number density (cm-2)
#[derive(Debug)]
pub struct IntergalacticDoppler {
    /// The central wavelength (Angstrom).
    c: f64,
    /// The Doppler width (Angstrom).
    b: f64,
    /// The amplitude.
    a: f64,
}

impl Profile for IntergalacticDoppler {
    const PARAMETER_COUNT: usize = 6;

    fn new(q: &[f64]) -> Self {
        let c = q[0] * (1.0 + q[2]) * (1.0 + q[3] / C0);
        Self {
            c,
            b: q[4] * c / C0,
            a: C1 * q[1] * 10.0_f64.powf(q[5]) * (q[0] * c),
        }
    }

    fn evaluate(&self, wavelength: f64) -> f64 {
        self.a * truncate(gaussian, wavelength - self.c, self.b, 4.0)
    }
}

/// The Doppler profile to infer the variation of the fine-structure
/// constant by means of a many-multiplet analysis.
///
/// Parameters `q[0]` to `q[5]` as for [`IntergalacticDoppler`], plus:
///
/// - `q[6]` the relativistic correction coefficient
/// - `q[7]` the variation of the fine-structure constant (1E-6)
///
/// Further reading:
///
/// R. Quast, D. Reimers and S. A. Levshakov (2004).
///   *Probing the variability of the fine-structure constant with the
///   VLT/UVES.* Astronomy and Astrophysics, 415, L7.
#[derive(Debug)]
pub struct ManyMultiplet {
    /// The central wavelength (Angstrom).
    c: f64,
    /// The Doppler width (Angstrom).
    b: f64,
    /// The amplitude.
    a: f64,
}

impl Profile for ManyMultiplet {
    const PARAMETER_COUNT: usize = 8;
    const HAS_ALPHA_VARIATION: bool = true;

    fn new(q: &[f64]) -> Self {
        // The rest wavelength modified by the relativistic correction.
        let u = 1.0E+08 / (1.0E+08 / q[0] + q[6] * (q[7] * MICRO) * (q[7] * MICRO + 2.0));
        let c = u * (1.0 + q[2]) * (1.0 + q[3] / C0);
        Self {
            c,
            b: q[4] * c / C0,
            a: C1 * q[1] * 10.0_f64.powf(q[5]) * (u * c),
        }
    }

    fn evaluate(&self, wavelength: f64) -> f64 {
        self.a * truncate(gaussian, wavelength - self.c, self.b, 4.0)
    }
}
