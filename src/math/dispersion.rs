//! Dispersion formulas for air/vacuum wavelength conversion.
//!
//! All formulas operate on wavenumber `x = 10 / wavelength(Angstrom)` in
//! units of nm-1 and map a vacuum wavenumber to the corresponding standard
//! air wavenumber. The inverse direction (air to vacuum) solves the forward
//! formula by Newton's method.
//!
//! Further reading:
//!
//! - K. P. Birch and M. J. Downs (1994). *Correction to the Updated Edlen
//!   Equation for the Refractive Index of Air.* Metrologia, 31, 4, 315.
//! - B. Edlen (1953). *The dispersion of standard air.* J. Opt. Soc. Am.,
//!   43, 5, 339.
//! - B. Edlen (1966). *The refractive index of air.* Metrologia, 2, 2, 71.

use crate::error::AppError;
use crate::math::sq;

/// A vacuum-to-air dispersion formula acting on wavenumber (nm-1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Formula {
    Birch1994,
    Edlen1953,
    Edlen1966,
}

impl Formula {
    /// Converts a vacuum wavenumber (nm-1) into an air wavenumber (nm-1).
    pub fn vacuum_to_air(self, x: f64) -> f64 {
        match self {
            Formula::Birch1994 => {
                (1.0 + 8.34254E-05
                    + 2.406147E-08 / (130.0E-06 - x * x)
                    + 1.5998E-10 / (38.9E-06 - x * x))
                    * x
            }
            Formula::Edlen1953 => {
                (1.0 + 6.43280E-05
                    + 2.5540E-10 / (0.0000410 - x * x)
                    + 2.949810E-08 / (0.000146 - x * x))
                    * x
            }
            Formula::Edlen1966 => {
                (1.0 + 8.34213E-05
                    + 1.5997E-10 / (0.0000389 - x * x)
                    + 2.406030E-08 / (0.000130 - x * x))
                    * x
            }
        }
    }

    /// The derivative of [`Formula::vacuum_to_air`] with respect to `x`.
    fn derivative(self, x: f64) -> f64 {
        let (c0, d1, e1, d2, e2) = match self {
            Formula::Birch1994 => (8.34254E-05, 2.406147E-08, 130.0E-06, 1.5998E-10, 38.9E-06),
            Formula::Edlen1953 => (6.43280E-05, 2.5540E-10, 0.0000410, 2.949810E-08, 0.000146),
            Formula::Edlen1966 => (8.34213E-05, 1.5997E-10, 0.0000389, 2.406030E-08, 0.000130),
        };

        1.0 + c0
            + d1 / (e1 - x * x)
            + pole_derivative(d1, e1, x)
            + d2 / (e2 - x * x)
            + pole_derivative(d2, e2, x)
    }

    /// Converts an air wavenumber (nm-1) back into a vacuum wavenumber by
    /// Newton's method.
    pub fn air_to_vacuum(self, y: f64) -> Result<f64, AppError> {
        let mut x = y;

        for _ in 0..100 {
            let f = self.vacuum_to_air(x) - y;
            let d = self.derivative(x);

            if d == 0.0 || !d.is_finite() {
                break;
            }

            let step = f / d;
            x -= step;

            if step.abs() < 1.0e-15 * x.abs() {
                return Ok(x);
            }
        }

        Err(AppError::numeric(format!(
            "especia: Error: the inversion of the dispersion formula did not converge for {y}"
        )))
    }
}

fn pole_derivative(d: f64, e: f64, x: f64) -> f64 {
    2.0 * d * x * x / sq(e - x * x)
}

/// Converts a vacuum wavelength (Angstrom) into an air wavelength.
pub fn vacuum_to_air_wavelength(formula: Formula, wavelength: f64) -> f64 {
    10.0 / formula.vacuum_to_air(10.0 / wavelength)
}

/// Converts an air wavelength (Angstrom) into a vacuum wavelength.
pub fn air_to_vacuum_wavelength(formula: Formula, wavelength: f64) -> Result<f64, AppError> {
    Ok(10.0 / formula.air_to_vacuum(10.0 / wavelength)?)
}
