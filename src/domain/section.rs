//! A contiguous spectral section.
//!
//! The forward model of a section, given a line superposition `S` and a
//! resolving power `R`:
//!
//! 1. optical depth `tau(lambda) = S(lambda)`
//! 2. apparent absorption `A = exp(-tau)`
//! 3. convolution of `A` with the instrument response, a Gaussian whose
//!    FWHM is `lambda / R`, evaluated numerically over the sample grid
//!    and truncated at four standard deviations
//! 4. a weighted Legendre continuum fit to the ratio `flux / convolved`
//! 5. model flux `m_i = continuum(xi_i) * convolved_i`
//! 6. cost `chi^2 = sum_i ((f_i - m_i) / sigma_i)^2` over masked-in points
//!
//! The section is immutable after loading except for the fitted continuum
//! coefficients, the model flux, and the cached cost, which are written
//! only by [`Section::apply`].

use crate::error::AppError;
use crate::math::legendre;
use crate::math::sq;

/// The instrument FWHM in units of the Gaussian standard deviation.
const FWHM_PER_SIGMA: f64 = 2.354_820_045_030_949_3; // 2 sqrt(2 ln 2)

/// The kernel truncation (standard deviations).
const KERNEL_TRUNCATION: f64 = 4.0;

/// One observed sample with its fitted model value.
#[derive(Debug, Clone, Copy)]
pub struct SampleRow {
    pub wavelength: f64,
    pub flux: f64,
    pub noise: f64,
    pub valid: bool,
    pub model: f64,
}

/// A contiguous spectral window with observed flux data.
#[derive(Debug, Clone)]
pub struct Section {
    wl_lo: f64,
    wl_hi: f64,
    wavelengths: Vec<f64>,
    fluxes: Vec<f64>,
    noise: Vec<f64>,
    valid: Vec<bool>,
    continuum: Vec<f64>,
    model_flux: Vec<f64>,
    cost: f64,
}

impl Section {
    /// Creates a new section from observed samples `(wavelength, flux,
    /// noise)` restricted to `[wl_lo, wl_hi]`. Samples outside the window,
    /// with non-positive noise, or with non-finite values are masked out.
    /// The samples are sorted by wavelength.
    pub fn new(wl_lo: f64, wl_hi: f64, samples: &[(f64, f64, f64)]) -> Result<Self, AppError> {
        let (wl_lo, wl_hi) = if wl_lo <= wl_hi {
            (wl_lo, wl_hi)
        } else {
            (wl_hi, wl_lo)
        };

        let mut sorted: Vec<(f64, f64, f64)> = samples.to_vec();
        sorted.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        let n = sorted.len();
        let mut wavelengths = Vec::with_capacity(n);
        let mut fluxes = Vec::with_capacity(n);
        let mut noise = Vec::with_capacity(n);
        let mut valid = Vec::with_capacity(n);

        for &(x, f, s) in &sorted {
            let ok = x.is_finite()
                && f.is_finite()
                && s.is_finite()
                && s > 0.0
                && (wl_lo..=wl_hi).contains(&x);
            wavelengths.push(x);
            fluxes.push(f);
            noise.push(s);
            valid.push(ok);
        }

        let section = Self {
            wl_lo,
            wl_hi,
            wavelengths,
            fluxes,
            noise,
            valid,
            continuum: Vec::new(),
            model_flux: Vec::new(),
            cost: 0.0,
        };

        if section.valid_data_count() == 0 {
            return Err(AppError::invalid_argument(format!(
                "especia: Error: no valid data points in [{wl_lo}, {wl_hi}]"
            )));
        }

        Ok(section)
    }

    /// Adds `[a, b]` to the user exclusion mask.
    pub fn mask(&mut self, a: f64, b: f64) {
        let (a, b) = if a <= b { (a, b) } else { (b, a) };
        for (i, &x) in self.wavelengths.iter().enumerate() {
            if (a..=b).contains(&x) {
                self.valid[i] = false;
            }
        }
    }

    pub fn lower_bound(&self) -> f64 {
        self.wl_lo
    }

    pub fn upper_bound(&self) -> f64 {
        self.wl_hi
    }

    /// The number of masked-in data points.
    pub fn valid_data_count(&self) -> usize {
        self.valid.iter().filter(|&&ok| ok).count()
    }

    /// The cost cached by the last [`Section::apply`].
    pub fn stored_cost(&self) -> f64 {
        self.cost
    }

    /// The continuum coefficients stored by the last [`Section::apply`].
    pub fn continuum_coefficients(&self) -> &[f64] {
        &self.continuum
    }

    /// The samples with their fitted model values (zero before
    /// [`Section::apply`]).
    pub fn rows(&self) -> impl Iterator<Item = SampleRow> + '_ {
        (0..self.wavelengths.len()).map(|i| SampleRow {
            wavelength: self.wavelengths[i],
            flux: self.fluxes[i],
            noise: self.noise[i],
            valid: self.valid[i],
            model: self.model_flux.get(i).copied().unwrap_or(0.0),
        })
    }

    /// Returns the section cost for the given line superposition,
    /// resolving power (units of 1E+03), and continuum order, without
    /// storing anything. Degenerate inputs yield an infinite cost.
    pub fn cost<S: Fn(f64) -> f64>(&self, superposition: S, resolution: f64, p: usize) -> f64 {
        match self.evaluate(superposition, resolution, p) {
            Some((_, _, cost)) => cost,
            None => f64::INFINITY,
        }
    }

    /// Evaluates the forward model and stores the fitted continuum, model
    /// flux, and cost.
    pub fn apply<S: Fn(f64) -> f64>(
        &mut self,
        superposition: S,
        resolution: f64,
        p: usize,
    ) -> Result<(), AppError> {
        let (continuum, model_flux, cost) = self
            .evaluate(superposition, resolution, p)
            .ok_or_else(|| {
                AppError::numeric(format!(
                    "especia: Error: the forward model is degenerate in [{}, {}]",
                    self.wl_lo, self.wl_hi
                ))
            })?;

        self.continuum = continuum;
        self.model_flux = model_flux;
        self.cost = cost;

        Ok(())
    }

    fn evaluate<S: Fn(f64) -> f64>(
        &self,
        superposition: S,
        resolution: f64,
        p: usize,
    ) -> Option<(Vec<f64>, Vec<f64>, f64)> {
        if !(resolution.is_finite() && resolution > 0.0) || p == 0 {
            return None;
        }

        let n = self.wavelengths.len();

        // Apparent absorption at every sample, masked or not. Masked-out
        // samples still contribute to the convolution sums of their
        // neighbours.
        let mut absorption = Vec::with_capacity(n);
        for &x in &self.wavelengths {
            let tau = superposition(x);
            if !tau.is_finite() {
                return None;
            }
            absorption.push((-tau).exp());
        }

        let convolved = self.convolve(&absorption, resolution)?;

        // Continuum fit on the normalised abscissa.
        let center = 0.5 * (self.wl_lo + self.wl_hi);
        let scale = 2.0 / (self.wl_hi - self.wl_lo);

        let mut xi = Vec::new();
        let mut ratio = Vec::new();
        let mut weight = Vec::new();

        for i in 0..n {
            if self.valid[i] {
                xi.push(scale * (self.wavelengths[i] - center));
                ratio.push(self.fluxes[i] / convolved[i]);
                weight.push(1.0 / sq(self.noise[i]));
            }
        }

        let coefficients = legendre::fit_weighted(&xi, &ratio, &weight, p)?;

        let mut model_flux = Vec::with_capacity(n);
        let mut cost = 0.0;

        for i in 0..n {
            let x = scale * (self.wavelengths[i] - center);
            let m = legendre::evaluate(&coefficients, x) * convolved[i];
            model_flux.push(m);

            if self.valid[i] {
                cost += sq((self.fluxes[i] - m) / self.noise[i]);
            }
        }

        if !cost.is_finite() {
            return None;
        }

        Some((coefficients, model_flux, cost))
    }

    /// Convolves `values` with the instrument response on the sample grid.
    /// The kernel is a Gaussian with FWHM `lambda / R` where `R` is
    /// `resolution * 1E+03`, truncated at four standard deviations, and
    /// normalised by the discrete kernel sum.
    fn convolve(&self, values: &[f64], resolution: f64) -> Option<Vec<f64>> {
        let n = self.wavelengths.len();
        let mut out = Vec::with_capacity(n);

        for i in 0..n {
            let x = self.wavelengths[i];
            let sigma = x / (1.0E+03 * resolution) / FWHM_PER_SIGMA;
            if !(sigma.is_finite() && sigma > 0.0) {
                return None;
            }
            let reach = KERNEL_TRUNCATION * sigma;

            let lo = self.wavelengths.partition_point(|&w| w < x - reach);
            let hi = self.wavelengths.partition_point(|&w| w <= x + reach);

            let mut num = 0.0;
            let mut den = 0.0;
            for j in lo..hi {
                let k = (-0.5 * sq((self.wavelengths[j] - x) / sigma)).exp();
                num += k * values[j];
                den += k;
            }

            if den == 0.0 {
                return None;
            }
            out.push(num / den);
        }

        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{IntergalacticDoppler, Superposition};
    use approx::assert_relative_eq;

    fn grid(lo: f64, hi: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| lo + (hi - lo) * i as f64 / (n - 1) as f64)
            .collect()
    }

    #[test]
    fn flat_spectrum_fits_a_constant_continuum() {
        let samples: Vec<(f64, f64, f64)> =
            grid(4_000.0, 4_010.0, 101).iter().map(|&x| (x, 2.5, 0.01)).collect();
        let mut section = Section::new(4_000.0, 4_010.0, &samples).unwrap();

        section.apply(|_| 0.0, 50.0, 1).unwrap();

        assert_relative_eq!(section.continuum_coefficients()[0], 2.5, epsilon = 1.0e-10);
        assert!(section.stored_cost() < 1.0e-16);
    }

    #[test]
    fn sloped_continuum_is_recovered() {
        let lo = 4_000.0;
        let hi = 4_010.0;
        let samples: Vec<(f64, f64, f64)> = grid(lo, hi, 101)
            .iter()
            .map(|&x| {
                let xi = (2.0 * x - (lo + hi)) / (hi - lo);
                (x, 2.0 + 0.5 * xi, 0.01)
            })
            .collect();
        let mut section = Section::new(lo, hi, &samples).unwrap();

        section.apply(|_| 0.0, 50.0, 2).unwrap();

        let a = section.continuum_coefficients();
        assert_relative_eq!(a[0], 2.0, epsilon = 1.0e-8);
        assert_relative_eq!(a[1], 0.5, epsilon = 1.0e-8);
        assert!(section.stored_cost() < 1.0e-12);
    }

    #[test]
    fn exact_absorption_model_has_negligible_cost() {
        // Data generated from the forward model itself, with a resolving
        // power so high that the convolution kernel collapses to the
        // sample itself.
        let q = [1215.67, 0.4164, 2.29, 0.0, 25.0, 13.2];
        let sp = Superposition::<IntergalacticDoppler>::new(1, &q);
        let lo = 3_995.0;
        let hi = 4_005.0;

        let samples: Vec<(f64, f64, f64)> = grid(lo, hi, 201)
            .iter()
            .map(|&x| (x, (-sp.value(x)).exp(), 0.01))
            .collect();
        let mut section = Section::new(lo, hi, &samples).unwrap();

        section.apply(|x| sp.value(x), 1.0e6, 1).unwrap();

        assert_relative_eq!(section.continuum_coefficients()[0], 1.0, epsilon = 1.0e-6);
        assert!(section.stored_cost() < 1.0e-10, "{}", section.stored_cost());
    }

    #[test]
    fn masked_points_do_not_contribute() {
        let samples: Vec<(f64, f64, f64)> = grid(4_000.0, 4_010.0, 101)
            .iter()
            .map(|&x| {
                let f = if (4_004.0..=4_006.0).contains(&x) { 99.0 } else { 2.5 };
                (x, f, 0.01)
            })
            .collect();
        let mut section = Section::new(4_000.0, 4_010.0, &samples).unwrap();

        let polluted = section.cost(|_| 0.0, 50.0, 1);
        section.mask(4_004.0, 4_006.0);
        let masked = section.cost(|_| 0.0, 50.0, 1);

        assert!(polluted > 1.0);
        assert!(masked < 1.0e-16, "{masked}");
        assert_eq!(section.valid_data_count(), 101 - 21);
    }

    #[test]
    fn convolution_smears_a_narrow_line() {
        let q = [1215.67, 0.4164, 2.29, 0.0, 5.0, 13.0];
        let sp = Superposition::<IntergalacticDoppler>::new(1, &q);
        let lo = 3_995.0;
        let hi = 4_005.0;

        let samples: Vec<(f64, f64, f64)> = grid(lo, hi, 401)
            .iter()
            .map(|&x| (x, 1.0, 0.01))
            .collect();
        let section = Section::new(lo, hi, &samples).unwrap();

        // Lowering the resolving power broadens the response and reduces
        // the model's line depth, so the cost against an unabsorbed
        // spectrum shrinks.
        let sharp = section.cost(|x| sp.value(x), 1.0e3, 1);
        let smeared = section.cost(|x| sp.value(x), 10.0, 1);

        assert!(sharp > smeared, "sharp {sharp} smeared {smeared}");
    }

    #[test]
    fn degenerate_resolution_is_an_infinite_cost() {
        let samples: Vec<(f64, f64, f64)> =
            grid(4_000.0, 4_010.0, 11).iter().map(|&x| (x, 1.0, 0.01)).collect();
        let section = Section::new(4_000.0, 4_010.0, &samples).unwrap();

        assert!(section.cost(|_| 0.0, 0.0, 1).is_infinite());
        assert!(section.cost(|_| 0.0, -5.0, 1).is_infinite());
    }

    #[test]
    fn out_of_window_samples_are_masked() {
        let samples = [
            (3_999.0, 1.0, 0.01),
            (4_001.0, 1.0, 0.01),
            (4_002.0, 1.0, -1.0),
            (4_003.0, 1.0, 0.01),
            (4_011.0, 1.0, 0.01),
        ];
        let section = Section::new(4_000.0, 4_010.0, &samples).unwrap();

        assert_eq!(section.valid_data_count(), 2);
    }

    #[test]
    fn window_without_data_is_rejected() {
        let samples = [(3_999.0, 1.0, 0.01)];
        assert!(Section::new(4_000.0, 4_010.0, &samples).is_err());
    }
}
