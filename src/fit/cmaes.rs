//! The covariance matrix adaption evolution strategy (CMA-ES).
//!
//! Further reading:
//!
//! N. Hansen, S. D. Mueller, P. Koumoutsakos (2003).
//!   *Reducing the Time Complexity of the Derandomized Evolution Strategy
//!   with Covariance Matrix Adaption (CMA-ES).*
//!   Evolutionary Computation, 11, 1, ISSN 1063-6560.
//!
//! N. Hansen, A. Ostermeier (2001).
//!   *Completely Derandomized Self-Adaption in Evolution Strategies.*
//!   Evolutionary Computation, 9, 159, ISSN 1063-6560.
//!
//! Candidate sampling is sequential so that a given random seed yields a
//! deterministic run; fitness evaluations within a generation are
//! independent and run in parallel, and the subsequent ranking breaks ties
//! on the sample index, so parallelism cannot perturb the result.

use std::io::Write;

use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;

use crate::error::AppError;
use crate::math::rng::{Mt19937_64, NormalDeviate};
use crate::math::{sq, EigenSolver};

/// Candidates violating the constraint are redrawn at most this many times
/// before the violation is accepted and left to the penalty.
const RETRY_LIMIT: usize = 100;

/// A constraint on the parameter space. The penalty is a first-class
/// extension point: it must be nonnegative and zero inside the feasible
/// set.
pub trait Constraint: Sync {
    /// Tests if a parameter vector violates the constraint.
    fn is_violated(&self, x: &[f64]) -> bool;

    /// The cost penalty associated with the constraint.
    fn cost(&self, x: &[f64]) -> f64;
}

/// No constraint.
pub struct NoConstraint;

impl Constraint for NoConstraint {
    fn is_violated(&self, _x: &[f64]) -> bool {
        false
    }

    fn cost(&self, _x: &[f64]) -> f64 {
        0.0
    }
}

/// A strict-bound prior constraint with a zero penalty; infeasible
/// candidates are handled by redrawing.
pub struct BoundedConstraint {
    lower: Vec<f64>,
    upper: Vec<f64>,
}

impl BoundedConstraint {
    /// Creates a new box constraint.
    ///
    /// # Panics
    /// Panics if the bound vectors differ in length.
    pub fn new(lower: Vec<f64>, upper: Vec<f64>) -> Self {
        assert_eq!(lower.len(), upper.len());
        Self { lower, upper }
    }
}

impl Constraint for BoundedConstraint {
    fn is_violated(&self, x: &[f64]) -> bool {
        x.iter()
            .zip(self.lower.iter().zip(self.upper.iter()))
            .any(|(&x, (&lo, &up))| x < lo || x > up)
    }

    fn cost(&self, _x: &[f64]) -> f64 {
        0.0
    }
}

/// Traces optimizer state information.
pub trait Tracer {
    /// Tests if tracing is enabled for generation `g`.
    fn is_enabled(&self, g: u64) -> bool;

    /// Traces the generation number, the best fitness, and the minimum and
    /// maximum mutation step sizes.
    fn trace(&mut self, g: u64, y: f64, min_step: f64, max_step: f64);
}

/// No tracing.
pub struct NoTracing;

impl Tracer for NoTracing {
    fn is_enabled(&self, _g: u64) -> bool {
        false
    }

    fn trace(&mut self, _g: u64, _y: f64, _min_step: f64, _max_step: f64) {}
}

/// Traces state information to an output stream, every `modulus`
/// generations.
pub struct StreamTracer<W: Write> {
    out: W,
    modulus: u64,
}

impl<W: Write> StreamTracer<W> {
    pub fn new(out: W, modulus: u64) -> Self {
        Self { out, modulus }
    }
}

impl<W: Write> Tracer for StreamTracer<W> {
    fn is_enabled(&self, g: u64) -> bool {
        self.modulus > 0 && g % self.modulus == 0
    }

    fn trace(&mut self, g: u64, y: f64, min_step: f64, max_step: f64) {
        let _ = writeln!(self.out, "{g:>8} {y:>12.4e} {min_step:>12.4e} {max_step:>12.4e}");
    }
}

/// The build configuration for an [`Optimizer`].
#[derive(Debug, Clone)]
pub struct Builder {
    problem_dimension: usize,
    parent_number: usize,
    population_size: usize,
    update_modulus: u64,
    accuracy_goal: f64,
    random_seed: u64,
    stop_generation: u64,
}

impl Default for Builder {
    fn default() -> Self {
        Self {
            problem_dimension: 1,
            parent_number: 4,
            population_size: 8,
            update_modulus: 1,
            accuracy_goal: 1.0E-04,
            random_seed: 27_182,
            stop_generation: 1_000,
        }
    }
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the problem dimension.
    pub fn with_problem_dimension(mut self, n: usize) -> Self {
        self.problem_dimension = n;
        self
    }

    /// Configures the parent number. A conventional choice is half the
    /// population size.
    pub fn with_parent_number(mut self, parent_number: usize) -> Self {
        self.parent_number = parent_number;
        self
    }

    /// Configures the population size. A conventional choice is
    /// `4 + floor(3 ln n)`.
    pub fn with_population_size(mut self, population_size: usize) -> Self {
        self.population_size = population_size;
        self
    }

    /// Configures the covariance matrix update modulus.
    pub fn with_covariance_update_modulus(mut self, update_modulus: u64) -> Self {
        self.update_modulus = update_modulus;
        self
    }

    /// Configures the accuracy goal.
    pub fn with_accuracy_goal(mut self, accuracy_goal: f64) -> Self {
        self.accuracy_goal = accuracy_goal;
        self
    }

    /// Configures the random seed.
    pub fn with_random_seed(mut self, random_seed: u64) -> Self {
        self.random_seed = random_seed;
        self
    }

    /// Configures the stop generation.
    pub fn with_stop_generation(mut self, stop_generation: u64) -> Self {
        self.stop_generation = stop_generation;
        self
    }

    /// Builds a new optimizer, deriving the strategy parameters.
    pub fn build(self) -> Result<Optimizer, AppError> {
        let n = self.problem_dimension;
        let mu = self.parent_number;
        let lambda = self.population_size;

        if n < 1 {
            return Err(AppError::invalid_argument(
                "especia: Error: the problem dimension must be positive",
            ));
        }
        if mu < 1 || lambda < 2 || mu > lambda {
            return Err(AppError::invalid_argument(format!(
                "especia: Error: invalid parent number ({mu}) or population size ({lambda})"
            )));
        }
        if !(self.accuracy_goal.is_finite() && self.accuracy_goal > 0.0) {
            return Err(AppError::invalid_argument(
                "especia: Error: the accuracy goal must be positive",
            ));
        }
        if self.update_modulus < 1 {
            return Err(AppError::invalid_argument(
                "especia: Error: the covariance update modulus must be positive",
            ));
        }

        // Recombination weights w_i = ln((mu + 1) / i), normalised to unit
        // sum, and their effective variance.
        let mut weights: Vec<f64> = (1..=mu)
            .map(|i| ((mu as f64 + 1.0) / i as f64).ln())
            .collect();
        let sum: f64 = weights.iter().sum();
        for w in &mut weights {
            *w /= sum;
        }
        let mutation_variance = 1.0 / weights.iter().map(|&w| w * w).sum::<f64>();

        let nf = n as f64;
        let mw = mutation_variance;

        let cs = (mw + 2.0) / (nf + mw + 3.0);
        let cc = 4.0 / (nf + 4.0);
        let acov = 1.0 / mw;
        let ccov = 2.0 / (sq(nf + std::f64::consts::SQRT_2) * mw)
            + (1.0 - acov) * f64::min(1.0, (2.0 * mw - 1.0) / (sq(nf + 2.0) + mw));
        let step_size_damping = 1.0
            + 2.0 * f64::max(0.0, ((mw - 1.0) / (nf + 1.0)).sqrt() - 1.0)
            + cs;

        Ok(Optimizer {
            config: self,
            weights,
            mutation_variance,
            cs,
            cc,
            ccov,
            acov,
            step_size_damping,
        })
    }
}

/// The optimization result.
#[derive(Debug, Clone)]
pub struct Optimum {
    /// The optimized parameter values (the final distribution mean).
    pub x: Vec<f64>,
    /// The final local step sizes (eigenvalue square roots).
    pub d: Vec<f64>,
    /// The final global step size.
    pub s: f64,
    /// The parameter uncertainties (zero unless optimized).
    pub z: Vec<f64>,
    /// The optimized fitness.
    pub y: f64,
    /// The final covariance matrix.
    pub c: DMatrix<f64>,
    /// The final rotation matrix.
    pub b: DMatrix<f64>,
    /// The distribution cumulation path.
    pub pc: Vec<f64>,
    /// The step size cumulation path.
    pub ps: Vec<f64>,
    /// The final generation number.
    pub g: u64,
    /// Whether the accuracy goal was reached before the stop generation.
    pub optimized: bool,
    /// Whether the mutation variance underflowed (fatal).
    pub underflow: bool,
}

/// An optimizer based on the CMA-ES developed by Hansen and Ostermeier
/// (2001). Owns its random number generator and eigensolver for the whole
/// run.
pub struct Optimizer {
    config: Builder,
    weights: Vec<f64>,
    mutation_variance: f64,
    cs: f64,
    cc: f64,
    ccov: f64,
    acov: f64,
    step_size_damping: f64,
}

impl Optimizer {
    pub fn builder() -> Builder {
        Builder::new()
    }

    /// Minimizes an objective function, starting from the parameter values
    /// `x`, the local step sizes `d`, and the global step size `s`.
    pub fn minimize<F, C, T>(
        &self,
        f: &F,
        x: &[f64],
        d: &[f64],
        s: f64,
        constraint: &C,
        tracer: &mut T,
    ) -> Result<Optimum, AppError>
    where
        F: Fn(&[f64]) -> f64 + Sync,
        C: Constraint,
        T: Tracer,
    {
        self.optimize(f, x, d, s, constraint, tracer, |a, b| a < b)
    }

    /// Maximizes an objective function.
    pub fn maximize<F, C, T>(
        &self,
        f: &F,
        x: &[f64],
        d: &[f64],
        s: f64,
        constraint: &C,
        tracer: &mut T,
    ) -> Result<Optimum, AppError>
    where
        F: Fn(&[f64]) -> f64 + Sync,
        C: Constraint,
        T: Tracer,
    {
        self.optimize(f, x, d, s, constraint, tracer, |a, b| a > b)
    }

    #[allow(clippy::too_many_arguments)]
    fn optimize<F, C, T, Compare>(
        &self,
        f: &F,
        x: &[f64],
        d: &[f64],
        s: f64,
        constraint: &C,
        tracer: &mut T,
        compare: Compare,
    ) -> Result<Optimum, AppError>
    where
        F: Fn(&[f64]) -> f64 + Sync,
        C: Constraint,
        T: Tracer,
        Compare: Fn(f64, f64) -> bool,
    {
        let n = self.config.problem_dimension;
        let mu = self.config.parent_number;
        let lambda = self.config.population_size;
        let goal = self.config.accuracy_goal;

        if x.len() != n || d.len() != n {
            return Err(AppError::invalid_argument(format!(
                "especia: Error: expected {n} initial values and step sizes, got {} and {}",
                x.len(),
                d.len()
            )));
        }

        let mut deviate = NormalDeviate::new(Mt19937_64::new(self.config.random_seed));
        let solver = EigenSolver::new(n);

        // The expected norm of an n-dimensional standard-normal vector.
        let nf = n as f64;
        let expected_norm = nf.sqrt() * (1.0 - 1.0 / (4.0 * nf) + 1.0 / (21.0 * nf * nf));

        let mut mean = DVector::from_column_slice(x);
        let mut local = DVector::from_column_slice(d);
        let mut rotation = DMatrix::<f64>::identity(n, n);
        let mut covariance = DMatrix::from_diagonal(&local.map(sq));
        let mut ps = DVector::<f64>::zeros(n);
        let mut pc = DVector::<f64>::zeros(n);
        let mut sigma = s;

        let mut g: u64 = 0;
        let mut optimized = false;
        let mut underflow = false;

        let mut z_samples: Vec<DVector<f64>> = vec![DVector::zeros(n); lambda];
        let mut u_samples: Vec<DVector<f64>> = vec![DVector::zeros(n); lambda];
        let mut candidates: Vec<Vec<f64>> = vec![vec![0.0; n]; lambda];

        while g < self.config.stop_generation && !optimized && !underflow {
            // Sample the new population. The mutation of candidate k is
            // x_k = mean + sigma * B (d o z_k) with z_k standard normal.
            for k in 0..lambda {
                for _retry in 0..=RETRY_LIMIT {
                    let z = DVector::from_fn(n, |_, _| deviate.sample());
                    let u = &rotation * z.component_mul(&local);
                    let candidate: Vec<f64> =
                        (0..n).map(|i| mean[i] + sigma * u[i]).collect();

                    let violated = constraint.is_violated(&candidate);
                    z_samples[k] = z;
                    u_samples[k] = u;
                    candidates[k] = candidate;

                    if !violated {
                        break;
                    }
                }
            }

            // Evaluate the fitness, including the constraint penalty.
            let fitness: Vec<f64> = candidates
                .par_iter()
                .map(|candidate| f(candidate) + constraint.cost(candidate))
                .collect();

            // Rank deterministically on (fitness, sample index).
            let mut order: Vec<usize> = (0..lambda).collect();
            order.sort_by(|&i, &j| {
                if compare(fitness[i], fitness[j]) {
                    std::cmp::Ordering::Less
                } else if compare(fitness[j], fitness[i]) {
                    std::cmp::Ordering::Greater
                } else {
                    i.cmp(&j)
                }
            });

            // Recombine the best parents.
            let mut new_mean = DVector::<f64>::zeros(n);
            let mut zw = DVector::<f64>::zeros(n);
            let mut uw = DVector::<f64>::zeros(n);
            for (i, &w) in self.weights.iter().enumerate() {
                let k = order[i];
                for r in 0..n {
                    new_mean[r] += w * candidates[k][r];
                    zw[r] += w * z_samples[k][r];
                    uw[r] += w * u_samples[k][r];
                }
            }

            // Cumulate the step-size path in the isotropic frame.
            let cs_norm = (self.cs * (2.0 - self.cs) * self.mutation_variance).sqrt();
            ps = &ps * (1.0 - self.cs) + (&rotation * &zw) * cs_norm;
            let ps_norm = ps.norm();

            let stall = ps_norm >= (1.4 + 2.0 / (nf + 1.0)) * expected_norm;

            // Cumulate the distribution path.
            let cc_norm = (self.cc * (2.0 - self.cc) * self.mutation_variance).sqrt();
            let cc_gain = if stall { 0.0 } else { cc_norm };
            pc = &pc * (1.0 - self.cc) + &uw * cc_gain;

            // Adapt the covariance matrix: rank-one from the distribution
            // path plus rank-mu from the parents.
            let mut rank_mu = DMatrix::<f64>::zeros(n, n);
            for (i, &w) in self.weights.iter().enumerate() {
                let u = &u_samples[order[i]];
                rank_mu += (u * u.transpose()) * w;
            }
            covariance = covariance * (1.0 - self.ccov)
                + (&pc * pc.transpose()) * (self.ccov * self.acov)
                + rank_mu * (self.ccov * (1.0 - self.acov));
            // Keep the matrix symmetric to working precision.
            for i in 0..n {
                for j in 0..i {
                    let v = 0.5 * (covariance[(i, j)] + covariance[(j, i)]);
                    covariance[(i, j)] = v;
                    covariance[(j, i)] = v;
                }
            }

            // Adapt the global step size.
            sigma *= ((self.cs / self.step_size_damping) * (ps_norm / expected_norm - 1.0)).exp();

            mean = new_mean;
            g += 1;

            // Refresh the mutation basis.
            if g % self.config.update_modulus == 0 {
                let (w, z) = solver.decompose(&covariance)?;

                if w[0] < f64::MIN_POSITIVE {
                    underflow = true;
                } else {
                    local = w.map(f64::sqrt);
                    rotation = z;
                }
            }

            // Completed when the spread of the best mu fitnesses falls
            // below the goal, relative to the best fitness or absolutely
            // at the goal's own scale.
            let best = fitness[order[0]];
            let spread = (fitness[order[mu - 1]] - best).abs();
            optimized = spread <= goal * best.abs() || spread <= sq(goal);

            if tracer.is_enabled(g) {
                let min_step = sigma * local.min();
                let max_step = sigma * local.max();
                tracer.trace(g, best, min_step, max_step);
            }
        }

        let x_final: Vec<f64> = mean.iter().copied().collect();
        let y_final = f(&x_final) + constraint.cost(&x_final);

        // Post-optimization uncertainties from the fitted covariance.
        let z_final: Vec<f64> = if optimized {
            (0..n).map(|i| sigma * covariance[(i, i)].sqrt()).collect()
        } else {
            vec![0.0; n]
        };

        Ok(Optimum {
            x: x_final,
            d: local.iter().copied().collect(),
            s: sigma,
            z: z_final,
            y: y_final,
            c: covariance,
            b: rotation,
            pc: pc.iter().copied().collect(),
            ps: ps.iter().copied().collect(),
            g,
            optimized,
            underflow,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sphere(x: &[f64]) -> f64 {
        x.iter().map(|&x| sq(x)).sum()
    }

    fn cigar(x: &[f64]) -> f64 {
        sq(x[0]) + 1.0E+06 * x[1..].iter().map(|&x| sq(x)).sum::<f64>()
    }

    fn rosenbrock(x: &[f64]) -> f64 {
        (0..x.len() - 1)
            .map(|i| 100.0 * sq(x[i + 1] - sq(x[i])) + sq(1.0 - x[i]))
            .sum()
    }

    fn builder() -> Builder {
        Optimizer::builder()
            .with_problem_dimension(10)
            .with_population_size(40)
            .with_parent_number(10)
            .with_accuracy_goal(1.0E-06)
            .with_random_seed(31_415)
    }

    #[test]
    fn minimize_sphere() {
        let optimizer = builder().with_stop_generation(200).build().unwrap();
        let result = optimizer
            .minimize(&sphere, &[1.0; 10], &[1.0; 10], 1.0, &NoConstraint, &mut NoTracing)
            .unwrap();

        assert!(result.optimized);
        assert!(!result.underflow);
        assert!(result.y.abs() < 1.0E-10, "fitness {}", result.y);
        for (i, &x) in result.x.iter().enumerate() {
            assert!(x.abs() < 1.0E-06, "x[{i}] = {x}");
        }
    }

    #[test]
    fn minimize_cigar() {
        let optimizer = builder().with_stop_generation(400).build().unwrap();
        let result = optimizer
            .minimize(&cigar, &[1.0; 10], &[1.0; 10], 1.0, &NoConstraint, &mut NoTracing)
            .unwrap();

        assert!(result.optimized);
        assert!(!result.underflow);
        assert!(result.y.abs() < 1.0E-10, "fitness {}", result.y);
        for (i, &x) in result.x.iter().enumerate() {
            assert!(x.abs() < 1.0E-06, "x[{i}] = {x}");
        }
    }

    #[test]
    fn minimize_rosenbrock() {
        let optimizer = builder().with_stop_generation(400).build().unwrap();
        let result = optimizer
            .minimize(
                &rosenbrock,
                &[0.0; 10],
                &[1.0; 10],
                0.1,
                &NoConstraint,
                &mut NoTracing,
            )
            .unwrap();

        assert!(result.optimized);
        assert!(!result.underflow);
        assert!(result.y.abs() < 1.0E-10, "fitness {}", result.y);
        for (i, &x) in result.x.iter().enumerate() {
            assert!((x - 1.0).abs() < 1.0E-06, "x[{i}] = {x}");
        }
    }

    #[test]
    fn maximize_inverted_sphere() {
        let optimizer = builder().with_stop_generation(200).build().unwrap();
        let result = optimizer
            .maximize(
                &|x: &[f64]| -sphere(x),
                &[1.0; 10],
                &[1.0; 10],
                1.0,
                &NoConstraint,
                &mut NoTracing,
            )
            .unwrap();

        assert!(result.optimized);
        for (i, &x) in result.x.iter().enumerate() {
            assert!(x.abs() < 1.0E-06, "x[{i}] = {x}");
        }
    }

    #[test]
    fn minimize_sphere_within_bounds() {
        let optimizer = builder().with_stop_generation(200).build().unwrap();
        let constraint = BoundedConstraint::new(vec![-2.0; 10], vec![2.0; 10]);
        let result = optimizer
            .minimize(&sphere, &[1.0; 10], &[1.0; 10], 1.0, &constraint, &mut NoTracing)
            .unwrap();

        assert!(result.optimized);
        assert!(result.y.abs() < 1.0E-10, "fitness {}", result.y);
    }

    #[test]
    fn runs_are_deterministic() {
        let first = builder()
            .with_stop_generation(100)
            .build()
            .unwrap()
            .minimize(&sphere, &[1.0; 10], &[1.0; 10], 1.0, &NoConstraint, &mut NoTracing)
            .unwrap();
        let second = builder()
            .with_stop_generation(100)
            .build()
            .unwrap()
            .minimize(&sphere, &[1.0; 10], &[1.0; 10], 1.0, &NoConstraint, &mut NoTracing)
            .unwrap();

        assert_eq!(first.x, second.x);
        assert_eq!(first.y, second.y);
        assert_eq!(first.g, second.g);
    }

    #[test]
    fn generation_limit_is_not_convergence() {
        let optimizer = builder().with_stop_generation(3).build().unwrap();
        let result = optimizer
            .minimize(&rosenbrock, &[0.0; 10], &[1.0; 10], 0.1, &NoConstraint, &mut NoTracing)
            .unwrap();

        assert!(!result.optimized);
        assert_eq!(result.g, 3);
        assert!(result.z.iter().all(|&z| z == 0.0));
    }

    #[test]
    fn vanishing_mutation_variance_underflows() {
        let optimizer = builder().with_stop_generation(100).build().unwrap();
        let result = optimizer
            .minimize(
                &sphere,
                &[1.0; 10],
                &[1.0E-200; 10],
                1.0E-200,
                &NoConstraint,
                &mut NoTracing,
            )
            .unwrap();

        assert!(result.underflow);
        assert!(!result.optimized);
    }

    #[test]
    fn uncertainties_are_positive_after_convergence() {
        let optimizer = builder().with_stop_generation(200).build().unwrap();
        let result = optimizer
            .minimize(&sphere, &[1.0; 10], &[1.0; 10], 1.0, &NoConstraint, &mut NoTracing)
            .unwrap();

        assert!(result.optimized);
        assert!(result.z.iter().all(|&z| z > 0.0));
    }

    #[test]
    fn builder_rejects_invalid_configurations() {
        assert!(Builder::new().with_problem_dimension(0).build().is_err());
        assert!(Builder::new()
            .with_parent_number(10)
            .with_population_size(5)
            .build()
            .is_err());
        assert!(Builder::new().with_accuracy_goal(0.0).build().is_err());
        assert!(Builder::new().with_covariance_update_modulus(0).build().is_err());
    }

    #[test]
    fn tracer_respects_the_modulus() {
        let tracer = StreamTracer::new(Vec::new(), 7);
        assert!(tracer.is_enabled(7));
        assert!(tracer.is_enabled(14));
        assert!(!tracer.is_enabled(8));

        let silent = StreamTracer::new(Vec::new(), 0);
        assert!(!silent.is_enabled(1));
    }
}
