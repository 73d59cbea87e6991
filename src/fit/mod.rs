//! Nonlinear function optimization by the CMA-ES.

pub mod cmaes;

pub use cmaes::{
    BoundedConstraint, Builder, Constraint, NoConstraint, NoTracing, Optimizer, Optimum,
    StreamTracer, Tracer,
};
