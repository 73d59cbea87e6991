//! `especia` library crate: evolutionary spectrum inversion and analysis.
//!
//! Especia fits parametric models of QSO absorption-line spectra to
//! observed flux data by a global nonlinear least-squares fit, using the
//! covariance matrix adaption evolution strategy (CMA-ES).
//!
//! The binaries are thin wrappers around this library so that:
//!
//! - the optimizer, the model, and the readers are testable without
//!   spawning processes
//! - the profile variants (`especia`, `especid`, `especiv`, `especix`)
//!   share one pipeline

pub mod app;
pub mod cli;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod report;
