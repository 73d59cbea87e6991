//! Command-line parsing.
//!
//! The driver takes exactly seven positional arguments; the model
//! definition is read from standard input and the report is written to
//! standard output:
//!
//! ```text
//! especia SEED PARENTS POPULATION STEP ACCURACY STOP TRACE < model.in > report.html
//! ```
//!
//! Invocation with no arguments prints the usage message and exits
//! successfully; any other arity is an invalid-argument error.

use clap::Parser;

use crate::error::AppError;

/// The optimization run configuration.
#[derive(Debug, Parser)]
#[command(
    name = "especia",
    about = "Evolutionary spectrum inversion and analysis",
    version
)]
pub struct Cli {
    /// The random seed.
    #[arg(value_name = "RANDOM_SEED")]
    pub random_seed: u64,

    /// The parent number.
    #[arg(value_name = "PARENT_NUMBER")]
    pub parent_number: usize,

    /// The population size.
    #[arg(value_name = "POPULATION_SIZE")]
    pub population_size: usize,

    /// The initial global step size.
    #[arg(value_name = "GLOBAL_STEP_SIZE")]
    pub global_step_size: f64,

    /// The accuracy goal.
    #[arg(value_name = "ACCURACY_GOAL")]
    pub accuracy_goal: f64,

    /// The stop generation number.
    #[arg(value_name = "STOP_GENERATION")]
    pub stop_generation: u64,

    /// The trace modulus (zero disables tracing).
    #[arg(value_name = "TRACE_MODULUS")]
    pub trace_modulus: u64,
}

impl Cli {
    /// Parses the command line; the first element is the program name.
    pub fn parse_args(args: &[String]) -> Result<Self, AppError> {
        let cli = Self::try_parse_from(args)
            .map_err(|err| AppError::invalid_argument(err.to_string()))?;

        if !(cli.global_step_size.is_finite() && cli.global_step_size > 0.0) {
            return Err(AppError::invalid_argument(
                "especia: Error: the global step size must be positive",
            ));
        }

        Ok(cli)
    }
}

/// The usage message printed when no arguments are supplied.
pub fn usage(program: &str) -> String {
    format!(
        "usage: {program} RANDOM_SEED PARENT_NUMBER POPULATION_SIZE GLOBAL_STEP_SIZE \
         ACCURACY_GOAL STOP_GENERATION TRACE_MODULUS < ISTREAM > OSTREAM\n"
    )
}
