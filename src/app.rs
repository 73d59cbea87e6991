//! Run orchestration: parse the command line, read the model from standard
//! input, optimize, and write the report to standard output.
//!
//! The binaries (`especia`, `especid`, `especiv`, `especix`) are thin
//! wrappers around [`run`], each instantiating the pipeline with its line
//! profile.

use std::io::{Read, Write};

use crate::cli::{self, Cli};
use crate::error::AppError;
use crate::fit::{Optimizer, StreamTracer};
use crate::io::read_model;
use crate::models::Profile;
use crate::report;

/// Runs a single optimization with the process arguments and standard
/// streams. Returns the exit code: 0 when converged, 1 when the
/// generation limit was reached.
pub fn run<P: Profile>() -> Result<u8, AppError> {
    let args: Vec<String> = std::env::args().collect();

    if args.len() == 1 {
        print!("{}", cli::usage(&args[0]));
        return Ok(0);
    }

    let mut text = String::new();
    std::io::stdin()
        .read_to_string(&mut text)
        .map_err(|err| AppError::io(format!("especia: Error: reading the model failed: {err}")))?;

    let stdout = std::io::stdout();
    run_with::<P, _>(&args, &text, &mut stdout.lock())
}

/// Runs a single optimization against explicit arguments, model text, and
/// output stream.
pub fn run_with<P: Profile, W: Write>(
    args: &[String],
    model_text: &str,
    out: &mut W,
) -> Result<u8, AppError> {
    let cli = Cli::parse_args(args)?;

    let mut model = read_model::<P>(model_text)?;

    let dimension = model.parameter_count();
    if dimension == 0 {
        return Err(AppError::invalid_argument(
            "especia: Error: the model has no free parameters",
        ));
    }

    let optimizer = Optimizer::builder()
        .with_problem_dimension(dimension)
        .with_parent_number(cli.parent_number)
        .with_population_size(cli.population_size)
        .with_accuracy_goal(cli.accuracy_goal)
        .with_random_seed(cli.random_seed)
        .with_stop_generation(cli.stop_generation)
        .build()?;

    report::write_preamble(out)?;

    // The optimizer trace goes into a comment block, written live.
    writeln!(out, "<!--").map_err(stream_failure)?;
    writeln!(out, "<log>").map_err(stream_failure)?;

    let result = {
        let constraint = model.constraint();
        let mut tracer = StreamTracer::new(&mut *out, cli.trace_modulus);

        optimizer.minimize(
            &|x: &[f64]| model.cost(x),
            &model.initial_parameter_values(),
            &model.initial_local_step_sizes(),
            cli.global_step_size,
            &constraint,
            &mut tracer,
        )?
    };

    writeln!(out, "</log>").map_err(stream_failure)?;
    writeln!(out, "-->").map_err(stream_failure)?;

    if result.underflow {
        return Err(AppError::numeric(
            "especia: Error: the mutation variance underflowed",
        ));
    }

    let messages = if result.optimized {
        vec![format!(
            "especia: the optimization has converged after {} generations, cost {:.6e}",
            result.g, result.y
        )]
    } else {
        vec![format!(
            "especia: warning: the optimization has not converged within {} generations, cost {:.6e}",
            result.g, result.y
        )]
    };

    model.apply(&result.x, &result.z)?;
    report::write_report(out, &model, &messages)?;

    Ok(u8::from(!result.optimized))
}

fn stream_failure(err: std::io::Error) -> AppError {
    AppError::io(format!("especia: Error: writing the report failed: {err}"))
}
