//! The Voigt profile variant (extended pseudo-Voigt approximation).

use std::process::ExitCode;

use especia::models::{ExtendedPseudoVoigt, IntergalacticVoigt};

fn main() -> ExitCode {
    match especia::app::run::<IntergalacticVoigt<ExtendedPseudoVoigt>>() {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(err.exit_code())
        }
    }
}
