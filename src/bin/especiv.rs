//! The Voigt profile variant (pseudo-Voigt approximation).

use std::process::ExitCode;

use especia::models::{IntergalacticVoigt, PseudoVoigt};

fn main() -> ExitCode {
    match especia::app::run::<IntergalacticVoigt<PseudoVoigt>>() {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(err.exit_code())
        }
    }
}
