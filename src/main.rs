use std::process::ExitCode;

use especia::models::IntergalacticDoppler;

fn main() -> ExitCode {
    match especia::app::run::<IntergalacticDoppler>() {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(err.exit_code())
        }
    }
}
