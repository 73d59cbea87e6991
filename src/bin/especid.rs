//! The many-multiplet analysis variant.

use std::process::ExitCode;

use especia::models::ManyMultiplet;

fn main() -> ExitCode {
    match especia::app::run::<ManyMultiplet>() {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(err.exit_code())
        }
    }
}
