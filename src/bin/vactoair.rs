//! Converts vacuum wavelengths (Angstrom) in the first input column to air
//! wavelengths; remaining columns pass through unchanged.

use std::io::{BufRead, Write};
use std::process::ExitCode;

use especia::math::dispersion::{vacuum_to_air_wavelength, Formula};

fn main() -> ExitCode {
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                eprintln!("vactoair: Error: {err}");
                return ExitCode::from(20);
            }
        };

        if line.trim().is_empty() || line.trim_start().starts_with('#') {
            let _ = writeln!(out, "{line}");
            continue;
        }

        let mut columns = line.split_whitespace();
        let first = columns.next().unwrap_or_default();

        let wavelength = match first.parse::<f64>() {
            Ok(wavelength) => vacuum_to_air_wavelength(Formula::Birch1994, wavelength),
            Err(_) => {
                eprintln!("vactoair: Error: argument '{first}' is not valid");
                return ExitCode::from(10);
            }
        };

        let rest: Vec<&str> = columns.collect();
        if rest.is_empty() {
            let _ = writeln!(out, "{wavelength:.6}");
        } else {
            let _ = writeln!(out, "{wavelength:.6} {}", rest.join(" "));
        }
    }

    ExitCode::SUCCESS
}
