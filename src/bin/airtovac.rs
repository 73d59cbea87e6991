//! Converts air wavelengths (Angstrom) in the first input column to vacuum
//! wavelengths; remaining columns pass through unchanged.

use std::io::{BufRead, Write};
use std::process::ExitCode;

use especia::math::dispersion::{air_to_vacuum_wavelength, Formula};

fn main() -> ExitCode {
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                eprintln!("airtovac: Error: {err}");
                return ExitCode::from(20);
            }
        };

        if line.trim().is_empty() || line.trim_start().starts_with('#') {
            let _ = writeln!(out, "{line}");
            continue;
        }

        let mut columns = line.split_whitespace();
        let first = columns.next().unwrap_or_default();

        let converted = match first.parse::<f64>() {
            Ok(wavelength) => air_to_vacuum_wavelength(Formula::Birch1994, wavelength),
            Err(_) => {
                eprintln!("airtovac: Error: argument '{first}' is not valid");
                return ExitCode::from(10);
            }
        };

        match converted {
            Ok(wavelength) => {
                let rest: Vec<&str> = columns.collect();
                if rest.is_empty() {
                    let _ = writeln!(out, "{wavelength:.6}");
                } else {
                    let _ = writeln!(out, "{wavelength:.6} {}", rest.join(" "));
                }
            }
            Err(err) => {
                eprintln!("{err}");
                return ExitCode::from(20);
            }
        }
    }

    ExitCode::SUCCESS
}
