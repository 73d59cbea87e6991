//! Spectrum data files.
//!
//! A data file carries one sample per line as whitespace-separated columns
//! `wavelength flux noise`; additional columns are ignored. Lines starting
//! with `#` and blank lines are skipped.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use crate::error::AppError;

/// Reads the samples of a spectrum data file.
pub fn read_spectrum(path: &Path) -> Result<Vec<(f64, f64, f64)>, AppError> {
    let file = File::open(path)
        .map_err(|_| AppError::parse(&path.display().to_string(), "file not found"))?;

    parse_spectrum(BufReader::new(file), &path.display().to_string())
}

/// Parses spectrum samples from a reader; `name` labels errors.
pub fn parse_spectrum<R: Read>(reader: R, name: &str) -> Result<Vec<(f64, f64, f64)>, AppError> {
    let mut samples = Vec::new();

    for line in BufReader::new(reader).lines() {
        let line = line.map_err(|_| AppError::parse(name, "input failed"))?;
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut columns = line.split_whitespace();
        let sample = (|| {
            let x: f64 = columns.next()?.parse().ok()?;
            let f: f64 = columns.next()?.parse().ok()?;
            let s: f64 = columns.next()?.parse().ok()?;
            Some((x, f, s))
        })();

        match sample {
            Some(sample) => samples.push(sample),
            None => return Err(AppError::parse(name, "input failed")),
        }
    }

    if samples.is_empty() {
        return Err(AppError::parse(name, "input failed"));
    }

    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_three_columns() {
        let text = "4000.0 1.00 0.01\n4000.1 0.99 0.01\n";
        let samples = parse_spectrum(text.as_bytes(), "test").unwrap();

        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0], (4000.0, 1.00, 0.01));
    }

    #[test]
    fn skips_comments_and_ignores_extra_columns() {
        let text = "# instrument UVES\n\n4000.0 1.0 0.01 99 flag\n";
        let samples = parse_spectrum(text.as_bytes(), "test").unwrap();

        assert_eq!(samples, vec![(4000.0, 1.0, 0.01)]);
    }

    #[test]
    fn rejects_short_rows() {
        let text = "4000.0 1.0\n";
        let err = parse_spectrum(text.as_bytes(), "bad.dat").unwrap_err();

        assert!(err.to_string().contains("input failed"));
        assert!(err.to_string().contains("bad.dat"));
    }

    #[test]
    fn rejects_empty_input() {
        assert!(parse_spectrum("".as_bytes(), "empty.dat").is_err());
    }

    #[test]
    fn missing_file_is_reported() {
        let err = read_spectrum(Path::new("/nonexistent/espectrum.dat")).unwrap_err();
        assert!(err.to_string().contains("file not found"));
    }
}
