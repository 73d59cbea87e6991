//! The HTML report.
//!
//! The report is a single HTML 4.01 Transitional document written to
//! standard output. Comment blocks embed the machine-readable artifacts of
//! the run (the optimizer trace, the raw model definition, and the fitted
//! data), followed by two tables: one row per section and one row per
//! line. Formatting code is kept in one place so output changes stay
//! localized.

use std::io::Write;

use crate::domain::{Model, Parameter};
use crate::error::AppError;
use crate::math::constants::SPEED_OF_LIGHT;
use crate::math::sq;
use crate::models::Profile;

/// The document type declaration and opening tag, written before the
/// optimizer trace.
pub fn write_preamble<W: Write>(out: &mut W) -> Result<(), AppError> {
    (|| {
        writeln!(
            out,
            "<!DOCTYPE html PUBLIC \"-//W3C//DTD HTML 4.01 Transitional//EN\">"
        )?;
        writeln!(out, "<html>")
    })()
    .map_err(write_failure)
}

/// Everything after the optimizer trace: result messages, the embedded
/// model and data, and the parameter tables.
pub fn write_report<P: Profile, W: Write>(
    out: &mut W,
    model: &Model<P>,
    messages: &[String],
) -> Result<(), AppError> {
    (|| {
        for message in messages {
            writeln!(out, "<!-- {message} -->")?;
        }

        writeln!(out, "<!--")?;
        writeln!(out, "<model>")?;
        write!(out, "{}", model.raw_text)?;
        if !model.raw_text.ends_with('\n') {
            writeln!(out)?;
        }
        writeln!(out, "</model>")?;
        writeln!(out, "-->")?;

        writeln!(out, "<!--")?;
        writeln!(out, "<data>")?;
        write_data(out, model)?;
        writeln!(out, "</data>")?;
        writeln!(out, "-->")?;

        writeln!(out, "<head>")?;
        writeln!(out, "  <title>Parameter Table</title>")?;
        writeln!(out, "</head>")?;
        writeln!(out, "<body>")?;
        write_section_table(out, model)?;
        writeln!(out, "<br>")?;
        write_line_table(out, model)?;
        writeln!(out, "<address>")?;
        writeln!(
            out,
            " Created by Evolutionary spectrum inversion and analysis (Especia) {}.<br>",
            env!("CARGO_PKG_VERSION")
        )?;
        writeln!(out, "</address>")?;
        writeln!(out, "</body>")?;
        writeln!(out, "</html>")?;

        out.flush()
    })()
    .map_err(write_failure)
}

fn write_failure(err: std::io::Error) -> AppError {
    AppError::io(format!("especia: Error: writing the report failed: {err}"))
}

/// The fitted-data dump: one row per sample with the section id, the
/// observed triple, the mask flag, and the model flux.
fn write_data<P: Profile, W: Write>(out: &mut W, model: &Model<P>) -> std::io::Result<()> {
    for (id, &s) in &model.section_ids {
        for row in model.sections[s].rows() {
            writeln!(
                out,
                "{id} {:.6} {:.6} {:.6} {} {:.6}",
                row.wavelength,
                row.flux,
                row.noise,
                u8::from(row.valid),
                row.model
            )?;
        }
    }
    Ok(())
}

fn write_section_table<P: Profile, W: Write>(
    out: &mut W,
    model: &Model<P>,
) -> std::io::Result<()> {
    writeln!(
        out,
        "<table border=\"1\" cellspacing=\"2\" cellpadding=\"2\" width=\"100%\">"
    )?;
    writeln!(out, "  <thead align=\"center\" valign=\"middle\">")?;
    writeln!(out, "    <tr>")?;
    writeln!(out, "      <td>Section</td>")?;
    writeln!(out, "      <td>Start<br>Wavelength<br>(&Aring;)</td>")?;
    writeln!(out, "      <td>End<br>Wavelength<br>(&Aring;)</td>")?;
    writeln!(out, "      <td>Legendre Basis<br>Polynomials</td>")?;
    writeln!(out, "      <td>Resolution<br>(10<sup>3</sup>)</td>")?;
    writeln!(out, "      <td>Data Points</td>")?;
    writeln!(out, "      <td>Cost</td>")?;
    writeln!(out, "      <td>Cost per<br>Data Point</td>")?;
    writeln!(out, "    </tr>")?;
    writeln!(out, "  </thead>")?;
    writeln!(out, "  <tbody align=\"left\">")?;

    for (id, &s) in &model.section_ids {
        let section = &model.sections[s];
        let points = section.valid_data_count();
        let cost = section.stored_cost();
        let resolution = &model.parameters[model.section_start[s]];

        writeln!(out, "    <tr>")?;
        writeln!(out, "      <td>{id}</td>")?;
        writeln!(out, "      <td>{:.2}</td>", section.lower_bound())?;
        writeln!(out, "      <td>{:.2}</td>", section.upper_bound())?;
        writeln!(out, "      <td>{}</td>", model.legendre_counts[s])?;
        writeln!(out, "      <td>{}</td>", fixed(resolution, 2))?;
        writeln!(out, "      <td>{points}</td>")?;
        writeln!(out, "      <td><strong>{cost:.2}</strong></td>")?;
        writeln!(out, "      <td>{:.2}</td>", cost / points as f64)?;
        writeln!(out, "    </tr>")?;
    }

    writeln!(out, "  </tbody>")?;
    writeln!(out, "</table>")
}

fn write_line_table<P: Profile, W: Write>(out: &mut W, model: &Model<P>) -> std::io::Result<()> {
    writeln!(
        out,
        "<table border=\"1\" cellspacing=\"2\" cellpadding=\"2\" width=\"100%\">"
    )?;
    writeln!(out, "  <thead align=\"center\" valign=\"middle\">")?;
    writeln!(out, "    <tr>")?;
    writeln!(out, "      <td>Line</td>")?;
    writeln!(out, "      <td>Observed<br>Wavelength<br>(&Aring;)</td>")?;
    writeln!(out, "      <td>Rest<br>Wavelength<br>(&Aring;)</td>")?;
    writeln!(out, "      <td>Oscillator<br>Strength</td>")?;
    writeln!(out, "      <td>Redshift</td>")?;
    writeln!(out, "      <td>Radial<br>Velocity<br>(km s<sup>-1</sup>)</td>")?;
    writeln!(out, "      <td>Broadening<br>Velocity<br>(km s<sup>-1</sup>)</td>")?;
    writeln!(out, "      <td>Log. Column<br>Density<br>(cm<sup>-2</sup>)</td>")?;
    if P::HAS_ALPHA_VARIATION {
        writeln!(out, "      <td>&Delta;&alpha;/&alpha;<br>(10<sup>-6</sup>)</td>")?;
    }
    writeln!(out, "    </tr>")?;
    writeln!(out, "  </thead>")?;
    writeln!(out, "  <tbody align=\"left\">")?;

    let c0 = 1.0E-03 * SPEED_OF_LIGHT;

    for (id, &j) in &model.line_ids {
        let p = &model.parameters;

        let x = p[j].value;
        let z = p[j + 2].value;
        let v = p[j + 3].value;
        let w = x * (1.0 + z) * (1.0 + v / c0);

        let dx = p[j].error;
        let dz = p[j + 2].error;
        let dv = p[j + 3].error;
        let dw = dx + x * (sq((1.0 + v / c0) * dz) + sq((1.0 + z) * dv / c0)).sqrt();

        writeln!(out, "    <tr>")?;
        writeln!(out, "      <td>{id}</td>")?;
        writeln!(out, "      <td>{w:.4} &plusmn; {dw:.4}</td>")?;
        writeln!(out, "      <td>{}</td>", fixed(&p[j], 4))?;
        writeln!(out, "      <td>{}</td>", scientific(&p[j + 1], 3))?;
        writeln!(out, "      <td>{}</td>", fixed(&p[j + 2], 7))?;
        writeln!(out, "      <td>{}</td>", fixed(&p[j + 3], 3))?;
        writeln!(out, "      <td>{}</td>", fixed(&p[j + 4], 3))?;
        writeln!(out, "      <td>{}</td>", fixed(&p[j + 5], 3))?;
        if P::HAS_ALPHA_VARIATION {
            writeln!(out, "      <td>{}</td>", fixed(&p[j + 7], 3))?;
        }
        writeln!(out, "    </tr>")?;
    }

    writeln!(out, "  </tbody>")?;
    writeln!(out, "</table>")
}

/// Formats a parameter value in fixed notation, with its uncertainty when
/// the parameter is free.
fn fixed(p: &Parameter, precision: usize) -> String {
    if p.free {
        format!("{:.precision$} &plusmn; {:.precision$}", p.value, p.error)
    } else {
        format!("{:.precision$}", p.value)
    }
}

/// Formats a parameter value in scientific notation, with its uncertainty
/// when the parameter is free.
fn scientific(p: &Parameter, precision: usize) -> String {
    if p.free {
        format!("{:.precision$e} &plusmn; {:.precision$e}", p.value, p.error)
    } else {
        format!("{:.precision$e}", p.value)
    }
}
