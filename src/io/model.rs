//! The model-definition reader.
//!
//! A model definition is a plain-text document of sections delimited by
//! `{` and `}`. Text from `%` to the end of the line is comment. Each
//! section begins with a head line
//!
//! ```text
//! { section_id  data_file  wl_lo  wl_hi  p  [mask_lo mask_hi]...
//! ```
//!
//! followed by the resolving-power parameter specification and one group
//! per line
//!
//! ```text
//!   line_id
//!     value  lower  upper  free_flag  [ref]
//!     ...
//! ```
//!
//! A parameter specification carries four numbers and an optional trailing
//! reference token on the same line; a reference aliases the parameter to
//! the same-position parameter of the referenced line (for the resolving
//! power, to the referenced section). Alias chains are resolved at read
//! time; duplicate identifiers, self-references, and unresolved references
//! are fatal.

use std::collections::BTreeMap;
use std::path::Path;

use crate::domain::{Model, Parameter, Section};
use crate::error::AppError;
use crate::io::spectrum::read_spectrum;
use crate::models::Profile;

const DUPLICATE_LINE: &str = "duplicate line identifier";
const DUPLICATE_SECTION: &str = "duplicate section identifier";
const INPUT_FAILED: &str = "input failed";
const SELF_REFERENCE: &str = "self reference";
const SYNTAX_ERROR: &str = "syntax error";
const REFERENCE_NOT_FOUND: &str = "reference not found";

/// Reads a model definition, loading the section data files it names.
pub fn read_model<P: Profile>(text: &str) -> Result<Model<P>, AppError> {
    let cleaned = strip_comments(text);

    let mut sections: Vec<Section> = Vec::new();
    let mut section_start: Vec<usize> = Vec::new();
    let mut legendre_counts: Vec<usize> = Vec::new();
    let mut line_counts: Vec<usize> = Vec::new();

    let mut parameters: Vec<Parameter> = Vec::new();
    let mut refs: Vec<Option<String>> = Vec::new();

    let mut section_ids: BTreeMap<String, usize> = BTreeMap::new();
    let mut line_ids: BTreeMap<String, usize> = BTreeMap::new();

    let chunks: Vec<&str> = cleaned.split('}').collect();
    // Content after the last terminator is ignored, like a reader that
    // stops at end of file.
    for chunk in &chunks[..chunks.len().saturating_sub(1)] {
        let body = match chunk.find('{') {
            Some(pos) => &chunk[pos + 1..],
            None => return Err(AppError::parse("model", SYNTAX_ERROR)),
        };

        let mut cursor = Cursor::new(body);

        // Section head.
        let sid = next_required(&mut cursor, "model")?;
        let file_name = next_required(&mut cursor, &sid)?;
        let wl_lo = parse_number(&mut cursor, &sid)?;
        let wl_hi = parse_number(&mut cursor, &sid)?;
        let p: usize = next_required(&mut cursor, &sid)?
            .parse()
            .map_err(|_| AppError::parse(&sid, INPUT_FAILED))?;
        let mask_tokens = cursor.rest_of_line();

        if section_ids.contains_key(&sid) {
            return Err(AppError::parse(&sid, DUPLICATE_SECTION));
        }
        section_ids.insert(sid.clone(), sections.len());

        let samples = read_spectrum(Path::new(&file_name))?;
        let mut section = Section::new(wl_lo, wl_hi, &samples)?;

        for pair in mask_tokens.chunks(2) {
            match (pair.first(), pair.get(1)) {
                (Some(a), Some(b)) => match (a.parse::<f64>(), b.parse::<f64>()) {
                    (Ok(a), Ok(b)) => section.mask(a, b),
                    _ => break,
                },
                _ => break,
            }
        }

        sections.push(section);
        section_start.push(parameters.len());
        legendre_counts.push(p);

        // The resolving-power parameter.
        let (parameter, reference) = read_spec(&mut cursor, &sid)?;
        parameters.push(parameter);
        refs.push(reference);

        // Line groups.
        let mut lines = 0;
        while let Some(pid) = cursor.next_token() {
            if line_ids.contains_key(&pid) {
                return Err(AppError::parse(&pid, DUPLICATE_LINE));
            }
            line_ids.insert(pid.clone(), parameters.len());

            for _ in 0..P::PARAMETER_COUNT {
                let (parameter, reference) = read_spec(&mut cursor, &pid)?;
                parameters.push(parameter);
                refs.push(reference);
            }
            lines += 1;
        }

        line_counts.push(lines);
    }

    if sections.is_empty() {
        return Err(AppError::parse("model", SYNTAX_ERROR));
    }

    // Index the independent parameters; frozen and aliased positions carry
    // no bounds of their own.
    let mut k = 0;
    for (parameter, reference) in parameters.iter_mut().zip(refs.iter()) {
        if parameter.free && reference.is_none() {
            if parameter.lower > parameter.upper {
                std::mem::swap(&mut parameter.lower, &mut parameter.upper);
            }
            parameter.index = k;
            k += 1;
        } else {
            parameter.lower = 0.0;
            parameter.upper = 0.0;
            parameter.index = 0;
        }
    }

    // Dereference the resolving-power references.
    for &s in section_ids.values() {
        let j = section_start[s];
        resolve(&mut parameters, &mut refs, j, |name| {
            section_ids.get(name).map(|&t| section_start[t])
        })?;
    }

    // Dereference the line-parameter references.
    for &first in line_ids.values() {
        for offset in 0..P::PARAMETER_COUNT {
            let j = first + offset;
            resolve(&mut parameters, &mut refs, j, |name| {
                line_ids.get(name).map(|&t| t + offset)
            })?;
        }
    }

    Ok(Model::from_parts(
        sections,
        section_start,
        legendre_counts,
        line_counts,
        parameters,
        section_ids,
        line_ids,
        text.to_string(),
    ))
}

/// Chases the alias chain starting at parameter `j` until it reaches a
/// concrete target, whose value and metadata are copied over.
fn resolve<F: Fn(&str) -> Option<usize>>(
    parameters: &mut [Parameter],
    refs: &mut [Option<String>],
    j: usize,
    lookup: F,
) -> Result<(), AppError> {
    while let Some(name) = refs[j].clone() {
        let l = match lookup(&name) {
            Some(l) => l,
            None => return Err(AppError::parse(&name, REFERENCE_NOT_FOUND)),
        };

        if l == j {
            return Err(AppError::parse(&name, SELF_REFERENCE));
        }

        if refs[l].is_none() {
            parameters[j].value = parameters[l].value;
            parameters[j].lower = parameters[l].lower;
            parameters[j].upper = parameters[l].upper;
            parameters[j].free = parameters[l].free;
            parameters[j].index = parameters[l].index;
            refs[j] = None;
        } else {
            refs[j] = refs[l].clone();
        }
    }

    Ok(())
}

/// Reads one parameter specification: four numbers, then an optional
/// reference token on the line of the fourth number.
fn read_spec(cursor: &mut Cursor, context: &str) -> Result<(Parameter, Option<String>), AppError> {
    let value = parse_number(cursor, context)?;
    let lower = parse_number(cursor, context)?;
    let upper = parse_number(cursor, context)?;
    let flag: i64 = next_required(cursor, context)?
        .parse()
        .map_err(|_| AppError::parse(context, INPUT_FAILED))?;

    let reference = cursor.rest_of_line().into_iter().next();

    let parameter = Parameter {
        value,
        error: 0.0,
        lower,
        upper,
        free: flag != 0,
        reference: reference.clone(),
        index: 0,
    };

    Ok((parameter, reference))
}

fn next_required(cursor: &mut Cursor, context: &str) -> Result<String, AppError> {
    cursor
        .next_token()
        .ok_or_else(|| AppError::parse(context, INPUT_FAILED))
}

fn parse_number(cursor: &mut Cursor, context: &str) -> Result<f64, AppError> {
    next_required(cursor, context)?
        .parse()
        .map_err(|_| AppError::parse(context, INPUT_FAILED))
}

/// Removes comments (from `%` to the end of the line) and blank lines.
fn strip_comments(text: &str) -> String {
    let mut out = String::new();
    for line in text.lines() {
        let line = match line.find('%') {
            Some(pos) => &line[..pos],
            None => line,
        };
        if !line.trim().is_empty() {
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}

/// A line-aware token cursor: tokens are read across lines, but a
/// reference token is only taken from the line its specification ends on.
struct Cursor {
    lines: Vec<Vec<String>>,
    row: usize,
    col: usize,
}

impl Cursor {
    fn new(text: &str) -> Self {
        let lines = text
            .lines()
            .map(|line| line.split_whitespace().map(str::to_string).collect())
            .filter(|tokens: &Vec<String>| !tokens.is_empty())
            .collect();
        Self {
            lines,
            row: 0,
            col: 0,
        }
    }

    /// The next token, advancing across lines.
    fn next_token(&mut self) -> Option<String> {
        while self.row < self.lines.len() {
            if self.col < self.lines[self.row].len() {
                let token = self.lines[self.row][self.col].clone();
                self.col += 1;
                return Some(token);
            }
            self.row += 1;
            self.col = 0;
        }
        None
    }

    /// The remaining tokens on the current line; advances to the next
    /// line.
    fn rest_of_line(&mut self) -> Vec<String> {
        let rest = if self.row < self.lines.len() {
            self.lines[self.row][self.col..].to_vec()
        } else {
            Vec::new()
        };
        self.row += 1;
        self.col = 0;
        rest
    }
}
