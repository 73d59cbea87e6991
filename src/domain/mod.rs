//! The parametric model: the parameter vector, its metadata, and the
//! collection of spectral sections it spans.
//!
//! The optimizer sees the model only through a narrow cost-function
//! interface over the *reduced* parameter vector (the free, non-aliased
//! positions in order). Scattering the reduced vector back into the full
//! vector is the model's job: frozen positions keep their stored value and
//! aliased positions share the reduced index of their resolved target.

pub mod section;

pub use section::Section;

use std::collections::BTreeMap;
use std::marker::PhantomData;

use crate::error::AppError;
use crate::fit::BoundedConstraint;
use crate::models::{Profile, Superposition};

/// One position of the full parameter vector with its metadata.
#[derive(Debug, Clone)]
pub struct Parameter {
    /// The current value.
    pub value: f64,
    /// The 1-sigma uncertainty (filled by [`Model::apply`]).
    pub error: f64,
    /// The lower box bound (inclusive).
    pub lower: f64,
    /// The upper box bound (inclusive).
    pub upper: f64,
    /// Whether the position is free (participates in the optimization).
    pub free: bool,
    /// The resolved alias target, if the position was declared by
    /// reference.
    pub reference: Option<String>,
    /// The position in the reduced free-parameter vector.
    pub index: usize,
}

/// The parametric model over all sections, generic over the line-profile
/// type.
#[derive(Debug)]
pub struct Model<P: Profile> {
    pub(crate) sections: Vec<Section>,
    /// Index of each section's resolving-power parameter in the full
    /// parameter vector; the section's line groups follow it.
    pub(crate) section_start: Vec<usize>,
    /// Number of Legendre basis polynomials per section.
    pub(crate) legendre_counts: Vec<usize>,
    /// Number of lines per section.
    pub(crate) line_counts: Vec<usize>,
    pub(crate) parameters: Vec<Parameter>,
    pub(crate) section_ids: BTreeMap<String, usize>,
    /// Line id to the first parameter of the line's group.
    pub(crate) line_ids: BTreeMap<String, usize>,
    /// The raw model definition, embedded in the report.
    pub(crate) raw_text: String,
    _profile: PhantomData<P>,
}

impl<P: Profile> Model<P> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        sections: Vec<Section>,
        section_start: Vec<usize>,
        legendre_counts: Vec<usize>,
        line_counts: Vec<usize>,
        parameters: Vec<Parameter>,
        section_ids: BTreeMap<String, usize>,
        line_ids: BTreeMap<String, usize>,
        raw_text: String,
    ) -> Self {
        Self {
            sections,
            section_start,
            legendre_counts,
            line_counts,
            parameters,
            section_ids,
            line_ids,
            raw_text,
            _profile: PhantomData,
        }
    }

    /// The dimension of the reduced free-parameter vector.
    pub fn parameter_count(&self) -> usize {
        self.parameters
            .iter()
            .filter(|p| p.free)
            .map(|p| p.index)
            .max()
            .map_or(0, |m| m + 1)
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// The initial reduced parameter vector: the midpoint of each box.
    pub fn initial_parameter_values(&self) -> Vec<f64> {
        self.collect_reduced(|p| 0.5 * (p.lower + p.upper))
    }

    /// The initial local step sizes: half of each box width.
    pub fn initial_local_step_sizes(&self) -> Vec<f64> {
        self.collect_reduced(|p| 0.5 * (p.upper - p.lower))
    }

    /// The box constraint over the reduced parameter vector.
    pub fn constraint(&self) -> BoundedConstraint {
        let lower = self.collect_reduced(|p| p.lower);
        let upper = self.collect_reduced(|p| p.upper);
        BoundedConstraint::new(lower, upper)
    }

    fn collect_reduced<F: Fn(&Parameter) -> f64>(&self, f: F) -> Vec<f64> {
        let n = self.parameter_count();
        let mut out = vec![0.0; n];
        let mut seen = vec![false; n];

        for p in &self.parameters {
            if p.free && !seen[p.index] {
                out[p.index] = f(p);
                seen[p.index] = true;
            }
        }

        out
    }

    /// Materialises the full parameter vector from the reduced one.
    fn full_values(&self, x: &[f64]) -> Vec<f64> {
        self.parameters
            .iter()
            .map(|p| if p.free { x[p.index] } else { p.value })
            .collect()
    }

    /// The global cost: the sum of all section costs for the reduced
    /// parameter vector `x`.
    pub fn cost(&self, x: &[f64]) -> f64 {
        let y = self.full_values(x);
        let mut total = 0.0;

        for (s, section) in self.sections.iter().enumerate() {
            let start = self.section_start[s];
            let lines = self.line_counts[s];
            let group = &y[start + 1..start + 1 + lines * P::PARAMETER_COUNT];
            let superposition = Superposition::<P>::new(lines, group);

            total += section.cost(
                |wavelength| superposition.value(wavelength),
                y[start],
                self.legendre_counts[s],
            );
        }

        total
    }

    /// Stores the optimized values `x` and uncertainties `z`, and
    /// refreshes every section's continuum, model flux, and cached cost.
    pub fn apply(&mut self, x: &[f64], z: &[f64]) -> Result<(), AppError> {
        for p in &mut self.parameters {
            if p.free {
                p.value = x[p.index];
                p.error = z[p.index];
            } else {
                p.error = 0.0;
            }
        }

        let y: Vec<f64> = self.parameters.iter().map(|p| p.value).collect();

        for (s, section) in self.sections.iter_mut().enumerate() {
            let start = self.section_start[s];
            let lines = self.line_counts[s];
            let group = &y[start + 1..start + 1 + lines * P::PARAMETER_COUNT];
            let superposition = Superposition::<P>::new(lines, group);

            section.apply(
                |wavelength| superposition.value(wavelength),
                y[start],
                self.legendre_counts[s],
            )?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::IntergalacticDoppler;

    fn parameter(value: f64, lower: f64, upper: f64, free: bool, index: usize) -> Parameter {
        Parameter {
            value,
            error: 0.0,
            lower,
            upper,
            free,
            reference: None,
            index,
        }
    }

    fn section_from_constant(flux: f64) -> Section {
        let samples: Vec<(f64, f64, f64)> = (0..101)
            .map(|i| (4_000.0 + 0.1 * f64::from(i), flux, 0.01))
            .collect();
        Section::new(4_000.0, 4_010.0, &samples).unwrap()
    }

    fn single_section_model() -> Model<IntergalacticDoppler> {
        // One section, one line: resolution frozen, redshift free,
        // broadening free, the rest frozen.
        let parameters = vec![
            parameter(45.0, 0.0, 0.0, false, 0),
            parameter(1215.67, 0.0, 0.0, false, 0),
            parameter(0.4164, 0.0, 0.0, false, 0),
            parameter(2.29, 2.28, 2.30, true, 0),
            parameter(0.0, 0.0, 0.0, false, 0),
            parameter(25.0, 10.0, 40.0, true, 1),
            parameter(13.2, 0.0, 0.0, false, 0),
        ];

        let mut section_ids = BTreeMap::new();
        section_ids.insert("sec_1".to_string(), 0);
        let mut line_ids = BTreeMap::new();
        line_ids.insert("line_1".to_string(), 1);

        Model::from_parts(
            vec![section_from_constant(1.0)],
            vec![0],
            vec![1],
            vec![1],
            parameters,
            section_ids,
            line_ids,
            String::new(),
        )
    }

    #[test]
    fn parameter_count_is_the_reduced_dimension() {
        let model = single_section_model();
        assert_eq!(model.parameter_count(), 2);
    }

    #[test]
    fn initial_vectors_come_from_the_boxes() {
        let model = single_section_model();

        let values = model.initial_parameter_values();
        assert!((values[0] - 2.29).abs() < 1.0e-12);
        assert!((values[1] - 25.0).abs() < 1.0e-12);

        let steps = model.initial_local_step_sizes();
        assert!((steps[0] - 0.01).abs() < 1.0e-12);
        assert!((steps[1] - 15.0).abs() < 1.0e-12);
    }

    #[test]
    fn constraint_spans_the_boxes() {
        let model = single_section_model();
        let constraint = model.constraint();

        assert!(!crate::fit::Constraint::is_violated(&constraint, &[2.29, 25.0]));
        assert!(crate::fit::Constraint::is_violated(&constraint, &[2.31, 25.0]));
        assert!(crate::fit::Constraint::is_violated(&constraint, &[2.29, 41.0]));
    }

    #[test]
    fn cost_scatters_the_reduced_vector() {
        let model = single_section_model();

        // Moving the line out of the section (via redshift bounds the
        // constraint would forbid, but the cost function itself accepts)
        // leaves a flat spectrum, so the cost drops to the noise floor.
        let with_line = model.cost(&[2.29, 25.0]);
        let without_line = model.cost(&[2.20, 25.0]);

        assert!(with_line > without_line);
        assert!(without_line < 1.0e-10);
    }

    #[test]
    fn apply_stores_values_and_errors() {
        let mut model = single_section_model();
        model.apply(&[2.295, 30.0], &[1.0e-4, 0.5]).unwrap();

        assert_eq!(model.parameters[3].value, 2.295);
        assert_eq!(model.parameters[3].error, 1.0e-4);
        assert_eq!(model.parameters[5].value, 30.0);
        assert_eq!(model.parameters[5].error, 0.5);
        // Frozen positions keep a zero error.
        assert_eq!(model.parameters[0].error, 0.0);
        assert!(model.sections[0].stored_cost().is_finite());
    }

    #[test]
    fn aliased_positions_share_the_reduced_index() {
        // Two lines whose redshifts are tied together.
        let parameters = vec![
            parameter(45.0, 0.0, 0.0, false, 0),
            // line_1
            parameter(1215.67, 0.0, 0.0, false, 0),
            parameter(0.4164, 0.0, 0.0, false, 0),
            parameter(2.29, 2.28, 2.30, true, 0),
            parameter(0.0, 0.0, 0.0, false, 0),
            parameter(25.0, 10.0, 40.0, true, 1),
            parameter(13.2, 0.0, 0.0, false, 0),
            // line_2, redshift aliased to line_1
            parameter(1215.67, 0.0, 0.0, false, 0),
            parameter(0.4164, 0.0, 0.0, false, 0),
            {
                let mut p = parameter(2.29, 2.28, 2.30, true, 0);
                p.reference = Some("line_1".to_string());
                p
            },
            parameter(0.0, 0.0, 0.0, false, 0),
            parameter(20.0, 10.0, 40.0, true, 2),
            parameter(13.0, 0.0, 0.0, false, 0),
        ];

        let mut section_ids = BTreeMap::new();
        section_ids.insert("sec_1".to_string(), 0);
        let mut line_ids = BTreeMap::new();
        line_ids.insert("line_1".to_string(), 1);
        line_ids.insert("line_2".to_string(), 7);

        let mut model: Model<IntergalacticDoppler> = Model::from_parts(
            vec![section_from_constant(1.0)],
            vec![0],
            vec![1],
            vec![2],
            parameters,
            section_ids,
            line_ids,
            String::new(),
        );

        assert_eq!(model.parameter_count(), 3);

        model.apply(&[2.2951, 30.0, 22.0], &[1.0e-4, 0.5, 0.4]).unwrap();
        assert_eq!(model.parameters[3].value, 2.2951);
        assert_eq!(model.parameters[9].value, 2.2951);
        assert_eq!(model.parameters[9].error, 1.0e-4);
    }
}
