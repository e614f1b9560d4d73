use crate::config::{CoefficientTable, DecisionThresholds};
use crate::decision::{self, DecisionLabel};
use crate::error::EngineError;
use crate::models::SubjectSet;

/// Rounds half away from zero at two decimals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Subject average: the exam counts twice as much as the mean of the
/// evaluation and test marks. Marks are expected in `[0, 20]`; nothing is
/// clamped here.
pub fn subject_average(evaluation: f64, test: f64, exam: f64) -> f64 {
    round2(((evaluation + test) / 2.0 + exam * 2.0) / 3.0)
}

/// Coefficient-weighted mean of the subject averages of one term. Every
/// recognised subject must be present.
pub fn term_average(
    subjects: &SubjectSet,
    coefficients: &CoefficientTable,
) -> Result<f64, EngineError> {
    if subjects.is_empty() {
        return Err(EngineError::EmptySubjectSet);
    }
    let missing = subjects.missing();
    if !missing.is_empty() {
        return Err(EngineError::IncompleteSubjectSet(missing));
    }

    let mut weighted = 0.0;
    let mut total_weight = 0.0;
    for (key, score) in subjects.iter() {
        let weight = coefficients.weight(key)?;
        weighted += score.average() * weight;
        total_weight += weight;
    }

    Ok(round2(weighted / total_weight))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TermOutcome {
    pub average: f64,
    pub decision: DecisionLabel,
}

pub fn compute_term_average(
    subjects: &SubjectSet,
    coefficients: &CoefficientTable,
    thresholds: &DecisionThresholds,
) -> Result<TermOutcome, EngineError> {
    let average = term_average(subjects, coefficients)?;
    Ok(TermOutcome {
        average,
        decision: decision::classify(average, thresholds),
    })
}
