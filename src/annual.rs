use crate::decision::{self, AnnualDecision};
use crate::grading::round2;
use crate::models::{Student, TermId};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnualOutcome {
    pub average: f64,
    pub decision: AnnualDecision,
}

/// Unweighted mean of the three term averages. The values are summed in
/// sorted order so the result does not depend on argument order.
pub fn annual_average(first: f64, second: f64, third: f64) -> f64 {
    let mut terms = [first, second, third];
    terms.sort_by(f64::total_cmp);
    round2(terms.iter().sum::<f64>() / 3.0)
}

pub fn compute_annual(
    first: f64,
    second: f64,
    third: f64,
    admission_threshold: f64,
) -> AnnualOutcome {
    let average = annual_average(first, second, third);
    AnnualOutcome {
        average,
        decision: decision::classify_annual(average, admission_threshold),
    }
}

pub fn annual_for(student: &Student, admission_threshold: f64) -> AnnualOutcome {
    let [first, second, third] =
        TermId::ALL.map(|term| student.term(term).overall_average());
    compute_annual(first, second, third, admission_threshold)
}
