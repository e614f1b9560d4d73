use uuid::Uuid;

use crate::decision::{DecisionLabel, PASS_MARK};
use crate::models::{AbsenceStatus, BehaviorStatus, Student, TermId};
use crate::rank::{RankScope, Standing};

/// Lower edge of the borderline-failure band; the upper edge is the pass mark.
pub const AT_RISK_FLOOR: f64 = 9.0;

/// How many flagged students a summary shows before truncating.
pub const FLAG_PREVIEW_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct BehaviorFlag {
    pub student_id: Uuid,
    pub name: String,
    pub term: TermId,
    pub behavior: BehaviorStatus,
    pub decision: DecisionLabel,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AbsenceFlag {
    pub student_id: Uuid,
    pub name: String,
    pub term: TermId,
    pub absence: AbsenceStatus,
}

pub fn is_at_risk(average: f64) -> bool {
    (AT_RISK_FLOOR..PASS_MARK).contains(&average)
}

/// Students just under the pass mark, in roster order.
pub fn at_risk_band(students: &[Student], scope: RankScope) -> Vec<Standing> {
    students
        .iter()
        .filter(|student| is_at_risk(scope.average_of(student)))
        .map(|student| Standing::of(student, scope))
        .collect()
}

/// Terms inspected for a scope, latest first.
fn terms_for(scope: RankScope) -> Vec<TermId> {
    match scope {
        RankScope::Term(term) => vec![term],
        RankScope::Annual => TermId::ALL.into_iter().rev().collect(),
    }
}

/// Students with negative conduct or a warning decision. Over the annual
/// scope a student is reported once, for the latest flagged term.
pub fn behavior_flags(students: &[Student], scope: RankScope) -> Vec<BehaviorFlag> {
    let terms = terms_for(scope);
    students
        .iter()
        .filter_map(|student| {
            terms.iter().find_map(|&term| {
                let record = student.term(term);
                let flagged =
                    record.behavior.is_negative() || record.decision == DecisionLabel::Warning;
                flagged.then(|| BehaviorFlag {
                    student_id: student.id,
                    name: student.identity.name.clone(),
                    term,
                    behavior: record.behavior,
                    decision: record.decision,
                })
            })
        })
        .collect()
}

pub fn absence_flags(students: &[Student], scope: RankScope) -> Vec<AbsenceFlag> {
    let terms = terms_for(scope);
    students
        .iter()
        .filter_map(|student| {
            terms.iter().find_map(|&term| {
                let absence = student.term(term).absence;
                absence.is_negative().then(|| AbsenceFlag {
                    student_id: student.id,
                    name: student.identity.name.clone(),
                    term,
                    absence,
                })
            })
        })
        .collect()
}

pub fn preview<T>(flags: &[T]) -> &[T] {
    &flags[..flags.len().min(FLAG_PREVIEW_LIMIT)]
}
