use std::fmt;

use uuid::Uuid;

use crate::annual;
use crate::config::CouncilConfig;
use crate::decision::{self, AnnualDecision, DecisionLabel};
use crate::error::EngineError;
use crate::grading;
use crate::models::{ClassGroup, Gradebook, Identity, Student, SubjectKey, TermId, TermRecord};
use crate::rank::{self, RankScope};

/// One raw-score edit for a single subject and term.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkEntry {
    pub term: TermId,
    pub subject: SubjectKey,
    pub evaluation: f64,
    pub test: f64,
    pub exam: f64,
    pub remark: Option<String>,
}

fn student_mut(class: &mut ClassGroup, student_id: Uuid) -> Result<&mut Student, EngineError> {
    class
        .students
        .iter_mut()
        .find(|student| student.id == student_id)
        .ok_or(EngineError::UnknownStudent(student_id))
}

/// Recomputes a term's overall average and automatic decision from its
/// subject averages. The record is left untouched on error.
pub fn recompute_term(record: &mut TermRecord, config: &CouncilConfig) -> Result<(), EngineError> {
    let outcome =
        grading::compute_term_average(&record.subjects, &config.coefficients, &config.thresholds)?;
    record.overall_average = outcome.average;
    record.decision = outcome.decision;
    Ok(())
}

/// Enrols a blank student and re-ranks the roster.
pub fn add_student(class: &mut ClassGroup, identity: Identity) -> Uuid {
    let student = Student::new(identity);
    let id = student.id;
    class.students.push(student);
    rank::rank_all_scopes(&mut class.students);
    id
}

/// Applies one subject edit and cascades: subject average, term average and
/// decision for that student, then ranks for the whole term roster.
pub fn record_marks(
    class: &mut ClassGroup,
    student_id: Uuid,
    entry: &MarkEntry,
    config: &CouncilConfig,
) -> Result<(), EngineError> {
    let student = student_mut(class, student_id)?;
    let mut record = student.term(entry.term).clone();

    let score = record.subjects.entry_mut(entry.subject);
    score.set_marks(entry.evaluation, entry.test, entry.exam);
    if let Some(remark) = &entry.remark {
        score.remark = remark.clone();
    }
    recompute_term(&mut record, config)?;

    tracing::debug!(
        student = %student_id,
        term = %entry.term,
        subject = %entry.subject,
        average = record.overall_average,
        "recorded marks"
    );
    *student.term_mut(entry.term) = record;

    rank::rank_roster(&mut class.students, RankScope::Term(entry.term));
    Ok(())
}

/// Manual council override of a term decision; kept until the next bulk
/// recompute.
pub fn set_council_decision(
    class: &mut ClassGroup,
    student_id: Uuid,
    term: TermId,
    decision: DecisionLabel,
    observation: Option<String>,
) -> Result<(), EngineError> {
    let record = student_mut(class, student_id)?.term_mut(term);
    record.decision = decision;
    if let Some(observation) = observation {
        record.observation = observation;
    }
    Ok(())
}

pub fn set_annual_decision(
    class: &mut ClassGroup,
    student_id: Uuid,
    decision: AnnualDecision,
) -> Result<(), EngineError> {
    student_mut(class, student_id)?.annual.decision = decision;
    Ok(())
}

/// Removes a student and re-ranks every scope of the remaining roster.
pub fn remove_student(class: &mut ClassGroup, student_id: Uuid) -> Result<Student, EngineError> {
    let index = class
        .students
        .iter()
        .position(|student| student.id == student_id)
        .ok_or(EngineError::UnknownStudent(student_id))?;
    let removed = class.students.remove(index);
    rank::rank_all_scopes(&mut class.students);
    Ok(removed)
}

/// Explicit annual pass over one roster: averages, automatic decisions and
/// annual ranks. A manual `Redirected` decision survives this pass.
pub fn recompute_annual(class: &mut ClassGroup, config: &CouncilConfig) {
    for student in &mut class.students {
        let outcome = annual::annual_for(student, config.admission_threshold);
        student.annual.average = outcome.average;
        if student.annual.decision != AnnualDecision::Redirected {
            student.annual.decision = outcome.decision;
        }
    }
    rank::rank_roster(&mut class.students, RankScope::Annual);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangedField {
    TermDecision(TermId),
    Observation(TermId),
    AnnualDecision,
}

impl fmt::Display for ChangedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangedField::TermDecision(term) => write!(f, "{term} decision"),
            ChangedField::Observation(term) => write!(f, "{term} observation"),
            ChangedField::AnnualDecision => f.write_str("annual decision"),
        }
    }
}

/// A council-facing value that a bulk recompute would replace.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionChange {
    pub class_id: String,
    pub student_id: Uuid,
    pub student_name: String,
    pub field: ChangedField,
    pub previous: String,
    pub proposed: String,
}

/// Fully recomputed dataset waiting for confirmation.
#[derive(Debug, Clone)]
pub struct RecomputePlan {
    base: Gradebook,
    proposed: Gradebook,
    changes: Vec<DecisionChange>,
}

impl RecomputePlan {
    pub fn proposed(&self) -> &Gradebook {
        &self.proposed
    }

    pub fn changes(&self) -> &[DecisionChange] {
        &self.changes
    }

    pub fn student_count(&self) -> usize {
        self.proposed.student_count()
    }

    /// Replaces `target` with the proposed dataset, provided `target` is
    /// still the dataset the plan was built from.
    pub fn commit(self, target: &mut Gradebook) -> Result<usize, EngineError> {
        if *target != self.base {
            return Err(EngineError::StalePlan);
        }
        let replaced = self.changes.len();
        *target = self.proposed;
        tracing::info!(changes = replaced, "bulk recompute committed");
        Ok(replaced)
    }

    pub fn into_gradebook(self) -> Gradebook {
        self.proposed
    }
}

fn recompute_student(
    class_id: &str,
    student: &mut Student,
    config: &CouncilConfig,
) -> Result<Vec<DecisionChange>, EngineError> {
    let mut diffs: Vec<(ChangedField, String, String)> = Vec::new();

    for term in TermId::ALL {
        let record = student.term_mut(term);
        let previous = record.decision;
        recompute_term(record, config)?;
        if record.decision != previous {
            diffs.push((
                ChangedField::TermDecision(term),
                previous.to_string(),
                record.decision.to_string(),
            ));
        }

        let observation = decision::observation_for(record.overall_average);
        if record.observation != observation {
            let previous = std::mem::replace(&mut record.observation, observation.to_string());
            diffs.push((ChangedField::Observation(term), previous, observation.to_string()));
        }
    }

    let outcome = annual::annual_for(student, config.admission_threshold);
    student.annual.average = outcome.average;
    if student.annual.decision != outcome.decision {
        diffs.push((
            ChangedField::AnnualDecision,
            student.annual.decision.to_string(),
            outcome.decision.to_string(),
        ));
        student.annual.decision = outcome.decision;
    }

    Ok(diffs
        .into_iter()
        .map(|(field, previous, proposed)| DecisionChange {
            class_id: class_id.to_string(),
            student_id: student.id,
            student_name: student.identity.name.clone(),
            field,
            previous,
            proposed,
        })
        .collect())
}

/// First phase of a bulk recompute: re-derives every term average, automatic
/// decision and observation, annual result and all four rank spaces for
/// every class, on a copy. The input is never modified, so an error leaves
/// nothing half-applied.
pub fn plan_bulk_recompute(
    gradebook: &Gradebook,
    config: &CouncilConfig,
) -> Result<RecomputePlan, EngineError> {
    let mut proposed = gradebook.clone();
    let mut changes = Vec::new();

    for class in &mut proposed.classes {
        for student in &mut class.students {
            changes.extend(recompute_student(&class.id, student, config)?);
        }
        rank::rank_all_scopes(&mut class.students);
    }

    tracing::info!(
        classes = proposed.classes.len(),
        students = proposed.student_count(),
        changes = changes.len(),
        "bulk recompute planned"
    );

    Ok(RecomputePlan {
        base: gradebook.clone(),
        proposed,
        changes,
    })
}

/// Plan and accept in one step, for callers that already obtained
/// confirmation.
pub fn bulk_recompute(gradebook: &Gradebook, config: &CouncilConfig) -> Result<Gradebook, EngineError> {
    plan_bulk_recompute(gradebook, config).map(RecomputePlan::into_gradebook)
}

fn refresh_annual_averages(class: &mut ClassGroup, config: &CouncilConfig) {
    for student in &mut class.students {
        student.annual.average = annual::annual_for(student, config.admission_threshold).average;
    }
}

/// Refreshes one class after raw marks were loaded in bulk: term averages and
/// automatic decisions, annual averages, then all four rank spaces.
/// Observations and annual decisions are left alone until the annual pass.
pub fn refresh_class(class: &mut ClassGroup, config: &CouncilConfig) -> Result<(), EngineError> {
    for student in &mut class.students {
        for term in TermId::ALL {
            recompute_term(student.term_mut(term), config)?;
        }
    }
    refresh_annual_averages(class, config);
    rank::rank_all_scopes(&mut class.students);
    Ok(())
}

/// Re-derives the cached term and annual averages and every rank of a
/// gradebook read from storage, so nothing stale survives a load. Decisions
/// and observations are council data and keep their stored values.
pub fn restore_derived(
    mut gradebook: Gradebook,
    config: &CouncilConfig,
) -> Result<Gradebook, EngineError> {
    for class in &mut gradebook.classes {
        for student in &mut class.students {
            for term in TermId::ALL {
                let record = student.term_mut(term);
                record.overall_average = grading::term_average(&record.subjects, &config.coefficients)?;
            }
        }
        refresh_annual_averages(class, config);
        rank::rank_all_scopes(&mut class.students);
    }
    tracing::debug!(students = gradebook.student_count(), "derived fields restored");
    Ok(gradebook)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Gender;
    use chrono::NaiveDate;

    fn identity(name: &str, registration: &str) -> Identity {
        Identity {
            name: name.to_string(),
            gender: Gender::Female,
            birth_date: NaiveDate::from_ymd_opt(2008, 9, 1).expect("valid date"),
            registration_number: registration.to_string(),
        }
    }

    fn fill(class: &mut ClassGroup, id: Uuid, term: TermId, mark: f64, config: &CouncilConfig) {
        for subject in SubjectKey::ALL {
            let entry = MarkEntry {
                term,
                subject,
                evaluation: mark,
                test: mark,
                exam: mark,
                remark: None,
            };
            record_marks(class, id, &entry, config).expect("marks recorded");
        }
    }

    fn sample_class(config: &CouncilConfig) -> (ClassGroup, Uuid, Uuid) {
        let mut class = ClassGroup::new("3s1", "3 Sci 1");
        let lina = add_student(&mut class, identity("Lina", "R1"));
        let yacine = add_student(&mut class, identity("Yacine", "R2"));
        for term in TermId::ALL {
            fill(&mut class, lina, term, 15.0, config);
            fill(&mut class, yacine, term, 9.0, config);
        }
        (class, lina, yacine)
    }

    fn term_position(class: &ClassGroup, id: Uuid, term: TermId) -> Option<u32> {
        class
            .student(id)
            .and_then(|student| student.term(term).rank())
            .map(|rank| rank.position())
    }

    #[test]
    fn recording_marks_cascades_to_average_decision_and_rank() {
        let config = CouncilConfig::default();
        let (mut class, lina, yacine) = sample_class(&config);

        let record = class.student(lina).expect("student").term(TermId::First);
        assert_eq!(record.overall_average(), 15.0);
        assert_eq!(record.decision, DecisionLabel::Encouragement);
        assert_eq!(term_position(&class, lina, TermId::First), Some(1));
        assert_eq!(term_position(&class, yacine, TermId::First), Some(2));

        fill(&mut class, yacine, TermId::First, 19.0, &config);
        let record = class.student(yacine).expect("student").term(TermId::First);
        assert_eq!(record.overall_average(), 19.0);
        assert_eq!(record.decision, DecisionLabel::Excellence);
        assert_eq!(term_position(&class, yacine, TermId::First), Some(1));
        assert_eq!(term_position(&class, lina, TermId::First), Some(2));
        // Other terms keep their own rank space.
        assert_eq!(term_position(&class, lina, TermId::Second), Some(1));
    }

    #[test]
    fn unknown_student_is_reported() {
        let config = CouncilConfig::default();
        let mut class = ClassGroup::new("3s1", "3 Sci 1");
        let ghost = Uuid::new_v4();
        let entry = MarkEntry {
            term: TermId::First,
            subject: SubjectKey::Art,
            evaluation: 10.0,
            test: 10.0,
            exam: 10.0,
            remark: None,
        };
        assert_eq!(
            record_marks(&mut class, ghost, &entry, &config),
            Err(EngineError::UnknownStudent(ghost))
        );
    }

    #[test]
    fn failed_edit_leaves_the_record_untouched() {
        let config = CouncilConfig::default();
        let (mut class, lina, _) = sample_class(&config);
        let before = class.student(lina).expect("student").clone();

        let mut broken = config.clone();
        broken.coefficients.set(SubjectKey::Mathematics, 0.0);
        let entry = MarkEntry {
            term: TermId::First,
            subject: SubjectKey::Art,
            evaluation: 2.0,
            test: 2.0,
            exam: 2.0,
            remark: Some("absent from the exam".to_string()),
        };
        assert!(record_marks(&mut class, lina, &entry, &broken).is_err());
        assert_eq!(class.student(lina), Some(&before));
    }

    #[test]
    fn removing_a_student_reranks_every_scope() {
        let config = CouncilConfig::default();
        let (mut class, lina, yacine) = sample_class(&config);
        recompute_annual(&mut class, &config);

        let removed = remove_student(&mut class, lina).expect("removed");
        assert_eq!(removed.name(), "Lina");
        for term in TermId::ALL {
            assert_eq!(term_position(&class, yacine, term), Some(1));
        }
        let annual_rank = class.student(yacine).and_then(|s| s.annual().rank());
        assert_eq!(annual_rank.map(|rank| rank.position()), Some(1));
        assert!(remove_student(&mut class, lina).is_err());
    }

    #[test]
    fn annual_pass_keeps_a_manual_redirect() {
        let config = CouncilConfig::default();
        let (mut class, lina, yacine) = sample_class(&config);
        set_annual_decision(&mut class, yacine, AnnualDecision::Redirected).expect("set");
        recompute_annual(&mut class, &config);

        let lina = class.student(lina).expect("student");
        assert_eq!(lina.annual().average(), 15.0);
        assert_eq!(lina.annual().decision, AnnualDecision::Promoted);
        let yacine = class.student(yacine).expect("student");
        assert_eq!(yacine.annual().average(), 9.0);
        assert_eq!(yacine.annual().decision, AnnualDecision::Redirected);
    }

    #[test]
    fn bulk_plan_reports_overwrites_without_touching_the_input() {
        let config = CouncilConfig::default();
        let (mut class, lina, yacine) = sample_class(&config);
        set_council_decision(
            &mut class,
            lina,
            TermId::Second,
            DecisionLabel::Congratulations,
            Some("Exceptional effort".to_string()),
        )
        .expect("override");
        set_annual_decision(&mut class, yacine, AnnualDecision::Redirected).expect("set");
        let gradebook = Gradebook {
            classes: vec![class],
        };

        let plan = plan_bulk_recompute(&gradebook, &config).expect("plan");
        let overridden: Vec<&DecisionChange> = plan
            .changes()
            .iter()
            .filter(|change| change.field == ChangedField::TermDecision(TermId::Second))
            .collect();
        assert_eq!(overridden.len(), 1);
        assert_eq!(overridden[0].student_id, lina);
        assert_eq!(overridden[0].previous, "Congratulations");
        assert_eq!(overridden[0].proposed, "Encouragement");
        assert!(plan
            .changes()
            .iter()
            .any(|change| change.field == ChangedField::AnnualDecision
                && change.student_id == yacine
                && change.proposed == "repeats the year"));

        let untouched = gradebook.class("3s1").and_then(|class| class.student(lina));
        assert_eq!(
            untouched.map(|student| student.term(TermId::Second).decision),
            Some(DecisionLabel::Congratulations)
        );
        assert_eq!(plan.student_count(), 2);
    }

    #[test]
    fn committed_recompute_is_idempotent() {
        let config = CouncilConfig::default();
        let (class, _, _) = sample_class(&config);
        let mut gradebook = Gradebook {
            classes: vec![class],
        };

        let plan = plan_bulk_recompute(&gradebook, &config).expect("plan");
        plan.commit(&mut gradebook).expect("commit");

        let second = plan_bulk_recompute(&gradebook, &config).expect("plan");
        assert!(second.changes().is_empty());
        assert_eq!(second.proposed(), &gradebook);
    }

    #[test]
    fn stale_plan_is_refused() {
        let config = CouncilConfig::default();
        let (class, lina, _) = sample_class(&config);
        let mut gradebook = Gradebook {
            classes: vec![class],
        };
        let plan = plan_bulk_recompute(&gradebook, &config).expect("plan");

        if let Some(class) = gradebook.class_mut("3s1") {
            set_council_decision(class, lina, TermId::First, DecisionLabel::Warning, None)
                .expect("override");
        }
        let snapshot = gradebook.clone();
        assert_eq!(plan.commit(&mut gradebook), Err(EngineError::StalePlan));
        assert_eq!(gradebook, snapshot);
    }

    #[test]
    fn invalid_configuration_aborts_the_whole_batch() {
        let config = CouncilConfig::default();
        let (class, _, _) = sample_class(&config);
        let gradebook = Gradebook {
            classes: vec![class],
        };
        let mut broken = config;
        broken.coefficients.set(SubjectKey::Civics, -1.0);
        assert!(matches!(
            bulk_recompute(&gradebook, &broken),
            Err(EngineError::InvalidCoefficient { .. })
        ));
    }

    #[test]
    fn new_coefficients_flow_through_the_batch() {
        let config = CouncilConfig::default();
        let (mut class, lina, _) = sample_class(&config);
        fill(&mut class, lina, TermId::First, 12.0, &config);
        let entry = MarkEntry {
            term: TermId::First,
            subject: SubjectKey::Mathematics,
            evaluation: 20.0,
            test: 20.0,
            exam: 20.0,
            remark: None,
        };
        record_marks(&mut class, lina, &entry, &config).expect("marks");
        let gradebook = Gradebook {
            classes: vec![class],
        };

        let mut weighted = config.clone();
        weighted.coefficients.set(SubjectKey::Mathematics, 5.0);
        let updated = bulk_recompute(&gradebook, &weighted).expect("recompute");
        let record = updated
            .class("3s1")
            .and_then(|class| class.student(lina))
            .map(|student| student.term(TermId::First).clone())
            .expect("student");
        // (20 * 5 + 12 * 11) / 16
        assert_eq!(record.overall_average(), 14.5);
        assert_eq!(record.observation, "Good work.");
    }
}
