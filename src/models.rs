use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decision::{AnnualDecision, DecisionLabel};
use crate::grading;
use crate::rank::Rank;

/// The closed set of subjects taught in every class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SubjectKey {
    #[serde(rename = "math")]
    Mathematics,
    #[serde(rename = "phys")]
    Physics,
    #[serde(rename = "sci")]
    NaturalSciences,
    #[serde(rename = "arab")]
    Arabic,
    #[serde(rename = "fr")]
    French,
    #[serde(rename = "eng")]
    English,
    #[serde(rename = "hist")]
    HistoryGeography,
    #[serde(rename = "civ")]
    Civics,
    #[serde(rename = "isl")]
    IslamicStudies,
    #[serde(rename = "art")]
    Art,
    #[serde(rename = "mus")]
    Music,
    #[serde(rename = "pe")]
    PhysicalEducation,
}

impl SubjectKey {
    pub const ALL: [SubjectKey; 12] = [
        SubjectKey::Mathematics,
        SubjectKey::Physics,
        SubjectKey::NaturalSciences,
        SubjectKey::Arabic,
        SubjectKey::French,
        SubjectKey::English,
        SubjectKey::HistoryGeography,
        SubjectKey::Civics,
        SubjectKey::IslamicStudies,
        SubjectKey::Art,
        SubjectKey::Music,
        SubjectKey::PhysicalEducation,
    ];

    pub fn code(self) -> &'static str {
        match self {
            SubjectKey::Mathematics => "math",
            SubjectKey::Physics => "phys",
            SubjectKey::NaturalSciences => "sci",
            SubjectKey::Arabic => "arab",
            SubjectKey::French => "fr",
            SubjectKey::English => "eng",
            SubjectKey::HistoryGeography => "hist",
            SubjectKey::Civics => "civ",
            SubjectKey::IslamicStudies => "isl",
            SubjectKey::Art => "art",
            SubjectKey::Music => "mus",
            SubjectKey::PhysicalEducation => "pe",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SubjectKey::Mathematics => "Mathematics",
            SubjectKey::Physics => "Physics",
            SubjectKey::NaturalSciences => "Natural sciences",
            SubjectKey::Arabic => "Arabic",
            SubjectKey::French => "French",
            SubjectKey::English => "English",
            SubjectKey::HistoryGeography => "History and geography",
            SubjectKey::Civics => "Civics",
            SubjectKey::IslamicStudies => "Islamic studies",
            SubjectKey::Art => "Art",
            SubjectKey::Music => "Music",
            SubjectKey::PhysicalEducation => "Physical education",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim();
        Self::ALL
            .into_iter()
            .find(|key| key.code().eq_ignore_ascii_case(code))
    }
}

impl fmt::Display for SubjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Raw marks as they arrive from a collaborator; any stored average is ignored.
#[derive(Debug, Clone, Deserialize)]
struct SubjectMarks {
    evaluation: f64,
    test: f64,
    exam: f64,
    #[serde(default)]
    remark: String,
}

/// One subject's three marks out of 20 plus the derived subject average.
///
/// The average is private and recomputed every time the marks change, so it
/// can never be read stale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "SubjectMarks")]
pub struct SubjectScore {
    evaluation: f64,
    test: f64,
    exam: f64,
    average: f64,
    pub remark: String,
}

impl SubjectScore {
    pub fn new(evaluation: f64, test: f64, exam: f64) -> Self {
        Self {
            evaluation,
            test,
            exam,
            average: grading::subject_average(evaluation, test, exam),
            remark: String::new(),
        }
    }

    pub fn with_remark(mut self, remark: impl Into<String>) -> Self {
        self.remark = remark.into();
        self
    }

    pub fn set_marks(&mut self, evaluation: f64, test: f64, exam: f64) {
        self.evaluation = evaluation;
        self.test = test;
        self.exam = exam;
        self.average = grading::subject_average(evaluation, test, exam);
    }

    pub fn evaluation(&self) -> f64 {
        self.evaluation
    }

    pub fn test(&self) -> f64 {
        self.test
    }

    pub fn exam(&self) -> f64 {
        self.exam
    }

    pub fn average(&self) -> f64 {
        self.average
    }
}

impl Default for SubjectScore {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }
}

impl From<SubjectMarks> for SubjectScore {
    fn from(marks: SubjectMarks) -> Self {
        Self::new(marks.evaluation, marks.test, marks.exam).with_remark(marks.remark)
    }
}

/// Scores of one term keyed by subject. Deserialised sets must hold every
/// recognised subject; sets built in code may be partial until completed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<SubjectKey, SubjectScore>",
    into = "BTreeMap<SubjectKey, SubjectScore>"
)]
pub struct SubjectSet(BTreeMap<SubjectKey, SubjectScore>);

impl SubjectSet {
    /// One all-zero score per recognised subject.
    pub fn blank() -> Self {
        Self(
            SubjectKey::ALL
                .into_iter()
                .map(|key| (key, SubjectScore::default()))
                .collect(),
        )
    }

    pub fn get(&self, key: SubjectKey) -> Option<&SubjectScore> {
        self.0.get(&key)
    }

    pub fn insert(&mut self, key: SubjectKey, score: SubjectScore) {
        self.0.insert(key, score);
    }

    pub fn iter(&self) -> impl Iterator<Item = (SubjectKey, &SubjectScore)> {
        self.0.iter().map(|(key, score)| (*key, score))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn missing(&self) -> Vec<SubjectKey> {
        SubjectKey::ALL
            .into_iter()
            .filter(|key| !self.0.contains_key(key))
            .collect()
    }

    pub(crate) fn entry_mut(&mut self, key: SubjectKey) -> &mut SubjectScore {
        self.0.entry(key).or_default()
    }
}

impl TryFrom<BTreeMap<SubjectKey, SubjectScore>> for SubjectSet {
    type Error = String;

    fn try_from(scores: BTreeMap<SubjectKey, SubjectScore>) -> Result<Self, Self::Error> {
        let set = Self(scores);
        let missing = set.missing();
        if missing.is_empty() {
            Ok(set)
        } else {
            let codes: Vec<&str> = missing.iter().map(|key| key.code()).collect();
            Err(format!("term is missing subjects: {}", codes.join(", ")))
        }
    }
}

impl From<SubjectSet> for BTreeMap<SubjectKey, SubjectScore> {
    fn from(set: SubjectSet) -> Self {
        set.0
    }
}

impl FromIterator<(SubjectKey, SubjectScore)> for SubjectSet {
    fn from_iter<I: IntoIterator<Item = (SubjectKey, SubjectScore)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum TermId {
    First,
    Second,
    Third,
}

impl TermId {
    pub const ALL: [TermId; 3] = [TermId::First, TermId::Second, TermId::Third];

    pub fn number(self) -> u8 {
        match self {
            TermId::First => 1,
            TermId::Second => 2,
            TermId::Third => 3,
        }
    }

    fn index(self) -> usize {
        usize::from(self.number() - 1)
    }
}

impl TryFrom<u8> for TermId {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(TermId::First),
            2 => Ok(TermId::Second),
            3 => Ok(TermId::Third),
            other => Err(format!("term must be 1, 2 or 3, got {other}")),
        }
    }
}

impl From<TermId> for u8 {
    fn from(term: TermId) -> Self {
        term.number()
    }
}

impl fmt::Display for TermId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "term {}", self.number())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorStatus {
    Exemplary,
    #[default]
    Good,
    Disruptive,
    Hyperactive,
}

impl BehaviorStatus {
    pub fn is_negative(self) -> bool {
        matches!(self, BehaviorStatus::Disruptive | BehaviorStatus::Hyperactive)
    }

    pub fn label(self) -> &'static str {
        match self {
            BehaviorStatus::Exemplary => "exemplary conduct",
            BehaviorStatus::Good => "good",
            BehaviorStatus::Disruptive => "disruptive",
            BehaviorStatus::Hyperactive => "hyperactive",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbsenceStatus {
    #[default]
    Punctual,
    Justified,
    Frequent,
    Unjustified,
}

impl AbsenceStatus {
    pub fn is_negative(self) -> bool {
        matches!(self, AbsenceStatus::Frequent | AbsenceStatus::Unjustified)
    }

    pub fn label(self) -> &'static str {
        match self {
            AbsenceStatus::Punctual => "punctual",
            AbsenceStatus::Justified => "justified absences",
            AbsenceStatus::Frequent => "frequently absent",
            AbsenceStatus::Unjustified => "unjustified absences",
        }
    }
}

/// One grading term of one student. `overall_average` and `rank` are derived
/// by the pipeline and only readable from outside the crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermRecord {
    pub(crate) subjects: SubjectSet,
    #[serde(default)]
    pub(crate) overall_average: f64,
    #[serde(default)]
    pub(crate) rank: Option<Rank>,
    #[serde(default)]
    pub decision: DecisionLabel,
    #[serde(default)]
    pub behavior: BehaviorStatus,
    #[serde(default)]
    pub absence: AbsenceStatus,
    #[serde(default)]
    pub observation: String,
}

impl TermRecord {
    pub fn subjects(&self) -> &SubjectSet {
        &self.subjects
    }

    pub fn overall_average(&self) -> f64 {
        self.overall_average
    }

    pub fn rank(&self) -> Option<Rank> {
        self.rank
    }
}

impl Default for TermRecord {
    fn default() -> Self {
        Self {
            subjects: SubjectSet::blank(),
            overall_average: 0.0,
            rank: None,
            decision: DecisionLabel::default(),
            behavior: BehaviorStatus::default(),
            absence: AbsenceStatus::default(),
            observation: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnnualRecord {
    #[serde(default)]
    pub(crate) average: f64,
    #[serde(default)]
    pub(crate) rank: Option<Rank>,
    #[serde(default)]
    pub decision: AnnualDecision,
}

impl AnnualRecord {
    pub fn average(&self) -> f64 {
        self.average
    }

    pub fn rank(&self) -> Option<Rank> {
        self.rank
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub gender: Gender,
    pub birth_date: NaiveDate,
    pub registration_number: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: Uuid,
    pub identity: Identity,
    terms: [TermRecord; 3],
    #[serde(default)]
    pub(crate) annual: AnnualRecord,
}

impl Student {
    /// A freshly enrolled student: all-zero marks, default statuses.
    pub fn new(identity: Identity) -> Self {
        Self {
            id: Uuid::new_v4(),
            identity,
            terms: Default::default(),
            annual: AnnualRecord::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.identity.name
    }

    pub fn term(&self, term: TermId) -> &TermRecord {
        &self.terms[term.index()]
    }

    pub fn term_mut(&mut self, term: TermId) -> &mut TermRecord {
        &mut self.terms[term.index()]
    }

    pub fn annual(&self) -> &AnnualRecord {
        &self.annual
    }
}

/// A class and its roster of students.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassGroup {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub major: String,
    #[serde(default)]
    pub year: String,
    #[serde(default)]
    pub students: Vec<Student>,
}

impl ClassGroup {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            major: String::new(),
            year: String::new(),
            students: Vec::new(),
        }
    }

    pub fn student(&self, id: Uuid) -> Option<&Student> {
        self.students.iter().find(|student| student.id == id)
    }

    pub fn find_by_registration(&self, registration_number: &str) -> Option<&Student> {
        self.students
            .iter()
            .find(|student| student.identity.registration_number == registration_number)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Gradebook {
    pub classes: Vec<ClassGroup>,
}

impl Gradebook {
    pub fn class(&self, id: &str) -> Option<&ClassGroup> {
        self.classes.iter().find(|class| class.id == id)
    }

    pub fn class_mut(&mut self, id: &str) -> Option<&mut ClassGroup> {
        self.classes.iter_mut().find(|class| class.id == id)
    }

    pub fn student_count(&self) -> usize {
        self.classes.iter().map(|class| class.students.len()).sum()
    }
}
