use std::fmt;

use crate::config::CouncilConfig;
use crate::decision::PASS_MARK;
use crate::grading::{round1, round2};
use crate::models::{Student, SubjectKey, TermId};
use crate::rank::{RankScope, Standing};
use crate::risk::{self, AbsenceFlag, BehaviorFlag};

/// Number of students listed as top performers over the annual scope.
pub const ANNUAL_TOP_COUNT: usize = 3;

/// Fixed score bands used for the class distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScoreBand {
    Outstanding,
    VeryGood,
    Good,
    FairlyGood,
    Average,
    Failing,
}

impl ScoreBand {
    pub const ALL: [ScoreBand; 6] = [
        ScoreBand::Outstanding,
        ScoreBand::VeryGood,
        ScoreBand::Good,
        ScoreBand::FairlyGood,
        ScoreBand::Average,
        ScoreBand::Failing,
    ];

    pub fn for_average(average: f64) -> Self {
        match average {
            a if a >= 18.0 => ScoreBand::Outstanding,
            a if a >= 16.0 => ScoreBand::VeryGood,
            a if a >= 14.0 => ScoreBand::Good,
            a if a >= 12.0 => ScoreBand::FairlyGood,
            a if a >= 10.0 => ScoreBand::Average,
            _ => ScoreBand::Failing,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ScoreBand::Outstanding => "outstanding (18-20)",
            ScoreBand::VeryGood => "very good (16-18)",
            ScoreBand::Good => "good (14-16)",
            ScoreBand::FairlyGood => "fairly good (12-14)",
            ScoreBand::Average => "average (10-12)",
            ScoreBand::Failing => "below 10",
        }
    }
}

impl fmt::Display for ScoreBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BandCount {
    pub band: ScoreBand,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubjectPerformance {
    pub subject: SubjectKey,
    pub average: f64,
}

/// One subject across the roster in one term.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubjectStatistics {
    pub subject: SubjectKey,
    pub term: TermId,
    pub average: f64,
    pub max: f64,
    pub min: f64,
    pub pass_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TermProgress {
    pub term: TermId,
    pub average: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScopeDetail {
    Term {
        subject_performance: Vec<SubjectPerformance>,
    },
    Annual {
        term_progression: Vec<TermProgress>,
        admitted: usize,
        repeating: usize,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatisticsReport {
    pub scope: RankScope,
    pub student_count: usize,
    pub class_average: f64,
    pub max_average: f64,
    pub pass_rate: f64,
    pub top_performers: Vec<Standing>,
    pub distribution: Vec<BandCount>,
    pub at_risk: Vec<Standing>,
    pub behavior_flags: Vec<BehaviorFlag>,
    pub absence_flags: Vec<AbsenceFlag>,
    pub detail: ScopeDetail,
}

impl StatisticsReport {
    pub fn behavior_preview(&self) -> &[BehaviorFlag] {
        risk::preview(&self.behavior_flags)
    }

    pub fn absence_preview(&self) -> &[AbsenceFlag] {
        risk::preview(&self.absence_flags)
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Band counts in band order; empty bands are left out.
pub fn score_distribution(averages: &[f64]) -> Vec<BandCount> {
    ScoreBand::ALL
        .into_iter()
        .map(|band| BandCount {
            band,
            count: averages
                .iter()
                .filter(|average| ScoreBand::for_average(**average) == band)
                .count(),
        })
        .filter(|entry| entry.count > 0)
        .collect()
}

/// Term scope: every honor-tier student, best first.
pub fn honor_roll(students: &[Student], term: TermId) -> Vec<Standing> {
    let scope = RankScope::Term(term);
    let mut roll: Vec<Standing> = students
        .iter()
        .filter(|student| student.term(term).decision.is_honor_tier())
        .map(|student| Standing::of(student, scope))
        .collect();
    roll.sort_by(|a, b| b.average.total_cmp(&a.average));
    roll
}

/// Annual scope: the best `count` annual averages.
pub fn annual_leaders(students: &[Student], count: usize) -> Vec<Standing> {
    let mut leaders: Vec<Standing> = students
        .iter()
        .map(|student| Standing::of(student, RankScope::Annual))
        .collect();
    leaders.sort_by(|a, b| b.average.total_cmp(&a.average));
    leaders.truncate(count);
    leaders
}

pub fn subject_performance(students: &[Student], term: TermId) -> Vec<SubjectPerformance> {
    let mut performance: Vec<SubjectPerformance> = SubjectKey::ALL
        .into_iter()
        .map(|subject| SubjectPerformance {
            subject,
            average: round2(mean(students.iter().map(|student| {
                student
                    .term(term)
                    .subjects()
                    .get(subject)
                    .map(|score| score.average())
                    .unwrap_or(0.0)
            }))),
        })
        .collect();
    performance.sort_by(|a, b| b.average.total_cmp(&a.average));
    performance
}

/// Mean, extremes and pass rate of one subject's averages. `None` for an
/// empty roster.
pub fn subject_statistics(
    students: &[Student],
    term: TermId,
    subject: SubjectKey,
) -> Option<SubjectStatistics> {
    if students.is_empty() {
        return None;
    }

    let averages: Vec<f64> = students
        .iter()
        .map(|student| {
            student
                .term(term)
                .subjects()
                .get(subject)
                .map(|score| score.average())
                .unwrap_or(0.0)
        })
        .collect();
    let passing = averages.iter().filter(|average| **average >= PASS_MARK).count();

    Some(SubjectStatistics {
        subject,
        term,
        average: round2(mean(averages.iter().copied())),
        max: averages.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        min: averages.iter().copied().fold(f64::INFINITY, f64::min),
        pass_rate: round1(passing as f64 / averages.len() as f64 * 100.0),
    })
}

pub fn term_progression(students: &[Student]) -> Vec<TermProgress> {
    TermId::ALL
        .into_iter()
        .map(|term| TermProgress {
            term,
            average: round2(mean(
                students
                    .iter()
                    .map(|student| student.term(term).overall_average()),
            )),
        })
        .collect()
}

/// Class-wide summary of a ranked roster for one scope. Returns `None` for an
/// empty roster. Nothing in the roster is modified.
pub fn compute_class_statistics(
    students: &[Student],
    scope: RankScope,
    config: &CouncilConfig,
) -> Option<StatisticsReport> {
    if students.is_empty() {
        return None;
    }

    let averages: Vec<f64> = students
        .iter()
        .map(|student| scope.average_of(student))
        .collect();
    let pass_line = match scope {
        RankScope::Term(_) => PASS_MARK,
        RankScope::Annual => config.admission_threshold,
    };
    let passing = averages.iter().filter(|average| **average >= pass_line).count();
    let total = averages.len();

    let (top_performers, detail) = match scope {
        RankScope::Term(term) => (
            honor_roll(students, term),
            ScopeDetail::Term {
                subject_performance: subject_performance(students, term),
            },
        ),
        RankScope::Annual => (
            annual_leaders(students, ANNUAL_TOP_COUNT),
            ScopeDetail::Annual {
                term_progression: term_progression(students),
                admitted: passing,
                repeating: total - passing,
            },
        ),
    };

    Some(StatisticsReport {
        scope,
        student_count: total,
        class_average: round2(mean(averages.iter().copied())),
        max_average: averages.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        pass_rate: round1(passing as f64 / total as f64 * 100.0),
        top_performers,
        distribution: score_distribution(&averages),
        at_risk: risk::at_risk_band(students, scope),
        behavior_flags: risk::behavior_flags(students, scope),
        absence_flags: risk::absence_flags(students, scope),
        detail,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::DecisionLabel;
    use crate::models::{Gender, Identity};
    use chrono::NaiveDate;

    fn student(name: &str, average: f64) -> Student {
        let mut student = Student::new(Identity {
            name: name.to_string(),
            gender: Gender::Female,
            birth_date: NaiveDate::from_ymd_opt(2008, 1, 9).expect("valid date"),
            registration_number: format!("RN-{name}"),
        });
        student.term_mut(TermId::First).overall_average = average;
        student.annual.average = average;
        student
    }

    #[test]
    fn three_student_scenario() {
        let roster = vec![student("Sofia", 15.0), student("Farid", 9.5), student("Hoda", 12.0)];
        let report = compute_class_statistics(
            &roster,
            RankScope::Term(TermId::First),
            &CouncilConfig::default(),
        )
        .expect("report");

        assert_eq!(report.student_count, 3);
        assert_eq!(report.pass_rate, 66.7);
        assert_eq!(report.class_average, 12.17);
        assert_eq!(report.max_average, 15.0);
        assert_eq!(report.at_risk.len(), 1);
        assert_eq!(report.at_risk[0].name, "Farid");
    }

    #[test]
    fn empty_roster_has_no_report() {
        let report = compute_class_statistics(&[], RankScope::Annual, &CouncilConfig::default());
        assert!(report.is_none());
    }

    #[test]
    fn distribution_omits_empty_bands() {
        let distribution = score_distribution(&[18.0, 19.5, 15.0, 9.99, 3.0]);
        assert_eq!(
            distribution,
            vec![
                BandCount { band: ScoreBand::Outstanding, count: 2 },
                BandCount { band: ScoreBand::Good, count: 1 },
                BandCount { band: ScoreBand::Failing, count: 2 },
            ]
        );
    }

    #[test]
    fn band_edges_are_lower_inclusive() {
        assert_eq!(ScoreBand::for_average(16.0), ScoreBand::VeryGood);
        assert_eq!(ScoreBand::for_average(15.99), ScoreBand::Good);
        assert_eq!(ScoreBand::for_average(10.0), ScoreBand::Average);
        assert_eq!(ScoreBand::for_average(20.0), ScoreBand::Outstanding);
    }

    #[test]
    fn term_top_performers_are_the_honor_roll() {
        let mut roster = vec![student("Sofia", 13.0), student("Farid", 17.0), student("Hoda", 11.0)];
        roster[0].term_mut(TermId::First).decision = DecisionLabel::HonorBoard;
        roster[1].term_mut(TermId::First).decision = DecisionLabel::Congratulations;
        roster[2].term_mut(TermId::First).decision = DecisionLabel::NoDistinction;

        let roll = honor_roll(&roster, TermId::First);
        let names: Vec<&str> = roll.iter().map(|entry| entry.name.as_str()).collect();
        assert_eq!(names, vec!["Farid", "Sofia"]);
    }

    #[test]
    fn annual_top_performers_are_the_best_three() {
        let roster = vec![
            student("A", 11.0),
            student("B", 16.0),
            student("C", 9.0),
            student("D", 14.0),
            student("E", 12.5),
        ];
        let report = compute_class_statistics(&roster, RankScope::Annual, &CouncilConfig::default())
            .expect("report");
        let names: Vec<&str> = report
            .top_performers
            .iter()
            .map(|entry| entry.name.as_str())
            .collect();
        assert_eq!(names, vec!["B", "D", "E"]);
        match report.detail {
            ScopeDetail::Annual { admitted, repeating, .. } => {
                assert_eq!(admitted, 4);
                assert_eq!(repeating, 1);
            }
            ScopeDetail::Term { .. } => panic!("expected annual detail"),
        }
    }

    #[test]
    fn subject_performance_is_sorted_best_first() {
        let mut roster = vec![student("Sofia", 0.0)];
        roster[0]
            .term_mut(TermId::First)
            .subjects
            .entry_mut(SubjectKey::Music)
            .set_marks(16.0, 16.0, 16.0);
        let performance = subject_performance(&roster, TermId::First);
        assert_eq!(performance.len(), SubjectKey::ALL.len());
        assert_eq!(performance[0].subject, SubjectKey::Music);
        assert_eq!(performance[0].average, 16.0);
    }

    #[test]
    fn subject_statistics_cover_one_subject_in_one_term() {
        let mut roster = vec![student("Sofia", 0.0), student("Farid", 0.0), student("Hoda", 0.0)];
        for (student, mark) in roster.iter_mut().zip([16.0, 8.0, 12.5]) {
            student
                .term_mut(TermId::Second)
                .subjects
                .entry_mut(SubjectKey::English)
                .set_marks(mark, mark, mark);
        }

        let stats = subject_statistics(&roster, TermId::Second, SubjectKey::English)
            .expect("statistics");
        assert_eq!(stats.average, 12.17);
        assert_eq!(stats.max, 16.0);
        assert_eq!(stats.min, 8.0);
        assert_eq!(stats.pass_rate, 66.7);

        let untouched = subject_statistics(&roster, TermId::First, SubjectKey::English)
            .expect("statistics");
        assert_eq!(untouched.max, 0.0);
        assert_eq!(untouched.pass_rate, 0.0);
    }

    #[test]
    fn subject_statistics_need_a_roster() {
        assert!(subject_statistics(&[], TermId::First, SubjectKey::Mathematics).is_none());
    }
}
