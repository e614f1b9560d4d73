use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Student, TermId};

/// Which average a rank was computed from. Each scope is its own rank space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankScope {
    Term(TermId),
    Annual,
}

impl RankScope {
    pub const ALL: [RankScope; 4] = [
        RankScope::Term(TermId::First),
        RankScope::Term(TermId::Second),
        RankScope::Term(TermId::Third),
        RankScope::Annual,
    ];

    pub fn average_of(self, student: &Student) -> f64 {
        match self {
            RankScope::Term(term) => student.term(term).overall_average(),
            RankScope::Annual => student.annual().average(),
        }
    }

    pub fn rank_of(self, student: &Student) -> Option<Rank> {
        match self {
            RankScope::Term(term) => student.term(term).rank(),
            RankScope::Annual => student.annual().rank(),
        }
    }

    fn slot(self, student: &mut Student) -> &mut Option<Rank> {
        match self {
            RankScope::Term(term) => &mut student.term_mut(term).rank,
            RankScope::Annual => &mut student.annual.rank,
        }
    }
}

impl fmt::Display for RankScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RankScope::Term(term) => write!(f, "{term}"),
            RankScope::Annual => f.write_str("annual"),
        }
    }
}

impl FromStr for RankScope {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "annual" | "year" => Ok(RankScope::Annual),
            other => other
                .trim_start_matches("term")
                .trim()
                .parse::<u8>()
                .map_err(|_| format!("expected 1, 2, 3 or annual, got {value:?}"))
                .and_then(TermId::try_from)
                .map(RankScope::Term),
        }
    }
}

/// A 1-based position tagged with the scope it belongs to. Ranks from
/// different scopes do not compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rank {
    scope: RankScope,
    position: u32,
}

impl Rank {
    pub fn scope(&self) -> RankScope {
        self.scope
    }

    pub fn position(&self) -> u32 {
        self.position
    }
}

impl PartialOrd for Rank {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.scope == other.scope {
            Some(self.position.cmp(&other.position))
        } else {
            None
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.position)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Standing {
    pub student_id: Uuid,
    pub name: String,
    pub average: f64,
    pub rank: Option<Rank>,
}

impl Standing {
    pub fn of(student: &Student, scope: RankScope) -> Self {
        Self {
            student_id: student.id,
            name: student.identity.name.clone(),
            average: scope.average_of(student),
            rank: scope.rank_of(student),
        }
    }
}

/// Sorts by average descending. Exact ties fall back to registration number,
/// then name, then roster order.
fn ranking_order(students: &[Student], scope: RankScope) -> Vec<usize> {
    let mut order: Vec<usize> = (0..students.len()).collect();
    order.sort_by(|&a, &b| {
        let (left, right) = (&students[a], &students[b]);
        scope
            .average_of(right)
            .total_cmp(&scope.average_of(left))
            .then_with(|| {
                left.identity
                    .registration_number
                    .cmp(&right.identity.registration_number)
            })
            .then_with(|| left.identity.name.cmp(&right.identity.name))
    });
    order
}

/// Assigns ranks `1..=n` for `scope` to every student in the roster. The
/// roster order itself is left untouched.
pub fn rank_roster(students: &mut [Student], scope: RankScope) {
    let order = ranking_order(students, scope);
    tracing::debug!(%scope, students = order.len(), "ranking roster");

    for (position, index) in order.into_iter().enumerate() {
        let rank = Rank {
            scope,
            position: position as u32 + 1,
        };
        *scope.slot(&mut students[index]) = Some(rank);
    }
}

pub fn rank_all_scopes(students: &mut [Student]) {
    for scope in RankScope::ALL {
        rank_roster(students, scope);
    }
}

/// The roster in rank order for `scope`, as currently stored.
pub fn standings(students: &[Student], scope: RankScope) -> Vec<Standing> {
    ranking_order(students, scope)
        .into_iter()
        .map(|index| Standing::of(&students[index], scope))
        .collect()
}
