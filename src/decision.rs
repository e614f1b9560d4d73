use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::DecisionThresholds;

/// Average needed to pass a term without a warning. Not configurable.
pub const PASS_MARK: f64 = 10.0;

/// Class-council outcome for one term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionLabel {
    Excellence,
    Congratulations,
    Encouragement,
    HonorBoard,
    #[default]
    #[serde(rename = "none")]
    NoDistinction,
    Warning,
}

impl DecisionLabel {
    /// Distinctions that put a student on the honor roll.
    pub fn is_honor_tier(self) -> bool {
        matches!(
            self,
            DecisionLabel::Excellence
                | DecisionLabel::Congratulations
                | DecisionLabel::Encouragement
                | DecisionLabel::HonorBoard
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            DecisionLabel::Excellence => "Excellence",
            DecisionLabel::Congratulations => "Congratulations",
            DecisionLabel::Encouragement => "Encouragement",
            DecisionLabel::HonorBoard => "Honor Board",
            DecisionLabel::NoDistinction => "none",
            DecisionLabel::Warning => "Warning",
        }
    }
}

impl fmt::Display for DecisionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// End-of-year outcome. `Redirected` is only ever set by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnualDecision {
    Promoted,
    #[default]
    Repeats,
    Redirected,
}

impl AnnualDecision {
    pub fn label(self) -> &'static str {
        match self {
            AnnualDecision::Promoted => "promoted to the next grade",
            AnnualDecision::Repeats => "repeats the year",
            AnnualDecision::Redirected => "redirected",
        }
    }
}

impl fmt::Display for AnnualDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Top-down threshold ladder; the first match wins. Threshold order is not
/// checked here.
pub fn classify(average: f64, thresholds: &DecisionThresholds) -> DecisionLabel {
    if average >= thresholds.excellence {
        DecisionLabel::Excellence
    } else if average >= thresholds.congratulations {
        DecisionLabel::Congratulations
    } else if average >= thresholds.encouragement {
        DecisionLabel::Encouragement
    } else if average >= thresholds.honor {
        DecisionLabel::HonorBoard
    } else if average >= PASS_MARK {
        DecisionLabel::NoDistinction
    } else {
        DecisionLabel::Warning
    }
}

pub fn classify_annual(average: f64, admission_threshold: f64) -> AnnualDecision {
    if average >= admission_threshold {
        AnnualDecision::Promoted
    } else {
        AnnualDecision::Repeats
    }
}

/// Council observation written alongside the automatic decision.
pub fn observation_for(average: f64) -> &'static str {
    match average {
        a if a >= 18.0 => "Excellent results, keep it up.",
        a if a >= 16.0 => "Very good work.",
        a if a >= 14.0 => "Good work.",
        a if a >= 12.0 => "Fair results.",
        a if a >= 10.0 => "Average results, more effort is needed.",
        a if a >= 8.0 => "Weak results, must catch up.",
        _ => "Insufficient results, warning.",
    }
}
