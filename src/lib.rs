//! Class-council grade engine: subject and term averages, decisions, ranks,
//! annual results and class statistics for a school grade-book.

pub mod annual;
pub mod config;
pub mod decision;
pub mod error;
pub mod grading;
pub mod models;
pub mod pipeline;
pub mod rank;
pub mod report;
pub mod risk;
pub mod stats;
pub mod store;
pub mod telemetry;

pub use annual::{compute_annual, AnnualOutcome};
pub use config::{CoefficientTable, CouncilConfig, DecisionThresholds};
pub use decision::{classify, AnnualDecision, DecisionLabel};
pub use error::EngineError;
pub use grading::{compute_term_average, subject_average as compute_subject_average, TermOutcome};
pub use models::{ClassGroup, Gradebook, Student, SubjectKey, SubjectScore, SubjectSet, TermId};
pub use pipeline::{bulk_recompute, plan_bulk_recompute, RecomputePlan};
pub use rank::{rank_roster, Rank, RankScope};
pub use stats::{compute_class_statistics, subject_statistics, StatisticsReport, SubjectStatistics};
