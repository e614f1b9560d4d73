use thiserror::Error;
use uuid::Uuid;

use crate::models::SubjectKey;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error("cannot compute a term average without any subject scores")]
    EmptySubjectSet,
    #[error("subject set is missing {} recognised subjects", .0.len())]
    IncompleteSubjectSet(Vec<SubjectKey>),
    #[error("coefficient for {subject} must be a positive number, got {value}")]
    InvalidCoefficient { subject: SubjectKey, value: f64 },
    #[error("no student with id {0} in this roster")]
    UnknownStudent(Uuid),
    #[error("no class with id {0}")]
    UnknownClass(String),
    #[error("the gradebook changed after the recompute was planned")]
    StalePlan,
}
