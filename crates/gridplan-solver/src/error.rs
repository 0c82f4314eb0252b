//! Solver error types.
//!
//! Infeasibility and budget exhaustion are NOT errors — they are expected
//! outcomes of a combinatorial search over user-supplied capacity data and
//! surface as [`crate::search::Outcome`] / [`crate::planner::PlanOutcome`]
//! variants instead.

use thiserror::Error;

use gridplan_model::ValidationError;

/// Internal builder invariant violations. These indicate an engine bug,
/// not bad input: valid inputs never produce them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelBuildError {
    #[error("variable table holds {actual} entries, expected {expected}")]
    VarTableMismatch { expected: usize, actual: usize },

    #[error("exclusion pair ({first}, {second}) references a task outside 0..{tasks}")]
    ExclusionOutOfRange {
        first: usize,
        second: usize,
        tasks: usize,
    },
}

/// Errors that can occur during a planning call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("model build failed: {0}")]
    ModelBuild(#[from] ModelBuildError),

    #[error("internal consistency failure: {0}")]
    Internal(String),
}

pub type PlanResult<T> = Result<T, PlanError>;
