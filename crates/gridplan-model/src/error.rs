//! Input validation errors.

use thiserror::Error;

/// Errors raised while validating node/task inputs, before any model
/// construction or solving work happens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("node list is empty")]
    NoNodes,

    #[error("task list is empty")]
    NoTasks,

    #[error("duplicate node id: {0}")]
    DuplicateNodeId(String),

    #[error("duplicate task id: {0}")]
    DuplicateTaskId(String),

    #[error("{entity} declares resource kinds [{found}], expected [{expected}]")]
    KindMismatch {
        /// Id of the node or task whose kind set disagrees.
        entity: String,
        /// Comma-joined kind set of the first node (the reference set).
        expected: String,
        /// Comma-joined kind set actually declared by `entity`.
        found: String,
    },
}
