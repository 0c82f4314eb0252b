//! Gridplan resource model — validated capacity/demand vectors and
//! anti-affinity expansion.
//!
//! This crate holds the input side of the placement engine: node and task
//! records, validation of their resource declarations into parallel
//! per-kind vectors, and expansion of anti-affinity labels into pairwise
//! exclusion constraints. It does NOT solve anything (that's
//! `gridplan-solver`).
//!
//! # Components
//!
//! - **`resources`** — `NodeSpec`/`TaskSpec` records and the validated `ResourceMatrix`
//! - **`affinity`** — label groups → pairwise exclusion pairs
//! - **`error`** — input validation errors

pub mod affinity;
pub mod error;
pub mod resources;

pub use affinity::{ExclusionPair, expand_exclusions};
pub use error::ValidationError;
pub use resources::{NodeSpec, ResourceKind, ResourceMatrix, TaskSpec};
