//! Gridplan constraint solver — multi-resource bin-packing placement.
//!
//! Turns validated node capacities, task demands, and anti-affinity
//! exclusion pairs into a feasible (or provably node-minimal) task→node
//! placement. The formulation is a single N-resource constraint model:
//! one bounded integer variable per (task, node, kind) triple, gated by
//! reified atomicity and full resource correlation, with per-node capacity
//! sums and per-pair exclusion constraints. The backend is a bounded
//! depth-first backtracking search with branch-and-bound for the
//! active-node objective.
//!
//! Infeasibility and budget exhaustion are outcomes, not errors: capacity
//! shortfalls are an expected, frequent result of solving over
//! user-supplied inventory data.
//!
//! # Components
//!
//! - **`model`** — variable table and typed constraint list, plus assignment verification
//! - **`search`** — bounded DFS / branch-and-bound engine and lazy solution enumeration
//! - **`extract`** — raw assignments into ordered `{node, tasks}` groups
//! - **`planner`** — end-to-end facade over validation, build, solve, extract
//! - **`error`** — validation/build/internal error taxonomy

pub mod error;
pub mod extract;
pub mod model;
pub mod planner;
pub mod search;

pub use error::{ModelBuildError, PlanError, PlanResult};
pub use extract::{NodeGroup, Placement, extract};
pub use model::{AllocVar, Assignment, Constraint, ConstraintModel, ConstraintViolation, VarId};
pub use planner::{
    EnumerationOutcome, PlanOutcome, PlanRequest, Placements, Planner, plan, plan_all,
};
pub use search::{Outcome, SearchConfig, SearchStatus, SolutionIter, enumerate, solve};
