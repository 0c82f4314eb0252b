//! Planner facade — validation, expansion, build, solve, extract in one
//! place.
//!
//! Callers hand over node/task records plus a [`PlanRequest`] and get back
//! a grouped [`Placement`] (or an explicit `Infeasible`/`TimedOut`
//! outcome). Each call owns its whole model and search state, so
//! independent plans may run concurrently with no shared mutable state.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use gridplan_model::{NodeSpec, ResourceMatrix, TaskSpec, expand_exclusions};

use crate::error::{PlanError, PlanResult};
use crate::extract::{Placement, extract};
use crate::model::ConstraintModel;
use crate::search::{self, Outcome, SearchConfig, SearchStatus, SolutionIter};

/// Caller-facing solve configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanRequest {
    /// Minimize the number of active nodes instead of taking the first
    /// feasible placement.
    pub minimize: bool,
    /// Cap on enumerated placements; `None` means budget-bounded only.
    pub solution_limit: Option<usize>,
    /// Wall-clock budget for the search.
    pub time_budget: Duration,
    /// Optional deterministic cap on explored branch points.
    pub step_budget: Option<u64>,
}

impl Default for PlanRequest {
    fn default() -> Self {
        Self {
            minimize: true,
            solution_limit: None,
            time_budget: Duration::from_secs(10),
            step_budget: None,
        }
    }
}

/// Terminal state of a single plan call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanOutcome {
    /// A placement satisfying every constraint.
    Placed(Placement),
    /// A placement with a proven-minimal active-node count.
    Optimal(Placement),
    /// No placement satisfies the constraints; the result is empty.
    Infeasible,
    /// Budget exhausted without an answer; retry with a larger budget.
    TimedOut,
}

impl PlanOutcome {
    /// The placement, when one was found.
    pub fn placement(&self) -> Option<&Placement> {
        match self {
            PlanOutcome::Placed(p) | PlanOutcome::Optimal(p) => Some(p),
            PlanOutcome::Infeasible | PlanOutcome::TimedOut => None,
        }
    }
}

/// Outcome of enumeration mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumerationOutcome {
    /// Up to `solution_limit` distinct placements, in discovery order.
    Placements(Vec<Placement>),
    Infeasible,
    TimedOut,
}

/// One placement problem, validated and modeled, ready to solve.
pub struct Planner {
    model: ConstraintModel,
    request: PlanRequest,
}

impl Planner {
    /// Validate inputs, expand anti-affinity labels, and build the model.
    pub fn new(nodes: &[NodeSpec], tasks: &[TaskSpec], request: PlanRequest) -> PlanResult<Self> {
        let matrix = ResourceMatrix::build(nodes, tasks)?;
        let exclusions = expand_exclusions(tasks);
        let model = ConstraintModel::build(matrix, exclusions, request.minimize)?;
        Ok(Self { model, request })
    }

    pub fn request(&self) -> &PlanRequest {
        &self.request
    }

    pub fn matrix(&self) -> &ResourceMatrix {
        self.model.matrix()
    }

    fn search_config(&self) -> SearchConfig {
        SearchConfig {
            time_budget: self.request.time_budget,
            step_budget: self.request.step_budget,
        }
    }

    /// Solve once and extract the grouped result.
    pub fn solve(&self) -> PlanResult<PlanOutcome> {
        match search::solve(&self.model, &self.search_config()) {
            Outcome::Feasible(a) => Ok(PlanOutcome::Placed(extract(self.matrix(), &a)?)),
            Outcome::Optimal(a) => Ok(PlanOutcome::Optimal(extract(self.matrix(), &a)?)),
            Outcome::Infeasible => Ok(PlanOutcome::Infeasible),
            Outcome::TimedOut => Ok(PlanOutcome::TimedOut),
        }
    }

    /// Lazy enumeration of distinct placements, capped by the request's
    /// `solution_limit`. Dropping the iterator cancels the search.
    pub fn placements(&self) -> Placements<'_> {
        Placements {
            matrix: self.matrix(),
            iter: SolutionIter::new(&self.model, &self.search_config()),
            remaining: self.request.solution_limit,
        }
    }
}

/// Pull-based sequence of grouped placements.
pub struct Placements<'p> {
    matrix: &'p ResourceMatrix,
    iter: SolutionIter<'p>,
    remaining: Option<usize>,
}

impl Placements<'_> {
    /// True once the underlying search ran out of budget.
    pub fn timed_out(&self) -> bool {
        matches!(self.iter.status(), SearchStatus::BudgetExhausted)
    }
}

impl Iterator for Placements<'_> {
    type Item = PlanResult<Placement>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == Some(0) {
            return None;
        }
        let assignment = self.iter.next()?;
        if let Some(remaining) = &mut self.remaining {
            *remaining -= 1;
        }
        Some(extract(self.matrix, &assignment))
    }
}

/// Solve one placement problem end to end.
pub fn plan(nodes: &[NodeSpec], tasks: &[TaskSpec], request: PlanRequest) -> PlanResult<PlanOutcome> {
    Planner::new(nodes, tasks, request)?.solve()
}

/// Enumerate distinct placements. Enumeration carries no objective, so
/// the request's minimize flag is ignored here.
pub fn plan_all(
    nodes: &[NodeSpec],
    tasks: &[TaskSpec],
    mut request: PlanRequest,
) -> PlanResult<EnumerationOutcome> {
    request.minimize = false;
    let planner = Planner::new(nodes, tasks, request)?;

    let mut found = Vec::new();
    let mut placements = planner.placements();
    for result in &mut placements {
        found.push(result?);
    }

    if found.is_empty() {
        if placements.timed_out() {
            Ok(EnumerationOutcome::TimedOut)
        } else {
            Ok(EnumerationOutcome::Infeasible)
        }
    } else {
        Ok(EnumerationOutcome::Placements(found))
    }
}
