//! Depth-first search over the constraint model.
//!
//! Atomicity plus full resource correlation collapse each task's variables
//! to a single hosting choice, so the search branches on (task, node)
//! presence: tasks in input order, candidate nodes in input order.
//! Propagation keeps per-node free-capacity vectors current and prunes
//! candidates that conflict with an already-placed anti-affinity peer.
//!
//! Three modes:
//! - **feasible** — first discovered assignment
//! - **minimize** — branch-and-bound on the active-node count
//! - **enumeration** — [`SolutionIter`], a pull-based lazy sequence of
//!   distinct assignments; cancellation is simply not pulling further
//!
//! Every mode is bounded by a caller-supplied time/step budget; exhausting
//! it reports [`Outcome::TimedOut`], distinct from [`Outcome::Infeasible`].

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::model::{Assignment, ConstraintModel};

/// Search budget. The underlying problem is NP-hard, so an unbounded
/// search is never allowed: the time budget always applies, and an
/// optional step budget caps explored branch points deterministically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    pub time_budget: Duration,
    pub step_budget: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            time_budget: Duration::from_secs(10),
            step_budget: None,
        }
    }
}

/// Terminal state of a single-solution solve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// An assignment satisfying every constraint.
    Feasible(Assignment),
    /// Feasible, and the active-node objective is proven minimal.
    Optimal(Assignment),
    /// No assignment satisfies the constraints.
    Infeasible,
    /// Budget exhausted without proving feasibility or infeasibility.
    TimedOut,
}

/// Where an enumeration stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStatus {
    /// More of the search space remains; keep pulling.
    InProgress,
    /// The search space was fully explored.
    Exhausted,
    /// The time or step budget ran out mid-search.
    BudgetExhausted,
}

/// Solve the model once.
///
/// Minimize mode runs branch-and-bound to optimality; otherwise the first
/// feasible assignment wins.
pub fn solve(model: &ConstraintModel, config: &SearchConfig) -> Outcome {
    let mut dfs = Dfs::new(model, config);
    let outcome = if model.minimize() {
        dfs.minimize()
    } else {
        match dfs.next_solution() {
            Some(assignment) => Outcome::Feasible(assignment),
            None if dfs.out_of_budget => Outcome::TimedOut,
            None => Outcome::Infeasible,
        }
    };
    info!(
        steps = dfs.steps,
        outcome = outcome_name(&outcome),
        "solve finished"
    );
    outcome
}

fn outcome_name(outcome: &Outcome) -> &'static str {
    match outcome {
        Outcome::Feasible(_) => "feasible",
        Outcome::Optimal(_) => "optimal",
        Outcome::Infeasible => "infeasible",
        Outcome::TimedOut => "timed_out",
    }
}

/// Pull-based lazy sequence of distinct feasible assignments.
///
/// Each call to `next` resumes the suspended search and returns the next
/// fully-materialized assignment. No ordering is guaranteed beyond
/// discovery order; every yielded assignment differs from the previous
/// ones in at least one (task, node) pairing because the search never
/// revisits a completed branch.
pub struct SolutionIter<'m> {
    dfs: Dfs<'m>,
}

impl<'m> SolutionIter<'m> {
    pub fn new(model: &'m ConstraintModel, config: &SearchConfig) -> Self {
        Self {
            dfs: Dfs::new(model, config),
        }
    }

    /// How the enumeration stopped (or that it hasn't).
    pub fn status(&self) -> SearchStatus {
        if self.dfs.out_of_budget {
            SearchStatus::BudgetExhausted
        } else if self.dfs.exhausted {
            SearchStatus::Exhausted
        } else {
            SearchStatus::InProgress
        }
    }
}

impl Iterator for SolutionIter<'_> {
    type Item = Assignment;

    fn next(&mut self) -> Option<Assignment> {
        self.dfs.next_solution()
    }
}

/// Collect up to `limit` distinct assignments.
pub fn enumerate(
    model: &ConstraintModel,
    config: &SearchConfig,
    limit: usize,
) -> (Vec<Assignment>, SearchStatus) {
    let mut iter = SolutionIter::new(model, config);
    let mut found = Vec::new();
    while found.len() < limit {
        match iter.next() {
            Some(assignment) => found.push(assignment),
            None => break,
        }
    }
    debug!(found = found.len(), status = ?iter.status(), "enumeration stopped");
    (found, iter.status())
}

/// Resumable backtracking state. All state is owned by the call chain;
/// nothing is shared between concurrent solves.
struct Dfs<'m> {
    model: &'m ConstraintModel,
    task_count: usize,
    node_count: usize,
    kind_count: usize,
    /// demand[task][kind], transposed from the matrix for the fit check.
    demand: Vec<Vec<u64>>,
    /// free[node][kind] under the current partial placement.
    free: Vec<Vec<u64>>,
    /// peers[task]: tasks it may never share a node with.
    peers: Vec<Vec<usize>>,
    /// chosen[t] is meaningful for t < depth.
    chosen: Vec<usize>,
    /// next[t]: next candidate node to try when (re)visiting depth t.
    next: Vec<usize>,
    /// Tasks hosted per node; load > 0 means the node is active.
    load: Vec<usize>,
    depth: usize,
    start: Instant,
    time_budget: Duration,
    step_budget: u64,
    steps: u64,
    exhausted: bool,
    out_of_budget: bool,
}

impl<'m> Dfs<'m> {
    fn new(model: &'m ConstraintModel, config: &SearchConfig) -> Self {
        let matrix = model.matrix();
        let task_count = matrix.task_count();
        let node_count = matrix.node_count();
        let kind_count = matrix.kind_count();

        let demand = (0..task_count)
            .map(|t| (0..kind_count).map(|k| matrix.demand(k, t)).collect())
            .collect();
        let free = (0..node_count)
            .map(|n| (0..kind_count).map(|k| matrix.capacity(k, n)).collect())
            .collect();

        let mut peers = vec![Vec::new(); task_count];
        for &(first, second) in model.exclusions() {
            peers[first].push(second);
            peers[second].push(first);
        }

        Self {
            model,
            task_count,
            node_count,
            kind_count,
            demand,
            free,
            peers,
            chosen: vec![0; task_count],
            next: vec![0; task_count],
            load: vec![0; node_count],
            depth: 0,
            start: Instant::now(),
            time_budget: config.time_budget,
            step_budget: config.step_budget.unwrap_or(u64::MAX),
            steps: 0,
            exhausted: false,
            out_of_budget: false,
        }
    }

    /// Charge one branch point against the budget. The wall clock is
    /// polled on the first step and every 64th after that.
    fn budget_hit(&mut self) -> bool {
        if self.steps >= self.step_budget {
            return true;
        }
        self.steps += 1;
        self.steps & 63 == 1 && self.start.elapsed() >= self.time_budget
    }

    /// `task` can land on `node`: capacity holds for every kind and no
    /// placed anti-affinity peer is already there.
    fn fits(&self, task: usize, node: usize) -> bool {
        for kind in 0..self.kind_count {
            if self.demand[task][kind] > self.free[node][kind] {
                return false;
            }
        }
        self.peers[task]
            .iter()
            .all(|&peer| peer >= task || self.chosen[peer] != node)
    }

    fn place(&mut self, task: usize, node: usize) {
        for kind in 0..self.kind_count {
            self.free[node][kind] -= self.demand[task][kind];
        }
        self.chosen[task] = node;
        self.load[node] += 1;
    }

    fn unplace(&mut self, task: usize, node: usize) {
        for kind in 0..self.kind_count {
            self.free[node][kind] += self.demand[task][kind];
        }
        self.load[node] -= 1;
    }

    /// Undo the deepest placement so the search can take the next branch.
    /// False once the whole tree is consumed.
    fn retreat(&mut self) -> bool {
        if self.depth == 0 {
            return false;
        }
        self.depth -= 1;
        let task = self.depth;
        self.unplace(task, self.chosen[task]);
        true
    }

    /// Resume the search and return the next complete assignment.
    fn next_solution(&mut self) -> Option<Assignment> {
        if self.exhausted || self.out_of_budget {
            return None;
        }
        loop {
            if self.budget_hit() {
                self.out_of_budget = true;
                warn!(steps = self.steps, "search budget exhausted");
                return None;
            }

            if self.depth == self.task_count {
                let found = Assignment::new(self.chosen.clone());
                debug_assert!(self.model.verify(&found).is_ok());
                debug!(steps = self.steps, "assignment found");
                if !self.retreat() {
                    self.exhausted = true;
                }
                return Some(found);
            }

            let task = self.depth;
            let mut advanced = false;
            while self.next[task] < self.node_count {
                let node = self.next[task];
                self.next[task] += 1;
                if self.fits(task, node) {
                    self.place(task, node);
                    self.depth += 1;
                    if self.depth < self.task_count {
                        self.next[self.depth] = 0;
                    }
                    advanced = true;
                    break;
                }
            }

            if !advanced && !self.retreat() {
                self.exhausted = true;
                return None;
            }
        }
    }

    /// Branch-and-bound on the active-node count.
    fn minimize(&mut self) -> Outcome {
        let mut best: Option<Assignment> = None;
        // Seed the bound from the model's redundant active-count limit.
        let limit = self.model.active_bound().unwrap_or(self.node_count);
        let mut best_active = limit + 1;

        self.branch(0, 0, &mut best, &mut best_active);

        match (best, self.out_of_budget) {
            (Some(assignment), false) => Outcome::Optimal(assignment),
            (Some(assignment), true) => {
                warn!(
                    active = best_active,
                    "budget exhausted before proving optimality"
                );
                Outcome::Feasible(assignment)
            }
            (None, true) => Outcome::TimedOut,
            (None, false) => Outcome::Infeasible,
        }
    }

    fn branch(
        &mut self,
        task: usize,
        active: usize,
        best: &mut Option<Assignment>,
        best_active: &mut usize,
    ) {
        if self.out_of_budget {
            return;
        }
        if self.budget_hit() {
            self.out_of_budget = true;
            warn!(steps = self.steps, "search budget exhausted");
            return;
        }
        if active >= *best_active {
            return;
        }
        if task == self.task_count {
            *best_active = active;
            *best = Some(Assignment::new(self.chosen.clone()));
            debug!(active, steps = self.steps, "new incumbent");
            return;
        }

        for node in 0..self.node_count {
            if self.out_of_budget {
                return;
            }
            if !self.fits(task, node) {
                continue;
            }
            let newly_active = self.load[node] == 0;
            if newly_active && active + 1 >= *best_active {
                continue;
            }
            self.place(task, node);
            self.branch(task + 1, active + usize::from(newly_active), best, best_active);
            self.unplace(task, node);
        }
    }
}
