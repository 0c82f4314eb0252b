//! Constraint model construction.
//!
//! Translates the validated resource matrix into an explicit variable table
//! and typed constraint list. One bounded integer variable exists per
//! (task, node, kind) triple; reified boolean indicators are expressed as
//! [`Constraint::Atomic`] (value is the full demand or zero) and
//! [`Constraint::Correlated`] (all kinds of a (task, node) pair agree).
//! Correlation is posted for EVERY unordered kind pair, so a task's
//! presence on a node is resource-agnostic — a task can never dodge an
//! exclusion constraint by having zero demand for one designated kind.

use std::fmt;

use tracing::debug;

use gridplan_model::{ExclusionPair, ResourceMatrix};

use crate::error::ModelBuildError;

/// Index of a decision variable in the model's variable table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VarId(pub usize);

/// A bounded integer decision variable: how much of one resource kind a
/// task consumes on a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocVar {
    pub task: usize,
    pub node: usize,
    pub kind: usize,
    /// Upper bound: the largest capacity any node offers for this kind.
    pub upper: u64,
}

/// A typed constraint over the variable table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// The variable is either the task's full demand or exactly zero.
    Atomic { var: VarId, demand: u64 },
    /// Summed over all nodes, the task's allocation equals its demand.
    Exact {
        task: usize,
        kind: usize,
        vars: Vec<VarId>,
        demand: u64,
    },
    /// Summed over all tasks, a node's allocation stays within capacity.
    Capacity {
        node: usize,
        kind: usize,
        vars: Vec<VarId>,
        capacity: u64,
    },
    /// The presence indicators of two kinds agree for one (task, node).
    Correlated {
        task: usize,
        node: usize,
        kind_a: usize,
        kind_b: usize,
    },
    /// The two tasks may not both be present on the node.
    Exclusion {
        first: usize,
        second: usize,
        node: usize,
    },
    /// The node's active indicator is true iff it hosts at least one task.
    ActiveNode { node: usize },
    /// Redundant pruning bound: at most `limit` nodes can be active.
    ActiveBound { limit: usize },
}

/// A raw solution: the hosting node chosen for each task.
///
/// Atomicity and full correlation collapse a task's variables to a single
/// hosting choice, so the raw assignment is a task→node vector; variable
/// values are derived from it (full demand when hosted, zero otherwise).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    task_node: Vec<usize>,
}

impl Assignment {
    pub fn new(task_node: Vec<usize>) -> Self {
        Self { task_node }
    }

    pub fn task_count(&self) -> usize {
        self.task_node.len()
    }

    /// The node hosting `task`.
    pub fn node_of(&self, task: usize) -> usize {
        self.task_node[task]
    }

    /// Value the assignment gives a decision variable.
    pub fn value(&self, var: &AllocVar, matrix: &ResourceMatrix) -> u64 {
        if self.task_node[var.task] == var.node {
            matrix.demand(var.kind, var.task)
        } else {
            0
        }
    }
}

/// Why an assignment fails verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstraintViolation {
    /// The assignment does not cover the model's task set.
    Arity { expected: usize, actual: usize },
    /// A constraint the assignment fails to satisfy.
    Unsatisfied(Constraint),
}

impl fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintViolation::Arity { expected, actual } => {
                write!(f, "assignment covers {actual} tasks, model has {expected}")
            }
            ConstraintViolation::Unsatisfied(constraint) => {
                write!(f, "constraint violated: {constraint:?}")
            }
        }
    }
}

/// The solvable constraint system for one placement problem.
///
/// Built fresh per solve from an immutable [`ResourceMatrix`]; holds no
/// state beyond a single solve call.
#[derive(Debug, Clone)]
pub struct ConstraintModel {
    matrix: ResourceMatrix,
    vars: Vec<AllocVar>,
    constraints: Vec<Constraint>,
    exclusions: Vec<ExclusionPair>,
    minimize: bool,
    active_bound: Option<usize>,
}

impl ConstraintModel {
    /// Build variables and constraints from the matrix.
    ///
    /// Infeasibility is never a build error; only internal invariant
    /// violations (out-of-range exclusion indices, variable table size
    /// mismatch) fail here.
    pub fn build(
        matrix: ResourceMatrix,
        exclusions: Vec<ExclusionPair>,
        minimize: bool,
    ) -> Result<Self, ModelBuildError> {
        let tasks = matrix.task_count();
        let nodes = matrix.node_count();
        let kinds = matrix.kind_count();

        for &(first, second) in &exclusions {
            if first >= tasks || second >= tasks {
                return Err(ModelBuildError::ExclusionOutOfRange {
                    first,
                    second,
                    tasks,
                });
            }
        }

        let mut vars = Vec::with_capacity(tasks * nodes * kinds);
        let mut constraints = Vec::new();

        for task in 0..tasks {
            for node in 0..nodes {
                for kind in 0..kinds {
                    let var = VarId(vars.len());
                    vars.push(AllocVar {
                        task,
                        node,
                        kind,
                        upper: matrix.max_capacity(kind),
                    });
                    constraints.push(Constraint::Atomic {
                        var,
                        demand: matrix.demand(kind, task),
                    });
                }
            }
        }

        if vars.len() != tasks * nodes * kinds {
            return Err(ModelBuildError::VarTableMismatch {
                expected: tasks * nodes * kinds,
                actual: vars.len(),
            });
        }

        let var_id = |task: usize, node: usize, kind: usize| VarId((task * nodes + node) * kinds + kind);

        for task in 0..tasks {
            for kind in 0..kinds {
                constraints.push(Constraint::Exact {
                    task,
                    kind,
                    vars: (0..nodes).map(|node| var_id(task, node, kind)).collect(),
                    demand: matrix.demand(kind, task),
                });
            }
        }

        for node in 0..nodes {
            for kind in 0..kinds {
                constraints.push(Constraint::Capacity {
                    node,
                    kind,
                    vars: (0..tasks).map(|task| var_id(task, node, kind)).collect(),
                    capacity: matrix.capacity(kind, node),
                });
            }
        }

        // Every unordered kind pair, not one designated pair.
        for task in 0..tasks {
            for node in 0..nodes {
                for kind_a in 0..kinds {
                    for kind_b in kind_a + 1..kinds {
                        constraints.push(Constraint::Correlated {
                            task,
                            node,
                            kind_a,
                            kind_b,
                        });
                    }
                }
            }
        }

        for &(first, second) in &exclusions {
            for node in 0..nodes {
                constraints.push(Constraint::Exclusion {
                    first,
                    second,
                    node,
                });
            }
        }

        let mut active_bound = None;
        if minimize {
            for node in 0..nodes {
                constraints.push(Constraint::ActiveNode { node });
            }
            constraints.push(Constraint::ActiveBound { limit: nodes });
            active_bound = Some(nodes);
        }

        debug!(
            vars = vars.len(),
            constraints = constraints.len(),
            exclusions = exclusions.len(),
            minimize,
            "built constraint model"
        );

        Ok(Self {
            matrix,
            vars,
            constraints,
            exclusions,
            minimize,
            active_bound,
        })
    }

    pub fn matrix(&self) -> &ResourceMatrix {
        &self.matrix
    }

    pub fn vars(&self) -> &[AllocVar] {
        &self.vars
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn exclusions(&self) -> &[ExclusionPair] {
        &self.exclusions
    }

    pub fn minimize(&self) -> bool {
        self.minimize
    }

    /// Redundant upper bound on the active-node count, present in
    /// minimize mode.
    pub fn active_bound(&self) -> Option<usize> {
        self.active_bound
    }

    /// Variable index for a (task, node, kind) triple.
    pub fn var_id(&self, task: usize, node: usize, kind: usize) -> VarId {
        VarId((task * self.matrix.node_count() + node) * self.matrix.kind_count() + kind)
    }

    /// Check an assignment against every constraint in the model.
    ///
    /// Used as the extractor's defensive re-check and by tests that
    /// re-verify returned solutions instead of trusting the search.
    pub fn verify(&self, assignment: &Assignment) -> Result<(), ConstraintViolation> {
        if assignment.task_count() != self.matrix.task_count() {
            return Err(ConstraintViolation::Arity {
                expected: self.matrix.task_count(),
                actual: assignment.task_count(),
            });
        }
        for constraint in &self.constraints {
            let satisfied = match constraint {
                Constraint::Atomic { var, demand } => {
                    let value = assignment.value(&self.vars[var.0], &self.matrix);
                    value == 0 || value == *demand
                }
                Constraint::Exact { vars, demand, .. } => {
                    let total: u64 = vars
                        .iter()
                        .map(|v| assignment.value(&self.vars[v.0], &self.matrix))
                        .sum();
                    total == *demand
                }
                Constraint::Capacity { vars, capacity, .. } => {
                    // Summed in u128: many over-packed tasks can exceed
                    // u64 before the comparison catches them.
                    let total: u128 = vars
                        .iter()
                        .map(|v| u128::from(assignment.value(&self.vars[v.0], &self.matrix)))
                        .sum();
                    total <= u128::from(*capacity)
                }
                Constraint::Correlated {
                    task,
                    node,
                    kind_a,
                    kind_b,
                } => {
                    self.indicator(assignment, *task, *node, *kind_a)
                        == self.indicator(assignment, *task, *node, *kind_b)
                }
                Constraint::Exclusion {
                    first,
                    second,
                    node,
                } => {
                    !(assignment.node_of(*first) == *node && assignment.node_of(*second) == *node)
                }
                // Definitional: the indicator is derived from the
                // assignment, so there is nothing to contradict.
                Constraint::ActiveNode { .. } => true,
                Constraint::ActiveBound { limit } => {
                    let mut hosting = vec![false; self.matrix.node_count()];
                    for task in 0..assignment.task_count() {
                        hosting[assignment.node_of(task)] = true;
                    }
                    hosting.iter().filter(|h| **h).count() <= *limit
                }
            };
            if !satisfied {
                return Err(ConstraintViolation::Unsatisfied(constraint.clone()));
            }
        }
        Ok(())
    }

    /// Presence indicator for one kind of a (task, node) pair. A
    /// zero-demand kind follows the hosting choice, so presence stays
    /// resource-agnostic.
    fn indicator(&self, assignment: &Assignment, task: usize, node: usize, kind: usize) -> bool {
        let demand = self.matrix.demand(kind, task);
        if demand == 0 {
            assignment.node_of(task) == node
        } else {
            assignment.value(&self.vars[self.var_id(task, node, kind).0], &self.matrix) == demand
        }
    }
}
