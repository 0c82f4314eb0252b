//! Node/task records and the validated resource matrix.
//!
//! Nodes and tasks declare their capacities and demands as explicit maps
//! keyed by [`ResourceKind`]. Every entity in one problem instance must
//! declare the same kind set; [`ResourceMatrix::build`] checks this and
//! produces parallel per-kind vectors the solver indexes by position.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A named resource dimension (`cpu`, `memory`, `disk`, ...).
///
/// Open set: any string identifier works, as long as all nodes and tasks
/// in one instance agree on the same set.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceKind(String);

impl ResourceKind {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceKind {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

/// A capacity-bounded placement target.
///
/// Capacities are fixed for the lifetime of one solve. Quantities are
/// unsigned, so negative capacities are unrepresentable; the layer that
/// parses human-readable sizes owns that rejection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub id: String,
    pub capacity: BTreeMap<ResourceKind, u64>,
}

impl NodeSpec {
    pub fn new(id: impl Into<String>, capacity: BTreeMap<ResourceKind, u64>) -> Self {
        Self {
            id: id.into(),
            capacity,
        }
    }
}

/// A demand vector to be placed on exactly one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub id: String,
    pub demand: BTreeMap<ResourceKind, u64>,
    /// Tasks sharing a label may never co-reside on a node.
    #[serde(default)]
    pub anti_affinity_labels: Vec<String>,
}

impl TaskSpec {
    pub fn new(id: impl Into<String>, demand: BTreeMap<ResourceKind, u64>) -> Self {
        Self {
            id: id.into(),
            demand,
            anti_affinity_labels: Vec::new(),
        }
    }

    pub fn with_labels(mut self, labels: Vec<String>) -> Self {
        self.anti_affinity_labels = labels;
        self
    }
}

/// Validated parallel vectors over a fixed kind set.
///
/// Kind order is the sorted declaration order of the first node; node and
/// task order is input order. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceMatrix {
    kinds: Vec<ResourceKind>,
    node_ids: Vec<String>,
    task_ids: Vec<String>,
    /// capacity[kind][node]
    capacity: Vec<Vec<u64>>,
    /// demand[kind][task]
    demand: Vec<Vec<u64>>,
}

impl ResourceMatrix {
    /// Validate nodes/tasks and build the per-kind vectors.
    ///
    /// Fails if either list is empty, if any entity declares a kind set
    /// different from the first node's, or if ids repeat.
    pub fn build(nodes: &[NodeSpec], tasks: &[TaskSpec]) -> Result<Self, ValidationError> {
        if nodes.is_empty() {
            return Err(ValidationError::NoNodes);
        }
        if tasks.is_empty() {
            return Err(ValidationError::NoTasks);
        }

        let kinds: Vec<ResourceKind> = nodes[0].capacity.keys().cloned().collect();

        for node in nodes {
            check_kind_set(&node.id, node.capacity.keys(), &kinds)?;
        }
        for task in tasks {
            check_kind_set(&task.id, task.demand.keys(), &kinds)?;
        }

        let mut node_ids = Vec::with_capacity(nodes.len());
        for node in nodes {
            if node_ids.contains(&node.id) {
                return Err(ValidationError::DuplicateNodeId(node.id.clone()));
            }
            node_ids.push(node.id.clone());
        }

        let mut task_ids = Vec::with_capacity(tasks.len());
        for task in tasks {
            if task_ids.contains(&task.id) {
                return Err(ValidationError::DuplicateTaskId(task.id.clone()));
            }
            task_ids.push(task.id.clone());
        }

        let capacity = kinds
            .iter()
            .map(|k| nodes.iter().map(|n| n.capacity[k]).collect())
            .collect();
        let demand = kinds
            .iter()
            .map(|k| tasks.iter().map(|t| t.demand[k]).collect())
            .collect();

        Ok(Self {
            kinds,
            node_ids,
            task_ids,
            capacity,
            demand,
        })
    }

    pub fn kinds(&self) -> &[ResourceKind] {
        &self.kinds
    }

    pub fn kind_count(&self) -> usize {
        self.kinds.len()
    }

    pub fn node_count(&self) -> usize {
        self.node_ids.len()
    }

    pub fn task_count(&self) -> usize {
        self.task_ids.len()
    }

    pub fn node_id(&self, node: usize) -> &str {
        &self.node_ids[node]
    }

    pub fn task_id(&self, task: usize) -> &str {
        &self.task_ids[task]
    }

    /// Capacity of `node` for the `kind`-th resource.
    pub fn capacity(&self, kind: usize, node: usize) -> u64 {
        self.capacity[kind][node]
    }

    /// Demand of `task` for the `kind`-th resource.
    pub fn demand(&self, kind: usize, task: usize) -> u64 {
        self.demand[kind][task]
    }

    /// Largest capacity for a kind across all nodes — the upper bound for
    /// every allocation variable of that kind.
    pub fn max_capacity(&self, kind: usize) -> u64 {
        self.capacity[kind].iter().copied().max().unwrap_or(0)
    }
}

fn check_kind_set<'a>(
    entity: &str,
    declared: impl Iterator<Item = &'a ResourceKind>,
    expected: &[ResourceKind],
) -> Result<(), ValidationError> {
    let found: Vec<&ResourceKind> = declared.collect();
    if found.len() != expected.len() || !found.iter().zip(expected).all(|(a, b)| *a == b) {
        return Err(ValidationError::KindMismatch {
            entity: entity.to_string(),
            expected: join_kinds(expected.iter()),
            found: join_kinds(found.into_iter()),
        });
    }
    Ok(())
}

fn join_kinds<'a>(kinds: impl Iterator<Item = &'a ResourceKind>) -> String {
    kinds
        .map(ResourceKind::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
