//! Solution extraction — raw assignments into grouped results.

use serde::{Deserialize, Serialize};

use gridplan_model::ResourceMatrix;

use crate::error::PlanError;
use crate::model::Assignment;

/// Tasks assigned to one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeGroup {
    pub node_id: String,
    pub task_ids: Vec<String>,
}

/// A grouped task→node result: one entry per node hosting at least one
/// task, nodes in input order, tasks within a node in input order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Placement {
    pub groups: Vec<NodeGroup>,
}

impl Placement {
    /// Number of nodes hosting at least one task.
    pub fn active_nodes(&self) -> usize {
        self.groups.len()
    }

    /// The node a task landed on, if any.
    pub fn node_of(&self, task_id: &str) -> Option<&str> {
        self.groups
            .iter()
            .find(|g| g.task_ids.iter().any(|t| t == task_id))
            .map(|g| g.node_id.as_str())
    }
}

/// Group the assignment's "on" (task, node) pairs by node.
///
/// Re-verifies that every task lands in exactly one group. With a valid
/// search result this cannot fail; a failure is an internal consistency
/// fault of the engine, never a property of the input.
pub fn extract(matrix: &ResourceMatrix, assignment: &Assignment) -> Result<Placement, PlanError> {
    if assignment.task_count() != matrix.task_count() {
        return Err(PlanError::Internal(format!(
            "assignment covers {} tasks, model has {}",
            assignment.task_count(),
            matrix.task_count()
        )));
    }

    let mut seen = vec![false; matrix.task_count()];
    let mut groups = Vec::new();

    for node in 0..matrix.node_count() {
        let mut task_ids = Vec::new();
        for task in 0..matrix.task_count() {
            if assignment.node_of(task) == node {
                if seen[task] {
                    return Err(PlanError::Internal(format!(
                        "task {} appears in more than one group",
                        matrix.task_id(task)
                    )));
                }
                seen[task] = true;
                task_ids.push(matrix.task_id(task).to_string());
            }
        }
        if !task_ids.is_empty() {
            groups.push(NodeGroup {
                node_id: matrix.node_id(node).to_string(),
                task_ids,
            });
        }
    }

    if let Some(task) = seen.iter().position(|placed| !placed) {
        return Err(PlanError::Internal(format!(
            "task {} missing from every group",
            matrix.task_id(task)
        )));
    }

    Ok(Placement { groups })
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridplan_model::{NodeSpec, ResourceKind, TaskSpec};
    use std::collections::BTreeMap;

    fn res(cpu: u64) -> BTreeMap<ResourceKind, u64> {
        [(ResourceKind::from("cpu"), cpu)].into()
    }

    fn make_matrix(node_count: usize, task_count: usize) -> ResourceMatrix {
        let nodes: Vec<NodeSpec> = (0..node_count)
            .map(|i| NodeSpec::new(format!("n{i}"), res(100)))
            .collect();
        let tasks: Vec<TaskSpec> = (0..task_count)
            .map(|i| TaskSpec::new(format!("t{i}"), res(1)))
            .collect();
        ResourceMatrix::build(&nodes, &tasks).unwrap()
    }

    #[test]
    fn groups_follow_input_order() {
        let matrix = make_matrix(3, 4);
        // t0→n2, t1→n0, t2→n2, t3→n0; n1 hosts nothing.
        let placement = extract(&matrix, &Assignment::new(vec![2, 0, 2, 0])).unwrap();

        assert_eq!(placement.active_nodes(), 2);
        assert_eq!(placement.groups[0].node_id, "n0");
        assert_eq!(placement.groups[0].task_ids, vec!["t1", "t3"]);
        assert_eq!(placement.groups[1].node_id, "n2");
        assert_eq!(placement.groups[1].task_ids, vec!["t0", "t2"]);
    }

    #[test]
    fn empty_nodes_are_omitted() {
        let matrix = make_matrix(2, 1);
        let placement = extract(&matrix, &Assignment::new(vec![1])).unwrap();

        assert_eq!(placement.active_nodes(), 1);
        assert_eq!(placement.groups[0].node_id, "n1");
        assert_eq!(placement.node_of("t0"), Some("n1"));
        assert_eq!(placement.node_of("missing"), None);
    }

    #[test]
    fn rejects_assignment_of_wrong_arity() {
        let matrix = make_matrix(2, 2);
        let err = extract(&matrix, &Assignment::new(vec![0])).unwrap_err();
        assert!(matches!(err, PlanError::Internal(_)));
    }

    #[test]
    fn rejects_out_of_range_node_index() {
        let matrix = make_matrix(2, 1);
        // Node 7 does not exist, so t0 lands in no group.
        let err = extract(&matrix, &Assignment::new(vec![7])).unwrap_err();
        assert!(matches!(err, PlanError::Internal(_)));
    }
}
