//! End-to-end placement scenarios.
//!
//! Each test re-verifies the returned placement against the raw inputs
//! (exactness, capacity, anti-affinity) instead of trusting the search.

use std::collections::BTreeMap;

use gridplan_model::{NodeSpec, ResourceKind, TaskSpec};
use gridplan_solver::{EnumerationOutcome, PlanOutcome, PlanRequest, Placement, plan, plan_all};

fn res(pairs: &[(&str, u64)]) -> BTreeMap<ResourceKind, u64> {
    pairs
        .iter()
        .map(|(k, v)| (ResourceKind::from(*k), *v))
        .collect()
}

fn make_node(id: &str, mem: u64, cpu: u64, disk: u64) -> NodeSpec {
    NodeSpec::new(id, res(&[("memory", mem), ("cpu", cpu), ("disk", disk)]))
}

fn make_task(id: &str, mem: u64, cpu: u64, disk: u64) -> TaskSpec {
    TaskSpec::new(id, res(&[("memory", mem), ("cpu", cpu), ("disk", disk)]))
}

/// Check exactness, capacity, and anti-affinity directly against the
/// input records.
fn check_placement(placement: &Placement, nodes: &[NodeSpec], tasks: &[TaskSpec]) {
    // Exactness: every task appears in exactly one group.
    for task in tasks {
        let hosting: Vec<&str> = placement
            .groups
            .iter()
            .filter(|g| g.task_ids.contains(&task.id))
            .map(|g| g.node_id.as_str())
            .collect();
        assert_eq!(hosting.len(), 1, "task {} hosted {} times", task.id, hosting.len());
    }

    // Capacity: per node and kind, hosted demand within capacity.
    for group in &placement.groups {
        let node = nodes.iter().find(|n| n.id == group.node_id).unwrap();
        for (kind, capacity) in &node.capacity {
            let used: u64 = group
                .task_ids
                .iter()
                .map(|id| tasks.iter().find(|t| &t.id == id).unwrap().demand[kind])
                .sum();
            assert!(
                used <= *capacity,
                "node {} over capacity for {kind}: {used} > {capacity}",
                group.node_id
            );
        }
    }

    // Anti-affinity: labelled peers never share a group.
    for group in &placement.groups {
        for (i, a) in group.task_ids.iter().enumerate() {
            for b in &group.task_ids[i + 1..] {
                let ta = tasks.iter().find(|t| &t.id == a).unwrap();
                let tb = tasks.iter().find(|t| &t.id == b).unwrap();
                let shared = ta
                    .anti_affinity_labels
                    .iter()
                    .any(|l| tb.anti_affinity_labels.contains(l));
                assert!(!shared, "{a} and {b} share a label on {}", group.node_id);
            }
        }
    }
}

#[test]
fn single_task_lands_on_the_only_node() {
    let nodes = vec![make_node("node-1", 32, 12, 1000)];
    let tasks = vec![make_task("app-1", 12, 2, 1000)];

    let outcome = plan(&nodes, &tasks, PlanRequest::default()).unwrap();
    let placement = outcome.placement().expect("should place");

    assert_eq!(placement.groups.len(), 1);
    assert_eq!(placement.groups[0].node_id, "node-1");
    assert_eq!(placement.groups[0].task_ids, vec!["app-1"]);
    check_placement(placement, &nodes, &tasks);
}

#[test]
fn memory_shortfall_is_infeasible() {
    // Three tasks want 12 memory total against a capacity of 8.
    let nodes = vec![make_node("node-1", 8, 16, 1000)];
    let tasks = vec![
        make_task("app-1", 4, 4, 100),
        make_task("app-2", 4, 4, 100),
        make_task("app-3", 4, 4, 100),
    ];

    assert_eq!(
        plan(&nodes, &tasks, PlanRequest::default()).unwrap(),
        PlanOutcome::Infeasible
    );
}

#[test]
fn anti_affinity_pair_on_a_single_node_is_infeasible() {
    // Plenty of capacity, but the pair may not co-reside and there is
    // nowhere else to go.
    let nodes = vec![make_node("node-1", 128, 24, 1000)];
    let tasks = vec![
        make_task("app-1", 2, 4, 10).with_labels(vec!["label-1".to_string()]),
        make_task("app-2", 4, 8, 10).with_labels(vec!["label-1".to_string()]),
    ];

    assert_eq!(
        plan(&nodes, &tasks, PlanRequest::default()).unwrap(),
        PlanOutcome::Infeasible
    );
}

fn cluster_of_ten() -> (Vec<NodeSpec>, Vec<TaskSpec>) {
    let mem_caps = [32, 32, 32, 16];
    let cpu_caps = [10, 12, 8, 12];
    let nodes = (0..4)
        .map(|i| {
            NodeSpec::new(
                format!("node-{i}"),
                res(&[("memory", mem_caps[i]), ("cpu", cpu_caps[i])]),
            )
        })
        .collect();

    let mem = [4, 8, 12, 16, 2, 8, 16, 10, 4, 8];
    let cpu = [2, 4, 12, 8, 1, 2, 4, 4, 2, 2];
    let mut tasks: Vec<TaskSpec> = (0..10)
        .map(|i| {
            TaskSpec::new(
                format!("app-{i}"),
                res(&[("memory", mem[i]), ("cpu", cpu[i])]),
            )
        })
        .collect();

    // Exclusion pairs (1,4), (3,7), (3,4), (6,8), expressed as labels.
    for (label, members) in [
        ("pair-a", [1usize, 4]),
        ("pair-b", [3, 7]),
        ("pair-c", [3, 4]),
        ("pair-d", [6, 8]),
    ] {
        for idx in members {
            tasks[idx].anti_affinity_labels.push(label.to_string());
        }
    }

    (nodes, tasks)
}

#[test]
fn ten_tasks_pack_onto_four_nodes() {
    let (nodes, tasks) = cluster_of_ten();
    let request = PlanRequest {
        minimize: false,
        ..PlanRequest::default()
    };

    let outcome = plan(&nodes, &tasks, request).unwrap();
    let placement = outcome.placement().expect("a feasible assignment exists");
    check_placement(placement, &nodes, &tasks);
}

#[test]
fn ten_task_cluster_minimizes_active_nodes() {
    let (nodes, tasks) = cluster_of_ten();

    let outcome = plan(&nodes, &tasks, PlanRequest::default()).unwrap();
    match outcome {
        PlanOutcome::Optimal(placement) => {
            check_placement(&placement, &nodes, &tasks);
            // The cpu demand of app-2 alone pins one node, and the
            // remaining demand cannot squeeze below four nodes.
            assert_eq!(placement.active_nodes(), 4);
        }
        other => panic!("expected optimal, got {other:?}"),
    }
}

#[test]
fn minimization_never_uses_more_nodes_than_any_feasible_plan() {
    let nodes = vec![
        make_node("node-1", 32, 16, 1000),
        make_node("node-2", 32, 16, 1000),
        make_node("node-3", 32, 16, 1000),
    ];
    let tasks = vec![
        make_task("app-1", 4, 4, 100),
        make_task("app-2", 4, 4, 100),
        make_task("app-3", 4, 4, 100),
    ];

    // Every feasible plan enumerated must use at least as many nodes as
    // the minimized one.
    let minimized = plan(&nodes, &tasks, PlanRequest::default()).unwrap();
    let best = match &minimized {
        PlanOutcome::Optimal(p) => p.active_nodes(),
        other => panic!("expected optimal, got {other:?}"),
    };
    assert_eq!(best, 1);

    match plan_all(&nodes, &tasks, PlanRequest::default()).unwrap() {
        EnumerationOutcome::Placements(all) => {
            assert!(!all.is_empty());
            for placement in &all {
                check_placement(placement, &nodes, &tasks);
                assert!(placement.active_nodes() >= best);
            }
        }
        other => panic!("expected placements, got {other:?}"),
    }
}

#[test]
fn resolving_identical_input_stays_valid() {
    let (nodes, tasks) = cluster_of_ten();
    let request = PlanRequest {
        minimize: false,
        ..PlanRequest::default()
    };

    // Not necessarily bit-identical across runs, but always valid.
    for _ in 0..3 {
        let outcome = plan(&nodes, &tasks, request.clone()).unwrap();
        check_placement(outcome.placement().unwrap(), &nodes, &tasks);
    }
}

#[test]
fn multi_node_single_task_lands_somewhere() {
    let nodes = vec![
        make_node("node-1", 32, 16, 1000),
        make_node("node-2", 32, 16, 1000),
    ];
    let tasks = vec![make_task("app-1", 12, 12, 500)];

    let outcome = plan(&nodes, &tasks, PlanRequest::default()).unwrap();
    let placement = outcome.placement().unwrap();

    let host = placement.node_of("app-1").unwrap();
    assert!(host == "node-1" || host == "node-2");
    check_placement(placement, &nodes, &tasks);
}

#[test]
fn three_tasks_fit_one_node() {
    let nodes = vec![make_node("node-1", 32, 16, 1000)];
    let tasks = vec![
        make_task("app-1", 4, 4, 500),
        make_task("app-2", 4, 4, 100),
        make_task("app-3", 4, 4, 100),
    ];

    let outcome = plan(&nodes, &tasks, PlanRequest::default()).unwrap();
    let placement = outcome.placement().unwrap();

    assert_eq!(placement.groups.len(), 1);
    assert_eq!(
        placement.groups[0].task_ids,
        vec!["app-1", "app-2", "app-3"]
    );
    check_placement(placement, &nodes, &tasks);
}

#[test]
fn zero_demand_kind_cannot_bypass_anti_affinity() {
    // Neither task consumes any cpu, but presence on a node is decided
    // by the hosting choice, not by any single resource's allocation.
    let nodes = vec![make_node("node-1", 128, 24, 1000)];
    let tasks = vec![
        make_task("app-1", 2, 0, 10).with_labels(vec!["label-1".to_string()]),
        make_task("app-2", 4, 0, 10).with_labels(vec!["label-1".to_string()]),
    ];

    assert_eq!(
        plan(&nodes, &tasks, PlanRequest::default()).unwrap(),
        PlanOutcome::Infeasible
    );
}

#[test]
fn node_hosting_only_a_zero_demand_task_is_active() {
    // app-2 consumes nothing, but hosting it keeps its node active, so
    // the proven minimum here is two nodes, each with a group.
    let nodes = vec![
        make_node("node-1", 32, 16, 1000),
        make_node("node-2", 32, 16, 1000),
    ];
    let tasks = vec![
        make_task("app-1", 4, 4, 100).with_labels(vec!["label-1".to_string()]),
        make_task("app-2", 0, 0, 0).with_labels(vec!["label-1".to_string()]),
    ];

    match plan(&nodes, &tasks, PlanRequest::default()).unwrap() {
        PlanOutcome::Optimal(placement) => {
            assert_eq!(placement.active_nodes(), 2);
            assert!(placement.node_of("app-2").is_some());
            check_placement(&placement, &nodes, &tasks);
        }
        other => panic!("expected optimal, got {other:?}"),
    }
}

#[test]
fn anti_affinity_spreads_across_nodes() {
    let nodes = vec![
        make_node("node-1", 128, 24, 1000),
        make_node("node-2", 128, 24, 1000),
    ];
    let tasks = vec![
        make_task("app-1", 2, 4, 10).with_labels(vec!["label-1".to_string()]),
        make_task("app-2", 4, 8, 10).with_labels(vec!["label-1".to_string()]),
    ];

    let outcome = plan(&nodes, &tasks, PlanRequest::default()).unwrap();
    let placement = outcome.placement().unwrap();

    assert_ne!(placement.node_of("app-1"), placement.node_of("app-2"));
    check_placement(placement, &nodes, &tasks);
}
