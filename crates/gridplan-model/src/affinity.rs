//! Anti-affinity label expansion.
//!
//! Tasks sharing a label form a group in which every pair is mutually
//! exclusive. Expansion turns the label sets into a flat, de-duplicated
//! list of task-index pairs the solver posts exclusion constraints for.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::resources::TaskSpec;

/// An unordered pair of task indices that must not share a node.
/// Always stored `(lo, hi)` with `lo < hi`.
pub type ExclusionPair = (usize, usize);

/// Expand label groups into pairwise exclusion pairs.
///
/// Tasks without labels contribute nothing. Two tasks sharing several
/// labels still yield a single pair. Output is sorted and de-duplicated;
/// empty input yields an empty list.
pub fn expand_exclusions(tasks: &[TaskSpec]) -> Vec<ExclusionPair> {
    let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (idx, task) in tasks.iter().enumerate() {
        for label in &task.anti_affinity_labels {
            groups.entry(label.as_str()).or_default().push(idx);
        }
    }

    let mut pairs: BTreeSet<ExclusionPair> = BTreeSet::new();
    for members in groups.values() {
        for (i, &a) in members.iter().enumerate() {
            for &b in &members[i + 1..] {
                // A task repeating a label must not pair with itself.
                if a != b {
                    pairs.insert((a.min(b), a.max(b)));
                }
            }
        }
    }

    debug!(
        labels = groups.len(),
        pairs = pairs.len(),
        "expanded anti-affinity labels"
    );

    pairs.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{ResourceKind, TaskSpec};
    use std::collections::BTreeMap;

    fn make_task(id: &str, labels: &[&str]) -> TaskSpec {
        let demand: BTreeMap<ResourceKind, u64> = [(ResourceKind::from("cpu"), 1)].into();
        TaskSpec::new(id, demand).with_labels(labels.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn no_labels_no_pairs() {
        let tasks = vec![make_task("t0", &[]), make_task("t1", &[])];
        assert!(expand_exclusions(&tasks).is_empty());
    }

    #[test]
    fn empty_input_yields_empty() {
        assert!(expand_exclusions(&[]).is_empty());
    }

    #[test]
    fn single_member_group_emits_nothing() {
        let tasks = vec![make_task("t0", &["ha"]), make_task("t1", &[])];
        assert!(expand_exclusions(&tasks).is_empty());
    }

    #[test]
    fn group_of_three_emits_all_pairs() {
        let tasks = vec![
            make_task("t0", &["ha"]),
            make_task("t1", &["ha"]),
            make_task("t2", &["ha"]),
        ];
        assert_eq!(expand_exclusions(&tasks), vec![(0, 1), (0, 2), (1, 2)]);
    }

    #[test]
    fn shared_labels_deduplicate() {
        // t0 and t1 share two labels but exclude each other only once.
        let tasks = vec![make_task("t0", &["ha", "zone"]), make_task("t1", &["ha", "zone"])];
        assert_eq!(expand_exclusions(&tasks), vec![(0, 1)]);
    }

    #[test]
    fn repeated_label_on_one_task_is_not_a_self_pair() {
        let tasks = vec![make_task("t0", &["ha", "ha"]), make_task("t1", &["ha"])];
        assert_eq!(expand_exclusions(&tasks), vec![(0, 1)]);
    }

    #[test]
    fn disjoint_groups_stay_disjoint() {
        let tasks = vec![
            make_task("t0", &["a"]),
            make_task("t1", &["a"]),
            make_task("t2", &["b"]),
            make_task("t3", &["b"]),
        ];
        assert_eq!(expand_exclusions(&tasks), vec![(0, 1), (2, 3)]);
    }
}
