//! Task-to-node assignment
//!
//! Planning is a pure function so it can be tested without a store; the
//! scheduler applies the plan with conditional updates.

/// Pair every task with a node, cycling through `nodes` in order
///
/// Task `i` goes to node `i mod n`. Each task appears exactly once in the
/// plan; an empty node list yields an empty plan.
pub fn round_robin<'a, T, N>(tasks: &'a [T], nodes: &'a [N]) -> Vec<(&'a T, &'a N)> {
    if nodes.is_empty() {
        return Vec::new();
    }

    tasks
        .iter()
        .enumerate()
        .map(|(i, task)| (task, &nodes[i % nodes.len()]))
        .collect()
}

/// How many tasks each node receives when `tasks` are spread over `nodes`
pub fn expected_load(tasks: usize, nodes: usize, node_index: usize) -> usize {
    if nodes == 0 || node_index >= nodes {
        return 0;
    }
    tasks / nodes + usize::from(node_index < tasks % nodes)
}
