// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Acyclicity check for the wiring of a pipeline.
//!
//! Uses Kahn's algorithm on the following-nodes adjacency: repeatedly remove
//! tasks with no remaining upstream edges. Tasks that are never removed sit on,
//! or downstream of, a cycle and are reported by name.

use std::collections::VecDeque;

use crate::errors::PipelineError;

/// Returns the tasks in a topological order, or `CyclicGraph` naming the tasks
/// that could not be ordered.
pub(crate) fn topological_order(
    names: &[String],
    following: &[Vec<usize>],
) -> Result<Vec<usize>, PipelineError> {
    let node_count = following.len();
    let mut in_degrees = vec![0usize; node_count];
    for targets in following {
        for &target in targets {
            in_degrees[target] += 1;
        }
    }

    let mut queue: VecDeque<usize> = (0..node_count)
        .filter(|&node| in_degrees[node] == 0)
        .collect();
    let mut order = Vec::with_capacity(node_count);

    while let Some(node) = queue.pop_front() {
        order.push(node);
        for &target in &following[node] {
            in_degrees[target] -= 1;
            if in_degrees[target] == 0 {
                queue.push_back(target);
            }
        }
    }

    if order.len() != node_count {
        let tasks = (0..node_count)
            .filter(|&node| in_degrees[node] > 0)
            .map(|node| names[node].clone())
            .collect();
        return Err(PipelineError::CyclicGraph { tasks });
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(count: usize) -> Vec<String> {
        (0..count).map(|i| format!("t{}", i)).collect()
    }

    #[test]
    fn test_empty_graph() {
        assert_eq!(topological_order(&[], &[]).unwrap(), Vec::<usize>::new());
    }

    #[test]
    fn test_diamond() {
        let following = vec![vec![1, 2], vec![3], vec![3], vec![]];
        let order = topological_order(&names(4), &following).unwrap();
        assert_eq!(order[0], 0);
        assert_eq!(order[3], 3);
    }

    #[test]
    fn test_self_loop() {
        let following = vec![vec![0]];
        match topological_order(&names(1), &following) {
            Err(PipelineError::CyclicGraph { tasks }) => assert_eq!(tasks, vec!["t0"]),
            other => panic!("expected a cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_cycle_reports_blocked_tasks_only() {
        // t0 -> t1 -> t2 -> t1, t2 -> t3
        let following = vec![vec![1], vec![2], vec![1, 3], vec![]];
        match topological_order(&names(4), &following) {
            Err(PipelineError::CyclicGraph { tasks }) => {
                assert_eq!(tasks, vec!["t1", "t2", "t3"])
            }
            other => panic!("expected a cycle, got {:?}", other),
        }
    }
}
