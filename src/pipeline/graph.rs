// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use crate::engine::container::TaskContainer;
use crate::engine::queue::InputWaker;
use crate::pipeline::export::GraphDescription;

/// The immutable runtime graph produced by [`Pipeline::build`](super::Pipeline::build).
///
/// Containers are indexed by the order in which their tasks were added. The
/// graph outlives individual runs: queues drain and refill, containers stay.
pub struct TaskGraph {
    containers: Vec<Arc<TaskContainer>>,
    waker: Arc<InputWaker>,
}

impl TaskGraph {
    pub(crate) fn new(containers: Vec<Arc<TaskContainer>>, waker: Arc<InputWaker>) -> Self {
        Self { containers, waker }
    }

    pub fn len(&self) -> usize {
        self.containers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    pub fn containers(&self) -> &[Arc<TaskContainer>] {
        &self.containers
    }

    pub fn container(&self, index: usize) -> Option<&Arc<TaskContainer>> {
        self.containers.get(index)
    }

    /// Number of following-node edges.
    pub fn edge_count(&self) -> usize {
        self.containers
            .iter()
            .map(|container| container.following().len())
            .sum()
    }

    pub fn external_input_count(&self) -> usize {
        self.containers
            .iter()
            .flat_map(|container| container.sources())
            .filter(|source| **source == crate::engine::container::InputSource::External)
            .count()
    }

    pub fn describe(&self) -> GraphDescription {
        GraphDescription::of(&self.containers)
    }

    pub fn to_dot(&self) -> String {
        self.describe().to_dot()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        self.describe().to_json()
    }

    pub(crate) fn waker(&self) -> &Arc<InputWaker> {
        &self.waker
    }
}

impl std::fmt::Debug for TaskGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("TaskGraph")
            .field("containers", &self.containers)
            .finish()
    }
}
