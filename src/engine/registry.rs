// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::{validate_config, SchedulerConfig};
use crate::errors::{ConfigError, SchedulerError};
use crate::traits::{ThreadGroups, ANY_GROUP, MAIN_GROUP};

/// Lane of the shared worker pool.
pub const ANY_LANE: usize = 0;
/// Lane drained by the caller of `Scheduler::run`.
pub const MAIN_LANE: usize = 1;

/// A named lane and its number of dedicated worker threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lane {
    pub name: String,
    pub threads: usize,
}

/// The lanes a scheduler serves.
///
/// Lane `0` is `any`, lane `1` is `main` (no worker threads, served by the
/// caller of `run`); named lanes follow in configuration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadGroupRegistry {
    lanes: Vec<Lane>,
}

impl ThreadGroupRegistry {
    pub fn new(worker_threads: usize) -> Self {
        Self {
            lanes: vec![
                Lane {
                    name: ANY_GROUP.to_string(),
                    threads: worker_threads,
                },
                Lane {
                    name: MAIN_GROUP.to_string(),
                    threads: 0,
                },
            ],
        }
    }

    pub fn from_config(config: &SchedulerConfig) -> Result<Self, ConfigError> {
        if let Err(errors) = validate_config(config) {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            return Err(ConfigError::Invalid(messages.join("; ")));
        }

        let registry = config.thread_groups.iter().fold(
            Self::new(config.worker_threads()),
            |mut registry, group| {
                registry.lanes.push(Lane {
                    name: group.name.trim().to_string(),
                    threads: group.threads,
                });
                registry
            },
        );
        Ok(registry)
    }

    pub fn lanes(&self) -> &[Lane] {
        &self.lanes
    }

    pub fn len(&self) -> usize {
        self.lanes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }

    pub fn lane_index(&self, name: &str) -> Option<usize> {
        self.lanes.iter().position(|lane| lane.name == name)
    }

    pub fn lane_name(&self, lane: usize) -> &str {
        self.lanes.get(lane).map(|lane| lane.name.as_str()).unwrap_or("?")
    }

    /// Total number of worker threads across all lanes.
    pub fn worker_threads(&self) -> usize {
        self.lanes.iter().map(|lane| lane.threads).sum()
    }

    /// Resolves a task's thread groups to lane indices.
    pub fn resolve(&self, task: &str, groups: &ThreadGroups) -> Result<Vec<usize>, SchedulerError> {
        groups
            .iter()
            .map(|group| {
                self.lane_index(group)
                    .ok_or_else(|| SchedulerError::UnknownThreadGroup {
                        task: task.to_string(),
                        group: group.to_string(),
                    })
            })
            .collect()
    }
}
