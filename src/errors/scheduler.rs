// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{ConfigError, PipelineError};

/// Errors raised while constructing a scheduler or executing a run.
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// The graph has tasks but none of them can run when the run starts.
    #[error("No schedulable initial task among {task_count} tasks")]
    NoInitialTask { task_count: usize },

    /// A task asked for a thread group the registry does not know about.
    #[error("Task '{task}' requires unknown thread group '{group}'")]
    UnknownThreadGroup { task: String, group: String },

    /// A task panicked while running.
    #[error("Task '{task}' panicked: {message}")]
    TaskPanicked { task: String, message: String },

    /// The run sat idle for the configured stall timeout while some tasks
    /// still waited on external input.
    #[error("Run stalled with {} tasks that never became runnable: {}", pending.len(), pending.join(", "))]
    Stalled { pending: Vec<String> },

    /// A task was dispatched while one of its input queues was empty.
    #[error("Task '{task}' was dispatched without a value on every input")]
    InputUnderflow { task: String },

    /// A worker lane stopped accepting tasks.
    #[error("Thread group '{group}' is no longer accepting tasks")]
    LaneClosed { group: String },

    /// A previous failure terminated the scheduler.
    #[error("Scheduler was terminated by an earlier task failure")]
    Terminated,

    #[error("Failed to spawn scheduler thread: {0}")]
    ThreadSpawn(#[source] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// What a task failure does to the scheduler.
///
/// Either way the failing run stops dispatching new tasks, waits for the tasks
/// already in flight and returns the failure from `run()`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStrategy {
    /// Only the current run fails; the scheduler can run again.
    #[default]
    AbortRun,
    /// Every later run is refused with [`SchedulerError::Terminated`].
    TerminateScheduler,
}
