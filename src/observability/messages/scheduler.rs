// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for the scheduler lifecycle.
//!
//! This module contains message types for logging events related to:
//! * Worker pool startup and shutdown
//! * Run lifecycle (start, completion, failure)
//! * Task dispatch, execution spans and task panics
//! * Values dropped after a failed run

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// Scheduler started its worker pool.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use the_conduit::observability::messages::scheduler::SchedulerStarted;
///
/// let msg = SchedulerStarted {
///     task_count: 5,
///     worker_threads: 4,
///     lanes: "any, io, main",
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct SchedulerStarted<'a> {
    pub task_count: usize,
    pub worker_threads: usize,
    pub lanes: &'a str,
}

impl Display for SchedulerStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Scheduler started: {} tasks, {} worker threads, lanes [{}]",
            self.task_count, self.worker_threads, self.lanes
        )
    }
}

impl StructuredLog for SchedulerStarted<'_> {
    fn log(&self) {
        tracing::info!(
            task_count = self.task_count,
            worker_threads = self.worker_threads,
            lanes = self.lanes,
            "{}", self
        );
    }
}

/// A run started.
///
/// # Log Level
/// `debug!` - Runs can be frequent
pub struct RunStarted {
    pub run: u64,
    pub task_count: usize,
    pub initial_tasks: usize,
}

impl Display for RunStarted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Run {} started: {} tasks, {} initially runnable",
            self.run, self.task_count, self.initial_tasks
        )
    }
}

impl StructuredLog for RunStarted {
    fn log(&self) {
        tracing::debug!(
            run = self.run,
            task_count = self.task_count,
            initial_tasks = self.initial_tasks,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "run",
            span_name = name,
            run = self.run,
            task_count = self.task_count,
        )
    }
}

/// A run completed.
///
/// # Log Level
/// `debug!` - Runs can be frequent
///
/// # Example
/// ```
/// use the_conduit::observability::messages::scheduler::RunCompleted;
/// use std::time::Duration;
///
/// let msg = RunCompleted {
///     run: 3,
///     task_count: 5,
///     duration: Duration::from_millis(12),
/// };
///
/// tracing::debug!("{}", msg);
/// ```
pub struct RunCompleted {
    pub run: u64,
    pub task_count: usize,
    pub duration: Duration,
}

impl Display for RunCompleted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Run {} completed: {} tasks in {:?}",
            self.run, self.task_count, self.duration
        )
    }
}

impl StructuredLog for RunCompleted {
    fn log(&self) {
        tracing::debug!(
            run = self.run,
            task_count = self.task_count,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }
}

/// A run failed.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct RunFailed<'a> {
    pub run: u64,
    pub error: &'a dyn std::error::Error,
}

impl Display for RunFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Run {} failed: {}", self.run, self.error)
    }
}

impl StructuredLog for RunFailed<'_> {
    fn log(&self) {
        tracing::error!(
            run = self.run,
            error = %self.error,
            "{}", self
        );
    }
}

/// A task was handed to a lane.
///
/// # Log Level
/// `trace!` - Per-task detail
pub struct TaskDispatched<'a> {
    pub task: &'a str,
    pub lane: &'a str,
}

impl Display for TaskDispatched<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Dispatched task '{}' to lane '{}'", self.task, self.lane)
    }
}

impl StructuredLog for TaskDispatched<'_> {
    fn log(&self) {
        tracing::trace!(task = self.task, lane = self.lane, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("task", span_name = name, task = self.task, lane = self.lane)
    }
}

/// Values produced during a failed run were dropped from a task's inputs.
///
/// # Log Level
/// `debug!` - Recovery detail
pub struct ValuesDiscarded<'a> {
    pub task: &'a str,
    pub count: usize,
}

impl Display for ValuesDiscarded<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Discarded {} queued values of task '{}' after a failed run",
            self.count, self.task
        )
    }
}

impl StructuredLog for ValuesDiscarded<'_> {
    fn log(&self) {
        tracing::debug!(task = self.task, count = self.count, "{}", self);
    }
}

/// A task panicked while running.
///
/// # Log Level
/// `error!` - Failure requiring attention
///
/// # Example
/// ```
/// use the_conduit::observability::messages::scheduler::TaskPanicked;
///
/// let msg = TaskPanicked {
///     task: "Merge",
///     message: "index out of bounds",
/// };
///
/// tracing::error!("{}", msg);
/// ```
pub struct TaskPanicked<'a> {
    pub task: &'a str,
    pub message: &'a str,
}

impl Display for TaskPanicked<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Task '{}' panicked: {}", self.task, self.message)
    }
}

impl StructuredLog for TaskPanicked<'_> {
    fn log(&self) {
        tracing::error!(task = self.task, message = self.message, "{}", self);
    }
}

/// The scheduler refuses further runs after a failure.
///
/// # Log Level
/// `warn!` - The scheduler is unusable from now on
pub struct SchedulerTerminated<'a> {
    pub reason: &'a str,
}

impl Display for SchedulerTerminated<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Scheduler terminated: {}", self.reason)
    }
}

impl StructuredLog for SchedulerTerminated<'_> {
    fn log(&self) {
        tracing::warn!(reason = self.reason, "{}", self);
    }
}

/// The worker pool was shut down.
///
/// # Log Level
/// `debug!` - Lifecycle detail
pub struct SchedulerStopped {
    pub runs: u64,
}

impl Display for SchedulerStopped {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Scheduler stopped after {} runs", self.runs)
    }
}

impl StructuredLog for SchedulerStopped {
    fn log(&self) {
        tracing::debug!(runs = self.runs, "{}", self);
    }
}
