// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for graph building and option updates.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};

/// A pipeline was turned into a task graph.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use the_conduit::observability::messages::pipeline::GraphBuilt;
///
/// let msg = GraphBuilt {
///     task_count: 3,
///     edge_count: 2,
///     external_inputs: 1,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct GraphBuilt {
    pub task_count: usize,
    pub edge_count: usize,
    pub external_inputs: usize,
}

impl Display for GraphBuilt {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Built task graph: {} tasks, {} edges, {} external inputs",
            self.task_count, self.edge_count, self.external_inputs
        )
    }
}

impl StructuredLog for GraphBuilt {
    fn log(&self) {
        tracing::info!(
            task_count = self.task_count,
            edge_count = self.edge_count,
            external_inputs = self.external_inputs,
            "{}", self
        );
    }
}

/// Building a pipeline failed.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct GraphBuildFailed<'a> {
    pub task_count: usize,
    pub error: &'a dyn std::error::Error,
}

impl Display for GraphBuildFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Failed to build task graph of {} tasks: {}",
            self.task_count, self.error
        )
    }
}

impl StructuredLog for GraphBuildFailed<'_> {
    fn log(&self) {
        tracing::error!(
            task_count = self.task_count,
            error = %self.error,
            "{}", self
        );
    }
}

/// An option update was refused.
///
/// # Log Level
/// `warn!` - The task keeps its previous value
///
/// # Example
/// ```
/// use the_conduit::errors::OptionError;
/// use the_conduit::observability::messages::pipeline::OptionRejected;
///
/// let error = OptionError::UnknownKey {
///     task: "blur".to_string(),
///     key: "sigma".to_string(),
/// };
/// let msg = OptionRejected {
///     task: "blur",
///     key: "sigma",
///     error: &error,
/// };
///
/// tracing::warn!("{}", msg);
/// ```
pub struct OptionRejected<'a> {
    pub task: &'a str,
    pub key: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for OptionRejected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Rejected option '{}' for task '{}': {}",
            self.key, self.task, self.error
        )
    }
}

impl StructuredLog for OptionRejected<'_> {
    fn log(&self) {
        tracing::warn!(
            task = self.task,
            key = self.key,
            error = %self.error,
            "{}", self
        );
    }
}
