// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors raised while wiring tasks together and building the task graph.
//!
//! Every variant is a configuration error: the graph cannot be built and the
//! caller is expected to fix the wiring, not to retry.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// A task does not declare a slot with the requested identifier.
    #[error("Task '{task}' has no {direction} slot '{slot}'")]
    SlotNotFound {
        task: String,
        direction: &'static str,
        slot: String,
    },

    /// The slot exists but carries a different value type.
    #[error("Task '{task}' {direction} slot '{slot}' holds {expected}, not {found}")]
    SlotTypeMismatch {
        task: String,
        direction: &'static str,
        slot: String,
        expected: &'static str,
        found: &'static str,
    },

    /// The input already has an upstream output or is marked external.
    #[error("Input slot '{slot}' of task '{task}' is already connected")]
    AlreadyConnected { task: String, slot: String },

    /// A connector does not belong to any task of the pipeline being built.
    #[error("Connector {connector} is not part of this pipeline")]
    ConnectorNotFound { connector: String },

    /// An input is neither wired to an output nor marked external.
    #[error("Input slot '{slot}' of task '{task}' is not connected")]
    UnboundInput { task: String, slot: String },

    /// The wiring contains a cycle.
    #[error("Cyclic dependency detected between tasks: {}", tasks.join(", "))]
    CyclicGraph { tasks: Vec<String> },

    /// A type-erased consumer reached a port of a different value type.
    #[error("Consumer of {found} cannot be attached to a port of {expected}")]
    ConsumerTypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// The configurator was used after its pipeline had been built.
    #[error("Task '{task}' was already built into a task graph")]
    AlreadyBuilt { task: String },
}
