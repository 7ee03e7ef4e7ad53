// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Typed dataflow pipelines.
//!
//! Tasks declare their inputs and outputs as tuples of [`slots::Slot`]s, get
//! wired together through a [`pipeline::Pipeline`] and are executed once per
//! [`engine::Scheduler::run`] on a thread pool split into named lanes.

pub mod config;         // scheduler config loading + validation
pub mod engine;         // containers, thread pool, scheduler
pub mod errors;         // error handling
pub mod identifier;     // packed slot ids
pub mod observability;
pub mod pipeline;       // graph construction
pub mod slots;          // slots, slot lists, connectors
pub mod traits;         // Task, options, thread groups
pub mod utils;
