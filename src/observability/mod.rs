// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and tracing.
//!
//! This module provides centralized message types for the diagnostic and
//! operational logging of The Conduit. Message types follow a struct-based
//! pattern with a `Display` implementation to:
//!
//! * Eliminate magic strings scattered throughout the codebase
//! * Keep log wording in one place per subsystem
//! * Provide consistent, structured logging output
//!
//! # Architecture
//!
//! Messages are organized by subsystem:
//! * `messages::pipeline` - graph building and option updates
//! * `messages::scheduler` - scheduler lifecycle, runs and task dispatch
//!
//! The library only emits `tracing` events. Installing a subscriber is left to
//! the application.
//!
//! # Usage
//!
//! ```rust
//! use the_conduit::observability::messages::scheduler::RunStarted;
//! use the_conduit::observability::messages::StructuredLog;
//!
//! let msg = RunStarted {
//!     run: 1,
//!     task_count: 4,
//!     initial_tasks: 2,
//! };
//!
//! msg.log();
//! tracing::info!("{}", msg);
//! ```

pub mod messages;
