// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! Each message type implements `Display` for the human-readable line and
//! [`StructuredLog`] to emit it with its fields attached.
//!
//! * `pipeline` - graph building and option updates
//! * `scheduler` - scheduler lifecycle, runs and task dispatch

use tracing::Span;

pub mod pipeline;
pub mod scheduler;

/// Emits a message as a structured `tracing` event or span.
pub trait StructuredLog {
    /// Logs the message at its own level with every field attached.
    fn log(&self);

    /// Opens a span carrying the message fields. Messages that never scope
    /// work return a disabled span.
    fn span(&self, _name: &str) -> Span {
        Span::none()
    }
}
