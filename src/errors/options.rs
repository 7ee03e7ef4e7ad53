// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Errors returned by option updates. The previous value stays in effect.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OptionError {
    #[error("Task '{task}' has no option named '{key}'")]
    UnknownKey { task: String, key: String },

    #[error("Option '{key}' of task '{task}' expects {expected}, got {found}")]
    TypeMismatch {
        task: String,
        key: String,
        expected: &'static str,
        found: &'static str,
    },
}
