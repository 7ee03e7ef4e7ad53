// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Scheduler configuration validation.
//!
//! Catches configurations that would produce an unusable worker pool before any
//! thread is spawned:
//!
//! * the `any` lane needs at least one worker
//! * named lanes need at least one worker and at most
//!   [`MAX_LANE_THREADS`](crate::config::consts::MAX_LANE_THREADS)
//! * lane names are unique, non-empty and do not redefine `any` or `main`
//! * a stall timeout, when given, is not zero
//!
//! All problems are reported at once rather than stopping at the first one.

use std::collections::HashSet;

use crate::config::consts::MAX_LANE_THREADS;
use crate::config::SchedulerConfig;
use crate::errors::ConfigError;
use crate::traits::{ANY_GROUP, MAIN_GROUP};

pub fn validate_config(config: &SchedulerConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if let Some(threads) = config.threads {
        if threads == 0 || threads > MAX_LANE_THREADS {
            errors.push(ConfigError::Invalid(format!(
                "threads must be between 1 and {}, got {}",
                MAX_LANE_THREADS, threads
            )));
        }
    }

    if config.stall_timeout_ms == Some(0) {
        errors.push(ConfigError::Invalid(
            "stall_timeout_ms must be greater than 0".to_string(),
        ));
    }

    errors.extend(validate_thread_groups(config));

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_thread_groups(config: &SchedulerConfig) -> Vec<ConfigError> {
    let mut seen = HashSet::new();
    let mut errors = Vec::new();

    for group in &config.thread_groups {
        let name = group.name.trim();
        if name.is_empty() {
            errors.push(ConfigError::Invalid(
                "thread group names must not be empty".to_string(),
            ));
            continue;
        }
        if name == ANY_GROUP || name == MAIN_GROUP {
            errors.push(ConfigError::Invalid(format!(
                "thread group '{}' is reserved",
                name
            )));
        }
        if !seen.insert(name) {
            errors.push(ConfigError::Invalid(format!(
                "thread group '{}' is defined more than once",
                name
            )));
        }
        if group.threads == 0 || group.threads > MAX_LANE_THREADS {
            errors.push(ConfigError::Invalid(format!(
                "thread group '{}' must have between 1 and {} threads, got {}",
                name, MAX_LANE_THREADS, group.threads
            )));
        }
    }

    errors
}
