// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod config;
mod options;
mod pipeline;
mod scheduler;

pub use config::ConfigError;
pub use options::OptionError;
pub use pipeline::PipelineError;
pub use scheduler::{FailureStrategy, SchedulerError};
