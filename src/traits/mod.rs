// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod options;
pub mod task;
pub mod thread_groups;

pub use options::{OptionSchema, OptionSet, OptionsHandle};
pub use task::Task;
pub use thread_groups::{ThreadGroups, ANY_GROUP, MAIN_GROUP};
