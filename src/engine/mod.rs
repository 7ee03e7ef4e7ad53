// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod condition;
pub mod container;
pub mod queue;
pub mod registry;
pub mod scheduler;
pub mod thread_pool;

pub use condition::{Condition, Wakeup};
pub use container::{InputSource, TaskContainer};
pub use registry::{Lane, ThreadGroupRegistry, ANY_LANE, MAIN_LANE};
pub use scheduler::Scheduler;
pub use thread_pool::ThreadPool;
