// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The rendezvous between the dispatcher and the thread blocked in `run()`.
//!
//! The caller of `run()` waits for one of two things: a task of the `main` lane
//! became runnable, or the run finished. Both live in one state object behind
//! one lock, so neither wake-up can be lost between the check and the wait.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;

use crate::errors::SchedulerError;

/// Why [`Condition::wait`] returned.
#[derive(Debug)]
pub enum Wakeup {
    /// A `main` lane task is ready to run on the waiting thread.
    MainTask(usize),
    /// The run is over.
    Finished(Result<(), SchedulerError>),
}

#[derive(Default)]
struct State {
    main_tasks: VecDeque<usize>,
    outcome: Option<Result<(), SchedulerError>>,
}

#[derive(Default)]
pub struct Condition {
    state: Mutex<State>,
    signal: Condvar,
}

impl Condition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_main_task(&self, task: usize) {
        self.state.lock().main_tasks.push_back(task);
        self.signal.notify_one();
    }

    pub fn finish(&self, outcome: Result<(), SchedulerError>) {
        self.state.lock().outcome = Some(outcome);
        self.signal.notify_all();
    }

    /// Blocks until a main task is queued or the run finished. Queued main
    /// tasks are handed out before the outcome.
    pub fn wait(&self) -> Wakeup {
        let mut state = self.state.lock();
        loop {
            if let Some(task) = state.main_tasks.pop_front() {
                return Wakeup::MainTask(task);
            }
            if let Some(outcome) = state.outcome.take() {
                return Wakeup::Finished(outcome);
            }
            self.signal.wait(&mut state);
        }
    }

    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.main_tasks.clear();
        state.outcome = None;
    }
}
