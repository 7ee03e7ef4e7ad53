// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use parking_lot::Mutex;
use std::sync::Arc;

use crate::engine::queue::{Accept, ErasedConsumer, InputWaker};
use crate::errors::PipelineError;

enum ExternalState<V> {
    /// Values written before the graph was built.
    Buffered(Vec<V>),
    Attached {
        queue: Arc<dyn Accept<V>>,
        task: usize,
        waker: Arc<InputWaker>,
    },
}

/// Write entry point of an input marked external.
///
/// Values can be written at any time, from any thread: before the pipeline is
/// built (they are queued during the build), between runs, and while a run is
/// in progress, in which case the scheduler picks the task up as soon as all
/// of its inputs hold a value.
pub struct ExternalInput<V> {
    state: Arc<Mutex<ExternalState<V>>>,
}

impl<V: Send + 'static> ExternalInput<V> {
    pub(crate) fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ExternalState::Buffered(Vec::new()))),
        }
    }

    pub fn write(&self, value: V) {
        let mut state = self.state.lock();
        match &mut *state {
            ExternalState::Buffered(values) => values.push(value),
            ExternalState::Attached { queue, task, waker } => {
                queue.accept(value);
                waker.wake(*task);
            }
        }
    }

    /// The write entry point as a plain function.
    pub fn writer(&self) -> impl Fn(V) + Send + Sync + Clone + 'static {
        let input = self.clone();
        move |value| input.write(value)
    }

    pub fn is_attached(&self) -> bool {
        matches!(*self.state.lock(), ExternalState::Attached { .. })
    }
}

impl<V> Clone for ExternalInput<V> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

/// Connects an external input to the queue it feeds.
pub(crate) trait AttachExternal: Send {
    fn attach(
        &self,
        consumer: ErasedConsumer,
        task: usize,
        waker: Arc<InputWaker>,
    ) -> Result<(), PipelineError>;
}

impl<V: Send + 'static> AttachExternal for ExternalInput<V> {
    fn attach(
        &self,
        consumer: ErasedConsumer,
        task: usize,
        waker: Arc<InputWaker>,
    ) -> Result<(), PipelineError> {
        let queue = consumer.downcast::<V>()?;
        let mut state = self.state.lock();
        if let ExternalState::Buffered(values) = &mut *state {
            for value in values.drain(..) {
                queue.accept(value);
            }
        }
        *state = ExternalState::Attached { queue, task, waker };
        Ok(())
    }
}
