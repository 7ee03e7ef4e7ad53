// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The runtime node of a task graph.
//!
//! A [`TaskContainer`] owns one queue per input slot, the fan-out list of every
//! output slot and the task instance. It is runnable when every input queue
//! holds at least one value; running it takes exactly one value from each
//! queue, calls the task and hands each result to the consumers of its slot.

use parking_lot::Mutex;
use std::sync::Arc;

use crate::engine::queue::ErasedQueue;
use crate::errors::SchedulerError;
use crate::slots::{SlotDescriptor, SlotList};
use crate::traits::{OptionSet, OptionsHandle, Task, ThreadGroups};

/// A task together with its typed queues and ports.
pub(crate) trait RunTask: Send {
    /// Runs the task once. Returns `false` without running if an input is empty.
    fn run_once(&mut self) -> bool;
}

pub(crate) struct TaskCell<T: Task> {
    task: T,
    queues: <T::Inputs as SlotList>::Queues,
    ports: <T::Outputs as SlotList>::Ports,
    options: OptionSet<T>,
    handle: OptionsHandle,
}

impl<T: Task> TaskCell<T> {
    pub(crate) fn new(
        task: T,
        queues: <T::Inputs as SlotList>::Queues,
        ports: <T::Outputs as SlotList>::Ports,
        options: OptionSet<T>,
        handle: OptionsHandle,
    ) -> Self {
        Self {
            task,
            queues,
            ports,
            options,
            handle,
        }
    }
}

impl<T: Task> RunTask for TaskCell<T> {
    fn run_once(&mut self) -> bool {
        let Some(inputs) = <T::Inputs as SlotList>::pop(&self.queues) else {
            return false;
        };
        self.options.apply_pending(&mut self.task, &self.handle);
        self.task.run(inputs).emit(&self.ports);
        true
    }
}

/// Where an input slot gets its values from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSource {
    /// Output slot `position` of task `task`.
    Task { task: usize, position: usize },
    /// Written from outside the graph.
    External,
}

pub struct TaskContainer {
    index: usize,
    name: String,
    thread_groups: ThreadGroups,
    inputs: Vec<Arc<dyn ErasedQueue>>,
    sources: Vec<InputSource>,
    input_descriptors: Vec<SlotDescriptor>,
    output_descriptors: Vec<SlotDescriptor>,
    following: Vec<usize>,
    task: Mutex<Box<dyn RunTask>>,
}

pub(crate) struct ContainerParts {
    pub index: usize,
    pub name: String,
    pub thread_groups: ThreadGroups,
    pub inputs: Vec<Arc<dyn ErasedQueue>>,
    pub sources: Vec<InputSource>,
    pub input_descriptors: Vec<SlotDescriptor>,
    pub output_descriptors: Vec<SlotDescriptor>,
    pub following: Vec<usize>,
    pub task: Box<dyn RunTask>,
}

impl TaskContainer {
    pub(crate) fn new(parts: ContainerParts) -> Self {
        Self {
            index: parts.index,
            name: parts.name,
            thread_groups: parts.thread_groups,
            inputs: parts.inputs,
            sources: parts.sources,
            input_descriptors: parts.input_descriptors,
            output_descriptors: parts.output_descriptors,
            following: parts.following,
            task: Mutex::new(parts.task),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn thread_groups(&self) -> &ThreadGroups {
        &self.thread_groups
    }

    /// Indices of the containers fed by this container's outputs.
    pub fn following(&self) -> &[usize] {
        &self.following
    }

    pub fn sources(&self) -> &[InputSource] {
        &self.sources
    }

    pub fn input_descriptors(&self) -> &[SlotDescriptor] {
        &self.input_descriptors
    }

    pub fn output_descriptors(&self) -> &[SlotDescriptor] {
        &self.output_descriptors
    }

    pub fn has_external_inputs(&self) -> bool {
        self.sources.contains(&InputSource::External)
    }

    /// Number of values waiting on each input.
    pub fn queued(&self) -> Vec<usize> {
        self.inputs.iter().map(|queue| queue.len()).collect()
    }

    /// True when every input queue holds a value. Always true without inputs.
    pub fn can_run(&self) -> bool {
        self.inputs.iter().all(|queue| !queue.is_empty())
    }

    pub(crate) fn begin_run(&self) {
        self.inputs.iter().for_each(|queue| queue.begin_run());
    }

    /// Drops the values upstream tasks produced for this container during the
    /// current run. Externally written values are kept.
    pub(crate) fn discard_run(&self) -> usize {
        self.inputs
            .iter()
            .zip(&self.sources)
            .filter(|(_, source)| **source != InputSource::External)
            .map(|(queue, _)| queue.discard_run())
            .sum()
    }

    /// Runs the task once on the calling thread.
    ///
    /// Panics raised by the task propagate to the caller.
    pub fn run(&self) -> Result<(), SchedulerError> {
        if self.task.lock().run_once() {
            Ok(())
        } else {
            Err(SchedulerError::InputUnderflow {
                task: self.name.clone(),
            })
        }
    }
}

impl std::fmt::Debug for TaskContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("TaskContainer")
            .field("index", &self.index)
            .field("name", &self.name)
            .field("thread_groups", &self.thread_groups)
            .field("queued", &self.queued())
            .field("following", &self.following)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::queue::{OutputPort, SlotQueue};
    use crate::identifier::id;
    use crate::slots::Slot;

    type Left = Slot<i32, { id("left") }>;
    type Right = Slot<i32, { id("right") }>;
    type Sum = Slot<i32, { id("sum") }>;

    struct Add {
        bias: i32,
    }

    impl Task for Add {
        type Inputs = (Left, Right);
        type Outputs = Sum;

        fn run(&mut self, (left, right): (Left, Right)) -> Sum {
            Sum::new(*left + *right + self.bias)
        }

        fn options() -> OptionSet<Self> {
            OptionSet::new().field("bias", |add: &mut Add| &mut add.bias)
        }
    }

    fn container() -> (TaskContainer, Arc<SlotQueue<i32>>, Arc<SlotQueue<i32>>, Arc<SlotQueue<i32>>, OptionsHandle) {
        let queues = <(Left, Right)>::queues();
        let inputs = <(Left, Right)>::erased_queues(&queues);
        let (left, right) = (queues.0.clone(), queues.1.clone());

        let sink = Arc::new(SlotQueue::<i32>::new());
        let mut port = OutputPort::<i32>::new();
        port.attach(sink.clone());

        let options = Add::options();
        let handle = OptionsHandle::new("add", options.schema());
        let cell = TaskCell::<Add>::new(Add { bias: 0 }, queues, port, options, handle.clone());

        let container = TaskContainer::new(ContainerParts {
            index: 0,
            name: "add".to_string(),
            thread_groups: ThreadGroups::any(),
            inputs,
            sources: vec![InputSource::External, InputSource::External],
            input_descriptors: <(Left, Right)>::descriptors(),
            output_descriptors: <Sum as SlotList>::descriptors(),
            following: Vec::new(),
            task: Box::new(cell),
        });
        (container, left, right, sink, handle)
    }

    #[test]
    fn test_runnable_only_with_every_input() {
        let (container, left, right, _sink, _) = container();
        assert!(!container.can_run());
        left.push(1);
        assert!(!container.can_run());
        right.push(2);
        assert!(container.can_run());
        assert_eq!(container.queued(), vec![1, 1]);
    }

    #[test]
    fn test_run_pairs_values_in_fifo_order() {
        let (container, left, right, sink, _) = container();
        left.push(1);
        left.push(10);
        right.push(2);
        right.push(20);

        container.run().unwrap();
        container.run().unwrap();
        assert_eq!(sink.pop(), Some(3));
        assert_eq!(sink.pop(), Some(30));
        assert!(!container.can_run());
    }

    #[test]
    fn test_run_without_inputs_underflows() {
        let (container, left, _right, sink, _) = container();
        left.push(1);
        let result = container.run();
        assert!(matches!(result, Err(SchedulerError::InputUnderflow { .. })));
        assert_eq!(left.len(), 1);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_discard_run_keeps_external_values() {
        let (mut container, left, right, _sink, _) = container();
        container.sources = vec![
            InputSource::Task {
                task: 1,
                position: 0,
            },
            InputSource::External,
        ];
        left.push(1);
        container.begin_run();
        left.push(2);
        right.push(3);

        assert_eq!(container.discard_run(), 1);
        assert_eq!(container.queued(), vec![1, 1]);
        assert_eq!(left.pop(), Some(1));
    }

    #[test]
    fn test_options_apply_before_next_run() {
        let (container, left, right, sink, handle) = container();
        handle.set("bias", 100).unwrap();
        handle.set("bias", 1000).unwrap();
        left.push(1);
        right.push(2);
        container.run().unwrap();
        assert_eq!(sink.pop(), Some(1003));
    }
}
