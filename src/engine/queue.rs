// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Runtime plumbing between tasks: input queues, output fan-out and the
//! type-erased handles used to connect them while the graph is built.

use crossbeam_channel::Sender;
use parking_lot::Mutex;
use std::any::{type_name, Any};
use std::collections::VecDeque;
use std::sync::{Arc, OnceLock};

use crate::errors::PipelineError;

/// Something that takes ownership of values of type `V`.
///
/// Implemented by input queues and by output listeners; an output port holds
/// a list of these and feeds every produced value to each of them.
pub trait Accept<V>: Send + Sync {
    fn accept(&self, value: V);
}

/// Thread-safe FIFO feeding one input slot of one task.
///
/// The queue remembers how many of its values arrived during the current run,
/// so a failed run can take back what it produced.
pub struct SlotQueue<V> {
    items: Mutex<Buffer<V>>,
}

struct Buffer<V> {
    values: VecDeque<V>,
    // Values pushed since `begin_run`; always the newest ones.
    fresh: usize,
}

impl<V> SlotQueue<V> {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(Buffer {
                values: VecDeque::new(),
                fresh: 0,
            }),
        }
    }

    pub fn push(&self, value: V) {
        let mut items = self.items.lock();
        items.values.push_back(value);
        items.fresh += 1;
    }

    pub fn pop(&self) -> Option<V> {
        let mut items = self.items.lock();
        let value = items.values.pop_front();
        items.fresh = items.fresh.min(items.values.len());
        value
    }

    pub fn len(&self) -> usize {
        self.items.lock().values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().values.is_empty()
    }

    /// Starts counting pushes for a new run.
    pub fn begin_run(&self) {
        self.items.lock().fresh = 0;
    }

    /// Drops the values pushed since [`begin_run`](Self::begin_run) that are
    /// still queued. Returns how many were dropped.
    pub fn discard_run(&self) -> usize {
        let mut items = self.items.lock();
        let fresh = items.fresh;
        let keep = items.values.len() - fresh;
        items.values.truncate(keep);
        items.fresh = 0;
        fresh
    }
}

impl<V> Default for SlotQueue<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Send> Accept<V> for SlotQueue<V> {
    fn accept(&self, value: V) {
        self.push(value);
    }
}

/// Side-channel observer attached to an output.
pub(crate) struct Listener<F>(pub(crate) F);

impl<V, F> Accept<V> for Listener<F>
where
    F: Fn(V) + Send + Sync,
{
    fn accept(&self, value: V) {
        (self.0)(value)
    }
}

/// Fan-out list of one output slot.
pub struct OutputPort<V> {
    consumers: Vec<Arc<dyn Accept<V>>>,
}

impl<V> OutputPort<V> {
    pub fn new() -> Self {
        Self {
            consumers: Vec::new(),
        }
    }

    pub fn attach(&mut self, consumer: Arc<dyn Accept<V>>) {
        self.consumers.push(consumer);
    }

    pub fn consumer_count(&self) -> usize {
        self.consumers.len()
    }
}

impl<V: Clone> OutputPort<V> {
    /// Delivers `value` to every consumer. All but the last consumer receive a
    /// clone, the last one receives the value itself.
    pub fn emit(&self, value: V) {
        if let Some((last, rest)) = self.consumers.split_last() {
            for consumer in rest {
                consumer.accept(value.clone());
            }
            last.accept(value);
        }
    }
}

impl<V> Default for OutputPort<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// A consumer with its value type erased, carried from the input side of a
/// connection to the output side while the graph is built.
pub struct ErasedConsumer {
    inner: Box<dyn Any + Send>,
    value_type: &'static str,
}

impl ErasedConsumer {
    pub fn new<V: 'static>(consumer: Arc<dyn Accept<V>>) -> Self {
        Self {
            inner: Box::new(consumer),
            value_type: type_name::<V>(),
        }
    }

    pub fn value_type(&self) -> &'static str {
        self.value_type
    }

    pub fn downcast<V: 'static>(self) -> Result<Arc<dyn Accept<V>>, PipelineError> {
        let found = self.value_type;
        self.inner
            .downcast::<Arc<dyn Accept<V>>>()
            .map(|consumer| *consumer)
            .map_err(|_| PipelineError::ConsumerTypeMismatch {
                expected: type_name::<V>(),
                found,
            })
    }
}

/// Input queue seen without its value type.
pub trait ErasedQueue: Send + Sync {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn value_type(&self) -> &'static str;

    fn begin_run(&self);

    fn discard_run(&self) -> usize;

    /// Push handle for this queue, to be registered on the upstream output.
    fn consumer(self: Arc<Self>) -> ErasedConsumer;
}

impl<V: Send + 'static> ErasedQueue for SlotQueue<V> {
    fn len(&self) -> usize {
        SlotQueue::len(self)
    }

    fn value_type(&self) -> &'static str {
        type_name::<V>()
    }

    fn begin_run(&self) {
        SlotQueue::begin_run(self)
    }

    fn discard_run(&self) -> usize {
        SlotQueue::discard_run(self)
    }

    fn consumer(self: Arc<Self>) -> ErasedConsumer {
        ErasedConsumer::new::<V>(self)
    }
}

/// Output port seen without its value type.
pub trait ErasedPort: Send {
    fn bind(&mut self, consumer: ErasedConsumer) -> Result<(), PipelineError>;

    fn consumer_count(&self) -> usize;

    fn value_type(&self) -> &'static str;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<V: Send + 'static> ErasedPort for OutputPort<V> {
    fn bind(&mut self, consumer: ErasedConsumer) -> Result<(), PipelineError> {
        self.attach(consumer.downcast::<V>()?);
        Ok(())
    }

    fn consumer_count(&self) -> usize {
        OutputPort::consumer_count(self)
    }

    fn value_type(&self) -> &'static str {
        type_name::<V>()
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// Tells a running scheduler that an external input of a task received a
/// value. Silent until a scheduler attaches its channel.
#[derive(Default)]
pub struct InputWaker {
    sender: OnceLock<Sender<usize>>,
}

impl InputWaker {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn attach(&self, sender: Sender<usize>) {
        // A graph is driven by a single scheduler for its whole life.
        let _ = self.sender.set(sender);
    }

    pub fn wake(&self, task: usize) {
        if let Some(sender) = self.sender.get() {
            // The scheduler may already be gone; the value stays queued.
            let _ = sender.send(task);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct Counted {
        clones: Arc<AtomicUsize>,
    }

    impl Clone for Counted {
        fn clone(&self) -> Self {
            self.clones.fetch_add(1, Ordering::SeqCst);
            Self {
                clones: self.clones.clone(),
            }
        }
    }

    #[test]
    fn test_queue_is_fifo() {
        let queue = SlotQueue::new();
        queue.push(1);
        queue.push(2);
        queue.push(3);
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.pop(), Some(1));
        assert_eq!(queue.pop(), Some(2));
        assert_eq!(queue.pop(), Some(3));
        assert_eq!(queue.pop(), None);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_discard_run_drops_only_this_runs_values() {
        let queue = SlotQueue::new();
        queue.push(1);
        queue.push(2);
        queue.begin_run();
        queue.push(3);
        queue.push(4);

        assert_eq!(queue.discard_run(), 2);
        assert_eq!(queue.pop(), Some(1));
        assert_eq!(queue.pop(), Some(2));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_popped_values_are_not_discarded_twice() {
        let queue = SlotQueue::new();
        queue.begin_run();
        queue.push(1);
        queue.push(2);
        assert_eq!(queue.pop(), Some(1));
        assert_eq!(queue.pop(), Some(2));
        assert_eq!(queue.discard_run(), 0);

        queue.push(3);
        assert_eq!(queue.discard_run(), 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_emit_clones_all_but_last_consumer() {
        let clones = Arc::new(AtomicUsize::new(0));
        let first = Arc::new(SlotQueue::<Counted>::new());
        let second = Arc::new(SlotQueue::<Counted>::new());
        let third = Arc::new(SlotQueue::<Counted>::new());

        let mut port = OutputPort::<Counted>::new();
        port.attach(first.clone());
        port.attach(second.clone());
        port.attach(third.clone());

        port.emit(Counted {
            clones: clones.clone(),
        });

        assert_eq!(clones.load(Ordering::SeqCst), 2);
        assert_eq!(first.len() + second.len() + third.len(), 3);
    }

    #[test]
    fn test_emit_without_consumers_drops_value() {
        let clones = Arc::new(AtomicUsize::new(0));
        let port = OutputPort::new();
        port.emit(Counted {
            clones: clones.clone(),
        });
        assert_eq!(clones.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_erased_consumer_round_trip() {
        let queue = Arc::new(SlotQueue::<u32>::new());
        let consumer = queue.clone().consumer();
        assert_eq!(consumer.value_type(), "u32");

        let mut port: Box<dyn ErasedPort> = Box::new(OutputPort::<u32>::new());
        port.bind(consumer).unwrap();
        assert_eq!(port.consumer_count(), 1);

        let port = port.into_any().downcast::<OutputPort<u32>>().unwrap();
        port.emit(7);
        assert_eq!(queue.pop(), Some(7));
    }

    #[test]
    fn test_erased_consumer_rejects_other_types() {
        let queue = Arc::new(SlotQueue::<String>::new());
        let mut port: Box<dyn ErasedPort> = Box::new(OutputPort::<u32>::new());
        let result = port.bind(queue.consumer());
        assert!(matches!(
            result,
            Err(PipelineError::ConsumerTypeMismatch { .. })
        ));
    }

    #[test]
    fn test_waker_is_silent_until_attached() {
        let waker = InputWaker::new();
        waker.wake(3);

        let (sender, receiver) = crossbeam_channel::unbounded();
        waker.attach(sender);
        waker.wake(5);
        assert_eq!(receiver.try_recv(), Ok(5));
        assert!(receiver.try_recv().is_err());
    }
}
