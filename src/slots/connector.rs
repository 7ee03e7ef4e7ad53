// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Typed endpoints used to wire tasks together.
//!
//! An [`OutputConnector`] may feed any number of [`InputConnector`]s, an input
//! accepts exactly one upstream output. Connectors only record the wiring; the
//! pipeline turns it into queues and fan-out lists when it is built.
//!
//! ```
//! use the_conduit::identifier::id;
//! use the_conduit::pipeline::Pipeline;
//! use the_conduit::slots::Slot;
//! use the_conduit::traits::Task;
//!
//! type Value = Slot<i32, { id("value") }>;
//!
//! struct Source;
//! impl Task for Source {
//!     type Inputs = ();
//!     type Outputs = Value;
//!     fn run(&mut self, _: ()) -> Value {
//!         Value::new(42)
//!     }
//! }
//!
//! struct Sink;
//! impl Task for Sink {
//!     type Inputs = Value;
//!     type Outputs = ();
//!     fn run(&mut self, _: Value) {}
//! }
//!
//! let mut pipeline = Pipeline::new();
//! let source = pipeline.add(Source);
//! let sink = pipeline.add(Sink);
//!
//! let output = source.output::<Value>().unwrap();
//! let input = sink.input::<Value>().unwrap();
//! assert!((output >> &input).is_ok());
//! assert!((output >> &input).is_err());
//! ```

use std::fmt::{Display, Formatter};
use std::marker::PhantomData;
use std::ops::{Shl, Shr};
use std::sync::{Arc, OnceLock};

use crate::errors::PipelineError;
use crate::identifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    Input,
    Output,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Input => "input",
            Direction::Output => "output",
        }
    }
}

/// Identity of one connector: the slot at `position` of task `node` in the
/// pipeline numbered `pipeline`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectorId {
    pub pipeline: u64,
    pub node: usize,
    pub position: usize,
    pub direction: Direction,
}

impl Display for ConnectorId {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}#{} of task {} (pipeline {})",
            self.direction.as_str(),
            self.position,
            self.node,
            self.pipeline
        )
    }
}

/// What feeds an input slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Binding {
    Upstream(ConnectorId),
    External,
}

/// Output endpoint of a slot carrying values of type `V`.
pub struct OutputConnector<V> {
    id: ConnectorId,
    _value: PhantomData<fn() -> V>,
}

impl<V> OutputConnector<V> {
    pub(crate) fn new(id: ConnectorId) -> Self {
        Self {
            id,
            _value: PhantomData,
        }
    }

    pub fn id(&self) -> ConnectorId {
        self.id
    }

    /// Binds `input` to this output.
    ///
    /// Fails with [`PipelineError::AlreadyConnected`] if the input already has
    /// an upstream output or was marked external.
    pub fn connect(&self, input: &InputConnector<V>) -> Result<(), PipelineError> {
        input.bind(Binding::Upstream(self.id))
    }
}

impl<V> Clone for OutputConnector<V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V> Copy for OutputConnector<V> {}

impl<V> std::fmt::Debug for OutputConnector<V> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        f.debug_struct("OutputConnector").field("id", &self.id).finish()
    }
}

/// Input endpoint of a slot carrying values of type `V`.
///
/// Clones share the binding, so connecting any clone connects them all.
pub struct InputConnector<V> {
    id: ConnectorId,
    task: Arc<str>,
    slot: u64,
    binding: Arc<OnceLock<Binding>>,
    _value: PhantomData<fn(V)>,
}

impl<V> InputConnector<V> {
    pub(crate) fn new(
        id: ConnectorId,
        task: Arc<str>,
        slot: u64,
        binding: Arc<OnceLock<Binding>>,
    ) -> Self {
        Self {
            id,
            task,
            slot,
            binding,
            _value: PhantomData,
        }
    }

    pub fn id(&self) -> ConnectorId {
        self.id
    }

    pub fn is_connected(&self) -> bool {
        self.binding.get().is_some()
    }

    /// The output feeding this input, if it has been connected to one.
    pub fn upstream(&self) -> Option<ConnectorId> {
        match self.binding.get() {
            Some(Binding::Upstream(id)) => Some(*id),
            _ => None,
        }
    }

    pub fn is_external(&self) -> bool {
        matches!(self.binding.get(), Some(Binding::External))
    }

    pub(crate) fn bind(&self, binding: Binding) -> Result<(), PipelineError> {
        self.binding
            .set(binding)
            .map_err(|_| PipelineError::AlreadyConnected {
                task: self.task.to_string(),
                slot: identifier::describe(self.slot),
            })
    }
}

impl<V> Clone for InputConnector<V> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            task: self.task.clone(),
            slot: self.slot,
            binding: self.binding.clone(),
            _value: PhantomData,
        }
    }
}

impl<V> std::fmt::Debug for InputConnector<V> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        f.debug_struct("InputConnector")
            .field("id", &self.id)
            .field("binding", &self.binding.get())
            .finish()
    }
}

impl<V> Shr<&InputConnector<V>> for OutputConnector<V> {
    type Output = Result<(), PipelineError>;

    fn shr(self, input: &InputConnector<V>) -> Self::Output {
        self.connect(input)
    }
}

impl<V> Shr<InputConnector<V>> for OutputConnector<V> {
    type Output = Result<(), PipelineError>;

    fn shr(self, input: InputConnector<V>) -> Self::Output {
        self.connect(&input)
    }
}

impl<V> Shl<OutputConnector<V>> for &InputConnector<V> {
    type Output = Result<(), PipelineError>;

    fn shl(self, output: OutputConnector<V>) -> Self::Output {
        output.connect(self)
    }
}

impl<V> Shl<OutputConnector<V>> for InputConnector<V> {
    type Output = Result<(), PipelineError>;

    fn shl(self, output: OutputConnector<V>) -> Self::Output {
        output.connect(&self)
    }
}
