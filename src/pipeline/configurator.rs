// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Build-time handle of one task in a pipeline.

use parking_lot::Mutex;
use std::any::{type_name, TypeId};
use std::sync::{Arc, OnceLock};

use crate::engine::queue::{ErasedConsumer, Listener};
use crate::errors::PipelineError;
use crate::identifier;
use crate::pipeline::connection::{Connection, ConnectionHelper};
use crate::pipeline::external::{AttachExternal, ExternalInput};
use crate::slots::connector::Binding;
use crate::slots::{
    contains_id, ConnectorId, Direction, InputConnector, OutputConnector, SlotDescriptor,
    SlotList, SlotType,
};
use crate::traits::{OptionSet, OptionsHandle, Task};

pub(crate) enum Constructor<T> {
    Value(T),
    Deferred(Box<dyn FnOnce() -> T + Send>),
}

impl<T> Constructor<T> {
    fn construct(self) -> T {
        match self {
            Constructor::Value(task) => task,
            Constructor::Deferred(factory) => factory(),
        }
    }
}

struct ConfiguratorState<T> {
    constructor: Option<Constructor<T>>,
    option_set: Option<OptionSet<T>>,
    externals: Vec<(usize, Box<dyn AttachExternal>)>,
    listeners: Vec<(usize, ErasedConsumer)>,
}

pub(crate) struct ConfiguratorShared<T: Task> {
    pipeline: u64,
    index: usize,
    name: Arc<str>,
    inputs: Vec<SlotDescriptor>,
    outputs: Vec<SlotDescriptor>,
    bindings: Vec<Arc<OnceLock<Binding>>>,
    options: OptionsHandle,
    state: Mutex<ConfiguratorState<T>>,
}

/// Wiring handle for one task of a [`Pipeline`](crate::pipeline::Pipeline).
///
/// Obtained from `Pipeline::add`. Cloning the handle is cheap; every clone
/// refers to the same task.
pub struct TaskConfigurator<T: Task> {
    shared: Arc<ConfiguratorShared<T>>,
}

impl<T: Task> Clone for TaskConfigurator<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T: Task> TaskConfigurator<T> {
    pub(crate) fn new(pipeline: u64, index: usize, name: String, constructor: Constructor<T>) -> Self {
        let option_set = T::options();
        let options = OptionsHandle::new(name.clone(), option_set.schema());
        let bindings = (0..T::Inputs::len())
            .map(|_| Arc::new(OnceLock::new()))
            .collect();

        Self {
            shared: Arc::new(ConfiguratorShared {
                pipeline,
                index,
                name: Arc::from(name),
                inputs: T::Inputs::descriptors(),
                outputs: T::Outputs::descriptors(),
                bindings,
                options,
                state: Mutex::new(ConfiguratorState {
                    constructor: Some(constructor),
                    option_set: Some(option_set),
                    externals: Vec::new(),
                    listeners: Vec::new(),
                }),
            }),
        }
    }

    pub(crate) fn shared(&self) -> Arc<ConfiguratorShared<T>> {
        self.shared.clone()
    }

    pub fn index(&self) -> usize {
        self.shared.index
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Connector of the input slot `S`.
    ///
    /// Asking for a slot id the task does not declare is a compile-time error.
    /// A declared id with a different value type is reported as
    /// [`PipelineError::SlotTypeMismatch`].
    ///
    /// ```compile_fail
    /// use the_conduit::identifier::id;
    /// use the_conduit::pipeline::Pipeline;
    /// use the_conduit::slots::Slot;
    /// use the_conduit::traits::Task;
    ///
    /// type Count = Slot<u32, { id("count") }>;
    /// type Missing = Slot<u32, { id("missing") }>;
    ///
    /// struct Sink;
    /// impl Task for Sink {
    ///     type Inputs = Count;
    ///     type Outputs = ();
    ///     fn run(&mut self, _: Count) {}
    /// }
    ///
    /// let mut pipeline = Pipeline::new();
    /// let sink = pipeline.add(Sink);
    /// let _ = sink.input::<Missing>();
    /// ```
    pub fn input<S: SlotType>(&self) -> Result<InputConnector<S::Value>, PipelineError> {
        const {
            assert!(
                contains_id(<T::Inputs as SlotList>::IDS, S::ID),
                "task has no input slot with this identifier"
            );
        }
        self.ensure_unbuilt()?;
        let position = self.shared.position::<S>(Direction::Input)?;
        Ok(InputConnector::new(
            self.shared.connector(Direction::Input, position),
            self.shared.name.clone(),
            S::ID,
            self.shared.bindings[position].clone(),
        ))
    }

    /// Connector of the output slot `S`. Unknown ids fail to compile, as for
    /// [`input`](Self::input).
    pub fn output<S: SlotType>(&self) -> Result<OutputConnector<S::Value>, PipelineError> {
        const {
            assert!(
                contains_id(<T::Outputs as SlotList>::IDS, S::ID),
                "task has no output slot with this identifier"
            );
        }
        self.ensure_unbuilt()?;
        let position = self.shared.position::<S>(Direction::Output)?;
        Ok(OutputConnector::new(
            self.shared.connector(Direction::Output, position),
        ))
    }

    /// Opts the input slot `S` out of graph wiring and returns its write entry
    /// point.
    pub fn mark_as_external<S: SlotType>(&self) -> Result<ExternalInput<S::Value>, PipelineError> {
        let input = self.input::<S>()?;
        input.bind(Binding::External)?;

        let external = ExternalInput::<S::Value>::new();
        self.shared
            .state
            .lock()
            .externals
            .push((input.id().position, Box::new(external.clone())));
        Ok(external)
    }

    /// Attaches `listener` to the output slot `S`. It receives every value the
    /// slot produces, in addition to the downstream inputs.
    pub fn add_listener<S, F>(&self, listener: F) -> Result<(), PipelineError>
    where
        S: SlotType,
        F: Fn(S::Value) + Send + Sync + 'static,
    {
        const {
            assert!(
                contains_id(<T::Outputs as SlotList>::IDS, S::ID),
                "task has no output slot with this identifier"
            );
        }
        self.ensure_unbuilt()?;
        let position = self.shared.position::<S>(Direction::Output)?;
        let consumer = ErasedConsumer::new::<S::Value>(Arc::new(Listener(listener)));
        self.shared.state.lock().listeners.push((position, consumer));
        Ok(())
    }

    /// Handle for updating the task's declared options, valid for the life of
    /// the task.
    pub fn options(&self) -> OptionsHandle {
        self.shared.options.clone()
    }

    fn ensure_unbuilt(&self) -> Result<(), PipelineError> {
        if self.shared.state.lock().constructor.is_none() {
            return Err(PipelineError::AlreadyBuilt {
                task: self.shared.name.to_string(),
            });
        }
        Ok(())
    }
}

impl<T: Task> ConfiguratorShared<T> {
    fn descriptors(&self, direction: Direction) -> &[SlotDescriptor] {
        match direction {
            Direction::Input => &self.inputs,
            Direction::Output => &self.outputs,
        }
    }

    fn position<S: SlotType>(&self, direction: Direction) -> Result<usize, PipelineError> {
        let descriptors = self.descriptors(direction);
        let position = descriptors
            .iter()
            .position(|descriptor| descriptor.id == S::ID)
            .ok_or_else(|| PipelineError::SlotNotFound {
                task: self.name.to_string(),
                direction: direction.as_str(),
                slot: identifier::describe(S::ID),
            })?;

        let descriptor = &descriptors[position];
        if descriptor.type_id != TypeId::of::<S::Value>() {
            return Err(PipelineError::SlotTypeMismatch {
                task: self.name.to_string(),
                direction: direction.as_str(),
                slot: identifier::describe(S::ID),
                expected: descriptor.type_name,
                found: type_name::<S::Value>(),
            });
        }
        Ok(position)
    }

    fn connector(&self, direction: Direction, position: usize) -> ConnectorId {
        ConnectorId {
            pipeline: self.pipeline,
            node: self.index,
            position,
            direction,
        }
    }
}

/// A configurator seen by the pipeline, without its task type.
pub(crate) trait Configure: Send + Sync {
    fn index(&self) -> usize;

    fn name(&self) -> &str;

    fn input_descriptors(&self) -> &[SlotDescriptor];

    fn output_descriptors(&self) -> &[SlotDescriptor];

    fn input_id(&self, position: usize) -> ConnectorId;

    fn output_ids(&self) -> Vec<ConnectorId>;

    /// Binding of every input, `None` where the input is unbound.
    fn bindings(&self) -> Vec<Option<Binding>>;

    /// Constructs the task and turns the configurator into its connection
    /// helper. Succeeds once.
    fn connection(&self) -> Result<Box<dyn Connection>, PipelineError>;
}

impl<T: Task> Configure for ConfiguratorShared<T> {
    fn index(&self) -> usize {
        self.index
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn input_descriptors(&self) -> &[SlotDescriptor] {
        &self.inputs
    }

    fn output_descriptors(&self) -> &[SlotDescriptor] {
        &self.outputs
    }

    fn input_id(&self, position: usize) -> ConnectorId {
        self.connector(Direction::Input, position)
    }

    fn output_ids(&self) -> Vec<ConnectorId> {
        (0..self.outputs.len())
            .map(|position| self.connector(Direction::Output, position))
            .collect()
    }

    fn bindings(&self) -> Vec<Option<Binding>> {
        self.bindings
            .iter()
            .map(|binding| binding.get().copied())
            .collect()
    }

    fn connection(&self) -> Result<Box<dyn Connection>, PipelineError> {
        let mut state = self.state.lock();
        let (constructor, option_set) = match (state.constructor.take(), state.option_set.take()) {
            (Some(constructor), Some(option_set)) => (constructor, option_set),
            _ => {
                return Err(PipelineError::AlreadyBuilt {
                    task: self.name.to_string(),
                })
            }
        };
        let externals = std::mem::take(&mut state.externals);
        let listeners = std::mem::take(&mut state.listeners);
        drop(state);

        let input_ids = (0..self.inputs.len())
            .map(|position| self.connector(Direction::Input, position))
            .collect();

        let helper = ConnectionHelper::<T>::new(
            self.index,
            self.name.to_string(),
            constructor.construct(),
            input_ids,
            self.output_ids(),
            option_set,
            self.options.clone(),
            externals,
        );
        let mut helper: Box<dyn Connection> = Box::new(helper);
        for (position, listener) in listeners {
            helper.bind(self.connector(Direction::Output, position), listener)?;
        }
        Ok(helper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::id;
    use crate::slots::Slot;

    type Count = Slot<u32, { id("count") }>;
    type Label = Slot<String, { id("label") }>;
    type Missing = Slot<u32, { id("missing") }>;
    type WrongType = Slot<i64, { id("count") }>;

    struct Labeller;

    impl Task for Labeller {
        type Inputs = Count;
        type Outputs = (Label, Count);

        fn run(&mut self, count: Count) -> (Label, Count) {
            (Label::new(format!("#{}", *count)), count)
        }
    }

    fn configurator() -> TaskConfigurator<Labeller> {
        TaskConfigurator::new(1, 0, "labeller".to_string(), Constructor::Value(Labeller))
    }

    #[test]
    fn test_connectors_resolve_by_slot_id() {
        let labeller = configurator();
        let input = labeller.input::<Count>().unwrap();
        assert_eq!(input.id().position, 0);
        assert_eq!(input.id().direction, Direction::Input);

        let output = labeller.output::<Count>().unwrap();
        assert_eq!(output.id().position, 1);
        assert_eq!(labeller.output::<Label>().unwrap().id().position, 0);
    }

    #[test]
    fn test_declared_ids_are_known_at_compile_time() {
        const INPUT: bool = contains_id(<Count as SlotList>::IDS, <Count as SlotType>::ID);
        const OUTPUT: bool = contains_id(<(Label, Count) as SlotList>::IDS, <Label as SlotType>::ID);
        const MISSING: bool = contains_id(<(Label, Count) as SlotList>::IDS, <Missing as SlotType>::ID);
        assert!(INPUT && OUTPUT);
        assert!(!MISSING);
    }

    #[test]
    fn test_slot_lookup_reports_unknown_ids() {
        let labeller = configurator();
        assert!(matches!(
            labeller.shared.position::<Missing>(Direction::Input),
            Err(PipelineError::SlotNotFound { direction: "input", .. })
        ));
        assert!(matches!(
            labeller.shared.position::<Missing>(Direction::Output),
            Err(PipelineError::SlotNotFound { direction: "output", .. })
        ));
    }

    #[test]
    fn test_slot_type_is_checked() {
        let labeller = configurator();
        assert!(matches!(
            labeller.input::<WrongType>(),
            Err(PipelineError::SlotTypeMismatch { .. })
        ));
    }

    #[test]
    fn test_external_inputs_cannot_be_marked_twice() {
        let labeller = configurator();
        labeller.mark_as_external::<Count>().unwrap();
        assert!(matches!(
            labeller.mark_as_external::<Count>(),
            Err(PipelineError::AlreadyConnected { .. })
        ));
        assert_eq!(
            labeller.shared.bindings(),
            vec![Some(Binding::External)]
        );
    }

    #[test]
    fn test_configurator_is_consumed_by_connection() {
        let labeller = configurator();
        labeller.mark_as_external::<Count>().unwrap();
        let shared = labeller.shared();

        assert!(shared.connection().is_ok());
        assert!(matches!(
            shared.connection(),
            Err(PipelineError::AlreadyBuilt { .. })
        ));
        assert!(matches!(
            labeller.input::<Count>(),
            Err(PipelineError::AlreadyBuilt { .. })
        ));
        assert!(matches!(
            labeller.add_listener::<Label, _>(|_| {}),
            Err(PipelineError::AlreadyBuilt { .. })
        ));
    }
}
