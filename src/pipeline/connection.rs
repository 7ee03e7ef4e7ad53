// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Build-time glue between typed connectors and type-erased runtime queues.
//!
//! A [`ConnectionHelper`] exists for each task while the pipeline is built. It
//! owns the constructed task, its input queues and its output ports, and maps
//! every connector of the task to the position of the queue or port behind it.
//! The pipeline uses [`Connection::target`] to obtain the push handle of an
//! input and [`Connection::bind`] to register it on the upstream output.

use std::collections::HashMap;
use std::sync::Arc;

use crate::engine::container::{ContainerParts, InputSource, TaskCell, TaskContainer};
use crate::engine::queue::{ErasedConsumer, ErasedPort, ErasedQueue, InputWaker};
use crate::errors::PipelineError;
use crate::pipeline::external::AttachExternal;
use crate::slots::{ConnectorId, Direction, SlotList};
use crate::traits::{OptionSet, OptionsHandle, Task};

pub(crate) trait Connection {
    fn index(&self) -> usize;

    /// Push handle of the input queue behind `input`.
    fn target(&self, input: ConnectorId) -> Result<ErasedConsumer, PipelineError>;

    /// Registers `consumer` on the output port behind `output`.
    fn bind(&mut self, output: ConnectorId, consumer: ErasedConsumer) -> Result<(), PipelineError>;

    fn into_container(
        self: Box<Self>,
        sources: Vec<InputSource>,
        following: Vec<usize>,
        waker: &Arc<InputWaker>,
    ) -> Result<TaskContainer, PipelineError>;
}

pub(crate) struct ConnectionHelper<T: Task> {
    index: usize,
    name: String,
    task: T,
    queues: <T::Inputs as SlotList>::Queues,
    erased_queues: Vec<Arc<dyn ErasedQueue>>,
    ports: Vec<Box<dyn ErasedPort>>,
    positions: HashMap<ConnectorId, usize>,
    option_set: OptionSet<T>,
    options: OptionsHandle,
    externals: Vec<(usize, Box<dyn AttachExternal>)>,
}

impl<T: Task> ConnectionHelper<T> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        index: usize,
        name: String,
        task: T,
        input_ids: Vec<ConnectorId>,
        output_ids: Vec<ConnectorId>,
        option_set: OptionSet<T>,
        options: OptionsHandle,
        externals: Vec<(usize, Box<dyn AttachExternal>)>,
    ) -> Self {
        let queues = <T::Inputs as SlotList>::queues();
        let erased_queues = <T::Inputs as SlotList>::erased_queues(&queues);
        let positions = input_ids
            .into_iter()
            .enumerate()
            .chain(output_ids.into_iter().enumerate())
            .map(|(position, id)| (id, position))
            .collect();

        Self {
            index,
            name,
            task,
            queues,
            erased_queues,
            ports: <T::Outputs as SlotList>::ports(),
            positions,
            option_set,
            options,
            externals,
        }
    }

    fn position(&self, connector: ConnectorId, direction: Direction) -> Result<usize, PipelineError> {
        self.positions
            .get(&connector)
            .copied()
            .filter(|_| connector.direction == direction)
            .ok_or_else(|| PipelineError::ConnectorNotFound {
                connector: connector.to_string(),
            })
    }
}

impl<T: Task> Connection for ConnectionHelper<T> {
    fn index(&self) -> usize {
        self.index
    }

    fn target(&self, input: ConnectorId) -> Result<ErasedConsumer, PipelineError> {
        let position = self.position(input, Direction::Input)?;
        Ok(self.erased_queues[position].clone().consumer())
    }

    fn bind(&mut self, output: ConnectorId, consumer: ErasedConsumer) -> Result<(), PipelineError> {
        let position = self.position(output, Direction::Output)?;
        self.ports[position].bind(consumer)
    }

    fn into_container(
        self: Box<Self>,
        sources: Vec<InputSource>,
        following: Vec<usize>,
        waker: &Arc<InputWaker>,
    ) -> Result<TaskContainer, PipelineError> {
        let helper = *self;

        for (position, external) in &helper.externals {
            let consumer = helper.erased_queues[*position].clone().consumer();
            external.attach(consumer, helper.index, waker.clone())?;
        }

        let ports = <T::Outputs as SlotList>::seal(helper.ports)?;
        let thread_groups = helper.task.thread_groups();
        let cell = TaskCell::new(
            helper.task,
            helper.queues,
            ports,
            helper.option_set,
            helper.options,
        );

        Ok(TaskContainer::new(ContainerParts {
            index: helper.index,
            name: helper.name,
            thread_groups,
            inputs: helper.erased_queues,
            sources,
            input_descriptors: <T::Inputs as SlotList>::descriptors(),
            output_descriptors: <T::Outputs as SlotList>::descriptors(),
            following,
            task: Box::new(cell),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::queue::{Accept, SlotQueue};
    use crate::identifier::id;
    use crate::slots::Slot;

    type Value = Slot<u32, { id("value") }>;
    type Doubled = Slot<u32, { id("doubled") }>;

    struct Double;

    impl Task for Double {
        type Inputs = Value;
        type Outputs = Doubled;

        fn run(&mut self, value: Value) -> Doubled {
            Doubled::new(*value * 2)
        }
    }

    fn connector(position: usize, direction: Direction) -> ConnectorId {
        ConnectorId {
            pipeline: 3,
            node: 0,
            position,
            direction,
        }
    }

    fn helper() -> Box<dyn Connection> {
        Box::new(ConnectionHelper::<Double>::new(
            0,
            "double".to_string(),
            Double,
            vec![connector(0, Direction::Input)],
            vec![connector(0, Direction::Output)],
            OptionSet::new(),
            OptionsHandle::new("double", Vec::new()),
            Vec::new(),
        ))
    }

    #[test]
    fn test_target_and_bind_wire_queue_to_port() {
        let mut helper = helper();
        let sink = Arc::new(SlotQueue::<u32>::new());
        helper
            .bind(connector(0, Direction::Output), sink.clone().consumer())
            .unwrap();

        let input = helper.target(connector(0, Direction::Input)).unwrap();
        let input = input.downcast::<u32>().unwrap();
        input.accept(21);

        let container = helper
            .into_container(vec![InputSource::External], Vec::new(), &Arc::new(InputWaker::new()))
            .unwrap();
        assert!(container.can_run());
        container.run().unwrap();
        assert_eq!(sink.pop(), Some(42));
    }

    #[test]
    fn test_unknown_connectors_are_rejected() {
        let mut helper = helper();
        let foreign = ConnectorId {
            pipeline: 4,
            ..connector(0, Direction::Input)
        };
        assert!(matches!(
            helper.target(foreign),
            Err(PipelineError::ConnectorNotFound { .. })
        ));

        let queue = Arc::new(SlotQueue::<u32>::new());
        assert!(matches!(
            helper.bind(connector(0, Direction::Input), queue.consumer()),
            Err(PipelineError::ConnectorNotFound { .. })
        ));
    }
}
