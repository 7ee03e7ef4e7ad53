// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Pipeline construction.
//!
//! A [`Pipeline`] collects tasks and their wiring. [`Pipeline::build`] turns it
//! into a [`TaskGraph`] in four steps:
//!
//! 1. map every output connector to the task that owns it
//! 2. resolve every input binding into a following-nodes edge, rejecting
//!    unbound inputs and foreign connectors
//! 3. reject cycles
//! 4. construct each task, bind input queues to upstream outputs and
//!    materialize one container per task
//!
//! ```
//! use the_conduit::identifier::id;
//! use the_conduit::pipeline::Pipeline;
//! use the_conduit::slots::Slot;
//! use the_conduit::traits::Task;
//!
//! type Text = Slot<String, { id("text") }>;
//!
//! struct Shout;
//! impl Task for Shout {
//!     type Inputs = Text;
//!     type Outputs = Text;
//!     fn run(&mut self, text: Text) -> Text {
//!         Text::new(text.to_uppercase())
//!     }
//! }
//!
//! let mut pipeline = Pipeline::new();
//! let shout = pipeline.add(Shout);
//! let input = shout.mark_as_external::<Text>().unwrap();
//! input.write("hello".to_string());
//!
//! let graph = pipeline.build().unwrap();
//! assert_eq!(graph.len(), 1);
//! assert!(graph.containers()[0].can_run());
//! ```

mod configurator;
mod connection;
mod external;
mod graph;
mod validation;

pub mod export;

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::engine::container::InputSource;
use crate::engine::queue::InputWaker;
use crate::errors::PipelineError;
use crate::identifier;
use crate::observability::messages::pipeline::{GraphBuildFailed, GraphBuilt};
use crate::observability::messages::StructuredLog;
use crate::slots::connector::Binding;
use crate::slots::{has_duplicate_ids, ConnectorId, SlotList};
use crate::traits::Task;
use crate::utils::short_type_name;

use configurator::{Configure, Constructor};

pub use configurator::TaskConfigurator;
pub use export::GraphDescription;
pub use external::ExternalInput;
pub use graph::TaskGraph;

static NEXT_PIPELINE_ID: AtomicU64 = AtomicU64::new(1);

/// Builder of a task graph.
pub struct Pipeline {
    id: u64,
    configurators: Vec<Arc<dyn Configure>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self {
            id: NEXT_PIPELINE_ID.fetch_add(1, Ordering::Relaxed),
            configurators: Vec::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn len(&self) -> usize {
        self.configurators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configurators.is_empty()
    }

    /// Adds `task`, named after its type.
    ///
    /// The task is moved into the pipeline now and into its container when the
    /// pipeline is built; it is never cloned.
    pub fn add<T: Task>(&mut self, task: T) -> TaskConfigurator<T> {
        self.insert(short_type_name::<T>(), Constructor::Value(task))
    }

    pub fn add_named<T: Task>(&mut self, name: impl Into<String>, task: T) -> TaskConfigurator<T> {
        self.insert(name.into(), Constructor::Value(task))
    }

    /// Adds a task constructed by `factory` when the pipeline is built.
    pub fn add_with<T, F>(&mut self, factory: F) -> TaskConfigurator<T>
    where
        T: Task,
        F: FnOnce() -> T + Send + 'static,
    {
        self.insert(short_type_name::<T>(), Constructor::Deferred(Box::new(factory)))
    }

    fn insert<T: Task>(&mut self, name: String, constructor: Constructor<T>) -> TaskConfigurator<T> {
        const {
            assert!(
                !has_duplicate_ids(<T::Inputs as SlotList>::IDS),
                "task declares two input slots with the same identifier"
            );
            assert!(
                !has_duplicate_ids(<T::Outputs as SlotList>::IDS),
                "task declares two output slots with the same identifier"
            );
        }

        let configurator =
            TaskConfigurator::new(self.id, self.configurators.len(), name, constructor);
        self.configurators.push(configurator.shared());
        configurator
    }

    /// Builds the runtime graph. Every configurator of the pipeline is consumed.
    pub fn build(self) -> Result<TaskGraph, PipelineError> {
        let task_count = self.configurators.len();
        match self.build_graph() {
            Ok(graph) => {
                GraphBuilt {
                    task_count: graph.len(),
                    edge_count: graph.edge_count(),
                    external_inputs: graph.external_input_count(),
                }
                .log();
                Ok(graph)
            }
            Err(error) => {
                GraphBuildFailed {
                    task_count,
                    error: &error,
                }
                .log();
                Err(error)
            }
        }
    }

    fn build_graph(self) -> Result<TaskGraph, PipelineError> {
        let configurators = self.configurators;
        let node_count = configurators.len();
        let names: Vec<String> = configurators
            .iter()
            .map(|configurator| configurator.name().to_string())
            .collect();

        let owners: HashMap<ConnectorId, usize> = configurators
            .iter()
            .flat_map(|configurator| {
                let index = configurator.index();
                configurator
                    .output_ids()
                    .into_iter()
                    .map(move |output| (output, index))
            })
            .collect();
        let owner_of = |output: &ConnectorId| {
            owners
                .get(output)
                .copied()
                .ok_or_else(|| PipelineError::ConnectorNotFound {
                    connector: output.to_string(),
                })
        };

        let mut sources = Vec::with_capacity(node_count);
        let mut following = vec![BTreeSet::new(); node_count];
        for configurator in &configurators {
            let mut node_sources = Vec::new();
            for (position, binding) in configurator.bindings().into_iter().enumerate() {
                let source = match binding {
                    None => {
                        return Err(PipelineError::UnboundInput {
                            task: configurator.name().to_string(),
                            slot: identifier::describe(
                                configurator.input_descriptors()[position].id,
                            ),
                        })
                    }
                    Some(Binding::External) => InputSource::External,
                    Some(Binding::Upstream(output)) => {
                        let owner = owner_of(&output)?;
                        following[owner].insert(configurator.index());
                        InputSource::Task {
                            task: owner,
                            position: output.position,
                        }
                    }
                };
                node_sources.push(source);
            }
            sources.push(node_sources);
        }

        let following: Vec<Vec<usize>> = following
            .into_iter()
            .map(|targets| targets.into_iter().collect())
            .collect();
        validation::topological_order(&names, &following)?;

        let mut helpers = configurators
            .iter()
            .map(|configurator| configurator.connection())
            .collect::<Result<Vec<_>, _>>()?;

        for configurator in &configurators {
            for (position, binding) in configurator.bindings().into_iter().enumerate() {
                if let Some(Binding::Upstream(output)) = binding {
                    let consumer =
                        helpers[configurator.index()].target(configurator.input_id(position))?;
                    helpers[owner_of(&output)?].bind(output, consumer)?;
                }
            }
        }

        let waker = Arc::new(InputWaker::new());
        let containers = helpers
            .into_iter()
            .zip(sources)
            .zip(following)
            .enumerate()
            .map(|(index, ((helper, sources), following))| {
                debug_assert_eq!(helper.index(), index);
                helper
                    .into_container(sources, following, &waker)
                    .map(Arc::new)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(TaskGraph::new(containers, waker))
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::id;
    use crate::slots::Slot;
    use std::sync::atomic::AtomicUsize;

    type Value = Slot<i32, { id("value") }>;
    type Other = Slot<i32, { id("other") }>;

    struct Source(i32);

    impl Task for Source {
        type Inputs = ();
        type Outputs = Value;

        fn run(&mut self, _: ()) -> Value {
            Value::new(self.0)
        }
    }

    struct Relay;

    impl Task for Relay {
        type Inputs = Value;
        type Outputs = Value;

        fn run(&mut self, value: Value) -> Value {
            value
        }
    }

    struct Pair;

    impl Task for Pair {
        type Inputs = (Value, Other);
        type Outputs = ();

        fn run(&mut self, _: (Value, Other)) {}
    }

    #[test]
    fn test_empty_pipeline_builds() {
        let graph = Pipeline::new().build().unwrap();
        assert!(graph.is_empty());
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_names_default_to_type_names() {
        let mut pipeline = Pipeline::new();
        let source = pipeline.add(Source(1));
        let relay = pipeline.add_named("relay-1", Relay);
        assert_eq!(source.name(), "Source");
        assert_eq!(relay.name(), "relay-1");
        assert_eq!(relay.index(), 1);
        assert_eq!(pipeline.len(), 2);
    }

    #[test]
    fn test_build_records_following_nodes() {
        let mut pipeline = Pipeline::new();
        let source = pipeline.add(Source(1));
        let left = pipeline.add(Relay);
        let right = pipeline.add(Relay);
        let output = source.output::<Value>().unwrap();
        (output >> left.input::<Value>().unwrap()).unwrap();
        (output >> right.input::<Value>().unwrap()).unwrap();

        let graph = pipeline.build().unwrap();
        assert_eq!(graph.containers()[0].following(), &[1, 2]);
        assert_eq!(graph.edge_count(), 2);
        assert!(graph.containers()[0].can_run());
        assert!(!graph.containers()[1].can_run());
    }

    #[test]
    fn test_unbound_input_fails() {
        let mut pipeline = Pipeline::new();
        pipeline.add(Relay);
        assert!(matches!(
            pipeline.build(),
            Err(PipelineError::UnboundInput { .. })
        ));
    }

    #[test]
    fn test_cycle_fails() {
        let mut pipeline = Pipeline::new();
        let first = pipeline.add(Relay);
        let second = pipeline.add(Relay);
        (first.output::<Value>().unwrap() >> second.input::<Value>().unwrap()).unwrap();
        (second.output::<Value>().unwrap() >> first.input::<Value>().unwrap()).unwrap();

        match pipeline.build() {
            Err(PipelineError::CyclicGraph { tasks }) => assert_eq!(tasks.len(), 2),
            other => panic!("expected a cycle, got {:?}", other.map(|g| g.len())),
        }
    }

    #[test]
    fn test_foreign_connector_fails() {
        let mut upstream = Pipeline::new();
        let source = upstream.add(Source(1));

        let mut pipeline = Pipeline::new();
        let relay = pipeline.add(Relay);
        (source.output::<Value>().unwrap() >> relay.input::<Value>().unwrap()).unwrap();

        assert!(matches!(
            pipeline.build(),
            Err(PipelineError::ConnectorNotFound { .. })
        ));
    }

    #[test]
    fn test_deferred_construction_happens_at_build() {
        let constructed = Arc::new(AtomicUsize::new(0));
        let counter = constructed.clone();

        let mut pipeline = Pipeline::new();
        pipeline.add_with(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Source(5)
        });
        assert_eq!(constructed.load(Ordering::SeqCst), 0);

        pipeline.build().unwrap();
        assert_eq!(constructed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_describe_lists_slots_and_edges() {
        let mut pipeline = Pipeline::new();
        let source = pipeline.add(Source(1));
        let pair = pipeline.add(Pair);
        (source.output::<Value>().unwrap() >> pair.input::<Value>().unwrap()).unwrap();
        pair.mark_as_external::<Other>().unwrap();

        let graph = pipeline.build().unwrap();
        let description = graph.describe();
        assert_eq!(description.nodes.len(), 2);
        assert_eq!(description.nodes[1].inputs[0].name, "VALUE");
        assert!(description.nodes[1].inputs[1].external);
        assert_eq!(
            description.edges,
            vec![export::EdgeDescription {
                from: 0,
                output: 0,
                to: 1,
                input: 0
            }]
        );

        let dot = graph.to_dot();
        assert!(dot.starts_with("digraph pipeline {"));
        assert!(dot.contains("n0:o0 -> n1:i0;"));
        assert!(dot.contains("x1_1 -> n1:i1 [style=dashed];"));

        let json: serde_json::Value = serde_json::from_str(&graph.to_json().unwrap()).unwrap();
        assert_eq!(json["nodes"][0]["name"], "Source");
        assert_eq!(json["nodes"][1]["inputs"][1]["external"], true);
    }
}
