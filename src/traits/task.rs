// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::slots::SlotList;

use super::options::OptionSet;
use super::thread_groups::ThreadGroups;

/// A unit of work with typed, identifier-tagged inputs and outputs.
///
/// `Inputs` and `Outputs` are `()`, a single [`Slot`](crate::slots::Slot) or a
/// tuple of slots. `run` receives one value per input and returns one value per
/// output; it is called again for every complete set of inputs.
///
/// The remaining items are optional hooks:
///
/// * [`Task::default_thread_groups`] and [`Task::thread_groups`] restrict the
///   lanes the task may run on. The default is any worker.
/// * [`Task::options`] declares named fields that can be changed from outside
///   while the pipeline is alive.
///
/// ```
/// use the_conduit::identifier::id;
/// use the_conduit::slots::Slot;
/// use the_conduit::traits::{OptionSet, Task, ThreadGroups};
///
/// type Input = Slot<f64, { id("input") }>;
/// type Output = Slot<f64, { id("output") }>;
///
/// struct Scale {
///     factor: f64,
/// }
///
/// impl Task for Scale {
///     type Inputs = Input;
///     type Outputs = Output;
///
///     fn run(&mut self, input: Input) -> Output {
///         Output::new(*input * self.factor)
///     }
///
///     fn default_thread_groups() -> ThreadGroups {
///         ThreadGroups::only("math")
///     }
///
///     fn options() -> OptionSet<Self> {
///         OptionSet::new().field("factor", |task: &mut Scale| &mut task.factor)
///     }
/// }
/// ```
pub trait Task: Send + Sized + 'static {
    type Inputs: SlotList;
    type Outputs: SlotList;

    fn run(&mut self, inputs: Self::Inputs) -> Self::Outputs;

    /// Lanes for every instance of the task type.
    fn default_thread_groups() -> ThreadGroups {
        ThreadGroups::any()
    }

    /// Lanes for this instance. Queried once, when the graph is built.
    fn thread_groups(&self) -> ThreadGroups {
        Self::default_thread_groups()
    }

    fn options() -> OptionSet<Self> {
        OptionSet::new()
    }
}
