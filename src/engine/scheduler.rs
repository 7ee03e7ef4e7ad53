// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Lane-aware scheduler executing a task graph to completion, repeatedly.
//!
//! # Architecture Overview
//!
//! ```text
//!               submit(lane, task)            Finished { task, outcome }
//!  dispatcher ──────────────────────► workers ───────────────────────┐
//!      ▲  │                                                          │
//!      │  │ push_main_task / finish                                  │
//!      │  ▼                                                          │
//!      │ Condition ◄──── wait() ──── caller of run() ── Finished ────┤
//!      │                                                             │
//!      └──────────────── events + external wake-ups ◄────────────────┘
//! ```
//!
//! * A fixed pool of worker threads serves the `any` lane and every named
//!   lane; the thread that calls [`Scheduler::run`] serves the `main` lane.
//! * A dispatcher thread consumes completion events and external-input
//!   wake-ups. After each completion it re-evaluates the following nodes of
//!   the finished task and submits those that became runnable.
//! * The caller of `run()` blocks on a [`Condition`] until either a `main`
//!   task is ready, which it runs inline, or the run is over.
//!
//! # Run Lifecycle
//!
//! 1. Containers that can run before anything executes are the initial tasks.
//!    A non-empty graph without initial tasks fails with
//!    [`SchedulerError::NoInitialTask`].
//! 2. Each container is scheduled at most once per run, on the allowed lane
//!    with the fewest tasks in flight.
//! 3. The run completes when every container has run once. Values left in a
//!    queue stay there for the next run.
//! 4. External inputs may be written at any time. While a run is active, a
//!    write that makes an unscheduled container runnable schedules it.
//!
//! # Failure Handling
//!
//! A panicking task is caught at the dispatch boundary. No further tasks are
//! dispatched, tasks already in flight drain, and `run()` returns
//! [`SchedulerError::TaskPanicked`]. With [`FailureStrategy::TerminateScheduler`]
//! every later `run()` returns [`SchedulerError::Terminated`].
//!
//! When a run fails, the values it produced for containers that did not
//! complete are dropped, so the next run pairs values of the same run again.
//! Externally written values are never dropped.
//!
//! # Stalls
//!
//! A run with nothing in flight and containers still pending is waiting for an
//! external write. Without a stall timeout it waits for as long as it takes.
//! With [`SchedulerConfig::stall_timeout_ms`] set, a run that stays idle for
//! that long fails with [`SchedulerError::Stalled`]; a value written later is
//! consumed by the next run.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicI32, Ordering};
//! use the_conduit::engine::Scheduler;
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
//! struct Target(Arc<AtomicI32>);
//! impl Task for Target {
//!     type Inputs = Value;
//!     type Outputs = ();
//!     fn run(&mut self, value: Value) {
//!         self.0.store(*value, Ordering::SeqCst);
//!     }
//! }
//!
//! let seen = Arc::new(AtomicI32::new(0));
//! let mut pipeline = Pipeline::new();
//! let source = pipeline.add(Source);
//! let target = pipeline.add(Target(seen.clone()));
//! (source.output::<Value>()? >> target.input::<Value>()?)?;
//!
//! let mut scheduler = Scheduler::new(pipeline, 2)?;
//! scheduler.run()?;
//! assert_eq!(seen.load(Ordering::SeqCst), 42);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crossbeam_channel::{after, never, select, unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::config::SchedulerConfig;
use crate::engine::condition::{Condition, Wakeup};
use crate::engine::container::TaskContainer;
use crate::engine::registry::{ThreadGroupRegistry, MAIN_LANE};
use crate::engine::thread_pool::{Submitter, ThreadPool};
use crate::errors::{FailureStrategy, SchedulerError};
use crate::observability::messages::scheduler::{
    RunCompleted, RunFailed, RunStarted, SchedulerStarted, SchedulerStopped,
    SchedulerTerminated, TaskDispatched, TaskPanicked, ValuesDiscarded,
};
use crate::observability::messages::StructuredLog;
use crate::pipeline::{Pipeline, TaskGraph};
use crate::utils::panic_message;

enum Event {
    Finished {
        task: usize,
        outcome: Result<(), SchedulerError>,
    },
    Terminate,
}

/// Bookkeeping of the run in progress.
struct Cycle {
    active: bool,
    scheduled: Vec<bool>,
    done: Vec<bool>,
    lane_of: Vec<usize>,
    in_flight: Vec<usize>,
    running: usize,
    completed: usize,
    failure: Option<SchedulerError>,
}

impl Cycle {
    fn new(task_count: usize, lane_count: usize) -> Self {
        Self {
            active: false,
            scheduled: vec![false; task_count],
            done: vec![false; task_count],
            lane_of: vec![0; task_count],
            in_flight: vec![0; lane_count],
            running: 0,
            completed: 0,
            failure: None,
        }
    }

    fn begin(&mut self) {
        self.active = true;
        self.scheduled.iter_mut().for_each(|scheduled| *scheduled = false);
        self.done.iter_mut().for_each(|done| *done = false);
        self.completed = 0;
        self.failure = None;
    }
}

struct Shared {
    graph: TaskGraph,
    registry: ThreadGroupRegistry,
    lanes: Vec<Vec<usize>>,
    cycle: Mutex<Cycle>,
    condition: Condition,
    submitter: Submitter,
    events: Sender<Event>,
}

impl Shared {
    fn container(&self, task: usize) -> &TaskContainer {
        &self.graph.containers()[task]
    }

    /// Runs a task on the calling thread, turning a panic into an error.
    fn execute(&self, task: usize) -> Result<(), SchedulerError> {
        let container = self.container(task);
        let lane = self.cycle.lock().lane_of[task];
        let span = TaskDispatched {
            task: container.name(),
            lane: self.registry.lane_name(lane),
        }
        .span("task_execution");
        let _guard = span.enter();

        match catch_unwind(AssertUnwindSafe(|| container.run())) {
            Ok(outcome) => outcome,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                TaskPanicked {
                    task: container.name(),
                    message: &message,
                }
                .log();
                Err(SchedulerError::TaskPanicked {
                    task: container.name().to_string(),
                    message,
                })
            }
        }
    }

    fn execute_and_report(&self, task: usize) {
        let outcome = self.execute(task);
        // The dispatcher outlives every run; a failed send means teardown.
        let _ = self.events.send(Event::Finished { task, outcome });
    }

    /// Schedules `task` if the run is healthy, the task has not been scheduled
    /// in this run and all of its inputs hold a value.
    fn try_schedule(&self, cycle: &mut Cycle, task: usize) {
        if !cycle.active || cycle.failure.is_some() || cycle.scheduled[task] {
            return;
        }
        let container = self.container(task);
        if !container.can_run() {
            return;
        }

        let Some(lane) = self.lanes[task]
            .iter()
            .copied()
            .min_by_key(|&lane| cycle.in_flight[lane])
        else {
            return;
        };

        cycle.scheduled[task] = true;
        cycle.lane_of[task] = lane;
        cycle.in_flight[lane] += 1;
        cycle.running += 1;

        TaskDispatched {
            task: container.name(),
            lane: self.registry.lane_name(lane),
        }
        .log();

        if lane == MAIN_LANE {
            self.condition.push_main_task(task);
        } else if let Err(error) = self.submitter.submit(lane, task) {
            cycle.in_flight[lane] -= 1;
            cycle.running -= 1;
            cycle.failure.get_or_insert(error);
        }
    }

    fn on_finished(&self, task: usize, outcome: Result<(), SchedulerError>) {
        let mut cycle = self.cycle.lock();
        let lane = cycle.lane_of[task];
        cycle.in_flight[lane] -= 1;
        cycle.running -= 1;

        match outcome {
            Ok(()) => {
                cycle.completed += 1;
                cycle.done[task] = true;
                for &next in self.container(task).following() {
                    self.try_schedule(&mut cycle, next);
                }
            }
            Err(error) => {
                cycle.failure.get_or_insert(error);
            }
        }
        self.check_finished(&mut cycle);
    }

    fn on_external_input(&self, task: usize) {
        let mut cycle = self.cycle.lock();
        if task < self.graph.len() {
            self.try_schedule(&mut cycle, task);
        }
    }

    /// Fails the run if it is idle and waiting for an external write.
    fn on_idle(&self) {
        let mut cycle = self.cycle.lock();
        if !cycle.active || cycle.running > 0 || cycle.failure.is_some() {
            return;
        }
        let pending = self.pending(&cycle);
        if pending.is_empty() {
            return;
        }
        self.end_run(&mut cycle, Err(SchedulerError::Stalled { pending }));
    }

    /// Ends the run once nothing is in flight and either a task failed or
    /// every container ran.
    fn check_finished(&self, cycle: &mut Cycle) {
        if !cycle.active || cycle.running > 0 {
            return;
        }

        let outcome = if let Some(failure) = cycle.failure.take() {
            Err(failure)
        } else if cycle.completed == self.graph.len() {
            Ok(())
        } else {
            return;
        };
        self.end_run(cycle, outcome);
    }

    fn end_run(&self, cycle: &mut Cycle, outcome: Result<(), SchedulerError>) {
        if outcome.is_err() {
            self.discard_unfinished(cycle);
        }
        cycle.active = false;
        self.condition.finish(outcome);
    }

    /// Names of the containers not yet scheduled in this run.
    fn pending(&self, cycle: &Cycle) -> Vec<String> {
        (0..self.graph.len())
            .filter(|&task| !cycle.scheduled[task])
            .map(|task| self.container(task).name().to_string())
            .collect()
    }

    fn discard_unfinished(&self, cycle: &Cycle) {
        for task in (0..self.graph.len()).filter(|&task| !cycle.done[task]) {
            let container = self.container(task);
            let count = container.discard_run();
            if count > 0 {
                ValuesDiscarded {
                    task: container.name(),
                    count,
                }
                .log();
            }
        }
    }
}

fn dispatch(
    shared: Arc<Shared>,
    events: Receiver<Event>,
    wakes: Receiver<usize>,
    stall_timeout: Option<Duration>,
) {
    loop {
        let idle = stall_timeout.map_or_else(never::<Instant>, after);
        select! {
            recv(events) -> event => match event {
                Ok(Event::Finished { task, outcome }) => shared.on_finished(task, outcome),
                Ok(Event::Terminate) | Err(_) => break,
            },
            recv(wakes) -> task => {
                if let Ok(task) = task {
                    shared.on_external_input(task);
                }
            },
            recv(idle) -> _ => shared.on_idle(),
        }
    }
}

/// Executes a task graph on a worker pool plus the calling thread.
pub struct Scheduler {
    shared: Arc<Shared>,
    pool: ThreadPool,
    dispatcher: Option<JoinHandle<()>>,
    failure_strategy: FailureStrategy,
    terminated: bool,
    runs: u64,
}

impl Scheduler {
    /// Builds `pipeline` and starts `threads` workers for the `any` lane.
    pub fn new(pipeline: Pipeline, threads: usize) -> Result<Self, SchedulerError> {
        Self::from_config(pipeline, &SchedulerConfig::with_threads(threads))
    }

    pub fn from_config(pipeline: Pipeline, config: &SchedulerConfig) -> Result<Self, SchedulerError> {
        let registry = ThreadGroupRegistry::from_config(config)?;
        let graph = pipeline.build()?;
        Self::start(graph, registry, config)
    }

    /// Drives an already built graph.
    pub fn with_graph(graph: TaskGraph, config: &SchedulerConfig) -> Result<Self, SchedulerError> {
        let registry = ThreadGroupRegistry::from_config(config)?;
        Self::start(graph, registry, config)
    }

    fn start(
        graph: TaskGraph,
        registry: ThreadGroupRegistry,
        config: &SchedulerConfig,
    ) -> Result<Self, SchedulerError> {
        let lanes = graph
            .containers()
            .iter()
            .map(|container| registry.resolve(container.name(), container.thread_groups()))
            .collect::<Result<Vec<_>, _>>()?;

        let (events, event_receiver) = unbounded();
        let (wakes, wake_receiver) = unbounded();
        graph.waker().attach(wakes);

        let mut pool = ThreadPool::new(&registry);
        let lane_names: Vec<&str> = registry.lanes().iter().map(|lane| lane.name.as_str()).collect();
        SchedulerStarted {
            task_count: graph.len(),
            worker_threads: registry.worker_threads(),
            lanes: &lane_names.join(", "),
        }
        .log();

        let shared = Arc::new(Shared {
            cycle: Mutex::new(Cycle::new(graph.len(), registry.len())),
            graph,
            lanes,
            condition: Condition::new(),
            submitter: pool.submitter(),
            events,
            registry,
        });

        let worker_shared = shared.clone();
        pool.start(move |task| worker_shared.execute_and_report(task))?;

        let dispatcher_shared = shared.clone();
        let stall_timeout = config.stall_timeout();
        let dispatcher = thread::Builder::new()
            .name("conduit-dispatcher".to_string())
            .spawn(move || {
                dispatch(dispatcher_shared, event_receiver, wake_receiver, stall_timeout)
            })
            .map_err(SchedulerError::ThreadSpawn)?;

        Ok(Self {
            shared,
            pool,
            dispatcher: Some(dispatcher),
            failure_strategy: config.failure_strategy,
            terminated: false,
            runs: 0,
        })
    }

    /// Executes every task of the graph once.
    ///
    /// Blocks until the run is over; `main` lane tasks run on the calling
    /// thread in the meantime.
    pub fn run(&mut self) -> Result<(), SchedulerError> {
        if self.terminated {
            return Err(SchedulerError::Terminated);
        }

        let task_count = self.shared.graph.len();
        if task_count == 0 {
            return Ok(());
        }

        self.runs += 1;
        let run = self.runs;
        let started = Instant::now();
        let run_span = {
            let mut cycle = self.shared.cycle.lock();
            self.shared.condition.reset();

            let initial: Vec<usize> = (0..task_count)
                .filter(|&task| self.shared.container(task).can_run())
                .collect();
            if initial.is_empty() {
                let error = SchedulerError::NoInitialTask { task_count };
                RunFailed { run, error: &error }.log();
                return Err(error);
            }

            let message = RunStarted {
                run,
                task_count,
                initial_tasks: initial.len(),
            };
            message.log();

            cycle.begin();
            for container in self.shared.graph.containers() {
                container.begin_run();
            }
            for task in initial {
                self.shared.try_schedule(&mut cycle, task);
            }
            self.shared.check_finished(&mut cycle);
            message.span("run")
        };
        let _entered = run_span.enter();

        let outcome = loop {
            match self.shared.condition.wait() {
                Wakeup::MainTask(task) => self.shared.execute_and_report(task),
                Wakeup::Finished(outcome) => break outcome,
            }
        };

        match &outcome {
            Ok(()) => RunCompleted {
                run,
                task_count,
                duration: started.elapsed(),
            }
            .log(),
            Err(error) => {
                RunFailed { run, error }.log();
                if matches!(error, SchedulerError::TaskPanicked { .. })
                    && self.failure_strategy == FailureStrategy::TerminateScheduler
                {
                    self.terminated = true;
                    SchedulerTerminated {
                        reason: "a task panicked and the failure strategy is terminate_scheduler",
                    }
                    .log();
                }
            }
        }
        outcome
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.shared.graph
    }

    pub fn registry(&self) -> &ThreadGroupRegistry {
        &self.shared.registry
    }

    pub fn runs(&self) -> u64 {
        self.runs
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    pub fn failure_strategy(&self) -> FailureStrategy {
        self.failure_strategy
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        let _ = self.shared.events.send(Event::Terminate);
        if let Some(dispatcher) = self.dispatcher.take() {
            if dispatcher.join().is_err() {
                tracing::warn!("dispatcher thread exited with a panic");
            }
        }
        self.pool.shutdown();
        SchedulerStopped { runs: self.runs }.log();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::id;
    use crate::slots::Slot;
    use crate::traits::Task;

    type Value = Slot<u8, { id("value") }>;

    struct Emit;

    impl Task for Emit {
        type Inputs = ();
        type Outputs = Value;

        fn run(&mut self, _: ()) -> Value {
            Value::new(1)
        }
    }

    struct Swallow;

    impl Task for Swallow {
        type Inputs = Value;
        type Outputs = ();

        fn run(&mut self, _: Value) {}
    }

    fn scheduler() -> Scheduler {
        let mut pipeline = Pipeline::new();
        let emit = pipeline.add(Emit);
        let swallow = pipeline.add(Swallow);
        (emit.output::<Value>().unwrap() >> swallow.input::<Value>().unwrap()).unwrap();
        Scheduler::new(pipeline, 1).unwrap()
    }

    #[test]
    fn test_pending_lists_unscheduled_tasks() {
        let scheduler = scheduler();
        let mut cycle = Cycle::new(2, scheduler.registry().len());
        cycle.begin();
        cycle.scheduled[0] = true;
        cycle.done[0] = true;
        cycle.completed = 1;

        assert_eq!(scheduler.shared.pending(&cycle), vec!["Swallow".to_string()]);
    }

    #[test]
    fn test_zero_threads_is_a_config_error() {
        let result = Scheduler::new(Pipeline::new(), 0);
        assert!(matches!(result, Err(SchedulerError::Config(_))));
    }

    #[test]
    fn test_run_counts_and_drop() {
        let mut scheduler = scheduler();
        scheduler.run().unwrap();
        scheduler.run().unwrap();
        assert_eq!(scheduler.runs(), 2);
        assert!(!scheduler.is_terminated());
        drop(scheduler);
    }
}
