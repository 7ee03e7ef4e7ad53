// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Splits a batch of numbers in two, sorts the halves on the `sort` lane,
//! merges them back together and prints the result from the main thread. A
//! last batch runs after switching on the `dedup` option of both sorts.
//!
//! Usage: cargo run --example sort_merge [config.yaml] [batches]
//!
//! Set `RUST_LOG=the_conduit=debug` to see the scheduler's structured logs.

use std::env;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use the_conduit::config::load_and_validate_config;
use the_conduit::engine::Scheduler;
use the_conduit::identifier::id;
use the_conduit::pipeline::Pipeline;
use the_conduit::slots::Slot;
use the_conduit::traits::{OptionSet, Task, ThreadGroups};

type Numbers = Slot<Vec<i64>, { id("numbers") }>;
type Left = Slot<Vec<i64>, { id("left") }>;
type Right = Slot<Vec<i64>, { id("right") }>;
type Sorted = Slot<Vec<i64>, { id("sorted") }>;

struct Split;

impl Task for Split {
    type Inputs = Numbers;
    type Outputs = (Left, Right);

    fn run(&mut self, numbers: Numbers) -> (Left, Right) {
        let mut left = numbers.into_inner();
        let right = left.split_off(left.len() / 2);
        (Left::new(left), Right::new(right))
    }
}

struct Sort {
    dedup: bool,
}

impl Task for Sort {
    type Inputs = Numbers;
    type Outputs = Sorted;

    fn run(&mut self, numbers: Numbers) -> Sorted {
        let mut numbers = numbers.into_inner();
        numbers.sort_unstable();
        if self.dedup {
            numbers.dedup();
        }
        Sorted::new(numbers)
    }

    fn default_thread_groups() -> ThreadGroups {
        ThreadGroups::only("sort")
    }

    fn options() -> OptionSet<Self> {
        OptionSet::new().field("dedup", |sort: &mut Sort| &mut sort.dedup)
    }
}

struct Merge;

impl Task for Merge {
    type Inputs = (Left, Right);
    type Outputs = Sorted;

    fn run(&mut self, (left, right): (Left, Right)) -> Sorted {
        let (left, right) = (left.into_inner(), right.into_inner());
        let mut merged = Vec::with_capacity(left.len() + right.len());
        let (mut l, mut r) = (left.into_iter().peekable(), right.into_iter().peekable());
        loop {
            let next = match (l.peek().copied(), r.peek().copied()) {
                (Some(a), Some(b)) if a <= b => l.next(),
                (Some(_), Some(_)) => r.next(),
                (Some(_), None) => l.next(),
                (None, Some(_)) => r.next(),
                (None, None) => break,
            };
            merged.extend(next);
        }
        Sorted::new(merged)
    }
}

struct Print {
    batch: usize,
}

impl Task for Print {
    type Inputs = Sorted;
    type Outputs = ();

    fn run(&mut self, sorted: Sorted) {
        self.batch += 1;
        println!("batch {}: {:?}", self.batch, *sorted);
    }

    fn default_thread_groups() -> ThreadGroups {
        ThreadGroups::main()
    }
}

/// Deterministic pseudo-random batch so runs are reproducible.
fn batch(seed: u64, len: usize) -> Vec<i64> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    (0..len)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            ((state >> 33) % 1000) as i64
        })
        .collect()
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let config_file = args
        .get(1)
        .map(String::as_str)
        .unwrap_or("configs/scheduler.yaml");
    let batches: usize = match args.get(2) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("'{}' is not a batch count", raw))?,
        None => 3,
    };

    let config = load_and_validate_config(config_file)
        .with_context(|| format!("loading {}", config_file))?;
    info!(config = %config_file, threads = config.worker_threads(), "configuration loaded");

    let mut pipeline = Pipeline::new();
    let split = pipeline.add(Split);
    let sort_left = pipeline.add_named("sort-left", Sort { dedup: false });
    let sort_right = pipeline.add_named("sort-right", Sort { dedup: false });
    let merge = pipeline.add(Merge);
    let print = pipeline.add(Print { batch: 0 });

    let numbers = split.mark_as_external::<Numbers>()?;
    (split.output::<Left>()? >> sort_left.input::<Numbers>()?)?;
    (split.output::<Right>()? >> sort_right.input::<Numbers>()?)?;
    (sort_left.output::<Sorted>()? >> merge.input::<Left>()?)?;
    (sort_right.output::<Sorted>()? >> merge.input::<Right>()?)?;
    (merge.output::<Sorted>()? >> print.input::<Sorted>()?)?;

    let mut scheduler = Scheduler::from_config(pipeline, &config)?;
    println!("{}", scheduler.graph().to_dot());

    for seed in 0..batches as u64 {
        numbers.write(batch(seed, 16));
        scheduler.run()?;
    }

    // Takes effect on the next run; each half comes back sorted without repeats.
    sort_left.options().set("dedup", true)?;
    sort_right.options().set("dedup", true)?;
    numbers.write(batch(batches as u64, 16));
    scheduler.run()?;

    info!(runs = scheduler.runs(), "done");
    Ok(())
}
