// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Fixed-size worker pool with one job channel per lane.
//!
//! Workers of a lane block on `select!` over the lane's job channel and the
//! shared shutdown channel. Dropping the only shutdown sender disconnects that
//! channel, which wakes every worker and makes it exit without touching the
//! jobs still queued.

use crossbeam_channel::{select, unbounded, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::engine::registry::ThreadGroupRegistry;
use crate::errors::SchedulerError;

struct LaneChannel {
    name: String,
    threads: usize,
    jobs: Option<(Sender<usize>, Receiver<usize>)>,
}

/// Submission side of the pool, cloned into the dispatcher.
#[derive(Clone)]
pub struct Submitter {
    lanes: Vec<(String, Option<Sender<usize>>)>,
}

impl Submitter {
    /// Queues `task` on `lane`. Lanes without workers, such as `main`, refuse.
    pub fn submit(&self, lane: usize, task: usize) -> Result<(), SchedulerError> {
        let closed = || SchedulerError::LaneClosed {
            group: self
                .lanes
                .get(lane)
                .map(|(name, _)| name.clone())
                .unwrap_or_else(|| lane.to_string()),
        };
        match self.lanes.get(lane) {
            Some((_, Some(sender))) => sender.send(task).map_err(|_| closed()),
            _ => Err(closed()),
        }
    }
}

pub struct ThreadPool {
    lanes: Vec<LaneChannel>,
    shutdown: Option<Sender<()>>,
    shutdown_signal: Receiver<()>,
    workers: Vec<JoinHandle<()>>,
}

impl ThreadPool {
    pub fn new(registry: &ThreadGroupRegistry) -> Self {
        let lanes = registry
            .lanes()
            .iter()
            .map(|lane| LaneChannel {
                name: lane.name.clone(),
                threads: lane.threads,
                jobs: (lane.threads > 0).then(unbounded),
            })
            .collect();
        let (shutdown, shutdown_signal) = unbounded();

        Self {
            lanes,
            shutdown: Some(shutdown),
            shutdown_signal,
            workers: Vec::new(),
        }
    }

    pub fn submitter(&self) -> Submitter {
        Submitter {
            lanes: self
                .lanes
                .iter()
                .map(|lane| {
                    let sender = lane.jobs.as_ref().map(|(sender, _)| sender.clone());
                    (lane.name.clone(), sender)
                })
                .collect(),
        }
    }

    /// Spawns the workers. Each job is handed to `execute` on a worker of the
    /// lane it was submitted to.
    pub fn start<F>(&mut self, execute: F) -> Result<(), SchedulerError>
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        let execute = Arc::new(execute);
        for lane in &self.lanes {
            let Some((_, jobs)) = &lane.jobs else {
                continue;
            };
            for worker in 0..lane.threads {
                let jobs = jobs.clone();
                let shutdown = self.shutdown_signal.clone();
                let execute = execute.clone();
                let handle = thread::Builder::new()
                    .name(format!("conduit-{}-{}", lane.name, worker))
                    .spawn(move || work(jobs, shutdown, execute))
                    .map_err(SchedulerError::ThreadSpawn)?;
                self.workers.push(handle);
            }
        }
        Ok(())
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Stops every worker and waits for them. Jobs still queued are dropped.
    pub fn shutdown(&mut self) {
        self.shutdown.take();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                tracing::warn!("worker thread exited with a panic");
            }
        }
    }
}

fn work<F: Fn(usize)>(jobs: Receiver<usize>, shutdown: Receiver<()>, execute: Arc<F>) {
    loop {
        select! {
            recv(shutdown) -> _ => break,
            recv(jobs) -> job => match job {
                Ok(task) => execute(task),
                Err(_) => break,
            },
        }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchedulerConfig;
    use crate::engine::registry::{ANY_LANE, MAIN_LANE};
    use parking_lot::Mutex;
    use std::time::Duration;

    fn registry() -> ThreadGroupRegistry {
        ThreadGroupRegistry::from_config(&SchedulerConfig::with_threads(2).with_thread_group("io", 1))
            .unwrap()
    }

    #[test]
    fn test_jobs_run_on_their_lane() {
        let registry = registry();
        let mut pool = ThreadPool::new(&registry);
        let submitter = pool.submitter();
        let (done, finished) = unbounded();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let record = seen.clone();

        pool.start(move |task| {
            let name = thread::current().name().unwrap_or_default().to_string();
            record.lock().push((task, name));
            done.send(()).unwrap();
        })
        .unwrap();
        assert_eq!(pool.worker_count(), 3);

        submitter.submit(ANY_LANE, 1).unwrap();
        submitter.submit(2, 2).unwrap();
        for _ in 0..2 {
            finished.recv_timeout(Duration::from_secs(5)).unwrap();
        }

        let mut seen = seen.lock().clone();
        seen.sort();
        assert!(seen[0].1.starts_with("conduit-any-"));
        assert_eq!(seen[1].1, "conduit-io-0");
    }

    #[test]
    fn test_main_lane_has_no_workers() {
        let pool = ThreadPool::new(&registry());
        let submitter = pool.submitter();
        assert!(matches!(
            submitter.submit(MAIN_LANE, 0),
            Err(SchedulerError::LaneClosed { .. })
        ));
        assert!(matches!(
            submitter.submit(42, 0),
            Err(SchedulerError::LaneClosed { .. })
        ));
    }

    #[test]
    fn test_shutdown_stops_idle_workers() {
        let mut pool = ThreadPool::new(&registry());
        pool.start(|_| {}).unwrap();
        pool.shutdown();
        assert_eq!(pool.worker_count(), 0);
    }
}
