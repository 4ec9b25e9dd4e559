//! Fixed-size worker pool driving the per-file hash tasks.
//!
//! Workers block on a `Condvar` over a `Mutex<VecDeque<Task>>`; nothing
//! holds either lock while running a task. Back-pressure and
//! completion are both poll-based on a 100ms cadence, per the original
//! tool's documented cadence — not a bounded channel + semaphore, which
//! would remove the only observable latency in the driver but change
//! its behavior.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::error::{Error, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const MAX_WORKERS: usize = 256;

type Task = Box<dyn FnOnce() + Send + 'static>;

struct Shared {
    queue: Mutex<VecDeque<Task>>,
    cv: Condvar,
    idle: AtomicUsize,
    completed: AtomicUsize,
    submitted: AtomicUsize,
    stopped: AtomicBool,
}

/// A bounded worker pool. `size` workers run concurrently; `commit`
/// back-pressures the caller (via a sleep-poll, never a busy spin) once
/// every worker is occupied.
pub struct Pool {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl Pool {
    /// Resolves the worker count the same way the original tool does:
    /// caller-specified `jobs` if non-zero, else `hardware concurrency`,
    /// else 8, hard-capped at 256.
    pub fn resolve_size(jobs: usize) -> usize {
        let size = if jobs != 0 {
            jobs
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(8)
        };
        size.min(MAX_WORKERS).max(1)
    }

    pub fn new(size: usize) -> Self {
        let size = size.min(MAX_WORKERS).max(1);
        let shared = Arc::new(Shared {
            queue: Mutex::new(VecDeque::new()),
            cv: Condvar::new(),
            idle: AtomicUsize::new(size),
            completed: AtomicUsize::new(0),
            submitted: AtomicUsize::new(0),
            stopped: AtomicBool::new(false),
        });

        let workers = (0..size)
            .map(|_| {
                let shared = Arc::clone(&shared);
                std::thread::spawn(move || worker_loop(shared))
            })
            .collect();

        Self { shared, workers }
    }

    /// Enqueues `task`, blocking (via a 100ms sleep-poll, not a busy
    /// spin) while every worker is occupied. Fails if the pool has
    /// already been stopped.
    pub fn commit(&self, task: impl FnOnce() + Send + 'static) -> Result<()> {
        if self.shared.stopped.load(Ordering::SeqCst) {
            return Err(Error::ParamInvalid {
                message: "pool already stopped".to_string(),
            });
        }

        while self.shared.idle.load(Ordering::SeqCst) == 0 {
            std::thread::sleep(POLL_INTERVAL);
        }
        self.shared.idle.fetch_sub(1, Ordering::SeqCst);

        {
            let mut queue = self.shared.queue.lock().unwrap();
            queue.push_back(Box::new(task));
        }
        self.shared.submitted.fetch_add(1, Ordering::SeqCst);
        self.shared.cv.notify_one();
        Ok(())
    }

    /// Blocks (100ms poll) until every committed task has completed.
    pub fn wait_idle(&self) {
        let total = self.shared.submitted.load(Ordering::SeqCst);
        while self.shared.completed.load(Ordering::SeqCst) < total {
            std::thread::sleep(POLL_INTERVAL);
        }
    }

    pub fn completed_count(&self) -> usize {
        self.shared.completed.load(Ordering::SeqCst)
    }

    /// Drains in-flight tasks then joins every worker. Further `commit`
    /// calls after this fail.
    pub fn stop(mut self) {
        self.wait_idle();
        self.shared.stopped.store(true, Ordering::SeqCst);
        self.shared.cv.notify_all();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

fn worker_loop(shared: Arc<Shared>) {
    loop {
        let task = {
            let mut queue = shared.queue.lock().unwrap();
            loop {
                if let Some(task) = queue.pop_front() {
                    break Some(task);
                }
                if shared.stopped.load(Ordering::SeqCst) {
                    break None;
                }
                queue = shared.cv.wait(queue).unwrap();
            }
        };

        match task {
            Some(task) => {
                task();
                shared.completed.fetch_add(1, Ordering::SeqCst);
                shared.idle.fetch_add(1, Ordering::SeqCst);
            }
            None => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize as Counter;

    #[test]
    fn runs_every_committed_task() {
        let pool = Pool::new(4);
        let counter = Arc::new(Counter::new(0));

        for _ in 0..20 {
            let counter = Arc::clone(&counter);
            pool.commit(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }

        pool.wait_idle();
        assert_eq!(counter.load(Ordering::SeqCst), 20);
        pool.stop();
    }

    #[test]
    fn resolve_size_falls_back_to_hardware_concurrency() {
        assert!(Pool::resolve_size(0) >= 1);
        assert_eq!(Pool::resolve_size(4), 4);
        assert_eq!(Pool::resolve_size(10_000), 256);
    }

    #[test]
    fn shared_result_map_accumulates_under_concurrent_writers() {
        let pool = Pool::new(8);
        let map: Arc<Mutex<std::collections::HashMap<u64, Vec<u32>>>> =
            Arc::new(Mutex::new(std::collections::HashMap::new()));

        for i in 0..50u32 {
            let map = Arc::clone(&map);
            pool.commit(move || {
                let hash = (i % 5) as u64;
                map.lock().unwrap().entry(hash).or_default().push(i);
            })
            .unwrap();
        }

        pool.wait_idle();
        let map = map.lock().unwrap();
        assert_eq!(map.len(), 5);
        assert_eq!(map.values().map(|v| v.len()).sum::<usize>(), 50);
        pool.stop();
    }
}
