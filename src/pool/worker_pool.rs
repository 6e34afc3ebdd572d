//! Worker Pool Implementation
//!
//! A fixed number of worker threads share one job queue behind a mutex,
//! with a condition variable as the wake-up signal. The worker count is set
//! at construction and never changes.
//!
//! Jobs are consumed LIFO: `submit` appends to the queue and workers pop
//! from the back, so the most recently submitted job runs first. This is a
//! deliberate policy choice, not an accident of the data structure, and it
//! is pinned by a test below.

use crate::pool::Job;
use parking_lot::{Condvar, Mutex};
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use tracing::{debug, error, trace};

/// Errors that can occur while constructing a pool.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// A worker thread could not be spawned.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] io::Error),
}

/// Queue and lifecycle flags, all guarded by one mutex.
///
/// Keeping the flags under the same lock as the queue means a shutdown
/// cannot slip between a worker's empty-queue check and its wait on the
/// wake-up signal.
struct PoolState {
    /// Pending jobs. Pushed in submission order, popped from the back.
    jobs: Vec<Box<dyn Job>>,
    /// Cleared to make every worker exit after its current job.
    running: bool,
    /// Set to stop accepting submissions while the queue drains.
    finishing: bool,
}

struct PoolShared {
    state: Mutex<PoolState>,
    /// Notified once per submission, broadcast on drain and stop.
    wake_up: Condvar,
}

/// One worker thread, joined on shutdown.
struct Worker {
    id: usize,
    handle: Option<thread::JoinHandle<()>>,
}

impl Worker {
    fn spawn(id: usize, shared: Arc<PoolShared>) -> io::Result<Self> {
        let handle = thread::Builder::new()
            .name(format!("echo-worker-{id}"))
            .spawn(move || worker_main(id, &shared))?;

        Ok(Worker {
            id,
            handle: Some(handle),
        })
    }
}

/// A fixed-size pool of worker threads with a shared LIFO job queue.
///
/// All worker threads start immediately at construction. The pool is
/// stopped once, either by [`drain_and_finish`](WorkerPool::drain_and_finish)
/// followed by a stop, or directly by
/// [`abandon_and_stop`](WorkerPool::abandon_and_stop). Dropping a pool that
/// is still running drains it and joins every worker, so no thread leaks.
///
/// # Example
///
/// ```
/// use echopool::WorkerPool;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// let pool = WorkerPool::new(4).unwrap();
/// let counter = Arc::new(AtomicUsize::new(0));
///
/// for _ in 0..16 {
///     let counter = Arc::clone(&counter);
///     pool.submit(move |_| {
///         counter.fetch_add(1, Ordering::SeqCst);
///     });
/// }
///
/// pool.drain_and_finish();
/// pool.abandon_and_stop();
/// assert_eq!(counter.load(Ordering::SeqCst), 16);
/// ```
pub struct WorkerPool {
    shared: Arc<PoolShared>,
    workers: Mutex<Vec<Worker>>,
}

impl WorkerPool {
    /// Creates a pool and immediately starts `count` worker threads.
    ///
    /// # Panics
    ///
    /// Panics if `count` is zero.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Spawn`] if any worker thread fails to spawn.
    /// Workers spawned before the failure are stopped and joined.
    pub fn new(count: usize) -> Result<Self, PoolError> {
        assert!(count > 0, "worker pool needs at least one worker");

        let shared = Arc::new(PoolShared {
            state: Mutex::new(PoolState {
                jobs: Vec::new(),
                running: true,
                finishing: false,
            }),
            wake_up: Condvar::new(),
        });

        let mut workers = Vec::with_capacity(count);
        for id in 0..count {
            match Worker::spawn(id, Arc::clone(&shared)) {
                Ok(worker) => workers.push(worker),
                Err(e) => {
                    let partial = WorkerPool {
                        shared,
                        workers: Mutex::new(workers),
                    };
                    partial.abandon_and_stop();
                    return Err(PoolError::Spawn(e));
                }
            }
        }

        debug!(workers = count, "worker pool started");

        Ok(WorkerPool {
            shared,
            workers: Mutex::new(workers),
        })
    }

    /// Submits a job for execution and wakes one idle worker.
    ///
    /// Submission is best effort: once a drain or stop has begun the job is
    /// silently discarded. Callers that need every job processed must keep
    /// submitting strictly before they ask the pool to finish.
    ///
    /// The only ordering guarantee is that a job runs no earlier than its
    /// submission. Among queued jobs the most recent submission runs first.
    pub fn submit<J: Job + 'static>(&self, job: J) {
        {
            let mut state = self.shared.state.lock();
            if state.finishing || !state.running {
                debug!("job submitted after shutdown began, discarding");
                return;
            }
            state.jobs.push(Box::new(job));
        }
        self.shared.wake_up.notify_one();
    }

    /// Stops accepting new jobs and blocks until the queue is empty.
    ///
    /// Workers keep consuming until nothing is left queued. A job a worker
    /// has already dequeued may still be executing when this returns; only
    /// the queue itself is guaranteed drained. The wait is a poll with a
    /// yield between checks, and it also ends if the pool is stopped from
    /// another thread while we wait.
    pub fn drain_and_finish(&self) {
        {
            let mut state = self.shared.state.lock();
            if !state.running {
                return;
            }
            state.finishing = true;
        }
        self.shared.wake_up.notify_all();

        loop {
            {
                let state = self.shared.state.lock();
                if state.jobs.is_empty() || !state.running {
                    break;
                }
            }
            thread::yield_now();
        }

        debug!("job queue drained");
    }

    /// Stops the pool without draining it and joins every worker thread.
    ///
    /// Idle workers exit immediately. A worker mid-job finishes that job
    /// first and then exits. Jobs still queued when this is called are
    /// discarded without being performed. Calling this more than once is
    /// harmless; later calls find nothing left to join.
    pub fn abandon_and_stop(&self) {
        let discarded;
        {
            let mut state = self.shared.state.lock();
            state.running = false;
            discarded = state.jobs.len();
            state.jobs.clear();
        }
        self.shared.wake_up.notify_all();

        if discarded > 0 {
            debug!(discarded, "queued jobs abandoned");
        }

        let mut workers = self.workers.lock();
        for worker in workers.iter_mut() {
            if let Some(handle) = worker.handle.take() {
                if handle.join().is_err() {
                    error!(worker = worker.id, "worker thread panicked");
                }
            }
        }
        workers.clear();
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.drain_and_finish();
        self.abandon_and_stop();
    }
}

/// Main loop for one worker thread.
///
/// While the pool is running: take the most recently queued job and perform
/// it, wait on the wake-up signal when idle, or exit once the queue is
/// empty during a drain.
fn worker_main(id: usize, shared: &PoolShared) {
    trace!(worker = id, "worker started");

    loop {
        let job = {
            let mut state = shared.state.lock();
            loop {
                if !state.running {
                    break None;
                }
                if let Some(job) = state.jobs.pop() {
                    break Some(job);
                }
                if state.finishing {
                    break None;
                }
                shared.wake_up.wait(&mut state);
            }
        };

        let Some(job) = job else { break };

        trace!(worker = id, "job dequeued");
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| job.perform(id))) {
            // One failing job must not take the worker down with it.
            error!(
                worker = id,
                panic = panic_message(payload.as_ref()),
                "job panicked"
            );
        }
    }

    trace!(worker = id, "worker exiting");
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    #[test]
    fn executes_every_job_submitted_before_drain() {
        let pool = WorkerPool::new(4).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..100 {
            let counter = Arc::clone(&counter);
            pool.submit(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }

        pool.drain_and_finish();
        pool.abandon_and_stop();

        assert_eq!(counter.load(Ordering::SeqCst), 100);
    }

    #[test]
    fn concurrent_submitters_lose_no_jobs() {
        let pool = Arc::new(WorkerPool::new(4).unwrap());
        let counter = Arc::new(AtomicUsize::new(0));

        let mut submitters = Vec::new();
        for _ in 0..8 {
            let pool = Arc::clone(&pool);
            let counter = Arc::clone(&counter);
            submitters.push(thread::spawn(move || {
                for _ in 0..50 {
                    let counter = Arc::clone(&counter);
                    pool.submit(move |_| {
                        counter.fetch_add(1, Ordering::SeqCst);
                    });
                }
            }));
        }
        for submitter in submitters {
            submitter.join().unwrap();
        }

        pool.drain_and_finish();
        pool.abandon_and_stop();

        assert_eq!(counter.load(Ordering::SeqCst), 8 * 50);
    }

    #[test]
    fn drain_waits_for_queued_jobs() {
        let pool = WorkerPool::new(1).unwrap();
        let completed = Arc::new(AtomicUsize::new(0));
        let started = Instant::now();

        for _ in 0..10 {
            let completed = Arc::clone(&completed);
            pool.submit(move |_| {
                thread::sleep(Duration::from_millis(10));
                completed.fetch_add(1, Ordering::SeqCst);
            });
        }

        pool.drain_and_finish();

        // The queue only empties once the single worker dequeues the last
        // job, so at least the nine before it have fully run by now.
        assert!(started.elapsed() >= Duration::from_millis(80));
        assert!(completed.load(Ordering::SeqCst) >= 9);

        pool.abandon_and_stop();
        assert_eq!(completed.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn abandon_discards_queued_jobs_and_returns_promptly() {
        let pool = WorkerPool::new(2).unwrap();
        let performed = Arc::new(AtomicUsize::new(0));

        for _ in 0..5 {
            let performed = Arc::clone(&performed);
            pool.submit(move |_| {
                performed.fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(200));
            });
        }

        // Let both workers pick up their first jobs.
        thread::sleep(Duration::from_millis(50));

        let stop_started = Instant::now();
        pool.abandon_and_stop();

        // Bounded by the two in-flight jobs, not by all five.
        assert!(stop_started.elapsed() < Duration::from_millis(400));
        assert!(performed.load(Ordering::SeqCst) <= 2);
    }

    #[test]
    fn most_recent_submission_runs_first() {
        let pool = WorkerPool::new(1).unwrap();
        let order = Arc::new(Mutex::new(Vec::new()));

        {
            let order = Arc::clone(&order);
            pool.submit(move |_| {
                thread::sleep(Duration::from_millis(50));
                order.lock().push(0);
            });
        }

        // Wait until the worker is busy with job 0, then queue three more.
        thread::sleep(Duration::from_millis(10));
        for tag in 1..=3 {
            let order = Arc::clone(&order);
            pool.submit(move |_| {
                order.lock().push(tag);
            });
        }

        pool.drain_and_finish();
        pool.abandon_and_stop();

        assert_eq!(*order.lock(), vec![0, 3, 2, 1]);
    }

    #[test]
    fn panicking_job_does_not_kill_the_worker() {
        let pool = WorkerPool::new(1).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        pool.submit(|_| panic!("job failure"));
        {
            let counter = Arc::clone(&counter);
            pool.submit(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }

        pool.drain_and_finish();
        pool.abandon_and_stop();

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn submissions_after_drain_are_discarded() {
        let pool = WorkerPool::new(1).unwrap();
        pool.drain_and_finish();

        let counter = Arc::new(AtomicUsize::new(0));
        {
            let counter = Arc::clone(&counter);
            pool.submit(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }

        pool.abandon_and_stop();
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn drop_joins_all_workers() {
        let counter = Arc::new(AtomicUsize::new(0));
        {
            let pool = WorkerPool::new(2).unwrap();
            for _ in 0..20 {
                let counter = Arc::clone(&counter);
                pool.submit(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                });
            }
        }

        // Drop drained the queue and joined the workers.
        assert_eq!(counter.load(Ordering::SeqCst), 20);
    }

    #[test]
    fn stopping_twice_does_not_hang() {
        let pool = WorkerPool::new(2).unwrap();
        pool.abandon_and_stop();
        pool.abandon_and_stop();
        pool.drain_and_finish();
    }

    #[test]
    #[should_panic(expected = "at least one worker")]
    fn zero_workers_is_rejected() {
        let _ = WorkerPool::new(0);
    }
}
