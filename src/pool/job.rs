//! Job Abstraction
//!
//! A job is the unit of work handed to the worker pool. It is moved into
//! the shared queue on submission, dequeued by exactly one worker, and
//! consumed when performed. The pool never observes a job again after a
//! worker has taken it.

/// A unit of work executed by exactly one pool worker.
///
/// `worker_id` identifies the worker thread running the job, which is
/// mostly useful for logging and diagnostics.
///
/// Closures can be submitted directly thanks to the blanket implementation:
///
/// ```
/// use echopool::WorkerPool;
///
/// let pool = WorkerPool::new(2).unwrap();
/// pool.submit(|worker_id| {
///     println!("running on worker {worker_id}");
/// });
/// pool.drain_and_finish();
/// ```
pub trait Job: Send {
    /// Performs the work, consuming the job.
    ///
    /// Runs to completion on the worker's thread. The pool imposes no
    /// preemption and no timeout.
    fn perform(self: Box<Self>, worker_id: usize);
}

impl<F> Job for F
where
    F: FnOnce(usize) + Send,
{
    fn perform(self: Box<Self>, worker_id: usize) {
        (*self)(worker_id)
    }
}
