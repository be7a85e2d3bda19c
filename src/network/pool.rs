//! Worker Pool
//!
//! Fixed-size thread pool fed by a shared job queue.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;

use crate::error::{Result, WordbankError};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// A fixed number of worker threads consuming jobs from a crossbeam channel
///
/// Jobs submitted while every worker is busy wait in the queue. A job that
/// panics is logged and its worker keeps serving the queue.
///
/// The pool is owned by whoever created it; [`WorkerPool::shutdown`] closes
/// the queue, after which workers exit as soon as they are idle.
pub struct WorkerPool {
    /// Sending half of the job queue, `None` once shut down
    sender: Mutex<Option<Sender<Job>>>,

    /// Worker thread handles
    workers: Mutex<Vec<JoinHandle<()>>>,

    /// Number of jobs currently running
    active: Arc<AtomicUsize>,

    size: usize,
}

impl WorkerPool {
    /// Start a pool with `size` worker threads
    pub fn new(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(WordbankError::Config(
                "worker pool needs at least one thread".to_string(),
            ));
        }

        let (tx, rx) = channel::unbounded::<Job>();
        let active = Arc::new(AtomicUsize::new(0));

        let mut workers = Vec::with_capacity(size);
        for id in 0..size {
            let rx = rx.clone();
            let active = Arc::clone(&active);
            let handle = thread::Builder::new()
                .name(format!("wordbank-worker-{}", id))
                .spawn(move || run_jobs(id, rx, active))?;
            workers.push(handle);
        }

        tracing::debug!("Created worker pool with {} threads", size);

        Ok(Self {
            sender: Mutex::new(Some(tx)),
            workers: Mutex::new(workers),
            active,
            size,
        })
    }

    /// Queue a job for the next free worker
    ///
    /// Fails with `PoolShutdown` once the pool has been shut down.
    pub fn spawn<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let sender = self.sender.lock();
        match sender.as_ref() {
            Some(tx) => tx.send(Box::new(job)).map_err(|_| WordbankError::PoolShutdown),
            None => Err(WordbankError::PoolShutdown),
        }
    }

    /// Stop accepting jobs
    ///
    /// Queued jobs still run; workers exit once the queue is drained. Running
    /// jobs are not interrupted and this call does not wait for them.
    pub fn shutdown(&self) {
        if self.sender.lock().take().is_some() {
            tracing::debug!("Worker pool shutting down");
        }
    }

    /// Whether [`WorkerPool::shutdown`] has been called
    pub fn is_shutdown(&self) -> bool {
        self.sender.lock().is_none()
    }

    /// Shut down and wait for every worker thread to exit
    pub fn join(&self) {
        self.shutdown();
        let workers: Vec<_> = self.workers.lock().drain(..).collect();
        for handle in workers {
            if handle.join().is_err() {
                tracing::error!("Worker thread terminated abnormally");
            }
        }
    }

    /// Number of worker threads
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of jobs running right now
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Worker loop: run jobs until the queue is closed and empty
fn run_jobs(id: usize, rx: Receiver<Job>, active: Arc<AtomicUsize>) {
    for job in rx.iter() {
        active.fetch_add(1, Ordering::SeqCst);
        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
            tracing::error!("Job panicked on worker {}", id);
        }
        active.fetch_sub(1, Ordering::SeqCst);
    }
    tracing::trace!("Worker {} exiting", id);
}
