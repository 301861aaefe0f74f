//! Bounded worker pool.
//!
//! The coordination loop must never wait on a slow job. It hands work to the pool,
//! which either accepts it at once or refuses it. At most `worker_count` jobs run
//! at a time and at most `backlog` more wait for a worker; anything beyond that is
//! rejected so the caller can answer immediately instead of queueing without bound.

use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("worker pool saturated ({workers} running, {backlog} queued)")]
pub struct PoolSaturated {
    pub workers: usize,
    pub backlog: usize,
}

pub struct WorkerPool {
    /// One permit per job allowed to run.
    running: Arc<Semaphore>,
    /// One permit per job admitted at all, running or queued.
    admitted: Arc<Semaphore>,
    worker_count: usize,
    backlog: usize,
}

impl WorkerPool {
    /// # Arguments
    /// * `worker_count`: Typically set to the number of CPU cores. Zero is treated as one.
    /// * `backlog`: Jobs allowed to wait for a free worker.
    pub fn new(worker_count: usize, backlog: usize) -> Self {
        let worker_count = worker_count.max(1);
        tracing::info!(
            "Starting worker pool with {} workers (backlog {})",
            worker_count,
            backlog
        );

        Self {
            running: Arc::new(Semaphore::new(worker_count)),
            admitted: Arc::new(Semaphore::new(worker_count + backlog)),
            worker_count,
            backlog,
        }
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Number of workers not currently running a job.
    pub fn idle_workers(&self) -> usize {
        self.running.available_permits()
    }

    /// Jobs currently admitted, running or queued.
    pub fn pending_jobs(&self) -> usize {
        self.worker_count + self.backlog - self.admitted.available_permits()
    }

    /// Admits `job` without blocking the caller, or refuses it when every worker
    /// is busy and the backlog is full.
    pub fn try_spawn<F>(&self, job: F) -> Result<tokio::task::JoinHandle<()>, PoolSaturated>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Ok(slot) = self.admitted.clone().try_acquire_owned() else {
            return Err(PoolSaturated {
                workers: self.worker_count,
                backlog: self.backlog,
            });
        };
        let running = self.running.clone();

        Ok(tokio::spawn(async move {
            let _slot = slot;
            let Ok(_permit) = running.acquire_owned().await else {
                tracing::warn!("Worker pool closed, dropping job");
                return;
            };
            job.await;
        }))
    }
}
