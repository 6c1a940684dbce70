//! Dispatcher - owns the queue, the session rotator and the worker pool
//!
//! Lifecycle: `Created -> Running -> Draining -> Stopped`, forward only.
//! `enqueue` is callable from any number of request handlers; `start` and
//! `stop` are called once each by the process supervisor.

use std::sync::Arc;
use std::time::{Duration, Instant};
use parking_lot::RwLock;
use tracing::{info, warn};

use relay_common::{DispatchStats, DispatcherState, Job, ShutdownReport};
use crate::client::DeliveryClient;
use crate::error::DispatchError;
use crate::metrics::DispatchMetrics;
use crate::pool::WorkerPool;
use crate::queue::{EnqueueError, JobQueue};
use crate::session::SessionRotator;
use crate::Result;

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub workers: usize,
    pub queue_capacity: usize,
    pub sessions: Vec<String>,
    /// Drain deadline for `stop`; `None` waits for workers indefinitely
    pub shutdown_timeout: Option<Duration>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            workers: 50,
            queue_capacity: 10_000,
            sessions: vec!["default".to_string()],
            shutdown_timeout: Some(Duration::from_secs(30)),
        }
    }
}

pub struct Dispatcher {
    queue: Arc<JobQueue>,
    rotator: Arc<SessionRotator>,
    pool: WorkerPool,
    metrics: Arc<DispatchMetrics>,
    state: RwLock<DispatcherState>,
    shutdown_timeout: Option<Duration>,
}

impl Dispatcher {
    pub fn new(config: DispatcherConfig, client: Arc<dyn DeliveryClient>) -> Result<Self> {
        if config.workers == 0 {
            return Err(DispatchError::Config("worker count must be at least 1".to_string()));
        }

        let queue = Arc::new(JobQueue::new(config.queue_capacity)?);
        let rotator = Arc::new(SessionRotator::new(config.sessions)?);
        let metrics = Arc::new(DispatchMetrics::new());
        let pool = WorkerPool::new(
            config.workers,
            queue.clone(),
            rotator.clone(),
            client,
            metrics.clone(),
        );

        Ok(Self {
            queue,
            rotator,
            pool,
            metrics,
            state: RwLock::new(DispatcherState::Created),
            shutdown_timeout: config.shutdown_timeout,
        })
    }

    /// Admit a job without waiting. A full queue fails fast with `QueueFull`.
    pub fn enqueue(&self, job: Job) -> Result<()> {
        let state = self.state();
        if !state.accepts_jobs() {
            self.metrics.record_rejected("not_accepting");
            return Err(DispatchError::NotAccepting(state));
        }

        match self.queue.try_push(job) {
            Ok(()) => {
                self.metrics.record_accepted(self.queue.len());
                Ok(())
            }
            Err(EnqueueError::Full(_)) => {
                self.metrics.record_rejected("queue_full");
                Err(DispatchError::QueueFull(self.queue.capacity()))
            }
            // stop() closed the queue between the state check and the push
            Err(EnqueueError::Closed(_)) => {
                self.metrics.record_rejected("not_accepting");
                Err(DispatchError::NotAccepting(self.state()))
            }
        }
    }

    /// Boolean form of [`enqueue`](Self::enqueue): true when the job was queued
    pub fn try_enqueue(&self, job: Job) -> bool {
        self.enqueue(job).is_ok()
    }

    /// Start all workers. Only valid from `Created`.
    pub fn start(&self) -> Result<()> {
        {
            let mut state = self.state.write();
            if *state != DispatcherState::Created {
                return Err(DispatchError::InvalidState {
                    from: *state,
                    to: DispatcherState::Running,
                });
            }
            *state = DispatcherState::Running;
        }

        self.pool.start();
        info!(
            workers = self.pool.size(),
            queue_capacity = self.queue.capacity(),
            sessions = ?self.rotator.sessions(),
            "Dispatcher running"
        );
        Ok(())
    }

    /// Close the queue, let workers drain it, and wait for them to exit.
    ///
    /// Jobs already queued are still delivered. If a shutdown deadline is
    /// configured and expires, in-flight deliveries are abandoned and the
    /// remaining queued jobs are discarded. The dispatcher ends `Stopped`
    /// either way. A second call returns `AlreadyStopped`.
    pub async fn stop(&self) -> Result<ShutdownReport> {
        {
            let mut state = self.state.write();
            match *state {
                DispatcherState::Draining | DispatcherState::Stopped => {
                    return Err(DispatchError::AlreadyStopped);
                }
                DispatcherState::Created | DispatcherState::Running => {
                    *state = DispatcherState::Draining;
                }
            }
        }

        let started = Instant::now();
        self.queue.close();
        info!(
            queued = self.queue.len(),
            deadline_secs = ?self.shutdown_timeout.map(|d| d.as_secs()),
            "Dispatcher draining"
        );

        let (drained, aborted_workers) = self.pool.wait(self.shutdown_timeout).await;

        let discarded = self.queue.drain_remaining().await;
        if !discarded.is_empty() {
            warn!(discarded = discarded.len(), "Discarding undelivered jobs");
        }
        self.metrics.set_queue_depth(0);

        *self.state.write() = DispatcherState::Stopped;

        let report = ShutdownReport {
            drained,
            aborted_workers,
            discarded_jobs: discarded.len(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            drained = report.drained,
            aborted_workers = report.aborted_workers,
            discarded_jobs = report.discarded_jobs,
            elapsed_ms = report.elapsed_ms,
            "Dispatcher stopped"
        );
        Ok(report)
    }

    pub fn state(&self) -> DispatcherState {
        *self.state.read()
    }

    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            state: self.state(),
            worker_count: self.pool.size() as u32,
            active_workers: self.metrics.active_workers(),
            queue_depth: self.queue.len(),
            queue_capacity: self.queue.capacity(),
            sessions: self.rotator.sessions().to_vec(),
            accepted: self.metrics.accepted(),
            rejected: self.metrics.rejected(),
            delivered: self.metrics.delivered(),
            failed: self.metrics.failed(),
        }
    }

    pub fn metrics(&self) -> &Arc<DispatchMetrics> {
        &self.metrics
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }
}
