//! WorkerPool - fixed set of workers draining the job queue
//!
//! Each worker handles one job at a time: pop, pick a session, call the
//! delivery client, record the outcome, repeat. A failed delivery is logged
//! and the job dropped; the worker keeps going. Workers exit once the queue
//! is closed and empty.

use std::sync::Arc;
use std::time::{Duration, Instant};
use parking_lot::Mutex;
use tokio::task::JoinSet;
use tracing::{info, warn, error, debug, info_span, Instrument};

use relay_common::Job;
use crate::client::DeliveryClient;
use crate::metrics::DispatchMetrics;
use crate::queue::JobQueue;
use crate::session::SessionRotator;

/// Marks a worker busy for as long as it is alive, including when aborted mid-call
struct BusyGuard<'a>(&'a DispatchMetrics);

impl<'a> BusyGuard<'a> {
    fn new(metrics: &'a DispatchMetrics) -> Self {
        metrics.worker_busy();
        Self(metrics)
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.worker_idle();
    }
}

pub struct WorkerPool {
    size: usize,
    queue: Arc<JobQueue>,
    rotator: Arc<SessionRotator>,
    client: Arc<dyn DeliveryClient>,
    metrics: Arc<DispatchMetrics>,
    /// Outstanding workers; taken by `wait` at shutdown
    workers: Mutex<Option<JoinSet<()>>>,
}

impl WorkerPool {
    pub fn new(
        size: usize,
        queue: Arc<JobQueue>,
        rotator: Arc<SessionRotator>,
        client: Arc<dyn DeliveryClient>,
        metrics: Arc<DispatchMetrics>,
    ) -> Self {
        Self {
            size,
            queue,
            rotator,
            client,
            metrics,
            workers: Mutex::new(None),
        }
    }

    /// Spawn all workers. Must run inside a tokio runtime. Returns false if
    /// the pool was already started.
    pub fn start(&self) -> bool {
        let mut workers = self.workers.lock();
        if workers.is_some() {
            return false;
        }

        let mut set = JoinSet::new();
        for worker_id in 0..self.size {
            set.spawn(Self::run_worker(
                worker_id,
                self.queue.clone(),
                self.rotator.clone(),
                self.client.clone(),
                self.metrics.clone(),
            ));
        }

        info!(workers = self.size, sessions = self.rotator.len(), "Worker pool started");
        *workers = Some(set);
        true
    }

    /// Wait for every worker to exit. With a deadline, workers still running
    /// when it expires are aborted. Returns `(drained, aborted_workers)`.
    pub async fn wait(&self, deadline: Option<Duration>) -> (bool, usize) {
        let taken = self.workers.lock().take();
        let Some(mut set) = taken else {
            return (true, 0);
        };

        let drained = match deadline {
            Some(limit) => tokio::time::timeout(limit, Self::join_all(&mut set)).await.is_ok(),
            None => {
                Self::join_all(&mut set).await;
                true
            }
        };

        if drained {
            return (true, 0);
        }

        let aborted = set.len();
        warn!(
            aborted_workers = aborted,
            "Shutdown deadline reached, aborting remaining workers"
        );
        set.abort_all();
        while set.join_next().await.is_some() {}
        (false, aborted)
    }

    async fn join_all(set: &mut JoinSet<()>) {
        while let Some(result) = set.join_next().await {
            if let Err(e) = result {
                if e.is_panic() {
                    error!(error = %e, "Worker panicked");
                }
            }
        }
    }

    async fn run_worker(
        worker_id: usize,
        queue: Arc<JobQueue>,
        rotator: Arc<SessionRotator>,
        client: Arc<dyn DeliveryClient>,
        metrics: Arc<DispatchMetrics>,
    ) {
        debug!(worker_id, "Worker ready");

        while let Some(job) = queue.pop().await {
            metrics.set_queue_depth(queue.len());
            let span = info_span!("delivery", worker_id, job_id = %job.id);
            Self::deliver(&job, &rotator, client.as_ref(), &metrics)
                .instrument(span)
                .await;
        }

        debug!(worker_id, "Worker stopped");
    }

    async fn deliver(
        job: &Job,
        rotator: &SessionRotator,
        client: &dyn DeliveryClient,
        metrics: &DispatchMetrics,
    ) {
        let session = rotator.next();
        let _busy = BusyGuard::new(metrics);
        let queued_ms = job.queued_for_ms();
        let start = Instant::now();

        match client.send(job, session).await {
            Ok(()) => {
                let elapsed = start.elapsed();
                info!(
                    recipient = %job.recipient,
                    session = %session,
                    queued_ms,
                    duration_ms = elapsed.as_millis() as u64,
                    "Message delivered"
                );
                metrics.record_delivered(session, elapsed);
            }
            Err(e) => {
                let elapsed = start.elapsed();
                warn!(
                    recipient = %job.recipient,
                    session = %session,
                    error = %e,
                    duration_ms = elapsed.as_millis() as u64,
                    "Delivery failed, dropping job"
                );
                metrics.record_failed(session, elapsed);
            }
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }
}
