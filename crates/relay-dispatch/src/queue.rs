//! JobQueue - bounded FIFO between the HTTP intake and the workers
//!
//! Admission never waits: a full queue rejects immediately. Workers share a
//! single receiver; once the queue is closed they keep draining what is left
//! and then observe closure as `None`.

use std::sync::atomic::{AtomicUsize, Ordering};
use parking_lot::RwLock;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};

use relay_common::Job;
use crate::error::DispatchError;

/// Why a job was not admitted. The job is handed back to the caller.
#[derive(Error, Debug)]
pub enum EnqueueError {
    #[error("queue is full")]
    Full(Job),

    #[error("queue is closed")]
    Closed(Job),
}

impl EnqueueError {
    pub fn into_job(self) -> Job {
        match self {
            EnqueueError::Full(job) | EnqueueError::Closed(job) => job,
        }
    }
}

pub struct JobQueue {
    /// `None` once closed; dropping the last sender is what ends the workers
    sender: RwLock<Option<mpsc::Sender<Job>>>,
    receiver: Mutex<mpsc::Receiver<Job>>,
    capacity: usize,
    depth: AtomicUsize,
}

impl JobQueue {
    pub fn new(capacity: usize) -> crate::Result<Self> {
        if capacity == 0 {
            return Err(DispatchError::Config("queue capacity must be at least 1".to_string()));
        }

        let (tx, rx) = mpsc::channel(capacity);
        Ok(Self {
            sender: RwLock::new(Some(tx)),
            receiver: Mutex::new(rx),
            capacity,
            depth: AtomicUsize::new(0),
        })
    }

    /// Place a job without waiting.
    pub fn try_push(&self, job: Job) -> Result<(), EnqueueError> {
        let guard = self.sender.read();
        let Some(tx) = guard.as_ref() else {
            return Err(EnqueueError::Closed(job));
        };

        // Count before sending so a fast worker never decrements below zero
        self.depth.fetch_add(1, Ordering::SeqCst);
        match tx.try_send(job) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.depth.fetch_sub(1, Ordering::SeqCst);
                match e {
                    mpsc::error::TrySendError::Full(job) => Err(EnqueueError::Full(job)),
                    mpsc::error::TrySendError::Closed(job) => Err(EnqueueError::Closed(job)),
                }
            }
        }
    }

    /// Wait for the next job. Returns `None` once the queue is closed and empty.
    pub async fn pop(&self) -> Option<Job> {
        let job = self.receiver.lock().await.recv().await;
        if job.is_some() {
            self.depth.fetch_sub(1, Ordering::SeqCst);
        }
        job
    }

    /// Stop admitting jobs. Returns false if the queue was already closed.
    pub fn close(&self) -> bool {
        self.sender.write().take().is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.sender.read().is_none()
    }

    /// Remove every job still buffered. Only used after workers are gone.
    pub async fn drain_remaining(&self) -> Vec<Job> {
        let mut rx = self.receiver.lock().await;
        let mut drained = Vec::new();
        while let Ok(job) = rx.try_recv() {
            self.depth.fetch_sub(1, Ordering::SeqCst);
            drained.push(job);
        }
        drained
    }

    pub fn len(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
