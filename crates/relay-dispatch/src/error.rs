use thiserror::Error;

use relay_common::DispatcherState;

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Queue full: capacity {0}")]
    QueueFull(usize),

    #[error("Dispatcher is not accepting jobs (state {0})")]
    NotAccepting(DispatcherState),

    #[error("Invalid lifecycle transition from {from} to {to}")]
    InvalidState {
        from: DispatcherState,
        to: DispatcherState,
    },

    #[error("Dispatcher already stopped or stopping")]
    AlreadyStopped,

    #[error("At least one session is required")]
    NoSessions,

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Failure reported by a delivery attempt. Workers log it and drop the job.
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status code: {0}")]
    Status(u16),

    #[error("Client build error: {0}")]
    Build(String),
}
