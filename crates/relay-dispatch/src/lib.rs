//! waha-relay Job Dispatcher
//!
//! Accepts outbound text jobs and delivers them asynchronously:
//! - JobQueue: bounded FIFO with fail-fast admission
//! - SessionRotator: round-robin choice of the gateway session per delivery
//! - WorkerPool: fixed set of workers draining the queue
//! - Dispatcher: lifecycle (Created -> Running -> Draining -> Stopped)
//! - DeliveryClient / WahaClient: the outbound gateway call
//! - API: HTTP intake, health and monitoring endpoints

pub mod error;
pub mod queue;
pub mod session;
pub mod client;
pub mod metrics;
pub mod pool;
pub mod dispatcher;
pub mod api;

pub use error::{DispatchError, DeliveryError};
pub use queue::{JobQueue, EnqueueError};
pub use session::SessionRotator;
pub use client::{DeliveryClient, WahaClient, WahaClientConfig};
pub use metrics::DispatchMetrics;
pub use pool::WorkerPool;
pub use dispatcher::{Dispatcher, DispatcherConfig};

pub use relay_common::{Job, DispatcherState, DispatchStats, ShutdownReport};

pub type Result<T> = std::result::Result<T, DispatchError>;
