use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use utoipa::ToSchema;

pub mod logging;

// ============================================================================
// Core Job Types
// ============================================================================

/// One outbound text message waiting for delivery.
///
/// Jobs are immutable once admitted. They are owned by the queue until a
/// worker claims them and are dropped after a single delivery attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    /// Correlation id, generated at admission
    pub id: String,
    /// Destination phone number or chat id
    pub recipient: String,
    /// Text body
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Job {
    pub fn new(recipient: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            recipient: recipient.into(),
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    /// Milliseconds spent between admission and now
    pub fn queued_for_ms(&self) -> i64 {
        (Utc::now() - self.created_at).num_milliseconds().max(0)
    }
}

// ============================================================================
// Dispatcher Lifecycle
// ============================================================================

/// Lifecycle of the dispatcher. Transitions only move forward:
/// `Created -> Running -> Draining -> Stopped`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DispatcherState {
    Created,
    Running,
    Draining,
    Stopped,
}

impl DispatcherState {
    /// Whether new jobs may still be admitted in this state
    pub fn accepts_jobs(&self) -> bool {
        matches!(self, DispatcherState::Created | DispatcherState::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DispatcherState::Created => "CREATED",
            DispatcherState::Running => "RUNNING",
            DispatcherState::Draining => "DRAINING",
            DispatcherState::Stopped => "STOPPED",
        }
    }
}

impl std::fmt::Display for DispatcherState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Statistics
// ============================================================================

/// Point-in-time view of the dispatcher
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DispatchStats {
    pub state: DispatcherState,
    pub worker_count: u32,
    pub active_workers: u32,
    pub queue_depth: usize,
    pub queue_capacity: usize,
    pub sessions: Vec<String>,
    pub accepted: u64,
    pub rejected: u64,
    pub delivered: u64,
    pub failed: u64,
}

/// Outcome of a dispatcher shutdown
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ShutdownReport {
    /// True when every worker exited on its own before the deadline
    pub drained: bool,
    /// Workers still running at the deadline and aborted
    pub aborted_workers: usize,
    /// Jobs left in the queue after the abort
    pub discarded_jobs: usize,
    pub elapsed_ms: u64,
}
