use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Request to send a text message
#[derive(Debug, Deserialize, ToSchema)]
pub struct SendRequest {
    /// Recipient phone number (digits, optionally with a chat id suffix)
    pub to: String,
    /// Message text
    pub message: String,
}

impl SendRequest {
    /// Both fields must contain something other than whitespace
    pub fn is_valid(&self) -> bool {
        !self.to.trim().is_empty() && !self.message.trim().is_empty()
    }
}

/// Response after a message was queued
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendAcceptedResponse {
    /// Always "queued"
    pub status: String,
    pub message: String,
    /// Correlation id for log lookup
    pub job_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self { error: error.into() }
    }
}

/// Simple health response
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// UP or DRAINING
    pub status: String,
    pub version: String,
}

/// Kubernetes probe response
#[derive(Debug, Serialize, ToSchema)]
pub struct ProbeResponse {
    /// LIVE, READY or NOT_READY
    pub status: String,
}
