//! Delivery client - the outbound call to the WAHA gateway
//!
//! - POST `{base_url}/api/sendText` with chat id, text and session
//! - `X-Api-Key` authentication
//! - 200 and 201 count as delivered, anything else is a failure
//! - Bounded per-request timeout so one slow call cannot pin a worker

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

use relay_common::Job;
use crate::error::DeliveryError;

pub const API_KEY_HEADER: &str = "X-Api-Key";
const SEND_TEXT_PATH: &str = "/api/sendText";
const PERSONAL_CHAT_SUFFIX: &str = "@c.us";

/// Performs one delivery attempt for a job through the given session.
#[async_trait]
pub trait DeliveryClient: Send + Sync {
    async fn send(&self, job: &Job, session: &str) -> Result<(), DeliveryError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendTextPayload<'a> {
    chat_id: String,
    text: &'a str,
    session: &'a str,
}

/// Configuration for the WAHA client
#[derive(Debug, Clone)]
pub struct WahaClientConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for WahaClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            api_key: String::new(),
            timeout: Duration::from_secs(15),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

pub struct WahaClient {
    client: Client,
    send_url: String,
    api_key: String,
}

impl WahaClient {
    pub fn new(config: WahaClientConfig) -> Result<Self, DeliveryError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| DeliveryError::Build(e.to_string()))?;

        let send_url = format!("{}{}", config.base_url.trim_end_matches('/'), SEND_TEXT_PATH);

        info!(
            url = %send_url,
            timeout_secs = config.timeout.as_secs(),
            "WahaClient initialized"
        );

        Ok(Self {
            client,
            send_url,
            api_key: config.api_key,
        })
    }

    pub fn send_url(&self) -> &str {
        &self.send_url
    }
}

/// Personal chats are addressed as `<number>@c.us`; ids that already carry a
/// domain (groups, channels) pass through.
pub fn chat_id_for(recipient: &str) -> String {
    if recipient.contains('@') {
        recipient.to_string()
    } else {
        format!("{}{}", recipient, PERSONAL_CHAT_SUFFIX)
    }
}

#[async_trait]
impl DeliveryClient for WahaClient {
    async fn send(&self, job: &Job, session: &str) -> Result<(), DeliveryError> {
        let payload = SendTextPayload {
            chat_id: chat_id_for(&job.recipient),
            text: &job.content,
            session,
        };

        let mut request = self.client.post(&self.send_url).json(&payload);
        if !self.api_key.is_empty() {
            request = request.header(API_KEY_HEADER, &self.api_key);
        }

        let response = request.send().await?;
        let status = response.status();

        debug!(job_id = %job.id, status = status.as_u16(), "Gateway responded");

        if status == StatusCode::OK || status == StatusCode::CREATED {
            Ok(())
        } else {
            Err(DeliveryError::Status(status.as_u16()))
        }
    }
}
