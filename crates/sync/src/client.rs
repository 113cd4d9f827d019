// HTTP client for the workflow backend
//
// GET /workflow/state     -> JSON array of WorkflowState (snapshot)
// GET /workflow/subscribe -> server-sent events, one WorkflowState per message (push)

use async_trait::async_trait;
use ballotflow_core::WorkflowState;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::{header, StatusCode};
use tracing::{debug, instrument};

use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::source::{PushSource, PushStream, SnapshotSource};

const STATE_PATH: &str = "/workflow/state";
const SUBSCRIBE_PATH: &str = "/workflow/subscribe";

/// Client for the workflow state endpoints
#[derive(Clone)]
pub struct WorkflowApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl WorkflowApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.base_url())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Pull the full list of workflow states
    #[instrument(skip(self), fields(base_url = %self.base_url))]
    pub async fn fetch_states(&self) -> Result<Vec<WorkflowState>> {
        let url = format!("{}{}", self.base_url, STATE_PATH);
        let response = self.http.get(&url).send().await?;
        let response = Self::check_status(response).await?;

        let states: Vec<WorkflowState> = response.json().await?;
        debug!(count = states.len(), "Fetched workflow state snapshot");
        Ok(states)
    }

    /// Open the server-sent events stream of state changes
    #[instrument(skip(self), fields(base_url = %self.base_url))]
    pub async fn subscribe(&self) -> Result<PushStream> {
        let url = format!("{}{}", self.base_url, SUBSCRIBE_PATH);
        let response = self
            .http
            .get(&url)
            .header(header::ACCEPT, "text/event-stream")
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        debug!("Workflow push stream opened");

        let events = response.bytes_stream().eventsource();
        let states = events.filter_map(|event| async move {
            match event {
                // Keep-alive messages carry no body
                Ok(event) if event.data.trim().is_empty() => None,
                Ok(event) => Some(
                    serde_json::from_str::<WorkflowState>(&event.data).map_err(SyncError::from),
                ),
                Err(e) => Some(Err(SyncError::stream(e.to_string()))),
            }
        });

        Ok(Box::pin(states))
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = if status == StatusCode::NOT_FOUND {
            "Not found".to_string()
        } else {
            response.text().await.unwrap_or_default()
        };
        Err(SyncError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl SnapshotSource for WorkflowApiClient {
    async fn fetch_snapshot(&self) -> Result<Vec<WorkflowState>> {
        self.fetch_states().await
    }
}

#[async_trait]
impl PushSource for WorkflowApiClient {
    async fn connect(&self) -> Result<PushStream> {
        self.subscribe().await
    }
}
