//! Dashboard ingestion endpoint client.

use reqwest::header::CONTENT_TYPE;
use schedsync_auth::Credential;
use schedsync_core::{NetworkError, ReqwestErrorExt};
use schedsync_schedule::WeekResult;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Path appended to the configured server origin.
pub const SYNC_PATH: &str = "/api/sync-schedule";

/// The three weeks of a run. Absent weeks serialize as `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WeekSchedules {
    pub week0: Option<WeekResult>,
    pub week1: Option<WeekResult>,
    pub week2: Option<WeekResult>,
}

impl WeekSchedules {
    pub fn present_count(&self) -> usize {
        [&self.week0, &self.week1, &self.week2]
            .iter()
            .filter(|w| w.is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.present_count() == 0
    }
}

/// Body posted to the ingestion endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncPayload {
    pub name: String,
    pub email: String,
    pub schedules: WeekSchedules,
}

impl SyncPayload {
    /// Returns `None` when no week was fetched; such a payload is never sent.
    pub fn new(credential: &Credential, schedules: WeekSchedules) -> Option<Self> {
        if schedules.is_empty() {
            return None;
        }

        Some(Self {
            name: credential.name.clone(),
            email: credential.email.clone(),
            schedules,
        })
    }
}

/// Ingestion endpoint reply.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IngestResponse {
    /// Any JSON value; see [`IngestResponse::is_success`].
    #[serde(default)]
    pub success: serde_json::Value,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

impl IngestResponse {
    /// Whether `success` is truthy: anything but `null`, `false`, `0`,
    /// `NaN` or `""`.
    pub fn is_success(&self) -> bool {
        match &self.success {
            serde_json::Value::Null => false,
            serde_json::Value::Bool(b) => *b,
            serde_json::Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
            serde_json::Value::String(s) => !s.is_empty(),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => true,
        }
    }

    /// Server-provided error text, unquoted when it is a JSON string.
    pub fn error_message(&self) -> String {
        match &self.error {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Null) | None => "unknown error".to_string(),
            Some(other) => other.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IngestClient {
    client: reqwest::Client,
    endpoint: String,
}

impl IngestClient {
    pub fn new(client: reqwest::Client, server_url: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}{}", server_url.trim_end_matches('/'), SYNC_PATH),
        }
    }

    /// Post the payload and read the `{ success, error }` reply.
    ///
    /// The reply body is interpreted whatever the status code; only a body
    /// that is not the expected JSON is an error.
    #[instrument(skip(self, payload), fields(weeks = payload.schedules.present_count()), level = "debug")]
    pub async fn send(&self, payload: &SyncPayload) -> Result<IngestResponse, NetworkError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .json(payload)
            .send()
            .await
            .map_err(|e| e.into_network_error())?;

        let status = response.status();
        let text = response.text().await.map_err(|e| e.into_network_error())?;

        match serde_json::from_str::<IngestResponse>(&text) {
            Ok(reply) => Ok(reply),
            Err(_) if !status.is_success() => Err(NetworkError::ServerError {
                status: status.as_u16(),
                message: text,
            }),
            Err(e) => Err(NetworkError::InvalidResponse(format!(
                "JSON parse error: {}",
                e
            ))),
        }
    }
}
