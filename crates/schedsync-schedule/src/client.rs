//! KSE schedule API client.

use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use schedsync_core::ReqwestErrorExt;
use tracing::instrument;

use crate::error::ScheduleError;
use crate::types::ScheduleBody;
use crate::week::WeekRange;

const ACCEPT_VALUE: &str = "application/json, text/plain, */*";

#[derive(Debug, Clone)]
pub struct ScheduleClient {
    client: reqwest::Client,
    base_url: String,
}

impl ScheduleClient {
    pub fn with_base_url(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Fetch the schedule for one week.
    #[instrument(skip(self, token), fields(week = %range), level = "debug")]
    pub async fn fetch_schedule(
        &self,
        token: &str,
        range: WeekRange,
    ) -> Result<ScheduleBody, ScheduleError> {
        let url = format!(
            "{}/schedule?from={}&till={}",
            self.base_url, range.from, range.to
        );

        let response = self
            .client
            .get(&url)
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, ACCEPT_VALUE)
            .send()
            .await
            .map_err(|e| e.into_network_error())?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                code @ (401 | 403) => ScheduleError::Unauthorized(code),
                code => ScheduleError::Api { status: code, body },
            });
        }

        let text = response.text().await.map_err(|e| e.into_network_error())?;
        let value: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| ScheduleError::InvalidResponse(format!("JSON parse error: {}", e)))?;

        Ok(ScheduleBody::from(value))
    }
}
