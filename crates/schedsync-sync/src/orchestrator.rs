//! One sync run: read the session, fetch three weeks, forward them.

use std::sync::Arc;

use anyhow::Result;
use schedsync_auth::{open_store, Credential, CredentialStore};
use schedsync_core::{build_http_client, AppError, AuthError, Config};
use schedsync_schedule::{Clock, ScheduleClient, ScheduleFetcher, WeekRange};

use crate::ingest::{IngestClient, SyncPayload, WeekSchedules};

/// Current week, next week and the week after.
pub const WEEK_OFFSETS: [i32; 3] = [0, 1, 2];

/// How a sync run ended.
///
/// Purely informational: every outcome has already been logged by the
/// time `run_sync` returns.
#[derive(Debug)]
pub enum SyncOutcome {
    /// No session stored under the credential key.
    NotLoggedIn,
    /// A session exists but carries no token.
    MissingToken,
    /// None of the three weeks could be fetched; nothing was sent.
    NoSchedules,
    /// The dashboard accepted the payload.
    Synced { weeks: usize },
    /// The dashboard answered but reported a failure.
    Rejected(String),
    /// The run stopped on an error.
    Failed(AppError),
}

impl SyncOutcome {
    pub fn is_synced(&self) -> bool {
        matches!(self, SyncOutcome::Synced { .. })
    }
}

pub struct SyncOrchestrator {
    store: Arc<dyn CredentialStore>,
    credential_key: String,
    fetcher: ScheduleFetcher,
    ingest: IngestClient,
}

impl SyncOrchestrator {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        credential_key: impl Into<String>,
        fetcher: ScheduleFetcher,
        ingest: IngestClient,
    ) -> Self {
        Self {
            store,
            credential_key: credential_key.into(),
            fetcher,
            ingest,
        }
    }

    /// Wire the store, schedule client and ingestion client from config.
    pub fn from_config(config: &Config, clock: Arc<dyn Clock>) -> Result<Self> {
        let http = build_http_client(config.sync.request_timeout())?;
        let store = open_store(&config.credentials);

        tracing::debug!(
            backend = store.name(),
            server = %config.server.url,
            api = %config.schedule.api_url,
            "Sync orchestrator configured"
        );

        Ok(Self::new(
            store,
            config.credentials.key.clone(),
            ScheduleFetcher::new(
                ScheduleClient::with_base_url(http.clone(), &config.schedule.api_url),
                clock,
            ),
            IngestClient::new(http, &config.server.url),
        ))
    }

    /// Ranges the next run would request, in offset order.
    pub fn week_ranges(&self) -> [WeekRange; 3] {
        WEEK_OFFSETS.map(|offset| self.fetcher.week_range(offset))
    }

    /// Run one fetch-aggregate-forward cycle. Never fails; see [`SyncOutcome`].
    pub async fn run_sync(&self) -> SyncOutcome {
        let credential = match Credential::load(self.store.as_ref(), &self.credential_key) {
            Ok(credential) => credential,
            Err(e @ AuthError::NotLoggedIn(_)) => {
                tracing::info!("Not logged in ({})", e);
                return SyncOutcome::NotLoggedIn;
            }
            Err(AuthError::MissingToken) => {
                tracing::info!("No token found in stored session");
                return SyncOutcome::MissingToken;
            }
            Err(e) => {
                tracing::error!("Failed to read session credential: {}", e);
                return SyncOutcome::Failed(e.into());
            }
        };

        tracing::info!("Fetching schedules for {}...", credential.name);

        let schedules = self.fetch_schedules(&credential.token).await;

        let Some(payload) = SyncPayload::new(&credential, schedules) else {
            tracing::error!("Failed to fetch any schedules");
            return SyncOutcome::NoSchedules;
        };

        let weeks = payload.schedules.present_count();
        if weeks < WEEK_OFFSETS.len() {
            tracing::warn!("Only {} of {} weeks fetched", weeks, WEEK_OFFSETS.len());
        }

        match self.ingest.send(&payload).await {
            Ok(reply) if reply.is_success() => {
                tracing::info!("Successfully synced schedules for {}", credential.name);
                SyncOutcome::Synced { weeks }
            }
            Ok(reply) => {
                let message = reply.error_message();
                tracing::error!("Dashboard rejected sync: {}", message);
                SyncOutcome::Rejected(message)
            }
            Err(e) => {
                tracing::error!("Error during sync: {}", e);
                SyncOutcome::Failed(e.into())
            }
        }
    }

    /// Fetch the three weeks concurrently; failed weeks come back as `None`.
    async fn fetch_schedules(&self, token: &str) -> WeekSchedules {
        let [first, second, third] = WEEK_OFFSETS;

        let (week0, week1, week2) = tokio::join!(
            self.fetcher.fetch_week(token, first),
            self.fetcher.fetch_week(token, second),
            self.fetcher.fetch_week(token, third),
        );

        WeekSchedules {
            week0,
            week1,
            week2,
        }
    }
}
