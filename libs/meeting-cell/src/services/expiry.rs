use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Method;
use tracing::{debug, info, warn};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::Meeting;
use crate::services::conflict::is_expired;

/// Sweep cadence. Matches the one-minute check the meetings page used to
/// run in the browser; here it runs server-side regardless of sessions.
pub const SWEEP_INTERVAL_SECS: u64 = 60;

pub struct ExpirySweeper {
    supabase: SupabaseClient,
}

impl ExpirySweeper {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Delete every meeting past its grace window. Individual delete
    /// failures are logged and skipped; a meeting deleted by a concurrent
    /// sweep or user action counts as already done.
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> anyhow::Result<usize> {
        let meetings: Vec<Meeting> = self
            .supabase
            .service_request(Method::GET, "/rest/v1/meetings", None)
            .await?;

        let expired: Vec<Meeting> = meetings
            .into_iter()
            .filter(|m| is_expired(m, now))
            .collect();

        if expired.is_empty() {
            debug!("Expiry sweep found nothing to remove");
            return Ok(0);
        }

        let mut removed = 0;
        for meeting in expired {
            let path = format!("/rest/v1/meetings?id=eq.{}", meeting.id);
            match self.supabase.service_delete(&path).await {
                Ok(()) => {
                    removed += 1;
                    debug!(
                        "Expired meeting {} (room {}, started {}) removed",
                        meeting.id, meeting.room_id, meeting.scheduled_time
                    );
                }
                Err(e) => {
                    warn!("Failed to remove expired meeting {}: {}", meeting.id, e);
                }
            }
        }

        info!("Expiry sweep removed {} meeting(s)", removed);
        Ok(removed)
    }
}

/// Background loop spawned at startup. Errors are logged and the loop
/// keeps going; a broken store connection must not take the sweeper down.
pub async fn run_expiry_sweeper(config: Arc<AppConfig>) {
    if !config.is_sweeper_configured() {
        warn!("Expiry sweeper disabled: service credentials missing");
        return;
    }

    let sweeper = ExpirySweeper::new(&config);
    let mut ticker = tokio::time::interval(Duration::from_secs(SWEEP_INTERVAL_SECS));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    info!("Meeting expiry sweeper running every {}s", SWEEP_INTERVAL_SECS);

    loop {
        ticker.tick().await;
        if let Err(e) = sweeper.sweep_once(Utc::now()).await {
            warn!("Expiry sweep failed: {}", e);
        }
    }
}
