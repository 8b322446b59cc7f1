use std::time::Duration;

use chrono::{NaiveDateTime, Utc};
use thiserror::Error;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::gateway::DeleteError;
use crate::models::QrCode;
use crate::state::AppState;
use crate::store::{self, StoreError};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepOutcome {
    pub expired: usize,
    pub failed: usize,
}

#[derive(Debug, Error)]
pub enum SweepError {
    #[error("database pool unavailable: {0}")]
    Pool(String),
    #[error("failed to load expired records: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
enum ExpireError {
    #[error("remote delete failed: {0}")]
    Remote(#[from] DeleteError),
    #[error("failed to persist record: {0}")]
    Store(#[from] StoreError),
    #[error("database pool unavailable: {0}")]
    Pool(String),
}

/// Periodic expiration sweep. Each due record is processed independently so
/// one failing record never stops the rest of the batch.
pub struct ExpirationSweeper {
    state: AppState,
    interval: Duration,
}

impl ExpirationSweeper {
    pub fn new(state: AppState, interval: Duration) -> Self {
        Self { state, interval }
    }

    pub async fn run(&self) {
        info!(
            interval_seconds = self.interval.as_secs(),
            "expiration sweeper started"
        );
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match sweep_once(&self.state).await {
                Ok(outcome) if outcome.failed > 0 => {
                    warn!(
                        expired = outcome.expired,
                        failed = outcome.failed,
                        "expiration sweep finished with failures"
                    );
                }
                Ok(outcome) if outcome.expired > 0 => {
                    info!(expired = outcome.expired, "expiration sweep finished");
                }
                Ok(_) => {}
                Err(err) => {
                    error!(error = %err, "expiration sweep failed");
                }
            }
        }
    }
}

/// Runs one sweep over all expired active records and reports per-item
/// results.
pub async fn sweep_once(state: &AppState) -> Result<SweepOutcome, SweepError> {
    let now = Utc::now().naive_utc();
    let due = {
        let mut conn = state
            .db()
            .map_err(|err| SweepError::Pool(format!("{err:?}")))?;
        store::find_expired(&mut conn, now)?
    };

    let mut outcome = SweepOutcome::default();
    for record in due {
        match expire_record(state, &record, now).await {
            Ok(()) => outcome.expired += 1,
            Err(err) => {
                warn!(
                    file_id = %record.file_id,
                    error = %err,
                    "failed to expire QR code"
                );
                outcome.failed += 1;
            }
        }
    }

    Ok(outcome)
}

async fn expire_record(
    state: &AppState,
    record: &QrCode,
    now: NaiveDateTime,
) -> Result<(), ExpireError> {
    match state
        .storage
        .delete(&state.config.storage_project_id, &record.file_id)
        .await
    {
        Ok(()) => {}
        // The remote file is already gone; the record can still be retired.
        Err(DeleteError::NotFound { .. }) => {}
        Err(err) => return Err(ExpireError::Remote(err)),
    }

    let mut conn = state
        .db()
        .map_err(|err| ExpireError::Pool(format!("{err:?}")))?;
    store::update_record(&mut conn, &record.clone().soft_deleted(now))?;
    Ok(())
}
