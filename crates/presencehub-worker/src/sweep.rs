//! The staleness sweep.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, info, warn};

use presencehub_core::config::worker::WorkerConfig;
use presencehub_core::result::AppResult;
use presencehub_entity::presence::{self, PresenceState};
use presencehub_entity::user;
use presencehub_store::{
    DocumentFields, DocumentStore, Filter, FilterField, FilterOp, FilterValue, WriteBatch,
};

/// Outcome of one sweep run, consumed only for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    /// Stale `online` documents the query matched.
    pub stale_found: usize,
    /// Users whose status and profile were demoted to offline.
    pub corrected: u32,
}

/// Corrects status documents whose `online` claim has gone stale.
///
/// Each run is a discrete unit: idempotent, safe to retry, safe to skip.
/// Re-running immediately after a successful run matches nothing, because
/// corrected documents are no longer `online`. A record that fails to
/// correct simply stays stale until the next run.
#[derive(Debug)]
pub struct StalenessSweep {
    store: Arc<dyn DocumentStore>,
    stale_window: Duration,
}

impl StalenessSweep {
    /// Create a sweep with the window taken from worker configuration.
    pub fn new(store: Arc<dyn DocumentStore>, config: &WorkerConfig) -> Self {
        Self {
            store,
            stale_window: Duration::minutes(config.stale_window_minutes),
        }
    }

    /// Run one sweep.
    ///
    /// Both corrections for a user (status document and profile record)
    /// go through a single write batch, so readers never see one side
    /// demoted without the other. The run as a whole is not atomic
    /// across users.
    pub async fn run_once(&self) -> AppResult<SweepReport> {
        let cutoff = Utc::now() - self.stale_window;

        let filter = Filter::new()
            .with(FilterField::eq(
                presence::model::fields::STATE,
                PresenceState::Online.as_str(),
            ))
            .with(FilterField::new(
                presence::model::fields::LAST_CHANGED,
                FilterOp::Lt,
                FilterValue::Integer(cutoff.timestamp_millis()),
            ));

        let page = self
            .store
            .query(presence::model::COLLECTION, &filter, None, None, None)
            .await?;

        if page.docs.is_empty() {
            debug!("no stale presence records found");
            return Ok(SweepReport {
                stale_found: 0,
                corrected: 0,
            });
        }

        let stale_found = page.docs.len();
        let mut corrected = 0u32;

        for (user_key, _) in &page.docs {
            let mut batch = WriteBatch::new();
            batch.update(
                presence::model::COLLECTION,
                user_key,
                DocumentFields::new()
                    .set(presence::model::fields::STATE, PresenceState::Offline.as_str())
                    .server_timestamp(presence::model::fields::LAST_CHANGED),
            );
            batch.update(
                user::model::COLLECTION,
                user_key,
                DocumentFields::new()
                    .set(user::model::fields::STATUS, PresenceState::Offline.as_str())
                    .set(user::model::fields::UPDATED_AT, Utc::now().to_rfc3339()),
            );

            if let Err(e) = self.store.commit(batch).await {
                warn!(user = %user_key, error = %e, "failed to demote stale presence record");
                continue;
            }

            corrected += 1;
        }

        if corrected > 0 {
            info!(corrected, stale_found, "stale presence records demoted to offline");
        }

        Ok(SweepReport {
            stale_found,
            corrected,
        })
    }
}
