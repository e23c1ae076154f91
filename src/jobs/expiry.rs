//! Releases stock held by pending transactions whose reservation window has
//! passed.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::db::models::TransactionStatus;
use crate::db::Store;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Transactions moved to `expired` with their stock restored.
    pub expired: usize,
    /// Settled by someone else between the query and the transition.
    pub skipped: usize,
    pub failed: usize,
}

/// Expires every pending transaction whose `expired_at` is at or before
/// `now`. Each transaction is reconciled on its own; one failure does not
/// stop the rest.
pub async fn sweep(store: &dyn Store, now: DateTime<Utc>) -> Result<SweepReport, AppError> {
    let candidates = store.find_expired_pending(now).await.map_err(|e| {
        AppError::ReconciliationError(format!("failed to query expired transactions: {}", e))
    })?;

    let mut report = SweepReport::default();
    for transaction in candidates {
        match store
            .transition_pending(&transaction.id, TransactionStatus::Expired)
            .await
        {
            Ok(Some(expired)) => {
                debug!(
                    transaction = %expired.id,
                    items = expired.tickets.len(),
                    "Expired transaction and restored stock"
                );
                report.expired += 1;
            }
            Ok(None) => {
                debug!(transaction = %transaction.id, "Transaction settled before expiry");
                report.skipped += 1;
            }
            Err(e) => {
                error!(transaction = %transaction.id, error = %e, "Failed to expire transaction");
                report.failed += 1;
            }
        }
    }

    Ok(report)
}

/// Runs [`sweep`] every `interval` until the handle is aborted. The first
/// sweep happens immediately.
pub fn spawn(store: Arc<dyn Store>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(interval_secs = interval.as_secs_f64(), "Transaction expiry job started");

        loop {
            ticker.tick().await;
            match sweep(store.as_ref(), Utc::now()).await {
                Ok(report) if report.expired + report.skipped + report.failed > 0 => {
                    info!(
                        expired = report.expired,
                        skipped = report.skipped,
                        failed = report.failed,
                        "Expiry sweep finished"
                    );
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Expiry sweep failed, retrying next tick"),
            }
        }
    })
}
