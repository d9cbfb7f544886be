// roster-service/src/services/notifier.rs
//
// Outbound notification boundary. The core decides what to send; actual
// transmission lives behind the dispatcher trait, and a publish failure
// never fails the decision that triggered it.
use crate::models::ServiceError;
use crate::utils::store::{KeyValueStore, Table, SCAN_PAGE_SIZE};
use crate::utils::time;
use chrono::{Duration, SecondsFormat, Utc};
use log::{error, info};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

// Only requests created in this window count toward the digest
const DIGEST_WINDOW_DAYS: i64 = 30;

pub trait NotificationDispatcher: Send + Sync {
    // Fire-and-forget publish
    fn publish(&self, subject: &str, message: &Value);
}

pub type SharedDispatcher = Arc<dyn NotificationDispatcher>;

// Default dispatcher: logs the message instead of transmitting it
pub struct LogDispatcher;

impl NotificationDispatcher for LogDispatcher {
    fn publish(&self, subject: &str, message: &Value) {
        info!("📣 Notification [{}]: {}", subject, message);
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct PendingSummary {
    pub availability: usize,
    pub swaps: usize,
    pub proposals: usize,
    pub generated_at: String,
}

// Periodic digest of pending approvals across all rosters. Invoked by an
// external scheduler; publishes one summary notification.
pub fn pending_approvals_digest(
    store: &dyn KeyValueStore,
    dispatcher: &dyn NotificationDispatcher,
) -> Result<PendingSummary, ServiceError> {
    let cutoff = (Utc::now() - Duration::days(DIGEST_WINDOW_DAYS))
        .to_rfc3339_opts(SecondsFormat::Millis, true);

    let summary = PendingSummary {
        availability: count_recent_pending(store, Table::AvailabilityRequests, &cutoff)?,
        swaps: count_recent_pending(store, Table::SwapRequests, &cutoff)?,
        proposals: count_recent_pending(store, Table::ChangeProposals, &cutoff)?,
        generated_at: time::now_iso(),
    };

    let message = serde_json::to_value(&summary).unwrap_or(Value::Null);
    dispatcher.publish("Pending approvals summary", &message);

    Ok(summary)
}

// Scan one table for recent rows still pending review
fn count_recent_pending(
    store: &dyn KeyValueStore,
    table: Table,
    cutoff: &str,
) -> Result<usize, ServiceError> {
    let mut count = 0;
    let mut cursor = None;
    loop {
        let (page, next) = store
            .scan_page(table, cursor.as_ref(), SCAN_PAGE_SIZE)
            .map_err(|e| {
                error!("Failed to scan {:?} for pending rows: {}", table, e);
                ServiceError::InternalServerError
            })?;
        for (_, item) in &page {
            let pending = item.get("status").and_then(Value::as_str) == Some("pending");
            let stamp = item
                .get("created_at")
                .or_else(|| item.get("updated_at"))
                .and_then(Value::as_str)
                .unwrap_or("");
            if pending && stamp >= cutoff {
                count += 1;
            }
        }
        match next {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }
    Ok(count)
}
