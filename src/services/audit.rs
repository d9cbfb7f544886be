// roster-service/src/services/audit.rs
//
// Append-only audit trail. A pure write-sink: recording never fails the
// surrounding operation, and reads are a thin pass-through over the
// store's newest-first range query.
use crate::models::{AuditLogEntry, Principal, ServiceError};
use crate::utils::store::{from_item, to_item, ItemKey, KeyValueStore, ScanDirection, Table};
use crate::utils::time;
use log::{error, warn};
use serde_json::Value;

// Audit view cap per request
pub const AUDIT_PAGE_SIZE: usize = 200;

// Append one immutable entry. Missing principal is recorded as "system";
// a missing roster id or a store failure is logged and swallowed.
pub fn record(
    store: &dyn KeyValueStore,
    roster_id: &str,
    principal: Option<&Principal>,
    action: &str,
    metadata: Value,
) {
    if roster_id.is_empty() {
        return;
    }
    let actor = principal
        .map(Principal::actor)
        .unwrap_or_else(|| "system".to_string());
    let entry = AuditLogEntry {
        roster_id: roster_id.to_string(),
        log_id: format!("{}_{}", time::now_millis(), actor),
        user_id: actor,
        action: action.to_string(),
        metadata,
        timestamp: time::now_iso(),
    };

    let item = match to_item(&entry) {
        Ok(item) => item,
        Err(e) => {
            warn!("Failed to serialize audit entry {}: {}", action, e);
            return;
        }
    };
    if let Err(e) = store.put(
        Table::AuditLogs,
        ItemKey::new(roster_id, &entry.log_id),
        item,
    ) {
        warn!("Failed to append audit entry {}: {}", action, e);
    }
}

// Latest entries for a roster, newest first, capped at 200
pub fn list(store: &dyn KeyValueStore, roster_id: &str) -> Result<Vec<AuditLogEntry>, ServiceError> {
    let items = store
        .query(
            Table::AuditLogs,
            roster_id,
            ScanDirection::Descending,
            Some(AUDIT_PAGE_SIZE),
        )
        .map_err(|e| {
            error!("Failed to query audit log for roster {}: {}", roster_id, e);
            ServiceError::InternalServerError
        })?;

    items
        .into_iter()
        .map(|item| {
            from_item(item).map_err(|e| {
                error!("Failed to parse audit entry: {}", e);
                ServiceError::InternalServerError
            })
        })
        .collect()
}
