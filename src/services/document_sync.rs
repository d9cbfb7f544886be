// roster-service/src/services/document_sync.rs
//
// Owns the shared roster document, its version counter, and the
// incremental update log. Concurrent writers are serialized by the store's
// atomic update - the version increment never happens as read-then-write
// in application code.
use crate::models::{
    DocumentView, ExportSnapshot, IncomingUpdate, Principal, Roster, RosterDocument, SavedDocument,
    ServiceError, UpdateLogEntry, OPERATION_FULL_SAVE,
};
use crate::services::audit;
use crate::utils::store::{
    from_item, to_item, ItemKey, KeyValueStore, ScanDirection, Table, SCAN_PAGE_SIZE,
};
use crate::utils::time;
use log::{error, info};
use serde_json::{json, Value};

// Update log page size
pub const UPDATES_PAGE_SIZE: usize = 50;

// Save the full document. Sets the payload and bumps the version counter
// (absent counts as 0) in one atomic store update, then records the save
// in the update log and the audit log.
pub fn save_document(
    store: &dyn KeyValueStore,
    roster_id: &str,
    data: Value,
    principal: &Principal,
) -> Result<SavedDocument, ServiceError> {
    let actor = principal.actor();
    let now = time::now_iso();
    let key = ItemKey::hash_only(roster_id);

    let saved = store
        .update(Table::RosterData, &key, &mut |item| {
            let version = item.get("version").and_then(Value::as_i64).unwrap_or(0) + 1;
            item.insert("roster_id".to_string(), json!(roster_id));
            item.insert("data".to_string(), data.clone());
            item.insert("version".to_string(), json!(version));
            item.insert("last_modified".to_string(), json!(now));
            item.insert("last_modified_by".to_string(), json!(actor));
        })
        .map_err(|e| {
            error!("Failed to save document for roster {}: {}", roster_id, e);
            ServiceError::InternalServerError
        })?;

    let version = saved.get("version").and_then(Value::as_i64).unwrap_or(0);

    // One full-save marker in the update log
    let update_id = format!("{}_{}", time::now_millis(), actor);
    let entry = UpdateLogEntry {
        roster_id: roster_id.to_string(),
        update_id,
        user_id: actor.clone(),
        operation_type: OPERATION_FULL_SAVE,
        data: json!({ "version": version, "last_modified_by": actor }),
        timestamp: now.clone(),
    };
    put_update_entry(store, &entry)?;

    audit::record(
        store,
        roster_id,
        Some(principal),
        "roster_saved",
        json!({ "version": version }),
    );

    Ok(SavedDocument {
        version,
        last_modified: now,
        last_modified_by: actor,
    })
}

// Load the current document, or None if the roster has never been saved
pub fn load_document(
    store: &dyn KeyValueStore,
    roster_id: &str,
) -> Result<Option<DocumentView>, ServiceError> {
    let item = store
        .get(Table::RosterData, &ItemKey::hash_only(roster_id))
        .map_err(|e| {
            error!("Failed to load document for roster {}: {}", roster_id, e);
            ServiceError::InternalServerError
        })?;

    let item = match item {
        Some(item) => item,
        None => return Ok(None),
    };

    let document: RosterDocument = from_item(item).map_err(|e| {
        error!("Failed to parse document for roster {}: {}", roster_id, e);
        ServiceError::InternalServerError
    })?;

    Ok(Some(DocumentView {
        data: document.data,
        version: document.version,
        last_modified: Some(document.last_modified),
        last_modified_by: Some(document.last_modified_by),
    }))
}

// Append one incremental update. Intentionally decoupled from the document
// version so partial client updates never force a full-document rewrite.
pub fn append_update(
    store: &dyn KeyValueStore,
    roster_id: &str,
    update: IncomingUpdate,
    principal: &Principal,
) -> Result<String, ServiceError> {
    let actor = principal.actor();
    let now = time::now_iso();
    let update_id = update
        .id
        .unwrap_or_else(|| format!("{}_{}", time::now_millis(), actor));

    let entry = UpdateLogEntry {
        roster_id: roster_id.to_string(),
        update_id: update_id.clone(),
        user_id: actor,
        operation_type: update.operation_type.unwrap_or(OPERATION_FULL_SAVE),
        data: update.data.unwrap_or_else(|| json!({})),
        timestamp: update.timestamp.unwrap_or(now),
    };
    put_update_entry(store, &entry)?;

    audit::record(
        store,
        roster_id,
        Some(principal),
        "roster_update",
        json!({ "update_id": update_id }),
    );

    Ok(update_id)
}

// Up to 50 update entries in insertion order. The `since` cursor is a
// strict, exclusive lower bound on the entry timestamp.
pub fn list_updates(
    store: &dyn KeyValueStore,
    roster_id: &str,
    since: Option<&str>,
) -> Result<Vec<UpdateLogEntry>, ServiceError> {
    let items = store
        .query(
            Table::RosterUpdates,
            roster_id,
            ScanDirection::Ascending,
            Some(UPDATES_PAGE_SIZE),
        )
        .map_err(|e| {
            error!("Failed to query update log for roster {}: {}", roster_id, e);
            ServiceError::InternalServerError
        })?;

    let mut entries = Vec::with_capacity(items.len());
    for item in items {
        let entry: UpdateLogEntry = from_item(item).map_err(|e| {
            error!("Failed to parse update entry: {}", e);
            ServiceError::InternalServerError
        })?;
        if let Some(since) = since {
            if entry.timestamp.as_str() <= since {
                continue;
            }
        }
        entries.push(entry);
    }

    Ok(entries)
}

// Build the export payload. Persistence and signed URLs are external.
pub fn export_snapshot(
    store: &dyn KeyValueStore,
    roster_id: &str,
) -> Result<Option<ExportSnapshot>, ServiceError> {
    let roster_item = store
        .get(Table::Rosters, &ItemKey::hash_only(roster_id))
        .map_err(|e| {
            error!("Failed to load roster {}: {}", roster_id, e);
            ServiceError::InternalServerError
        })?;
    let document = match load_document(store, roster_id)? {
        Some(document) => document,
        None => return Ok(None),
    };

    let roster = match roster_item {
        Some(item) => {
            let roster: Roster = from_item(item).map_err(|e| {
                error!("Failed to parse roster {}: {}", roster_id, e);
                ServiceError::InternalServerError
            })?;
            roster.summary()
        }
        None => Value::Null,
    };

    Ok(Some(ExportSnapshot {
        roster,
        data: document.data,
        version: document.version,
        exported_at: time::now_iso(),
    }))
}

// Cascade delete. Each step is idempotent and re-runnable; there is no
// cross-table transaction, so re-invoking the whole deletion is the
// recovery path after a partial failure.
pub fn delete_roster(store: &dyn KeyValueStore, roster_id: &str) -> Result<(), ServiceError> {
    delete_partition(store, Table::RosterMembers, roster_id, Some("user_id"))?;
    delete_partition(store, Table::RosterData, roster_id, None)?;
    delete_partition(store, Table::RosterUpdates, roster_id, Some("update_id"))?;
    delete_partition(store, Table::AvailabilityRequests, roster_id, Some("request_id"))?;
    delete_partition(store, Table::SwapRequests, roster_id, Some("request_id"))?;
    delete_partition(store, Table::ShiftLocks, roster_id, Some("lock_id"))?;
    delete_partition(store, Table::ChangeProposals, roster_id, Some("proposal_id"))?;
    delete_partition(store, Table::AuditLogs, roster_id, Some("log_id"))?;
    delete_partition(store, Table::Presence, roster_id, Some("user_id"))?;
    delete_partition(store, Table::TimeClock, roster_id, Some("entry_id"))?;
    delete_partition(store, Table::AiFeedback, roster_id, Some("feedback_id"))?;
    delete_share_codes(store, roster_id)?;

    store
        .delete(Table::Rosters, &ItemKey::hash_only(roster_id))
        .map_err(|e| {
            error!("Failed to delete roster row {}: {}", roster_id, e);
            ServiceError::InternalServerError
        })?;

    info!("🗑️ Deleted roster {} and all scoped rows", roster_id);
    Ok(())
}

// Delete every row in one roster partition, batched at the store maximum
fn delete_partition(
    store: &dyn KeyValueStore,
    table: Table,
    roster_id: &str,
    sort_attribute: Option<&str>,
) -> Result<usize, ServiceError> {
    let items = store
        .query(table, roster_id, ScanDirection::Ascending, None)
        .map_err(|e| {
            error!("Failed to query {:?} for roster {}: {}", table, roster_id, e);
            ServiceError::InternalServerError
        })?;
    if items.is_empty() {
        return Ok(0);
    }

    let keys: Vec<ItemKey> = items
        .iter()
        .map(|item| match sort_attribute {
            Some(attribute) => ItemKey::new(
                roster_id,
                item.get(attribute)
                    .and_then(Value::as_str)
                    .unwrap_or_default(),
            ),
            None => ItemKey::hash_only(roster_id),
        })
        .collect();

    store.batch_delete(table, &keys).map_err(|e| {
        error!(
            "Failed to batch delete {:?} for roster {}: {}",
            table, roster_id, e
        );
        ServiceError::InternalServerError
    })?;

    Ok(keys.len())
}

// Share codes are keyed by code, not roster, so cleanup is the one
// unindexed scan in the system. Tokens are low-cardinality; accepted.
fn delete_share_codes(store: &dyn KeyValueStore, roster_id: &str) -> Result<usize, ServiceError> {
    let mut keys: Vec<ItemKey> = Vec::new();
    let mut cursor: Option<ItemKey> = None;
    loop {
        let (page, next) = store
            .scan_page(Table::ShareCodes, cursor.as_ref(), SCAN_PAGE_SIZE)
            .map_err(|e| {
                error!("Failed to scan share codes: {}", e);
                ServiceError::InternalServerError
            })?;
        for (key, item) in page {
            if item.get("roster_id").and_then(Value::as_str) == Some(roster_id) {
                keys.push(key);
            }
        }
        match next {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    if keys.is_empty() {
        return Ok(0);
    }
    store.batch_delete(Table::ShareCodes, &keys).map_err(|e| {
        error!("Failed to delete share codes for roster {}: {}", roster_id, e);
        ServiceError::InternalServerError
    })?;
    Ok(keys.len())
}

// Shared put for update log entries
fn put_update_entry(store: &dyn KeyValueStore, entry: &UpdateLogEntry) -> Result<(), ServiceError> {
    let item = to_item(entry).map_err(|e| {
        error!("Failed to serialize update entry: {}", e);
        ServiceError::InternalServerError
    })?;
    store
        .put(
            Table::RosterUpdates,
            ItemKey::new(&entry.roster_id, &entry.update_id),
            item,
        )
        .map_err(|e| {
            error!("Failed to append update entry: {}", e);
            ServiceError::InternalServerError
        })
}
