// roster-service/src/models/document.rs
use serde::{Deserialize, Serialize};
use serde_json::Value;

// Operation type for full-document saves in the update log
pub const OPERATION_FULL_SAVE: i64 = 0;

// The single shared document for a roster. `version` starts at 0 (absent)
// and increments by exactly one per successful save.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RosterDocument {
    pub roster_id: String,
    pub data: Value,
    pub version: i64,
    pub last_modified: String,
    pub last_modified_by: String,
}

// What callers see after a save or load
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct DocumentView {
    pub data: Value,
    pub version: i64,
    pub last_modified: Option<String>,
    pub last_modified_by: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SavedDocument {
    pub version: i64,
    pub last_modified: String,
    pub last_modified_by: String,
}

// Append-only incremental update record. Grows independently of the
// document version counter.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UpdateLogEntry {
    pub roster_id: String,
    pub update_id: String,
    pub user_id: String,
    pub operation_type: i64,
    pub data: Value,
    pub timestamp: String,
}

// Client-supplied incremental update. The id doubles as an idempotency key.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct IncomingUpdate {
    pub id: Option<String>,
    pub operation_type: Option<i64>,
    pub data: Option<Value>,
    pub timestamp: Option<String>,
}

// Snapshot payload handed to the external export sink
#[derive(Serialize, Debug, Clone)]
pub struct ExportSnapshot {
    pub roster: Value,
    pub data: Value,
    pub version: i64,
    pub exported_at: String,
}
