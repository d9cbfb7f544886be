// roster-service/src/models/requests.rs
use serde::{Deserialize, Serialize};

// Leave/availability request submitted by a member or a share-code guest
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AvailabilityRequest {
    pub roster_id: String,
    pub request_id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub request_type: String,
    pub start_date: String,
    pub end_date: String,
    pub status: String,
    pub notes: String,
    pub guest_name: Option<String>,
    pub reviewed_by: Option<String>,
    pub review_note: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

// Shift swap request between two people on the roster
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SwapRequest {
    pub roster_id: String,
    pub request_id: String,
    pub user_id: String,
    pub from_person: String,
    pub to_person: Option<String>,
    pub date: String,
    pub shift: Option<String>,
    pub status: String,
    pub notes: String,
    pub reviewed_by: Option<String>,
    pub review_note: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

// Advisory marker preventing a shift assignment. Ordinary keyed data,
// not a concurrency primitive.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ShiftLock {
    pub roster_id: String,
    pub lock_id: String,
    pub date: String,
    pub shift: String,
    pub person_name: Option<String>,
    pub reason: String,
    pub locked_by: String,
    pub created_at: String,
}

impl ShiftLock {
    // Lock ids are derived so re-locking the same slot overwrites
    pub fn derive_lock_id(date: &str, shift: &str, person_name: Option<&str>) -> String {
        format!("{}_{}_{}", date, shift, person_name.unwrap_or("any"))
    }
}

// Batched change proposal reviewed by a manager
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ChangeProposal {
    pub roster_id: String,
    pub proposal_id: String,
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub changes: serde_json::Value,
    pub status: String,
    pub reviewed_by: Option<String>,
    pub review_note: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

// Device presence heartbeat, upserted per (roster, user)
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PresenceRecord {
    pub roster_id: String,
    pub user_id: String,
    pub display_name: String,
    pub device: String,
    pub last_seen: String,
}

// Imported time clock entry
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TimeClockEntry {
    pub roster_id: String,
    pub entry_id: String,
    pub person_name: String,
    pub date: Option<String>,
    pub hours: f64,
    pub source: String,
    pub imported_by: String,
    pub created_at: String,
}

// Feedback on a generated suggestion
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AiFeedback {
    pub roster_id: String,
    pub feedback_id: String,
    pub suggestion_id: String,
    pub feedback: String,
    pub impact: Option<f64>,
    pub notes: String,
    pub user_id: String,
    pub created_at: String,
}

// Request status values shared by availability, swaps, and proposals
pub const STATUS_PENDING: &str = "pending";
