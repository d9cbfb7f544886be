// roster-service/src/models/share_code.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Role ceiling a share code can grant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShareRole {
    #[serde(rename = "viewer")]
    Viewer,
    #[serde(rename = "editor")]
    Editor,
}

impl ShareRole {
    // Anything that is not explicitly "editor" grants view-only access
    pub fn from_request(role: Option<&str>) -> ShareRole {
        match role {
            Some("editor") => ShareRole::Editor,
            _ => ShareRole::Viewer,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ShareRole::Viewer => "viewer",
            ShareRole::Editor => "editor",
        }
    }
}

// Capability token granting bounded access to one roster. Keyed by the
// code itself, not the roster, so cascade deletion has to scan.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ShareCode {
    pub code: String,
    pub roster_id: String,
    pub role: ShareRole,
    pub created_by: String,
    pub created_at: String,
    pub expires_at: Option<String>,
    pub max_uses: Option<i64>,
    pub uses: i64,
}

impl ShareCode {
    // Check if the code is past its expiry timestamp
    pub fn is_expired(&self) -> bool {
        match self.expires_at.as_deref() {
            Some(raw) => match DateTime::parse_from_rfc3339(raw) {
                Ok(expires) => Utc::now() > expires.with_timezone(&Utc),
                // Unparseable expiry counts as expired
                Err(_) => true,
            },
            None => false,
        }
    }

    // Check if the usage quota has been consumed
    pub fn is_exhausted(&self) -> bool {
        match self.max_uses {
            Some(max) => self.uses >= max,
            None => false,
        }
    }
}

// Result of the pure validation pass. Expired and exhausted codes keep
// their records; only access is refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareCodeState {
    Valid,
    NotFound,
    Expired,
    Exhausted,
}

// Typed outcome of code creation; expected business conditions are not errors
#[derive(Debug, Clone)]
pub enum CreateCodeOutcome {
    Created(ShareCode),
    InvalidFormat,
    Taken { suggestions: Vec<String> },
    AttemptsExhausted,
}
