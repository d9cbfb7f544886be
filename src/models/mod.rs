// roster-service/src/models/mod.rs
use actix_web::{HttpResponse, ResponseError};
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;

// Document and update log models
pub mod document;
pub use document::*;

// Share code models
pub mod share_code;
pub use share_code::*;

// Availability / swap / proposal / shift lock models
pub mod requests;
pub use requests::*;

// Organization and team models
pub mod org;
pub use org::*;

// Roster model - the root aggregate for one schedule workspace
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Roster {
    pub roster_id: String,
    pub name: String,
    pub owner_id: String,
    pub org_id: Option<String>,
    pub password_hash: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Roster {
    // Public shape for API responses - never exposes the password hash
    pub fn summary(&self) -> serde_json::Value {
        json!({
            "id": self.roster_id,
            "name": self.name,
            "owner_id": self.owner_id,
            "org_id": self.org_id,
            "created_at": self.created_at,
            "updated_at": self.updated_at,
            "password_protected": self.password_hash.is_some(),
        })
    }
}

// Fixed role ordering used by every permission check. Member, staff and
// editor share a rank; unrecognized names rank as viewer (fail closed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Viewer,
    Member,
    Staff,
    Editor,
    Manager,
    Admin,
    Owner,
}

impl Role {
    pub fn rank(&self) -> u8 {
        match self {
            Role::Owner => 4,
            Role::Admin => 3,
            Role::Manager => 2,
            Role::Member | Role::Staff | Role::Editor => 1,
            Role::Viewer => 0,
        }
    }

    pub fn from_name(name: &str) -> Role {
        match name {
            "owner" => Role::Owner,
            "admin" => Role::Admin,
            "manager" => Role::Manager,
            "editor" => Role::Editor,
            "staff" => Role::Staff,
            "member" => Role::Member,
            _ => Role::Viewer,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Editor => "editor",
            Role::Staff => "staff",
            Role::Member => "member",
            Role::Viewer => "viewer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Role::from_name(&name))
    }
}

// Membership record - one row per (roster, user) pair, upsert semantics
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RosterMember {
    pub roster_id: String,
    pub user_id: String,
    pub role: Role,
    pub joined_at: String,
}

// The identity performing an operation. Guests come from redeemed share
// codes and never satisfy a membership check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    User(String),
    Guest(String),
}

impl Principal {
    // Actor string recorded in audit entries and update log rows
    pub fn actor(&self) -> String {
        match self {
            Principal::User(id) => id.clone(),
            Principal::Guest(code) => format!("guest:{}", code),
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            Principal::User(id) => Some(id),
            Principal::Guest(_) => None,
        }
    }
}

// Audit log entry - write-once, queried newest-first
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AuditLogEntry {
    pub roster_id: String,
    pub log_id: String,
    pub user_id: String,
    pub action: String,
    pub metadata: serde_json::Value,
    pub timestamp: String,
}

// User profile - created on first sight, field-preserving upsert afterwards
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UserProfile {
    pub user_id: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub settings: Option<serde_json::Value>,
    pub created_at: String,
    pub updated_at: String,
}

// JWT claims structure for authentication
#[derive(Serialize, Deserialize, Debug)]
pub struct Claims {
    pub sub: String, // Subject (user ID)
    pub email: Option<String>,
    pub exp: usize, // Expiration time
    pub iat: usize, // Issued at
}

// Custom error types
#[derive(Debug)]
pub enum ServiceError {
    InternalServerError,
    BadRequest(String),
    Unauthorized,
    NotFound,
    Forbidden,
    Conflict(String),
    Exhausted(String),
}

// Implement Display for ServiceError
impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ServiceError::InternalServerError => write!(f, "Internal Server Error"),
            ServiceError::BadRequest(msg) => write!(f, "BadRequest: {}", msg),
            ServiceError::Unauthorized => write!(f, "Unauthorized"),
            ServiceError::NotFound => write!(f, "Not Found"),
            ServiceError::Forbidden => write!(f, "Forbidden"),
            ServiceError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ServiceError::Exhausted(msg) => write!(f, "Exhausted: {}", msg),
        }
    }
}

// Implement std::error::Error for ServiceError
impl std::error::Error for ServiceError {}

// Implement ResponseError for ServiceError
impl ResponseError for ServiceError {
    fn error_response(&self) -> HttpResponse {
        match self {
            ServiceError::InternalServerError => HttpResponse::InternalServerError()
                .json(json!({ "error": "Internal Server Error" })),
            ServiceError::BadRequest(ref message) => {
                HttpResponse::BadRequest().json(json!({ "error": message }))
            }
            ServiceError::Unauthorized => {
                HttpResponse::Unauthorized().json(json!({ "error": "Unauthorized" }))
            }
            ServiceError::NotFound => {
                HttpResponse::NotFound().json(json!({ "error": "Not found" }))
            }
            ServiceError::Forbidden => {
                HttpResponse::Forbidden().json(json!({ "error": "Forbidden" }))
            }
            ServiceError::Conflict(ref message) => {
                HttpResponse::Conflict().json(json!({ "error": message }))
            }
            ServiceError::Exhausted(ref message) => {
                HttpResponse::Gone().json(json!({ "error": message }))
            }
        }
    }
}
