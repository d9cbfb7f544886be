// roster-service/src/services/authorization.rs
//
// Role checks over the membership tables. The engine is a pure function of
// (stored role, required role); missing memberships deny, unknown role
// names rank as viewer. Expected business outcomes are booleans - only
// store faults surface as errors.
use crate::models::{Role, ServiceError};
use crate::utils::store::{ItemKey, KeyValueStore, Table};
use log::error;
use serde_json::Value;

// Core check, parameterized only by which membership table is consulted
fn has_scope_role(
    store: &dyn KeyValueStore,
    table: Table,
    parent_id: &str,
    user_id: &str,
    required: Role,
) -> Result<bool, ServiceError> {
    if parent_id.is_empty() || user_id.is_empty() {
        return Ok(false);
    }

    let membership = store
        .get(table, &ItemKey::new(parent_id, user_id))
        .map_err(|e| {
            error!("Failed to read membership for {}: {}", parent_id, e);
            ServiceError::InternalServerError
        })?;

    let item = match membership {
        Some(item) => item,
        None => return Ok(false),
    };

    let role = item
        .get("role")
        .and_then(Value::as_str)
        .map(Role::from_name)
        .unwrap_or(Role::Viewer);

    Ok(role.rank() >= required.rank())
}

// Does the user hold at least `required` on this roster?
pub fn has_roster_role(
    store: &dyn KeyValueStore,
    roster_id: &str,
    user_id: &str,
    required: Role,
) -> Result<bool, ServiceError> {
    has_scope_role(store, Table::RosterMembers, roster_id, user_id, required)
}

// Does the user hold at least `required` in this organization?
pub fn has_org_role(
    store: &dyn KeyValueStore,
    org_id: &str,
    user_id: &str,
    required: Role,
) -> Result<bool, ServiceError> {
    has_scope_role(store, Table::OrgMembers, org_id, user_id, required)
}

// Any membership row at all grants read access
pub fn is_roster_member(
    store: &dyn KeyValueStore,
    roster_id: &str,
    user_id: &str,
) -> Result<bool, ServiceError> {
    has_roster_role(store, roster_id, user_id, Role::Viewer)
}
