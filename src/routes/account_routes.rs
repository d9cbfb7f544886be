// roster-service/src/routes/account_routes.rs
use crate::models::ServiceError;
use crate::utils::store::{ItemKey, KeyValueStore, SharedStore, Table};
use crate::utils::{get_principal_with_email, time};
use actix_web::{get, post, web, HttpRequest, HttpResponse};
use log::{error, info};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Deserialize, Debug)]
struct ProfileRequest {
    display_name: Option<String>,
    email: Option<String>,
}

#[derive(Deserialize, Debug)]
struct SettingsRequest {
    settings: Option<Value>,
}

// Upsert the caller's profile. Supplied fields overwrite; absent fields
// keep their stored values; created_at is set exactly once.
#[post("/profile")]
async fn save_profile(
    req: HttpRequest,
    store: web::Data<SharedStore>,
    body: web::Json<ProfileRequest>,
) -> Result<HttpResponse, ServiceError> {
    let (principal, claim_email) = get_principal_with_email(&req)?;
    let user_id = principal.user_id().ok_or(ServiceError::Unauthorized)?.to_string();
    let store = store.get_ref().as_ref();

    let now = time::now_iso();
    let display_name = body.display_name.clone();
    let email = body.email.clone().or(claim_email);
    store
        .update(
            Table::UserProfiles,
            &ItemKey::hash_only(&user_id),
            &mut |item| {
                if !item.contains_key("user_id") {
                    item.insert("user_id".to_string(), json!(user_id));
                    item.insert("created_at".to_string(), json!(now));
                }
                if let Some(name) = display_name.as_deref() {
                    item.insert("display_name".to_string(), json!(name));
                } else if !item.contains_key("display_name") {
                    item.insert("display_name".to_string(), json!("User"));
                }
                if let Some(email) = email.as_deref() {
                    item.insert("email".to_string(), json!(email));
                }
                item.insert("updated_at".to_string(), json!(now));
            },
        )
        .map_err(|e| {
            error!("Failed to save profile for {}: {}", user_id, e);
            ServiceError::InternalServerError
        })?;

    Ok(HttpResponse::Ok().json(json!({ "ok": true })))
}

// Read the caller's settings blob
#[get("/settings/get")]
async fn get_settings(
    req: HttpRequest,
    store: web::Data<SharedStore>,
) -> Result<HttpResponse, ServiceError> {
    let (principal, _) = get_principal_with_email(&req)?;
    let user_id = principal.user_id().ok_or(ServiceError::Unauthorized)?.to_string();
    let store = store.get_ref().as_ref();

    let profile = store
        .get(Table::UserProfiles, &ItemKey::hash_only(&user_id))
        .map_err(|e| {
            error!("Failed to read profile for {}: {}", user_id, e);
            ServiceError::InternalServerError
        })?;

    let settings = profile
        .and_then(|item| item.get("settings").cloned())
        .unwrap_or_else(|| json!({}));
    Ok(HttpResponse::Ok().json(settings))
}

// Save the caller's settings blob
#[post("/settings/save")]
async fn save_settings(
    req: HttpRequest,
    store: web::Data<SharedStore>,
    body: web::Json<SettingsRequest>,
) -> Result<HttpResponse, ServiceError> {
    let (principal, _) = get_principal_with_email(&req)?;
    let user_id = principal.user_id().ok_or(ServiceError::Unauthorized)?.to_string();
    let store = store.get_ref().as_ref();

    let now = time::now_iso();
    let settings = body.into_inner().settings.unwrap_or_else(|| json!({}));
    store
        .update(
            Table::UserProfiles,
            &ItemKey::hash_only(&user_id),
            &mut |item| {
                if !item.contains_key("user_id") {
                    item.insert("user_id".to_string(), json!(user_id));
                    item.insert("created_at".to_string(), json!(now));
                }
                item.insert("settings".to_string(), settings.clone());
                item.insert("updated_at".to_string(), json!(now));
            },
        )
        .map_err(|e| {
            error!("Failed to save settings for {}: {}", user_id, e);
            ServiceError::InternalServerError
        })?;

    Ok(HttpResponse::Ok().json(json!({ "ok": true })))
}

// Remove the caller's memberships, open requests, and profile. The same
// saga rules as roster deletion apply: idempotent steps, re-run on failure.
#[post("/account/delete")]
async fn delete_account(
    req: HttpRequest,
    store: web::Data<SharedStore>,
) -> Result<HttpResponse, ServiceError> {
    let (principal, _) = get_principal_with_email(&req)?;
    let user_id = principal.user_id().ok_or(ServiceError::Unauthorized)?.to_string();
    let store = store.get_ref().as_ref();

    delete_by_user(store, Table::RosterMembers, "roster_id", &user_id)?;
    delete_by_user(store, Table::OrgMembers, "org_id", &user_id)?;
    delete_by_user(store, Table::TeamMembers, "team_id", &user_id)?;
    delete_requests_by_user(store, Table::AvailabilityRequests, &user_id)?;
    delete_requests_by_user(store, Table::SwapRequests, &user_id)?;

    store
        .delete(Table::UserProfiles, &ItemKey::hash_only(&user_id))
        .map_err(|e| {
            error!("Failed to delete profile for {}: {}", user_id, e);
            ServiceError::InternalServerError
        })?;

    info!("🗑️ Deleted account data for user: {}", user_id);

    Ok(HttpResponse::Ok().json(json!({ "ok": true })))
}

// Membership rows where the user id is the sort key
fn delete_by_user(
    store: &dyn KeyValueStore,
    table: Table,
    partition_attribute: &str,
    user_id: &str,
) -> Result<(), ServiceError> {
    let rows = store
        .query_by_attribute(table, "user_id", user_id)
        .map_err(|e| {
            error!("Failed to find {:?} rows for {}: {}", table, user_id, e);
            ServiceError::InternalServerError
        })?;
    let keys: Vec<ItemKey> = rows
        .iter()
        .filter_map(|item| {
            item.get(partition_attribute)
                .and_then(Value::as_str)
                .map(|partition| ItemKey::new(partition, user_id))
        })
        .collect();
    if keys.is_empty() {
        return Ok(());
    }
    store.batch_delete(table, &keys).map_err(|e| {
        error!("Failed to delete {:?} rows for {}: {}", table, user_id, e);
        ServiceError::InternalServerError
    })
}

// Request rows carry their own id in the sort key
fn delete_requests_by_user(
    store: &dyn KeyValueStore,
    table: Table,
    user_id: &str,
) -> Result<(), ServiceError> {
    let rows = store
        .query_by_attribute(table, "user_id", user_id)
        .map_err(|e| {
            error!("Failed to find {:?} rows for {}: {}", table, user_id, e);
            ServiceError::InternalServerError
        })?;
    let keys: Vec<ItemKey> = rows
        .iter()
        .filter_map(|item| {
            let roster_id = item.get("roster_id").and_then(Value::as_str)?;
            let request_id = item.get("request_id").and_then(Value::as_str)?;
            Some(ItemKey::new(roster_id, request_id))
        })
        .collect();
    if keys.is_empty() {
        return Ok(());
    }
    store.batch_delete(table, &keys).map_err(|e| {
        error!("Failed to delete {:?} rows for {}: {}", table, user_id, e);
        ServiceError::InternalServerError
    })
}

// Static catalog of the built-in roles and what they allow
#[get("/roles/templates")]
async fn role_templates(req: HttpRequest) -> Result<HttpResponse, ServiceError> {
    get_principal_with_email(&req)?;
    Ok(HttpResponse::Ok().json(json!([
        {
            "id": "owner",
            "name": "Owner",
            "description": "Full control including billing and role management.",
            "permissions": ["roster.read", "roster.write", "roster.manage", "org.manage", "team.manage", "settings.manage"],
        },
        {
            "id": "admin",
            "name": "Admin",
            "description": "Manage rosters, teams, and approvals.",
            "permissions": ["roster.read", "roster.write", "roster.manage", "team.manage", "approvals.manage"],
        },
        {
            "id": "manager",
            "name": "Manager",
            "description": "Approve requests and manage day-to-day roster.",
            "permissions": ["roster.read", "roster.write", "approvals.manage", "coverage.manage"],
        },
        {
            "id": "member",
            "name": "Staff",
            "description": "Read roster and submit requests.",
            "permissions": ["roster.read", "requests.submit"],
        },
        {
            "id": "viewer",
            "name": "Viewer",
            "description": "Read-only access.",
            "permissions": ["roster.read"],
        },
    ])))
}

// Register all account routes
pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(save_profile)
        .service(get_settings)
        .service(save_settings)
        .service(delete_account)
        .service(role_templates);
}
