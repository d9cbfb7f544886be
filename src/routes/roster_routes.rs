// roster-service/src/routes/roster_routes.rs
use crate::models::{Role, Roster, RosterMember, ServiceError};
use crate::routes::{get_record, put_record};
use crate::services::{audit, authorization, document_sync};
use crate::utils::store::{from_item, ItemKey, SharedStore, Table};
use crate::utils::{get_principal, password, time};
use actix_web::{delete, get, post, web, HttpRequest, HttpResponse};
use log::{error, info};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

#[derive(Deserialize, Debug)]
struct CreateRosterRequest {
    name: String,
    password: Option<String>,
    org_id: Option<String>,
}

#[derive(Deserialize, Debug)]
struct JoinRosterRequest {
    roster_id: String,
    password: Option<String>,
}

// Liveness probe
#[get("/health")]
async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "ok": true }))
}

// Create a new roster; the creator becomes its owner
#[post("/rosters/create")]
async fn create_roster(
    req: HttpRequest,
    store: web::Data<SharedStore>,
    body: web::Json<CreateRosterRequest>,
) -> Result<HttpResponse, ServiceError> {
    let principal = get_principal(&req)?;
    let user_id = principal.user_id().ok_or(ServiceError::Unauthorized)?.to_string();
    let store = store.get_ref().as_ref();

    if body.name.trim().is_empty() {
        return Err(ServiceError::BadRequest("Missing roster name".to_string()));
    }

    info!("📝 Creating new roster: {} for user: {}", body.name, user_id);

    // Creating inside an org requires manager rank there
    if let Some(org_id) = body.org_id.as_deref() {
        if !authorization::has_org_role(store, org_id, &user_id, Role::Manager)? {
            error!("❌ User: {} cannot create rosters in org: {}", user_id, org_id);
            return Err(ServiceError::Forbidden);
        }
    }

    let roster_id = Uuid::new_v4().to_string();
    let now = time::now_iso();
    let roster = Roster {
        roster_id: roster_id.clone(),
        name: body.name.clone(),
        owner_id: user_id.clone(),
        org_id: body.org_id.clone(),
        password_hash: body
            .password
            .as_deref()
            .map(password::hash_roster_password),
        created_at: now.clone(),
        updated_at: now.clone(),
    };
    put_record(store, Table::Rosters, ItemKey::hash_only(&roster_id), &roster)?;

    let member = RosterMember {
        roster_id: roster_id.clone(),
        user_id: user_id.clone(),
        role: Role::Owner,
        joined_at: now,
    };
    put_record(
        store,
        Table::RosterMembers,
        ItemKey::new(&roster_id, &user_id),
        &member,
    )?;

    audit::record(
        store,
        &roster_id,
        Some(&principal),
        "roster_created",
        json!({ "name": body.name, "org_id": body.org_id }),
    );

    info!("✅ Roster created successfully: {}", roster_id);

    Ok(HttpResponse::Ok().json(json!({ "roster_id": roster_id })))
}

// Join an existing roster, optionally gated by a password
#[post("/rosters/join")]
async fn join_roster(
    req: HttpRequest,
    store: web::Data<SharedStore>,
    body: web::Json<JoinRosterRequest>,
) -> Result<HttpResponse, ServiceError> {
    let principal = get_principal(&req)?;
    let user_id = principal.user_id().ok_or(ServiceError::Unauthorized)?.to_string();
    let store = store.get_ref().as_ref();

    let roster: Roster = match get_record(
        store,
        Table::Rosters,
        &ItemKey::hash_only(&body.roster_id),
    )? {
        Some(roster) => roster,
        None => {
            error!("❌ Roster not found: {}", body.roster_id);
            return Err(ServiceError::NotFound);
        }
    };

    if !password::verify_roster_password(roster.password_hash.as_deref(), body.password.as_deref())
    {
        error!("❌ Invalid password for roster: {}", body.roster_id);
        return Err(ServiceError::Forbidden);
    }

    // Re-joining is idempotent
    if authorization::is_roster_member(store, &body.roster_id, &user_id)? {
        return Ok(HttpResponse::Ok().json(json!({ "roster_id": body.roster_id })));
    }

    let member = RosterMember {
        roster_id: body.roster_id.clone(),
        user_id: user_id.clone(),
        role: Role::Member,
        joined_at: time::now_iso(),
    };
    put_record(
        store,
        Table::RosterMembers,
        ItemKey::new(&body.roster_id, &user_id),
        &member,
    )?;

    audit::record(
        store,
        &body.roster_id,
        Some(&principal),
        "roster_joined",
        json!({}),
    );

    info!("✅ User: {} joined roster: {}", user_id, body.roster_id);

    Ok(HttpResponse::Ok().json(json!({ "roster_id": body.roster_id })))
}

// List the caller's rosters with their role in each
#[get("/rosters")]
async fn list_rosters(
    req: HttpRequest,
    store: web::Data<SharedStore>,
) -> Result<HttpResponse, ServiceError> {
    let principal = get_principal(&req)?;
    let user_id = principal.user_id().ok_or(ServiceError::Unauthorized)?.to_string();
    let store = store.get_ref().as_ref();

    let memberships = store
        .query_by_attribute(Table::RosterMembers, "user_id", &user_id)
        .map_err(|e| {
            error!("Failed to list memberships for user {}: {}", user_id, e);
            ServiceError::InternalServerError
        })?;

    let mut result = Vec::with_capacity(memberships.len());
    for item in memberships {
        let member: RosterMember = from_item(item).map_err(|e| {
            error!("Failed to parse membership: {}", e);
            ServiceError::InternalServerError
        })?;
        let roster: Option<Roster> = get_record(
            store,
            Table::Rosters,
            &ItemKey::hash_only(&member.roster_id),
        )?;
        result.push(json!({
            "roster_id": member.roster_id,
            "role": member.role,
            "roster": roster.map(|r| r.summary()),
        }));
    }

    Ok(HttpResponse::Ok().json(result))
}

// Delete a roster and everything scoped to it. Owner only.
#[delete("/rosters/{roster_id}")]
async fn delete_roster(
    req: HttpRequest,
    store: web::Data<SharedStore>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let principal = get_principal(&req)?;
    let user_id = principal.user_id().ok_or(ServiceError::Unauthorized)?.to_string();
    let roster_id = path.into_inner();
    let store = store.get_ref().as_ref();

    if !authorization::has_roster_role(store, &roster_id, &user_id, Role::Owner)? {
        error!("❌ Only the roster owner can delete roster: {}", roster_id);
        return Err(ServiceError::Forbidden);
    }

    let roster: Option<Roster> =
        get_record(store, Table::Rosters, &ItemKey::hash_only(&roster_id))?;
    if roster.is_none() {
        return Err(ServiceError::NotFound);
    }

    document_sync::delete_roster(store, &roster_id)?;

    Ok(HttpResponse::Ok().json(json!({ "ok": true })))
}

// Register all roster lifecycle routes
pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(health)
        .service(create_roster)
        .service(join_roster)
        .service(list_rosters)
        .service(delete_roster);
}
