// roster-service/src/routes/document_routes.rs
use crate::models::{IncomingUpdate, Role, ServiceError};
use crate::services::{authorization, document_sync};
use crate::utils::get_principal;
use crate::utils::store::SharedStore;
use actix_web::{get, post, web, HttpRequest, HttpResponse};
use log::{error, info};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Deserialize, Debug)]
struct SaveDocumentRequest {
    roster_id: String,
    data: Value,
}

#[derive(Deserialize, Debug)]
struct AppendUpdateRequest {
    roster_id: String,
    update: IncomingUpdate,
}

#[derive(Deserialize, Debug)]
struct RosterQuery {
    roster_id: String,
    since: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ExportRequest {
    roster_id: String,
}

// Save the full roster document. Requires member rank; the version
// counter serializes concurrent writers.
#[post("/roster/save")]
async fn save_document(
    req: HttpRequest,
    store: web::Data<SharedStore>,
    body: web::Json<SaveDocumentRequest>,
) -> Result<HttpResponse, ServiceError> {
    let principal = get_principal(&req)?;
    let user_id = principal.user_id().ok_or(ServiceError::Unauthorized)?.to_string();
    let store = store.get_ref().as_ref();

    if !authorization::has_roster_role(store, &body.roster_id, &user_id, Role::Member)? {
        error!("❌ User: {} cannot save roster: {}", user_id, body.roster_id);
        return Err(ServiceError::Forbidden);
    }

    let body = body.into_inner();
    let saved = document_sync::save_document(store, &body.roster_id, body.data, &principal)?;

    info!(
        "✅ Saved roster: {} at version: {}",
        body.roster_id, saved.version
    );

    Ok(HttpResponse::Ok().json(saved))
}

// Load the current document; null means the roster has never been saved
#[get("/roster/load")]
async fn load_document(
    req: HttpRequest,
    store: web::Data<SharedStore>,
    query: web::Query<RosterQuery>,
) -> Result<HttpResponse, ServiceError> {
    let principal = get_principal(&req)?;
    let user_id = principal.user_id().ok_or(ServiceError::Unauthorized)?.to_string();
    let store = store.get_ref().as_ref();

    if !authorization::is_roster_member(store, &query.roster_id, &user_id)? {
        return Err(ServiceError::Forbidden);
    }

    let document = document_sync::load_document(store, &query.roster_id)?;
    Ok(HttpResponse::Ok().json(document))
}

// Append one incremental update to the log
#[post("/roster/update")]
async fn append_update(
    req: HttpRequest,
    store: web::Data<SharedStore>,
    body: web::Json<AppendUpdateRequest>,
) -> Result<HttpResponse, ServiceError> {
    let principal = get_principal(&req)?;
    let user_id = principal.user_id().ok_or(ServiceError::Unauthorized)?.to_string();
    let store = store.get_ref().as_ref();

    if !authorization::has_roster_role(store, &body.roster_id, &user_id, Role::Member)? {
        return Err(ServiceError::Forbidden);
    }

    let body = body.into_inner();
    let update_id = document_sync::append_update(store, &body.roster_id, body.update, &principal)?;

    Ok(HttpResponse::Ok().json(json!({ "ok": true, "update_id": update_id })))
}

// Updates strictly after the `since` cursor, ascending, capped at 50
#[get("/roster/updates")]
async fn list_updates(
    req: HttpRequest,
    store: web::Data<SharedStore>,
    query: web::Query<RosterQuery>,
) -> Result<HttpResponse, ServiceError> {
    let principal = get_principal(&req)?;
    let user_id = principal.user_id().ok_or(ServiceError::Unauthorized)?.to_string();
    let store = store.get_ref().as_ref();

    if !authorization::is_roster_member(store, &query.roster_id, &user_id)? {
        return Err(ServiceError::Forbidden);
    }

    let entries = document_sync::list_updates(store, &query.roster_id, query.since.as_deref())?;
    Ok(HttpResponse::Ok().json(entries))
}

// Build an export snapshot. Persistence of the payload is external.
#[post("/exports/roster")]
async fn export_roster(
    req: HttpRequest,
    store: web::Data<SharedStore>,
    body: web::Json<ExportRequest>,
) -> Result<HttpResponse, ServiceError> {
    let principal = get_principal(&req)?;
    let user_id = principal.user_id().ok_or(ServiceError::Unauthorized)?.to_string();
    let store = store.get_ref().as_ref();

    if !authorization::is_roster_member(store, &body.roster_id, &user_id)? {
        return Err(ServiceError::Forbidden);
    }

    let snapshot = match document_sync::export_snapshot(store, &body.roster_id)? {
        Some(snapshot) => snapshot,
        None => {
            error!("❌ No document to export for roster: {}", body.roster_id);
            return Err(ServiceError::NotFound);
        }
    };

    Ok(HttpResponse::Ok().json(snapshot))
}

// Register all document sync routes
pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(save_document)
        .service(load_document)
        .service(append_update)
        .service(list_updates)
        .service(export_roster);
}
