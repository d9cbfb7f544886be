// roster-service/src/routes/activity_routes.rs
//
// Presence heartbeats, time clock imports, and the suggestion endpoints.
use crate::models::{AiFeedback, PresenceRecord, Role, ServiceError, TimeClockEntry};
use crate::routes::{put_record, query_records};
use crate::services::suggestions::{self, SharedSuggestionBackend, SuggestionRequest};
use crate::services::{audit, authorization};
use crate::utils::store::{to_item, ItemKey, ScanDirection, SharedStore, Table};
use crate::utils::{get_principal, get_principal_with_email, time};
use actix_web::{get, post, web, HttpRequest, HttpResponse};
use log::error;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

const TIMECLOCK_LIST_LIMIT: usize = 200;

#[derive(Deserialize, Debug)]
struct RosterQuery {
    roster_id: String,
}

#[derive(Deserialize, Debug)]
struct HeartbeatRequest {
    roster_id: String,
    device: Option<String>,
    display_name: Option<String>,
}

#[derive(Deserialize, Debug)]
struct TimeClockImportRequest {
    roster_id: String,
    entries: Vec<TimeClockImportEntry>,
}

#[derive(Deserialize, Debug)]
struct TimeClockImportEntry {
    entry_id: Option<String>,
    person_name: Option<String>,
    date: Option<String>,
    hours: Option<f64>,
    source: Option<String>,
}

#[derive(Deserialize, Debug)]
struct FeedbackRequest {
    roster_id: String,
    suggestion_id: String,
    feedback: String,
    impact: Option<f64>,
    notes: Option<String>,
}

// Record a presence heartbeat for the caller's device
#[post("/presence/heartbeat")]
async fn presence_heartbeat(
    req: HttpRequest,
    store: web::Data<SharedStore>,
    body: web::Json<HeartbeatRequest>,
) -> Result<HttpResponse, ServiceError> {
    let (principal, email) = get_principal_with_email(&req)?;
    let user_id = principal.user_id().ok_or(ServiceError::Unauthorized)?.to_string();
    let store = store.get_ref().as_ref();

    if !authorization::is_roster_member(store, &body.roster_id, &user_id)? {
        return Err(ServiceError::Forbidden);
    }

    let now = time::now_iso();
    let body = body.into_inner();
    let record = PresenceRecord {
        roster_id: body.roster_id.clone(),
        user_id: user_id.clone(),
        display_name: body
            .display_name
            .or(email)
            .unwrap_or_else(|| "User".to_string()),
        device: body.device.unwrap_or_else(|| "unknown".to_string()),
        last_seen: now.clone(),
    };
    put_record(
        store,
        Table::Presence,
        ItemKey::new(&body.roster_id, &user_id),
        &record,
    )?;

    Ok(HttpResponse::Ok().json(json!({ "ok": true, "last_seen": now })))
}

// Who is currently active on the roster
#[get("/presence/list")]
async fn presence_list(
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

    let records: Vec<PresenceRecord> = query_records(
        store,
        Table::Presence,
        &query.roster_id,
        ScanDirection::Ascending,
        None,
    )?;
    Ok(HttpResponse::Ok().json(records))
}

// Bulk import of time clock entries. Manager rank required; writes go to
// the store in 25-item batches.
#[post("/timeclock/import")]
async fn import_timeclock(
    req: HttpRequest,
    store: web::Data<SharedStore>,
    body: web::Json<TimeClockImportRequest>,
) -> Result<HttpResponse, ServiceError> {
    let principal = get_principal(&req)?;
    let user_id = principal.user_id().ok_or(ServiceError::Unauthorized)?.to_string();
    let store = store.get_ref().as_ref();

    if !authorization::has_roster_role(store, &body.roster_id, &user_id, Role::Manager)? {
        return Err(ServiceError::Forbidden);
    }

    let now = time::now_iso();
    let body = body.into_inner();
    let mut items = Vec::with_capacity(body.entries.len());
    for entry in body.entries {
        let entry_id = entry
            .entry_id
            .unwrap_or_else(|| format!("{}_{}", time::now_millis(), Uuid::new_v4().simple()));
        let record = TimeClockEntry {
            roster_id: body.roster_id.clone(),
            entry_id: entry_id.clone(),
            person_name: entry.person_name.unwrap_or_else(|| "Unknown".to_string()),
            date: entry.date,
            hours: entry.hours.unwrap_or(0.0),
            source: entry.source.unwrap_or_else(|| "import".to_string()),
            imported_by: user_id.clone(),
            created_at: now.clone(),
        };
        let item = to_item(&record).map_err(|e| {
            error!("Failed to serialize time clock entry: {}", e);
            ServiceError::InternalServerError
        })?;
        items.push((ItemKey::new(&body.roster_id, &entry_id), item));
    }

    let imported = items.len();
    store.batch_put(Table::TimeClock, items).map_err(|e| {
        error!("Failed to import time clock entries: {}", e);
        ServiceError::InternalServerError
    })?;

    audit::record(
        store,
        &body.roster_id,
        Some(&principal),
        "timeclock_imported",
        json!({ "count": imported }),
    );

    Ok(HttpResponse::Ok().json(json!({ "imported": imported })))
}

// List imported time clock entries, newest first
#[get("/timeclock")]
async fn list_timeclock(
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

    let entries: Vec<TimeClockEntry> = query_records(
        store,
        Table::TimeClock,
        &query.roster_id,
        ScanDirection::Descending,
        Some(TIMECLOCK_LIST_LIMIT),
    )?;
    Ok(HttpResponse::Ok().json(entries))
}

// Record feedback on a generated suggestion
#[post("/ai/feedback")]
async fn record_feedback(
    req: HttpRequest,
    store: web::Data<SharedStore>,
    body: web::Json<FeedbackRequest>,
) -> Result<HttpResponse, ServiceError> {
    let principal = get_principal(&req)?;
    let user_id = principal.user_id().ok_or(ServiceError::Unauthorized)?.to_string();
    let store = store.get_ref().as_ref();

    if body.suggestion_id.trim().is_empty() || body.feedback.trim().is_empty() {
        return Err(ServiceError::BadRequest(
            "Missing suggestionId or feedback".to_string(),
        ));
    }
    if !authorization::is_roster_member(store, &body.roster_id, &user_id)? {
        return Err(ServiceError::Forbidden);
    }

    let feedback_id = format!("{}_{}", time::now_millis(), user_id);
    let body = body.into_inner();
    let record = AiFeedback {
        roster_id: body.roster_id.clone(),
        feedback_id: feedback_id.clone(),
        suggestion_id: body.suggestion_id,
        feedback: body.feedback,
        impact: body.impact,
        notes: body.notes.unwrap_or_default(),
        user_id,
        created_at: time::now_iso(),
    };
    put_record(
        store,
        Table::AiFeedback,
        ItemKey::new(&body.roster_id, &feedback_id),
        &record,
    )?;

    Ok(HttpResponse::Ok().json(json!({ "ok": true })))
}

// Ask the suggestion backend for roster optimizations. Always answers with
// a suggestions array, empty on any backend or parse failure.
#[post("/ai/suggestions")]
async fn get_suggestions(
    req: HttpRequest,
    backend: web::Data<SharedSuggestionBackend>,
    body: web::Json<SuggestionRequest>,
) -> Result<HttpResponse, ServiceError> {
    get_principal(&req)?;
    let suggestions = suggestions::request_suggestions(backend.get_ref().as_ref(), &body);
    Ok(HttpResponse::Ok().json(json!({ "suggestions": suggestions })))
}

// Register presence, time clock, and suggestion routes
pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(presence_heartbeat)
        .service(presence_list)
        .service(import_timeclock)
        .service(list_timeclock)
        .service(record_feedback)
        .service(get_suggestions);
}
