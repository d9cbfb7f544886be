// roster-service/src/routes/request_routes.rs
//
// Change-request flows: availability/leave requests, shift swaps, shift
// locks, and batched change proposals. Review decisions publish a
// notification; a failed publish never fails the decision.
use crate::models::{
    AvailabilityRequest, ChangeProposal, Role, ServiceError, ShiftLock, SwapRequest,
    STATUS_PENDING,
};
use crate::routes::{put_record, query_records};
use crate::services::notifier::SharedDispatcher;
use crate::services::{audit, authorization};
use crate::utils::store::{ItemKey, KeyValueStore, ScanDirection, SharedStore, Table};
use crate::utils::{get_principal, time};
use actix_web::{get, post, web, HttpRequest, HttpResponse};
use log::error;
use serde::Deserialize;
use serde_json::json;

// List caps for request views
const REQUEST_LIST_LIMIT: usize = 100;
const LOCK_LIST_LIMIT: usize = 200;

#[derive(Deserialize, Debug)]
struct RosterQuery {
    roster_id: String,
}

#[derive(Deserialize, Debug)]
struct AvailabilityRequestBody {
    roster_id: String,
    #[serde(rename = "type")]
    request_type: String,
    start_date: String,
    end_date: Option<String>,
    notes: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ReviewBody {
    roster_id: String,
    request_id: String,
    decision: String,
    note: Option<String>,
}

#[derive(Deserialize, Debug)]
struct SwapRequestBody {
    roster_id: String,
    from_person: String,
    to_person: Option<String>,
    date: String,
    shift: Option<String>,
    notes: Option<String>,
}

#[derive(Deserialize, Debug)]
struct LockBody {
    roster_id: String,
    date: String,
    shift: String,
    person_name: Option<String>,
    reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct UnlockBody {
    roster_id: String,
    lock_id: String,
}

#[derive(Deserialize, Debug)]
struct ProposalBody {
    roster_id: String,
    title: String,
    description: Option<String>,
    changes: serde_json::Value,
}

#[derive(Deserialize, Debug)]
struct ProposalReviewBody {
    roster_id: String,
    proposal_id: String,
    decision: String,
    note: Option<String>,
}

// Set review fields on an existing request row. The existence condition
// keeps a review from materializing a phantom row.
fn apply_review(
    store: &dyn KeyValueStore,
    table: Table,
    roster_id: &str,
    sort_key: &str,
    decision: &str,
    note: &str,
    reviewer: &str,
) -> Result<(), ServiceError> {
    let now = time::now_iso();
    let updated = store
        .conditional_update(
            table,
            &ItemKey::new(roster_id, sort_key),
            &|item| item.is_some(),
            &mut |item| {
                item.insert("status".to_string(), json!(decision));
                item.insert("reviewed_by".to_string(), json!(reviewer));
                item.insert("review_note".to_string(), json!(note));
                item.insert("updated_at".to_string(), json!(now));
            },
        )
        .map_err(|e| {
            error!("Failed to review {:?} row {}: {}", table, sort_key, e);
            ServiceError::InternalServerError
        })?;
    if updated.is_none() {
        return Err(ServiceError::NotFound);
    }
    Ok(())
}

// Submit an availability/leave request
#[post("/availability/request")]
async fn request_availability(
    req: HttpRequest,
    store: web::Data<SharedStore>,
    body: web::Json<AvailabilityRequestBody>,
) -> Result<HttpResponse, ServiceError> {
    let principal = get_principal(&req)?;
    let user_id = principal.user_id().ok_or(ServiceError::Unauthorized)?.to_string();
    let store = store.get_ref().as_ref();

    if body.request_type.trim().is_empty() || body.start_date.trim().is_empty() {
        return Err(ServiceError::BadRequest(
            "Missing type or startDate".to_string(),
        ));
    }
    if !authorization::has_roster_role(store, &body.roster_id, &user_id, Role::Member)? {
        return Err(ServiceError::Forbidden);
    }

    let now = time::now_iso();
    let request_id = format!("{}_{}", time::now_millis(), user_id);
    let body = body.into_inner();
    let request = AvailabilityRequest {
        roster_id: body.roster_id.clone(),
        request_id: request_id.clone(),
        user_id: user_id.clone(),
        request_type: body.request_type.clone(),
        start_date: body.start_date.clone(),
        end_date: body.end_date.unwrap_or(body.start_date),
        status: STATUS_PENDING.to_string(),
        notes: body.notes.unwrap_or_default(),
        guest_name: None,
        reviewed_by: None,
        review_note: None,
        created_at: now.clone(),
        updated_at: now,
    };
    put_record(
        store,
        Table::AvailabilityRequests,
        ItemKey::new(&body.roster_id, &request_id),
        &request,
    )?;

    audit::record(
        store,
        &body.roster_id,
        Some(&principal),
        "availability_requested",
        json!({ "request_id": request_id, "type": body.request_type }),
    );

    Ok(HttpResponse::Ok().json(json!({ "request_id": request_id })))
}

// List availability requests, newest first
#[get("/availability/requests")]
async fn list_availability(
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

    let requests: Vec<AvailabilityRequest> = query_records(
        store,
        Table::AvailabilityRequests,
        &query.roster_id,
        ScanDirection::Descending,
        Some(REQUEST_LIST_LIMIT),
    )?;
    Ok(HttpResponse::Ok().json(requests))
}

// Approve or deny an availability request. Manager rank required.
#[post("/availability/approve")]
async fn review_availability(
    req: HttpRequest,
    store: web::Data<SharedStore>,
    dispatcher: web::Data<SharedDispatcher>,
    body: web::Json<ReviewBody>,
) -> Result<HttpResponse, ServiceError> {
    let principal = get_principal(&req)?;
    let user_id = principal.user_id().ok_or(ServiceError::Unauthorized)?.to_string();
    let store = store.get_ref().as_ref();

    if body.decision.trim().is_empty() {
        return Err(ServiceError::BadRequest("Missing decision".to_string()));
    }
    if !authorization::has_roster_role(store, &body.roster_id, &user_id, Role::Manager)? {
        return Err(ServiceError::Forbidden);
    }

    apply_review(
        store,
        Table::AvailabilityRequests,
        &body.roster_id,
        &body.request_id,
        &body.decision,
        body.note.as_deref().unwrap_or(""),
        &user_id,
    )?;

    audit::record(
        store,
        &body.roster_id,
        Some(&principal),
        "availability_reviewed",
        json!({ "request_id": body.request_id, "decision": body.decision }),
    );
    dispatcher.publish(
        "Availability request reviewed",
        &json!({
            "roster_id": body.roster_id,
            "request_id": body.request_id,
            "decision": body.decision,
            "reviewed_by": user_id,
        }),
    );

    Ok(HttpResponse::Ok().json(json!({ "ok": true })))
}

// Submit a shift swap request
#[post("/swaps/request")]
async fn request_swap(
    req: HttpRequest,
    store: web::Data<SharedStore>,
    body: web::Json<SwapRequestBody>,
) -> Result<HttpResponse, ServiceError> {
    let principal = get_principal(&req)?;
    let user_id = principal.user_id().ok_or(ServiceError::Unauthorized)?.to_string();
    let store = store.get_ref().as_ref();

    if body.from_person.trim().is_empty() || body.date.trim().is_empty() {
        return Err(ServiceError::BadRequest(
            "Missing fromPerson or date".to_string(),
        ));
    }
    if !authorization::has_roster_role(store, &body.roster_id, &user_id, Role::Member)? {
        return Err(ServiceError::Forbidden);
    }

    let now = time::now_iso();
    let request_id = format!("{}_{}", time::now_millis(), user_id);
    let body = body.into_inner();
    let request = SwapRequest {
        roster_id: body.roster_id.clone(),
        request_id: request_id.clone(),
        user_id: user_id.clone(),
        from_person: body.from_person,
        to_person: body.to_person,
        date: body.date.clone(),
        shift: body.shift,
        status: STATUS_PENDING.to_string(),
        notes: body.notes.unwrap_or_default(),
        reviewed_by: None,
        review_note: None,
        created_at: now.clone(),
        updated_at: now,
    };
    put_record(
        store,
        Table::SwapRequests,
        ItemKey::new(&body.roster_id, &request_id),
        &request,
    )?;

    audit::record(
        store,
        &body.roster_id,
        Some(&principal),
        "swap_requested",
        json!({ "request_id": request_id, "date": body.date }),
    );

    Ok(HttpResponse::Ok().json(json!({ "request_id": request_id })))
}

// List swap requests, newest first
#[get("/swaps/requests")]
async fn list_swaps(
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

    let requests: Vec<SwapRequest> = query_records(
        store,
        Table::SwapRequests,
        &query.roster_id,
        ScanDirection::Descending,
        Some(REQUEST_LIST_LIMIT),
    )?;
    Ok(HttpResponse::Ok().json(requests))
}

// Accept or reject a swap request. Manager rank required.
#[post("/swaps/respond")]
async fn review_swap(
    req: HttpRequest,
    store: web::Data<SharedStore>,
    dispatcher: web::Data<SharedDispatcher>,
    body: web::Json<ReviewBody>,
) -> Result<HttpResponse, ServiceError> {
    let principal = get_principal(&req)?;
    let user_id = principal.user_id().ok_or(ServiceError::Unauthorized)?.to_string();
    let store = store.get_ref().as_ref();

    if body.decision.trim().is_empty() {
        return Err(ServiceError::BadRequest("Missing decision".to_string()));
    }
    if !authorization::has_roster_role(store, &body.roster_id, &user_id, Role::Manager)? {
        return Err(ServiceError::Forbidden);
    }

    apply_review(
        store,
        Table::SwapRequests,
        &body.roster_id,
        &body.request_id,
        &body.decision,
        body.note.as_deref().unwrap_or(""),
        &user_id,
    )?;

    audit::record(
        store,
        &body.roster_id,
        Some(&principal),
        "swap_reviewed",
        json!({ "request_id": body.request_id, "decision": body.decision }),
    );
    dispatcher.publish(
        "Swap request reviewed",
        &json!({
            "roster_id": body.roster_id,
            "request_id": body.request_id,
            "decision": body.decision,
            "reviewed_by": user_id,
        }),
    );

    Ok(HttpResponse::Ok().json(json!({ "ok": true })))
}

// Place an advisory lock on a shift slot. Manager rank required.
#[post("/locks/set")]
async fn set_lock(
    req: HttpRequest,
    store: web::Data<SharedStore>,
    body: web::Json<LockBody>,
) -> Result<HttpResponse, ServiceError> {
    let principal = get_principal(&req)?;
    let user_id = principal.user_id().ok_or(ServiceError::Unauthorized)?.to_string();
    let store = store.get_ref().as_ref();

    if body.date.trim().is_empty() || body.shift.trim().is_empty() {
        return Err(ServiceError::BadRequest("Missing date or shift".to_string()));
    }
    if !authorization::has_roster_role(store, &body.roster_id, &user_id, Role::Manager)? {
        return Err(ServiceError::Forbidden);
    }

    let body = body.into_inner();
    let lock_id = ShiftLock::derive_lock_id(&body.date, &body.shift, body.person_name.as_deref());
    let lock = ShiftLock {
        roster_id: body.roster_id.clone(),
        lock_id: lock_id.clone(),
        date: body.date,
        shift: body.shift,
        person_name: body.person_name,
        reason: body.reason.unwrap_or_default(),
        locked_by: user_id,
        created_at: time::now_iso(),
    };
    put_record(
        store,
        Table::ShiftLocks,
        ItemKey::new(&body.roster_id, &lock_id),
        &lock,
    )?;

    audit::record(
        store,
        &body.roster_id,
        Some(&principal),
        "shift_locked",
        json!({ "lock_id": lock_id }),
    );

    Ok(HttpResponse::Ok().json(json!({ "lock_id": lock_id })))
}

// List shift locks, newest first
#[get("/locks")]
async fn list_locks(
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

    let locks: Vec<ShiftLock> = query_records(
        store,
        Table::ShiftLocks,
        &query.roster_id,
        ScanDirection::Descending,
        Some(LOCK_LIST_LIMIT),
    )?;
    Ok(HttpResponse::Ok().json(locks))
}

// Remove a shift lock. Manager rank required.
#[post("/locks/remove")]
async fn remove_lock(
    req: HttpRequest,
    store: web::Data<SharedStore>,
    body: web::Json<UnlockBody>,
) -> Result<HttpResponse, ServiceError> {
    let principal = get_principal(&req)?;
    let user_id = principal.user_id().ok_or(ServiceError::Unauthorized)?.to_string();
    let store = store.get_ref().as_ref();

    if !authorization::has_roster_role(store, &body.roster_id, &user_id, Role::Manager)? {
        return Err(ServiceError::Forbidden);
    }

    store
        .delete(
            Table::ShiftLocks,
            &ItemKey::new(&body.roster_id, &body.lock_id),
        )
        .map_err(|e| {
            error!("Failed to delete lock {}: {}", body.lock_id, e);
            ServiceError::InternalServerError
        })?;

    audit::record(
        store,
        &body.roster_id,
        Some(&principal),
        "shift_unlocked",
        json!({ "lock_id": body.lock_id }),
    );

    Ok(HttpResponse::Ok().json(json!({ "ok": true })))
}

// Create a change proposal
#[post("/proposals/create")]
async fn create_proposal(
    req: HttpRequest,
    store: web::Data<SharedStore>,
    body: web::Json<ProposalBody>,
) -> Result<HttpResponse, ServiceError> {
    let principal = get_principal(&req)?;
    let user_id = principal.user_id().ok_or(ServiceError::Unauthorized)?.to_string();
    let store = store.get_ref().as_ref();

    if body.title.trim().is_empty() {
        return Err(ServiceError::BadRequest("Missing title".to_string()));
    }
    if !authorization::has_roster_role(store, &body.roster_id, &user_id, Role::Member)? {
        return Err(ServiceError::Forbidden);
    }

    let now = time::now_iso();
    let proposal_id = format!("{}_{}", time::now_millis(), user_id);
    let body = body.into_inner();
    let proposal = ChangeProposal {
        roster_id: body.roster_id.clone(),
        proposal_id: proposal_id.clone(),
        user_id,
        title: body.title,
        description: body.description.unwrap_or_default(),
        changes: body.changes,
        status: STATUS_PENDING.to_string(),
        reviewed_by: None,
        review_note: None,
        created_at: now.clone(),
        updated_at: now,
    };
    put_record(
        store,
        Table::ChangeProposals,
        ItemKey::new(&body.roster_id, &proposal_id),
        &proposal,
    )?;

    audit::record(
        store,
        &body.roster_id,
        Some(&principal),
        "proposal_created",
        json!({ "proposal_id": proposal_id }),
    );

    Ok(HttpResponse::Ok().json(json!({ "proposal_id": proposal_id })))
}

// List change proposals, newest first
#[get("/proposals")]
async fn list_proposals(
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

    let proposals: Vec<ChangeProposal> = query_records(
        store,
        Table::ChangeProposals,
        &query.roster_id,
        ScanDirection::Descending,
        Some(REQUEST_LIST_LIMIT),
    )?;
    Ok(HttpResponse::Ok().json(proposals))
}

// Resolve a change proposal. Manager rank required.
#[post("/proposals/resolve")]
async fn resolve_proposal(
    req: HttpRequest,
    store: web::Data<SharedStore>,
    dispatcher: web::Data<SharedDispatcher>,
    body: web::Json<ProposalReviewBody>,
) -> Result<HttpResponse, ServiceError> {
    let principal = get_principal(&req)?;
    let user_id = principal.user_id().ok_or(ServiceError::Unauthorized)?.to_string();
    let store = store.get_ref().as_ref();

    if body.decision.trim().is_empty() {
        return Err(ServiceError::BadRequest("Missing decision".to_string()));
    }
    if !authorization::has_roster_role(store, &body.roster_id, &user_id, Role::Manager)? {
        return Err(ServiceError::Forbidden);
    }

    apply_review(
        store,
        Table::ChangeProposals,
        &body.roster_id,
        &body.proposal_id,
        &body.decision,
        body.note.as_deref().unwrap_or(""),
        &user_id,
    )?;

    audit::record(
        store,
        &body.roster_id,
        Some(&principal),
        "proposal_resolved",
        json!({ "proposal_id": body.proposal_id, "decision": body.decision }),
    );
    dispatcher.publish(
        "Change proposal resolved",
        &json!({
            "roster_id": body.roster_id,
            "proposal_id": body.proposal_id,
            "decision": body.decision,
            "reviewed_by": user_id,
        }),
    );

    Ok(HttpResponse::Ok().json(json!({ "ok": true })))
}

// Register all change-request routes
pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(request_availability)
        .service(list_availability)
        .service(review_availability)
        .service(request_swap)
        .service(list_swaps)
        .service(review_swap)
        .service(set_lock)
        .service(list_locks)
        .service(remove_lock)
        .service(create_proposal)
        .service(list_proposals)
        .service(resolve_proposal);
}
