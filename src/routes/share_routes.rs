// roster-service/src/routes/share_routes.rs
use crate::models::{
    AvailabilityRequest, CreateCodeOutcome, Principal, Role, Roster, ServiceError, ShareCode,
    ShareCodeState, ShareRole, STATUS_PENDING,
};
use crate::routes::{get_record, put_record};
use crate::services::{audit, authorization, document_sync, share_token};
use crate::utils::store::{ItemKey, KeyValueStore, SharedStore, Table};
use crate::utils::{get_principal, time};
use actix_web::{post, web, HttpRequest, HttpResponse};
use log::{error, info};
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize, Debug)]
struct CreateShareRequest {
    roster_id: String,
    role: Option<String>,
    expires_in_hours: Option<i64>,
    max_uses: Option<i64>,
    custom_code: Option<String>,
}

#[derive(Deserialize, Debug)]
struct AccessShareRequest {
    code: String,
}

#[derive(Deserialize, Debug)]
struct GuestLeaveRequest {
    code: String,
    start_date: String,
    end_date: Option<String>,
    notes: Option<String>,
    guest_name: Option<String>,
}

// Resolve a loaded code to a usable one, failing closed
fn require_valid_share(share: Option<ShareCode>) -> Result<ShareCode, ServiceError> {
    let state = share_token::validate(share.as_ref());
    match state {
        ShareCodeState::Valid => Ok(share.ok_or(ServiceError::NotFound)?),
        ShareCodeState::NotFound => Err(ServiceError::NotFound),
        ShareCodeState::Expired => Err(ServiceError::Exhausted("Share code expired".to_string())),
        ShareCodeState::Exhausted => {
            Err(ServiceError::Exhausted("Share code exhausted".to_string()))
        }
    }
}

// Roster snapshot returned to a redeemer
fn share_access_response(
    store: &dyn KeyValueStore,
    share: &ShareCode,
) -> Result<HttpResponse, ServiceError> {
    let roster: Option<Roster> = get_record(
        store,
        Table::Rosters,
        &ItemKey::hash_only(&share.roster_id),
    )?;
    let document = document_sync::load_document(store, &share.roster_id)?;

    let (data, version, last_modified, last_modified_by) = match document {
        Some(document) => (
            document.data,
            document.version,
            document.last_modified,
            document.last_modified_by,
        ),
        None => (serde_json::Value::Null, 0, None, None),
    };

    Ok(HttpResponse::Ok().json(json!({
        "roster_id": share.roster_id,
        "role": share.role,
        "roster_name": roster.map(|r| r.name),
        "data": data,
        "version": version,
        "last_modified": last_modified,
        "last_modified_by": last_modified_by,
    })))
}

// Mint a share code. Requires manager rank on the roster.
#[post("/share/create")]
async fn create_share(
    req: HttpRequest,
    store: web::Data<SharedStore>,
    body: web::Json<CreateShareRequest>,
) -> Result<HttpResponse, ServiceError> {
    let principal = get_principal(&req)?;
    let user_id = principal.user_id().ok_or(ServiceError::Unauthorized)?.to_string();
    let store = store.get_ref().as_ref();

    if !authorization::has_roster_role(store, &body.roster_id, &user_id, Role::Manager)? {
        error!("❌ User: {} cannot share roster: {}", user_id, body.roster_id);
        return Err(ServiceError::Forbidden);
    }

    let role = ShareRole::from_request(body.role.as_deref());
    let outcome = share_token::create_share_code(
        store,
        &body.roster_id,
        role,
        body.expires_in_hours,
        body.max_uses,
        body.custom_code.as_deref(),
        &user_id,
    )?;

    match outcome {
        CreateCodeOutcome::Created(share) => {
            audit::record(
                store,
                &body.roster_id,
                Some(&principal),
                "share_code_created",
                json!({ "code": share.code, "role": share.role }),
            );
            info!("✅ Share code created for roster: {}", body.roster_id);
            Ok(HttpResponse::Ok().json(json!({
                "code": share.code,
                "roster_id": share.roster_id,
                "role": share.role,
                "expires_at": share.expires_at,
                "max_uses": share.max_uses,
            })))
        }
        CreateCodeOutcome::InvalidFormat => Err(ServiceError::BadRequest(
            "Invalid share code format. Use 6-12 characters A-Z (excluding I and O) and 2-9."
                .to_string(),
        )),
        CreateCodeOutcome::Taken { suggestions } => {
            Ok(HttpResponse::Conflict().json(json!({
                "error": "Share code already in use.",
                "suggestions": suggestions,
            })))
        }
        CreateCodeOutcome::AttemptsExhausted => {
            error!("❌ Unable to generate a unique share code");
            Err(ServiceError::InternalServerError)
        }
    }
}

// Anonymous access via a share code. Counts one redemption.
#[post("/share/access")]
async fn access_share(
    store: web::Data<SharedStore>,
    body: web::Json<AccessShareRequest>,
) -> Result<HttpResponse, ServiceError> {
    let store = store.get_ref().as_ref();
    let share = require_valid_share(share_token::load_share_code(store, &body.code)?)?;

    if !share_token::redeem(store, &share)? {
        return Err(ServiceError::Exhausted("Share code exhausted".to_string()));
    }

    share_access_response(store, &share)
}

// Authenticated access via a share code. Editor codes upgrade the caller
// to a real membership before the redemption is counted.
#[post("/share/access-auth")]
async fn access_share_authenticated(
    req: HttpRequest,
    store: web::Data<SharedStore>,
    body: web::Json<AccessShareRequest>,
) -> Result<HttpResponse, ServiceError> {
    let principal = get_principal(&req)?;
    let store = store.get_ref().as_ref();
    let share = require_valid_share(share_token::load_share_code(store, &body.code)?)?;

    share_token::elevate_guest(store, &share, &principal)?;

    if !share_token::redeem(store, &share)? {
        return Err(ServiceError::Exhausted("Share code exhausted".to_string()));
    }

    share_access_response(store, &share)
}

// Anonymous leave request attributed to the guest pseudo-identity
#[post("/share/leave")]
async fn guest_leave(
    store: web::Data<SharedStore>,
    body: web::Json<GuestLeaveRequest>,
) -> Result<HttpResponse, ServiceError> {
    let store = store.get_ref().as_ref();

    if body.start_date.trim().is_empty() {
        return Err(ServiceError::BadRequest("Missing startDate".to_string()));
    }

    let share = require_valid_share(share_token::load_share_code(store, &body.code)?)?;

    if !share_token::redeem(store, &share)? {
        return Err(ServiceError::Exhausted("Share code exhausted".to_string()));
    }

    let guest = Principal::Guest(share.code.clone());
    let now = time::now_iso();
    let request_id = format!("{}_guest_{}", time::now_millis(), share.code);
    let body = body.into_inner();
    let guest_name = body.guest_name.unwrap_or_else(|| "Guest".to_string());

    let request = AvailabilityRequest {
        roster_id: share.roster_id.clone(),
        request_id: request_id.clone(),
        user_id: guest.actor(),
        request_type: "leave".to_string(),
        start_date: body.start_date.clone(),
        end_date: body.end_date.unwrap_or(body.start_date),
        status: STATUS_PENDING.to_string(),
        notes: body.notes.unwrap_or_default(),
        guest_name: Some(guest_name.clone()),
        reviewed_by: None,
        review_note: None,
        created_at: now.clone(),
        updated_at: now,
    };
    put_record(
        store,
        Table::AvailabilityRequests,
        ItemKey::new(&share.roster_id, &request_id),
        &request,
    )?;

    audit::record(
        store,
        &share.roster_id,
        Some(&guest),
        "guest_leave_requested",
        json!({ "request_id": request_id, "guest_name": guest_name }),
    );

    info!(
        "✅ Guest leave request {} recorded for roster: {}",
        request_id, share.roster_id
    );

    Ok(HttpResponse::Ok().json(json!({ "request_id": request_id })))
}

// Register all share code routes
pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(create_share)
        .service(access_share)
        .service(access_share_authenticated)
        .service(guest_leave);
}
