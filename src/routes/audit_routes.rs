// roster-service/src/routes/audit_routes.rs
use crate::models::{Role, ServiceError};
use crate::services::notifier::{self, SharedDispatcher};
use crate::services::{audit, authorization};
use crate::utils::get_principal;
use crate::utils::store::SharedStore;
use actix_web::{get, post, web, HttpRequest, HttpResponse};
use log::error;
use serde::Deserialize;

#[derive(Deserialize, Debug)]
struct RosterQuery {
    roster_id: String,
}

// Audit trail view. Manager rank required; newest first, capped at 200.
#[get("/audit")]
async fn view_audit(
    req: HttpRequest,
    store: web::Data<SharedStore>,
    query: web::Query<RosterQuery>,
) -> Result<HttpResponse, ServiceError> {
    let principal = get_principal(&req)?;
    let user_id = principal.user_id().ok_or(ServiceError::Unauthorized)?.to_string();
    let store = store.get_ref().as_ref();

    if !authorization::has_roster_role(store, &query.roster_id, &user_id, Role::Manager)? {
        error!("❌ User: {} cannot view audit log for: {}", user_id, query.roster_id);
        return Err(ServiceError::Forbidden);
    }

    let entries = audit::list(store, &query.roster_id)?;
    Ok(HttpResponse::Ok().json(entries))
}

// Manually trigger the pending-approvals digest normally run on a schedule
#[post("/admin/digest")]
async fn run_digest(
    req: HttpRequest,
    store: web::Data<SharedStore>,
    dispatcher: web::Data<SharedDispatcher>,
) -> Result<HttpResponse, ServiceError> {
    get_principal(&req)?;
    let summary = notifier::pending_approvals_digest(
        store.get_ref().as_ref(),
        dispatcher.get_ref().as_ref(),
    )?;
    Ok(HttpResponse::Ok().json(summary))
}

// Register audit routes
pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(view_audit).service(run_digest);
}
