// roster-service/src/routes/org_routes.rs
use crate::models::{Org, OrgMember, Role, ServiceError, Team, TeamMember};
use crate::routes::{get_record, put_record, query_records};
use crate::services::authorization;
use crate::utils::store::{from_item, ItemKey, ScanDirection, SharedStore, Table};
use crate::utils::{get_principal, time};
use actix_web::{get, post, web, HttpRequest, HttpResponse};
use log::{error, info};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

#[derive(Deserialize, Debug)]
struct CreateOrgRequest {
    name: String,
}

#[derive(Deserialize, Debug)]
struct OrgMemberRoleRequest {
    org_id: String,
    member_user_id: String,
    role: Role,
}

#[derive(Deserialize, Debug)]
struct CreateTeamRequest {
    org_id: String,
    name: String,
}

#[derive(Deserialize, Debug)]
struct OrgQuery {
    org_id: String,
}

#[derive(Deserialize, Debug)]
struct AddTeamMemberRequest {
    org_id: String,
    team_id: String,
    member_user_id: String,
    role: Option<Role>,
}

// Create a new organization; the creator becomes its owner
#[post("/orgs/create")]
async fn create_org(
    req: HttpRequest,
    store: web::Data<SharedStore>,
    body: web::Json<CreateOrgRequest>,
) -> Result<HttpResponse, ServiceError> {
    let principal = get_principal(&req)?;
    let user_id = principal.user_id().ok_or(ServiceError::Unauthorized)?.to_string();
    let store = store.get_ref().as_ref();

    if body.name.trim().is_empty() {
        return Err(ServiceError::BadRequest("Missing org name".to_string()));
    }

    let org_id = Uuid::new_v4().to_string();
    let now = time::now_iso();
    let org = Org {
        org_id: org_id.clone(),
        name: body.name.clone(),
        owner_id: user_id.clone(),
        created_at: now.clone(),
        updated_at: now.clone(),
    };
    put_record(store, Table::Orgs, ItemKey::hash_only(&org_id), &org)?;

    let member = OrgMember {
        org_id: org_id.clone(),
        user_id: user_id.clone(),
        role: Role::Owner,
        joined_at: now,
    };
    put_record(
        store,
        Table::OrgMembers,
        ItemKey::new(&org_id, &user_id),
        &member,
    )?;

    info!("✅ Org created: {} by user: {}", org_id, user_id);

    Ok(HttpResponse::Ok().json(json!({ "org_id": org_id })))
}

// List the caller's organizations with their role in each
#[get("/orgs")]
async fn list_orgs(
    req: HttpRequest,
    store: web::Data<SharedStore>,
) -> Result<HttpResponse, ServiceError> {
    let principal = get_principal(&req)?;
    let user_id = principal.user_id().ok_or(ServiceError::Unauthorized)?.to_string();
    let store = store.get_ref().as_ref();

    let memberships = store
        .query_by_attribute(Table::OrgMembers, "user_id", &user_id)
        .map_err(|e| {
            error!("Failed to list org memberships for {}: {}", user_id, e);
            ServiceError::InternalServerError
        })?;

    let mut result = Vec::with_capacity(memberships.len());
    for item in memberships {
        let member: OrgMember = from_item(item).map_err(|e| {
            error!("Failed to parse org membership: {}", e);
            ServiceError::InternalServerError
        })?;
        let org: Option<Org> = get_record(store, Table::Orgs, &ItemKey::hash_only(&member.org_id))?;
        result.push(json!({
            "org_id": member.org_id,
            "role": member.role,
            "org": org.map(|o| o.summary()),
        }));
    }

    Ok(HttpResponse::Ok().json(result))
}

// Change an org member's role. Admin rank required.
#[post("/orgs/members/role")]
async fn update_org_member_role(
    req: HttpRequest,
    store: web::Data<SharedStore>,
    body: web::Json<OrgMemberRoleRequest>,
) -> Result<HttpResponse, ServiceError> {
    let principal = get_principal(&req)?;
    let user_id = principal.user_id().ok_or(ServiceError::Unauthorized)?.to_string();
    let store = store.get_ref().as_ref();

    if !authorization::has_org_role(store, &body.org_id, &user_id, Role::Admin)? {
        error!("❌ User: {} cannot manage roles in org: {}", user_id, body.org_id);
        return Err(ServiceError::Forbidden);
    }

    let updated = store
        .conditional_update(
            Table::OrgMembers,
            &ItemKey::new(&body.org_id, &body.member_user_id),
            &|item| item.is_some(),
            &mut |item| {
                item.insert("role".to_string(), json!(body.role));
            },
        )
        .map_err(|e| {
            error!("Failed to update org member role: {}", e);
            ServiceError::InternalServerError
        })?;
    if updated.is_none() {
        return Err(ServiceError::NotFound);
    }

    Ok(HttpResponse::Ok().json(json!({ "ok": true })))
}

// Create a team inside an org. Manager rank required.
#[post("/teams/create")]
async fn create_team(
    req: HttpRequest,
    store: web::Data<SharedStore>,
    body: web::Json<CreateTeamRequest>,
) -> Result<HttpResponse, ServiceError> {
    let principal = get_principal(&req)?;
    let user_id = principal.user_id().ok_or(ServiceError::Unauthorized)?.to_string();
    let store = store.get_ref().as_ref();

    if body.name.trim().is_empty() {
        return Err(ServiceError::BadRequest("Missing team name".to_string()));
    }
    if !authorization::has_org_role(store, &body.org_id, &user_id, Role::Manager)? {
        return Err(ServiceError::Forbidden);
    }

    let team_id = Uuid::new_v4().to_string();
    let now = time::now_iso();
    let team = Team {
        org_id: body.org_id.clone(),
        team_id: team_id.clone(),
        name: body.name.clone(),
        created_at: now.clone(),
    };
    put_record(
        store,
        Table::Teams,
        ItemKey::new(&body.org_id, &team_id),
        &team,
    )?;

    let member = TeamMember {
        team_id: team_id.clone(),
        user_id: user_id.clone(),
        role: Role::Manager,
        joined_at: now,
    };
    put_record(
        store,
        Table::TeamMembers,
        ItemKey::new(&team_id, &user_id),
        &member,
    )?;

    Ok(HttpResponse::Ok().json(json!({ "team_id": team_id })))
}

// List the teams of an org. Staff rank is enough to read.
#[get("/teams")]
async fn list_teams(
    req: HttpRequest,
    store: web::Data<SharedStore>,
    query: web::Query<OrgQuery>,
) -> Result<HttpResponse, ServiceError> {
    let principal = get_principal(&req)?;
    let user_id = principal.user_id().ok_or(ServiceError::Unauthorized)?.to_string();
    let store = store.get_ref().as_ref();

    if !authorization::has_org_role(store, &query.org_id, &user_id, Role::Staff)? {
        return Err(ServiceError::Forbidden);
    }

    let teams: Vec<Team> = query_records(
        store,
        Table::Teams,
        &query.org_id,
        ScanDirection::Ascending,
        None,
    )?;
    Ok(HttpResponse::Ok().json(teams))
}

// Add a member to a team. Org manager rank required.
#[post("/teams/members/add")]
async fn add_team_member(
    req: HttpRequest,
    store: web::Data<SharedStore>,
    body: web::Json<AddTeamMemberRequest>,
) -> Result<HttpResponse, ServiceError> {
    let principal = get_principal(&req)?;
    let user_id = principal.user_id().ok_or(ServiceError::Unauthorized)?.to_string();
    let store = store.get_ref().as_ref();

    let team: Option<Team> = get_record(
        store,
        Table::Teams,
        &ItemKey::new(&body.org_id, &body.team_id),
    )?;
    if team.is_none() {
        error!("❌ Team not found: {}", body.team_id);
        return Err(ServiceError::NotFound);
    }
    if !authorization::has_org_role(store, &body.org_id, &user_id, Role::Manager)? {
        return Err(ServiceError::Forbidden);
    }

    let member = TeamMember {
        team_id: body.team_id.clone(),
        user_id: body.member_user_id.clone(),
        role: body.role.unwrap_or(Role::Member),
        joined_at: time::now_iso(),
    };
    put_record(
        store,
        Table::TeamMembers,
        ItemKey::new(&body.team_id, &body.member_user_id),
        &member,
    )?;

    Ok(HttpResponse::Ok().json(json!({ "ok": true })))
}

// Register all org and team routes
pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(create_org)
        .service(list_orgs)
        .service(update_org_member_role)
        .service(create_team)
        .service(list_teams)
        .service(add_team_member);
}
