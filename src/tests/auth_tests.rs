// roster-service/src/tests/auth_tests.rs
use crate::models::Role;
use crate::routes::{document_routes, roster_routes};
use crate::services::authorization;
use crate::tests::{seed_member, seed_roster, test_store};
use crate::utils::jwt;
use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use serde_json::json;

#[::core::prelude::v1::test]
fn test_role_rank_ordering() {
    assert!(Role::Owner.rank() > Role::Admin.rank());
    assert!(Role::Admin.rank() > Role::Manager.rank());
    assert!(Role::Manager.rank() > Role::Member.rank());
    assert!(Role::Member.rank() > Role::Viewer.rank());

    // Member, staff and editor share one rank
    assert_eq!(Role::Member.rank(), Role::Staff.rank());
    assert_eq!(Role::Member.rank(), Role::Editor.rank());
}

#[::core::prelude::v1::test]
fn test_unknown_role_ranks_as_viewer() {
    assert_eq!(Role::from_name("superadmin"), Role::Viewer);
    assert_eq!(Role::from_name(""), Role::Viewer);
    assert_eq!(Role::from_name("OWNER"), Role::Viewer, "names are case sensitive");
}

#[::core::prelude::v1::test]
fn test_missing_membership_denies() {
    let store = test_store();
    seed_roster(store.as_ref(), "roster-1", "owner-1");

    let allowed =
        authorization::has_roster_role(store.as_ref(), "roster-1", "stranger", Role::Viewer)
            .unwrap();
    assert!(!allowed, "no membership row should deny even viewer rank");
}

#[::core::prelude::v1::test]
fn test_role_check_is_monotonic() {
    let store = test_store();
    seed_roster(store.as_ref(), "roster-1", "owner-1");
    seed_member(store.as_ref(), "roster-1", "manager-1", Role::Manager);

    // Holding manager implies every lower requirement
    for required in [Role::Viewer, Role::Member, Role::Manager] {
        assert!(
            authorization::has_roster_role(store.as_ref(), "roster-1", "manager-1", required)
                .unwrap(),
            "manager should satisfy {:?}",
            required
        );
    }
    for required in [Role::Admin, Role::Owner] {
        assert!(
            !authorization::has_roster_role(store.as_ref(), "roster-1", "manager-1", required)
                .unwrap(),
            "manager should not satisfy {:?}",
            required
        );
    }
}

#[actix_rt::test]
async fn test_save_rejected_without_membership() {
    let store = test_store();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(store.clone()))
            .configure(roster_routes::init_routes)
            .configure(document_routes::init_routes),
    )
    .await;

    // U1 creates the roster and becomes its owner
    let owner_token = jwt::issue_token("user-1", None).unwrap();
    let request = test::TestRequest::post()
        .uri("/rosters/create")
        .insert_header(("Authorization", format!("Bearer {}", owner_token)))
        .set_json(json!({ "name": "Team X" }))
        .to_request();
    let response: serde_json::Value = test::call_and_read_body_json(&app, request).await;
    let roster_id = response["roster_id"].as_str().unwrap().to_string();

    // U2 never joined, so saving is forbidden
    let outsider_token = jwt::issue_token("user-2", None).unwrap();
    let request = test::TestRequest::post()
        .uri("/roster/save")
        .insert_header(("Authorization", format!("Bearer {}", outsider_token)))
        .set_json(json!({ "roster_id": roster_id, "data": { "shifts": {} } }))
        .to_request();
    let response = test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[actix_rt::test]
async fn test_only_the_owner_deletes_a_roster() {
    let store = test_store();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(store.clone()))
            .configure(roster_routes::init_routes),
    )
    .await;

    let owner_token = jwt::issue_token("user-1", None).unwrap();
    let request = test::TestRequest::post()
        .uri("/rosters/create")
        .insert_header(("Authorization", format!("Bearer {}", owner_token)))
        .set_json(json!({ "name": "Team X" }))
        .to_request();
    let response: serde_json::Value = test::call_and_read_body_json(&app, request).await;
    let roster_id = response["roster_id"].as_str().unwrap().to_string();

    // A plain member joined the roster but cannot delete it
    let member_token = jwt::issue_token("user-2", None).unwrap();
    let request = test::TestRequest::post()
        .uri("/rosters/join")
        .insert_header(("Authorization", format!("Bearer {}", member_token)))
        .set_json(json!({ "roster_id": roster_id }))
        .to_request();
    let _: serde_json::Value = test::call_and_read_body_json(&app, request).await;

    let request = test::TestRequest::delete()
        .uri(&format!("/rosters/{}", roster_id))
        .insert_header(("Authorization", format!("Bearer {}", member_token)))
        .to_request();
    let response = test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let request = test::TestRequest::delete()
        .uri(&format!("/rosters/{}", roster_id))
        .insert_header(("Authorization", format!("Bearer {}", owner_token)))
        .to_request();
    let response = test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[actix_rt::test]
async fn test_missing_token_is_unauthorized() {
    let store = test_store();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(store.clone()))
            .configure(roster_routes::init_routes),
    )
    .await;

    let request = test::TestRequest::post()
        .uri("/rosters/create")
        .set_json(json!({ "name": "Team X" }))
        .to_request();
    let response = test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
