// roster-service/src/tests/share_tests.rs
use crate::models::{CreateCodeOutcome, Principal, Role, ShareCodeState, ShareRole};
use crate::routes::share_routes;
use crate::services::share_token;
use crate::tests::{seed_member, seed_roster, test_store};
use crate::utils::store::{ItemKey, KeyValueStore, ScanDirection, Table};
use actix_web::{test, web, App};
use serde_json::{json, Value};
use std::thread;

fn create_custom(
    store: &dyn KeyValueStore,
    roster_id: &str,
    code: &str,
    role: ShareRole,
    max_uses: Option<i64>,
) -> crate::models::ShareCode {
    match share_token::create_share_code(store, roster_id, role, None, max_uses, Some(code), "owner-1")
        .unwrap()
    {
        CreateCodeOutcome::Created(share) => share,
        other => panic!("expected created, got {:?}", other),
    }
}

#[::core::prelude::v1::test]
fn test_generated_codes_use_reduced_alphabet() {
    for _ in 0..50 {
        let code = share_token::generate_code(8);
        assert_eq!(code.len(), 8);
        for c in code.chars() {
            assert!(
                share_token::CODE_ALPHABET.contains(&(c as u8)),
                "generated character {} outside the reduced alphabet",
                c
            );
        }
    }
}

#[::core::prelude::v1::test]
fn test_custom_code_normalization() {
    // Punctuation and case are normalized away
    assert_eq!(
        share_token::normalize_custom_code("team-x23!"),
        Some("TEAMX23".to_string())
    );
    // Ambiguous characters are rejected outright
    assert_eq!(share_token::normalize_custom_code("TEAMI234"), None);
    assert_eq!(share_token::normalize_custom_code("TEAMO234"), None);
    assert_eq!(share_token::normalize_custom_code("TEAM0123"), None);
    assert_eq!(share_token::normalize_custom_code("TEAM1123"), None);
    // Length bounds
    assert_eq!(share_token::normalize_custom_code("ABCDE"), None);
    assert_eq!(share_token::normalize_custom_code("ABCDEFGHJKLMN"), None);
    assert_eq!(
        share_token::normalize_custom_code("abcdef"),
        Some("ABCDEF".to_string())
    );
}

#[::core::prelude::v1::test]
fn test_duplicate_custom_code_conflicts_with_suggestions() {
    let store = test_store();
    seed_roster(store.as_ref(), "roster-1", "owner-1");

    create_custom(store.as_ref(), "roster-1", "TEAMX23", ShareRole::Viewer, None);

    let outcome = share_token::create_share_code(
        store.as_ref(),
        "roster-1",
        ShareRole::Viewer,
        None,
        None,
        Some("TEAMX23"),
        "owner-1",
    )
    .unwrap();
    match outcome {
        CreateCodeOutcome::Taken { suggestions } => {
            assert_eq!(suggestions.len(), 3);
            for suggestion in &suggestions {
                assert!(
                    suggestion.starts_with("TEAM"),
                    "suggestion {} should keep the requested prefix",
                    suggestion
                );
                assert_eq!(suggestion.len(), 8);
            }
        }
        other => panic!("expected taken, got {:?}", other),
    }
}

#[::core::prelude::v1::test]
fn test_validate_is_pure() {
    let store = test_store();
    seed_roster(store.as_ref(), "roster-1", "owner-1");
    let share = create_custom(store.as_ref(), "roster-1", "PURE23X", ShareRole::Viewer, Some(5));

    for _ in 0..3 {
        assert_eq!(share_token::validate(Some(&share)), ShareCodeState::Valid);
    }
    let reloaded = share_token::load_share_code(store.as_ref(), "PURE23X")
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.uses, 0, "validation must never consume a use");
}

#[::core::prelude::v1::test]
fn test_expired_code_is_refused() {
    let store = test_store();
    seed_roster(store.as_ref(), "roster-1", "owner-1");

    // Negative expiry window puts the deadline in the past
    let outcome = share_token::create_share_code(
        store.as_ref(),
        "roster-1",
        ShareRole::Viewer,
        Some(-1),
        None,
        Some("EXPRD23X"),
        "owner-1",
    )
    .unwrap();
    let share = match outcome {
        CreateCodeOutcome::Created(share) => share,
        other => panic!("expected created, got {:?}", other),
    };
    assert_eq!(share_token::validate(Some(&share)), ShareCodeState::Expired);
}

#[::core::prelude::v1::test]
fn test_unknown_code_is_not_found() {
    let store = test_store();
    let loaded = share_token::load_share_code(store.as_ref(), "NEVERSET").unwrap();
    assert_eq!(share_token::validate(loaded.as_ref()), ShareCodeState::NotFound);
}

#[::core::prelude::v1::test]
fn test_lookup_is_case_insensitive() {
    let store = test_store();
    seed_roster(store.as_ref(), "roster-1", "owner-1");
    create_custom(store.as_ref(), "roster-1", "CASE23X", ShareRole::Viewer, None);

    let loaded = share_token::load_share_code(store.as_ref(), "case23x").unwrap();
    assert!(loaded.is_some(), "codes are stored uppercase and matched case-insensitively");
}

#[::core::prelude::v1::test]
fn test_concurrent_redeems_respect_quota() {
    let store = test_store();
    seed_roster(store.as_ref(), "roster-1", "owner-1");
    let share = create_custom(store.as_ref(), "roster-1", "QTA23XYZ", ShareRole::Viewer, Some(2));

    let handles: Vec<_> = (0..3)
        .map(|_| {
            let store = store.clone();
            let share = share.clone();
            thread::spawn(move || share_token::redeem(store.as_ref(), &share).unwrap())
        })
        .collect();
    let results: Vec<bool> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let successes = results.iter().filter(|ok| **ok).count();
    assert_eq!(successes, 2, "exactly max_uses redemptions may succeed");

    let reloaded = share_token::load_share_code(store.as_ref(), "QTA23XYZ")
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.uses, 2);
    assert_eq!(
        share_token::validate(Some(&reloaded)),
        ShareCodeState::Exhausted
    );

    // Further attempts keep failing without moving the counter
    assert!(!share_token::redeem(store.as_ref(), &reloaded).unwrap());
    let reloaded = share_token::load_share_code(store.as_ref(), "QTA23XYZ")
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.uses, 2);
}

#[::core::prelude::v1::test]
fn test_unlimited_code_always_redeems() {
    let store = test_store();
    seed_roster(store.as_ref(), "roster-1", "owner-1");
    let share = create_custom(store.as_ref(), "roster-1", "FREE23XY", ShareRole::Viewer, None);

    for _ in 0..5 {
        assert!(share_token::redeem(store.as_ref(), &share).unwrap());
    }
    let reloaded = share_token::load_share_code(store.as_ref(), "FREE23XY")
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.uses, 5);
}

#[::core::prelude::v1::test]
fn test_editor_elevation_is_idempotent() {
    let store = test_store();
    seed_roster(store.as_ref(), "roster-1", "owner-1");
    let share = create_custom(store.as_ref(), "roster-1", "EDTR23XY", ShareRole::Editor, None);

    let principal = Principal::User("newcomer".to_string());
    share_token::elevate_guest(store.as_ref(), &share, &principal).unwrap();
    share_token::elevate_guest(store.as_ref(), &share, &principal).unwrap();

    let memberships = store
        .query(Table::RosterMembers, "roster-1", ScanDirection::Ascending, None)
        .unwrap();
    // Owner seed plus exactly one elevated membership
    assert_eq!(memberships.len(), 2);

    // An existing membership is never downgraded by elevation
    seed_member(store.as_ref(), "roster-1", "boss", Role::Owner);
    share_token::elevate_guest(store.as_ref(), &share, &Principal::User("boss".to_string()))
        .unwrap();
    let item = store
        .get(Table::RosterMembers, &ItemKey::new("roster-1", "boss"))
        .unwrap()
        .unwrap();
    assert_eq!(item.get("role").and_then(Value::as_str), Some("owner"));
}

#[::core::prelude::v1::test]
fn test_viewer_codes_never_elevate() {
    let store = test_store();
    seed_roster(store.as_ref(), "roster-1", "owner-1");
    let share = create_custom(store.as_ref(), "roster-1", "VWER23XY", ShareRole::Viewer, None);

    share_token::elevate_guest(
        store.as_ref(),
        &share,
        &Principal::User("visitor".to_string()),
    )
    .unwrap();
    assert!(store
        .get(Table::RosterMembers, &ItemKey::new("roster-1", "visitor"))
        .unwrap()
        .is_none());
}

#[actix_rt::test]
async fn test_guest_leave_records_guest_actor() {
    let store = test_store();
    seed_roster(store.as_ref(), "roster-1", "owner-1");
    let share = create_custom(store.as_ref(), "roster-1", "LEAVE23X", ShareRole::Viewer, Some(10));

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(store.clone()))
            .configure(share_routes::init_routes),
    )
    .await;

    let request = test::TestRequest::post()
        .uri("/share/leave")
        .set_json(json!({
            "code": "leave23x",
            "start_date": "2024-02-01",
            "guest_name": "Sam",
        }))
        .to_request();
    let response: Value = test::call_and_read_body_json(&app, request).await;
    let request_id = response["request_id"].as_str().unwrap();
    assert!(request_id.contains("guest_LEAVE23X"));

    // The request row carries the synthetic guest identity
    let rows = store
        .query(
            Table::AvailabilityRequests,
            "roster-1",
            ScanDirection::Ascending,
            None,
        )
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(
        rows[0].get("user_id").and_then(Value::as_str),
        Some("guest:LEAVE23X")
    );

    // And the submission consumed one use
    let reloaded = share_token::load_share_code(store.as_ref(), &share.code)
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.uses, 1);

    // The audit trail attributes the action to the guest as well
    let audit_rows = store
        .query(Table::AuditLogs, "roster-1", ScanDirection::Ascending, None)
        .unwrap();
    assert!(audit_rows.iter().any(|item| {
        item.get("action").and_then(Value::as_str) == Some("guest_leave_requested")
            && item.get("user_id").and_then(Value::as_str) == Some("guest:LEAVE23X")
    }));
}

#[actix_rt::test]
async fn test_exhausted_code_returns_gone() {
    let store = test_store();
    seed_roster(store.as_ref(), "roster-1", "owner-1");
    let share = create_custom(store.as_ref(), "roster-1", "NCE23XYZ", ShareRole::Viewer, Some(1));
    assert!(share_token::redeem(store.as_ref(), &share).unwrap());

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(store.clone()))
            .configure(share_routes::init_routes),
    )
    .await;

    let request = test::TestRequest::post()
        .uri("/share/access")
        .set_json(json!({ "code": "NCE23XYZ" }))
        .to_request();
    let response = test::call_service(&app, request).await;
    assert_eq!(response.status(), actix_web::http::StatusCode::GONE);
}
