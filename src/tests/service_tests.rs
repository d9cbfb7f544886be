// roster-service/src/tests/service_tests.rs
use crate::models::{Role, ServiceError, UserProfile};
use crate::routes::account_routes;
use crate::services::notifier::{self, NotificationDispatcher};
use crate::services::suggestions::{
    self, OfflineSuggestionBackend, SuggestionBackend, SuggestionRequest,
};
use crate::tests::{seed_member, seed_roster, test_store};
use crate::utils::store::{ItemKey, ScanDirection, Table};
use crate::utils::{jwt, password, time};
use actix_web::{test, web, App};
use serde_json::{json, Value};
use std::sync::Mutex;

#[::core::prelude::v1::test]
fn test_safe_json_parse_tolerates_wrapping() {
    // Clean JSON
    let parsed = suggestions::safe_json_parse(r#"{"suggestions":[]}"#);
    assert_eq!(parsed, Some(json!({ "suggestions": [] })));

    // Fenced or prefixed output still yields the inner object
    let fenced = "```json\n{\"suggestions\":[{\"id\":\"s1\"}]}\n```";
    let parsed = suggestions::safe_json_parse(fenced).unwrap();
    assert_eq!(parsed["suggestions"][0]["id"], "s1");

    let chatty = "Here you go: {\"suggestions\":[]} hope that helps!";
    assert!(suggestions::safe_json_parse(chatty).is_some());

    // Garbage degrades to nothing
    assert_eq!(suggestions::safe_json_parse("no json here"), None);
    assert_eq!(suggestions::safe_json_parse(""), None);
}

#[::core::prelude::v1::test]
fn test_extract_suggestions_defaults_to_empty() {
    assert!(suggestions::extract_suggestions(None).is_empty());
    assert!(suggestions::extract_suggestions(Some(json!("not an object"))).is_empty());
    assert!(suggestions::extract_suggestions(Some(json!({ "other": 1 }))).is_empty());

    let items = suggestions::extract_suggestions(Some(json!({ "suggestions": [{ "id": "s1" }] })));
    assert_eq!(items.len(), 1);
}

struct FailingBackend;

impl SuggestionBackend for FailingBackend {
    fn complete(&self, _request: &SuggestionRequest) -> Result<String, ServiceError> {
        Err(ServiceError::InternalServerError)
    }
}

#[::core::prelude::v1::test]
fn test_request_suggestions_never_errors() {
    let request = SuggestionRequest::default();
    assert!(suggestions::request_suggestions(&OfflineSuggestionBackend, &request).is_empty());
    assert!(suggestions::request_suggestions(&FailingBackend, &request).is_empty());
}

#[::core::prelude::v1::test]
fn test_user_prompt_carries_the_payload() {
    let request = SuggestionRequest {
        staff: json!([{ "name": "Alex" }]),
        ..Default::default()
    };
    let prompt = suggestions::build_user_prompt(&request);
    assert!(prompt.contains("\"staff\""));
    assert!(prompt.contains("Alex"));

    // The backing instructions demand bare JSON in the response schema
    assert!(suggestions::SYSTEM_PROMPT.contains("\"suggestions\""));
}

// Dispatcher that remembers what was published
struct RecordingDispatcher {
    published: Mutex<Vec<(String, Value)>>,
}

impl RecordingDispatcher {
    fn new() -> Self {
        Self {
            published: Mutex::new(Vec::new()),
        }
    }
}

impl NotificationDispatcher for RecordingDispatcher {
    fn publish(&self, subject: &str, message: &Value) {
        self.published
            .lock()
            .unwrap()
            .push((subject.to_string(), message.clone()));
    }
}

#[::core::prelude::v1::test]
fn test_pending_digest_counts_recent_pending_only() {
    let store = test_store();
    seed_roster(store.as_ref(), "roster-1", "owner-1");
    seed_member(store.as_ref(), "roster-1", "member-1", Role::Member);

    let now = time::now_iso();
    let rows = [
        ("req-1", "pending", now.as_str()),
        ("req-2", "approved", now.as_str()),
        ("req-3", "pending", "2020-01-01T00:00:00.000Z"),
    ];
    for (request_id, status, created_at) in rows {
        store
            .put(
                Table::AvailabilityRequests,
                ItemKey::new("roster-1", request_id),
                crate::utils::store::to_item(&json!({
                    "roster_id": "roster-1",
                    "request_id": request_id,
                    "user_id": "member-1",
                    "type": "leave",
                    "start_date": "2024-02-01",
                    "end_date": "2024-02-01",
                    "status": status,
                    "notes": "",
                    "created_at": created_at,
                    "updated_at": created_at,
                }))
                .unwrap(),
            )
            .unwrap();
    }

    let dispatcher = RecordingDispatcher::new();
    let summary = notifier::pending_approvals_digest(store.as_ref(), &dispatcher).unwrap();
    assert_eq!(summary.availability, 1, "approved and stale rows are excluded");
    assert_eq!(summary.swaps, 0);
    assert_eq!(summary.proposals, 0);

    let published = dispatcher.published.lock().unwrap();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].0, "Pending approvals summary");
    assert_eq!(published[0].1["availability"], 1);
}

#[::core::prelude::v1::test]
fn test_roster_password_hashing() {
    let hash = password::hash_roster_password("secret");
    assert_ne!(hash, "secret");
    assert_eq!(hash, password::hash_roster_password("secret"));

    assert!(password::verify_roster_password(None, None));
    assert!(password::verify_roster_password(None, Some("anything")));
    assert!(password::verify_roster_password(Some(&hash), Some("secret")));
    assert!(!password::verify_roster_password(Some(&hash), Some("wrong")));
    assert!(!password::verify_roster_password(Some(&hash), None));
}

#[::core::prelude::v1::test]
fn test_batch_delete_handles_more_than_one_chunk() {
    let store = test_store();
    let mut keys = Vec::new();
    for index in 0..60 {
        let key = ItemKey::new("roster-1", format!("row-{:03}", index));
        store
            .put(
                Table::RosterUpdates,
                key.clone(),
                crate::utils::store::to_item(&json!({ "index": index })).unwrap(),
            )
            .unwrap();
        keys.push(key);
    }

    store.batch_delete(Table::RosterUpdates, &keys).unwrap();
    let rows = store
        .query(Table::RosterUpdates, "roster-1", ScanDirection::Ascending, None)
        .unwrap();
    assert!(rows.is_empty(), "all chunks must be deleted");
}

#[actix_rt::test]
async fn test_profile_upsert_preserves_existing_fields() {
    let store = test_store();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(store.clone()))
            .configure(account_routes::init_routes),
    )
    .await;
    let token = jwt::issue_token("user-1", Some("user-1@example.com")).unwrap();

    // First write creates the row
    let request = test::TestRequest::post()
        .uri("/profile")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .set_json(json!({ "display_name": "Ada" }))
        .to_request();
    let response: Value = test::call_and_read_body_json(&app, request).await;
    assert_eq!(response["ok"], true);

    let item = store
        .get(Table::UserProfiles, &ItemKey::hash_only("user-1"))
        .unwrap()
        .unwrap();
    let created_at = item
        .get("created_at")
        .and_then(Value::as_str)
        .unwrap()
        .to_string();
    assert_eq!(item.get("display_name").and_then(Value::as_str), Some("Ada"));
    assert_eq!(
        item.get("email").and_then(Value::as_str),
        Some("user-1@example.com"),
        "email falls back to the token claim"
    );

    // A later write without fields keeps the earlier values
    let request = test::TestRequest::post()
        .uri("/profile")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .set_json(json!({}))
        .to_request();
    let _: Value = test::call_and_read_body_json(&app, request).await;

    let item = store
        .get(Table::UserProfiles, &ItemKey::hash_only("user-1"))
        .unwrap()
        .unwrap();
    let profile: UserProfile = crate::utils::store::from_item(item).unwrap();
    assert_eq!(profile.display_name.as_deref(), Some("Ada"));
    assert_eq!(
        profile.created_at, created_at,
        "created_at is written exactly once"
    );
}

#[actix_rt::test]
async fn test_settings_roundtrip() {
    let store = test_store();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(store.clone()))
            .configure(account_routes::init_routes),
    )
    .await;
    let token = jwt::issue_token("user-1", None).unwrap();

    // Empty before anything is saved
    let request = test::TestRequest::get()
        .uri("/settings/get")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_request();
    let response: Value = test::call_and_read_body_json(&app, request).await;
    assert_eq!(response, json!({}));

    let request = test::TestRequest::post()
        .uri("/settings/save")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .set_json(json!({ "settings": { "theme": "dark" } }))
        .to_request();
    let _: Value = test::call_and_read_body_json(&app, request).await;

    let request = test::TestRequest::get()
        .uri("/settings/get")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_request();
    let response: Value = test::call_and_read_body_json(&app, request).await;
    assert_eq!(response, json!({ "theme": "dark" }));
}
