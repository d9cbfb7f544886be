// roster-service/src/tests/sync_tests.rs
use crate::models::{IncomingUpdate, Principal, Role, ShareRole};
use crate::services::{document_sync, share_token};
use crate::tests::{seed_member, seed_roster, test_store};
use crate::utils::store::{ItemKey, ScanDirection, Table};
use serde_json::json;
use std::thread;

#[test]
fn test_first_save_yields_version_one() {
    let store = test_store();
    seed_roster(store.as_ref(), "roster-1", "owner-1");

    let principal = Principal::User("owner-1".to_string());
    let payload = json!({ "shifts": {} });
    let saved =
        document_sync::save_document(store.as_ref(), "roster-1", payload.clone(), &principal)
            .unwrap();
    assert_eq!(saved.version, 1);
    assert_eq!(saved.last_modified_by, "owner-1");

    let loaded = document_sync::load_document(store.as_ref(), "roster-1")
        .unwrap()
        .expect("document should exist after save");
    assert_eq!(loaded.version, 1);
    assert_eq!(loaded.data, payload);
}

#[test]
fn test_load_before_first_save_is_empty() {
    let store = test_store();
    seed_roster(store.as_ref(), "roster-1", "owner-1");

    let loaded = document_sync::load_document(store.as_ref(), "roster-1").unwrap();
    assert!(loaded.is_none(), "a never-saved roster has no document");
}

#[test]
fn test_concurrent_saves_lose_no_updates() {
    let store = test_store();
    seed_roster(store.as_ref(), "roster-1", "owner-1");

    let writers = 8;
    let saves_per_writer = 5;
    let handles: Vec<_> = (0..writers)
        .map(|writer| {
            let store = store.clone();
            thread::spawn(move || {
                let principal = Principal::User(format!("user-{}", writer));
                for save in 0..saves_per_writer {
                    document_sync::save_document(
                        store.as_ref(),
                        "roster-1",
                        json!({ "writer": writer, "save": save }),
                        &principal,
                    )
                    .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // Every save that was issued must be counted exactly once
    let loaded = document_sync::load_document(store.as_ref(), "roster-1")
        .unwrap()
        .unwrap();
    assert_eq!(loaded.version, (writers * saves_per_writer) as i64);
}

#[test]
fn test_incremental_updates_do_not_touch_version() {
    let store = test_store();
    seed_roster(store.as_ref(), "roster-1", "owner-1");

    let principal = Principal::User("owner-1".to_string());
    document_sync::save_document(store.as_ref(), "roster-1", json!({ "shifts": {} }), &principal)
        .unwrap();

    let update = IncomingUpdate {
        id: Some("client-update-1".to_string()),
        operation_type: Some(2),
        data: Some(json!({ "cell": "A1" })),
        timestamp: None,
    };
    let update_id =
        document_sync::append_update(store.as_ref(), "roster-1", update, &principal).unwrap();
    assert_eq!(update_id, "client-update-1", "client id is the idempotency key");

    let loaded = document_sync::load_document(store.as_ref(), "roster-1")
        .unwrap()
        .unwrap();
    assert_eq!(loaded.version, 1, "the update log never bumps the version");
}

#[test]
fn test_list_updates_since_is_strict_and_ascending() {
    let store = test_store();
    seed_roster(store.as_ref(), "roster-1", "owner-1");
    let principal = Principal::User("owner-1".to_string());

    let stamps = [
        "2023-12-31T23:59:59.000Z",
        "2024-01-01T00:00:00.000Z",
        "2024-01-02T08:30:00.000Z",
        "2024-01-03T12:00:00.000Z",
    ];
    for (index, stamp) in stamps.iter().enumerate() {
        let update = IncomingUpdate {
            id: Some(format!("update-{}", index)),
            operation_type: Some(1),
            data: Some(json!({ "index": index })),
            timestamp: Some(stamp.to_string()),
        };
        document_sync::append_update(store.as_ref(), "roster-1", update, &principal).unwrap();
    }

    let entries = document_sync::list_updates(
        store.as_ref(),
        "roster-1",
        Some("2024-01-01T00:00:00.000Z"),
    )
    .unwrap();
    let ids: Vec<&str> = entries.iter().map(|e| e.update_id.as_str()).collect();
    assert_eq!(
        ids,
        vec!["update-2", "update-3"],
        "entries at or before the cursor timestamp are skipped"
    );

    let entries =
        document_sync::list_updates(store.as_ref(), "roster-1", Some("2020-01-01T00:00:00.000Z"))
            .unwrap();
    assert_eq!(entries.len(), 4, "a cursor before all entries returns everything");

    // Ascending order by insertion
    let all = document_sync::list_updates(store.as_ref(), "roster-1", None).unwrap();
    let mut sorted = all.clone();
    sorted.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    assert_eq!(
        all.iter().map(|e| &e.update_id).collect::<Vec<_>>(),
        sorted.iter().map(|e| &e.update_id).collect::<Vec<_>>()
    );
}

#[test]
fn test_list_updates_caps_at_page_size() {
    let store = test_store();
    seed_roster(store.as_ref(), "roster-1", "owner-1");
    let principal = Principal::User("owner-1".to_string());

    for index in 0..60 {
        let update = IncomingUpdate {
            id: Some(format!("update-{:03}", index)),
            operation_type: Some(1),
            data: Some(json!({})),
            timestamp: Some(format!("2024-01-01T00:00:{:02}.000Z", index % 60)),
        };
        document_sync::append_update(store.as_ref(), "roster-1", update, &principal).unwrap();
    }

    let entries = document_sync::list_updates(store.as_ref(), "roster-1", None).unwrap();
    assert_eq!(entries.len(), document_sync::UPDATES_PAGE_SIZE);
}

#[test]
fn test_cascade_delete_leaves_no_residual_rows() {
    let store = test_store();
    seed_roster(store.as_ref(), "roster-1", "owner-1");
    seed_roster(store.as_ref(), "roster-2", "owner-2");
    seed_member(store.as_ref(), "roster-1", "member-1", Role::Member);

    let principal = Principal::User("owner-1".to_string());
    document_sync::save_document(store.as_ref(), "roster-1", json!({ "shifts": {} }), &principal)
        .unwrap();
    document_sync::append_update(
        store.as_ref(),
        "roster-1",
        IncomingUpdate::default(),
        &principal,
    )
    .unwrap();

    // Share codes for both rosters; only roster-1's may disappear
    let doomed = match share_token::create_share_code(
        store.as_ref(),
        "roster-1",
        ShareRole::Viewer,
        None,
        None,
        Some("DMED23XY"),
        "owner-1",
    )
    .unwrap()
    {
        crate::models::CreateCodeOutcome::Created(share) => share,
        other => panic!("unexpected outcome: {:?}", other),
    };
    let survivor = match share_token::create_share_code(
        store.as_ref(),
        "roster-2",
        ShareRole::Viewer,
        None,
        None,
        Some("KEEPER23"),
        "owner-2",
    )
    .unwrap()
    {
        crate::models::CreateCodeOutcome::Created(share) => share,
        other => panic!("unexpected outcome: {:?}", other),
    };

    document_sync::delete_roster(store.as_ref(), "roster-1").unwrap();

    // Every roster-scoped table must scan empty for the deleted roster
    for table in [
        Table::RosterMembers,
        Table::RosterData,
        Table::RosterUpdates,
        Table::AvailabilityRequests,
        Table::SwapRequests,
        Table::ShiftLocks,
        Table::ChangeProposals,
        Table::AuditLogs,
        Table::Presence,
        Table::TimeClock,
        Table::AiFeedback,
    ] {
        let rows = store
            .query(table, "roster-1", ScanDirection::Ascending, None)
            .unwrap();
        assert!(rows.is_empty(), "{:?} still has rows after cascade", table);
    }
    assert!(store
        .get(Table::Rosters, &ItemKey::hash_only("roster-1"))
        .unwrap()
        .is_none());
    assert!(
        share_token::load_share_code(store.as_ref(), &doomed.code)
            .unwrap()
            .is_none(),
        "share codes of the deleted roster must be scanned out"
    );
    assert!(
        share_token::load_share_code(store.as_ref(), &survivor.code)
            .unwrap()
            .is_some(),
        "other rosters' share codes must survive"
    );

    // Re-running the cascade is safe
    document_sync::delete_roster(store.as_ref(), "roster-1").unwrap();
}

#[test]
fn test_export_snapshot_shape() {
    let store = test_store();
    seed_roster(store.as_ref(), "roster-1", "owner-1");
    let principal = Principal::User("owner-1".to_string());
    document_sync::save_document(store.as_ref(), "roster-1", json!({ "shifts": {} }), &principal)
        .unwrap();

    let snapshot = document_sync::export_snapshot(store.as_ref(), "roster-1")
        .unwrap()
        .expect("saved roster should export");
    assert_eq!(snapshot.version, 1);
    assert_eq!(snapshot.data, json!({ "shifts": {} }));
    assert_eq!(snapshot.roster["name"], "Test Roster");
    assert!(
        snapshot.roster.get("password_hash").is_none(),
        "export must not leak the password hash"
    );

    let missing = document_sync::export_snapshot(store.as_ref(), "roster-9").unwrap();
    assert!(missing.is_none());
}
