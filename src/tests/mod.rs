// roster-service/src/tests/mod.rs
mod auth_tests;
mod service_tests;
mod share_tests;
mod sync_tests;

use crate::models::{Role, Roster, RosterMember};
use crate::routes::put_record;
use crate::utils::store::{ItemKey, KeyValueStore, MemoryStore, SharedStore, Table};
use crate::utils::time;

// Fresh empty store for one test
pub(crate) fn test_store() -> SharedStore {
    MemoryStore::shared()
}

// Seed a roster with its owner membership
pub(crate) fn seed_roster(store: &dyn KeyValueStore, roster_id: &str, owner_id: &str) {
    let now = time::now_iso();
    let roster = Roster {
        roster_id: roster_id.to_string(),
        name: "Test Roster".to_string(),
        owner_id: owner_id.to_string(),
        org_id: None,
        password_hash: None,
        created_at: now.clone(),
        updated_at: now,
    };
    put_record(store, Table::Rosters, ItemKey::hash_only(roster_id), &roster).unwrap();
    seed_member(store, roster_id, owner_id, Role::Owner);
}

// Seed a single membership row
pub(crate) fn seed_member(store: &dyn KeyValueStore, roster_id: &str, user_id: &str, role: Role) {
    let member = RosterMember {
        roster_id: roster_id.to_string(),
        user_id: user_id.to_string(),
        role,
        joined_at: time::now_iso(),
    };
    put_record(
        store,
        Table::RosterMembers,
        ItemKey::new(roster_id, user_id),
        &member,
    )
    .unwrap();
}
