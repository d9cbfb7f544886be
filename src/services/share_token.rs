// roster-service/src/services/share_token.rs
//
// Mints and redeems share codes. Redemption is the one place the whole
// system depends on the store's conditional write: under N simultaneous
// redemptions of a code with max_uses = k, exactly k succeed and the rest
// observe a refused condition, which maps to Exhausted.
use crate::models::{
    CreateCodeOutcome, Principal, Role, RosterMember, ServiceError, ShareCode, ShareCodeState,
    ShareRole,
};
use crate::utils::store::{from_item, to_item, ItemKey, KeyValueStore, Table};
use crate::utils::time;
use chrono::{Duration, SecondsFormat, Utc};
use lazy_static::lazy_static;
use log::error;
use rand::Rng;
use regex::Regex;
use serde_json::{json, Value};
use std::collections::HashSet;

// Reduced alphabet: A-Z without I and O, digits 2-9. The ambiguous
// characters 0, 1, I, O never appear in a stored code.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

const GENERATED_CODE_LENGTH: usize = 8;
const GENERATION_ATTEMPTS: usize = 6;
const SUGGESTION_COUNT: usize = 3;
const SUGGESTION_PREFIX_LENGTH: usize = 4;

lazy_static! {
    // Custom codes must use the same alphabet the generator draws from
    static ref CUSTOM_CODE_RE: Regex = Regex::new(r"^[A-HJ-NP-Z2-9]{6,12}$").unwrap();
}

// Draw a random code from the reduced alphabet
pub fn generate_code(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

// Uppercase, strip everything outside A-Z0-9, then require the reduced
// alphabet. A code containing 0, 1, I or O fails here.
pub fn normalize_custom_code(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .to_uppercase()
        .chars()
        .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        .collect();
    if CUSTOM_CODE_RE.is_match(&cleaned) {
        Some(cleaned)
    } else {
        None
    }
}

// Alternatives offered when a custom code is taken: the first four valid
// characters of the request plus four random ones.
pub fn suggest_codes(base: &str) -> Vec<String> {
    let prefix: String = base
        .chars()
        .filter(|c| CODE_ALPHABET.contains(&(*c as u8)))
        .take(SUGGESTION_PREFIX_LENGTH)
        .collect();
    let mut suggestions = HashSet::new();
    while suggestions.len() < SUGGESTION_COUNT {
        suggestions.insert(format!("{}{}", prefix, generate_code(SUGGESTION_PREFIX_LENGTH)));
    }
    suggestions.into_iter().collect()
}

// Pure validation - never touches the use counter
pub fn validate(share: Option<&ShareCode>) -> ShareCodeState {
    let share = match share {
        Some(share) => share,
        None => return ShareCodeState::NotFound,
    };
    if share.is_expired() {
        return ShareCodeState::Expired;
    }
    if share.is_exhausted() {
        return ShareCodeState::Exhausted;
    }
    ShareCodeState::Valid
}

// Look up a code. Codes are case-insensitive and stored uppercase.
pub fn load_share_code(
    store: &dyn KeyValueStore,
    code: &str,
) -> Result<Option<ShareCode>, ServiceError> {
    let code = code.trim().to_uppercase();
    if code.is_empty() {
        return Ok(None);
    }
    let item = store
        .get(Table::ShareCodes, &ItemKey::hash_only(&code))
        .map_err(|e| {
            error!("Failed to load share code: {}", e);
            ServiceError::InternalServerError
        })?;
    match item {
        Some(item) => {
            let share: ShareCode = from_item(item).map_err(|e| {
                error!("Failed to parse share code record: {}", e);
                ServiceError::InternalServerError
            })?;
            Ok(Some(share))
        }
        None => Ok(None),
    }
}

// Mint a code. Custom codes are claimed with a conditional create so two
// concurrent requests for the same code cannot both win.
pub fn create_share_code(
    store: &dyn KeyValueStore,
    roster_id: &str,
    role: ShareRole,
    expires_in_hours: Option<i64>,
    max_uses: Option<i64>,
    custom_code: Option<&str>,
    created_by: &str,
) -> Result<CreateCodeOutcome, ServiceError> {
    let now = time::now_iso();
    let expires_at = expires_in_hours
        .map(|hours| (Utc::now() + Duration::hours(hours)).to_rfc3339_opts(SecondsFormat::Millis, true));

    if let Some(raw) = custom_code {
        let code = match normalize_custom_code(raw) {
            Some(code) => code,
            None => return Ok(CreateCodeOutcome::InvalidFormat),
        };
        let share = build_share_code(&code, roster_id, role, created_by, &now, expires_at, max_uses);
        if claim_code(store, &share)? {
            return Ok(CreateCodeOutcome::Created(share));
        }
        return Ok(CreateCodeOutcome::Taken {
            suggestions: suggest_codes(&code),
        });
    }

    // Random generation, bounded retry. At 32^8 codes, exhausting the
    // attempts means something is very wrong.
    for _ in 0..GENERATION_ATTEMPTS {
        let code = generate_code(GENERATED_CODE_LENGTH);
        let share = build_share_code(&code, roster_id, role, created_by, &now, expires_at.clone(), max_uses);
        if claim_code(store, &share)? {
            return Ok(CreateCodeOutcome::Created(share));
        }
    }
    Ok(CreateCodeOutcome::AttemptsExhausted)
}

// Atomically consume one use. The condition - uses absent or below the
// quota - is evaluated by the store in the same critical section as the
// increment, so there is no read-modify-write window. A refused condition
// means the code is spent.
pub fn redeem(store: &dyn KeyValueStore, share: &ShareCode) -> Result<bool, ServiceError> {
    let key = ItemKey::hash_only(&share.code);
    let max_uses = share.max_uses;
    let updated = store
        .conditional_update(
            Table::ShareCodes,
            &key,
            &|item| match item {
                None => false,
                Some(item) => match max_uses {
                    None => true,
                    Some(max) => item
                        .get("uses")
                        .and_then(Value::as_i64)
                        .map_or(true, |uses| uses < max),
                },
            },
            &mut |item| {
                let uses = item.get("uses").and_then(Value::as_i64).unwrap_or(0);
                item.insert("uses".to_string(), json!(uses + 1));
            },
        )
        .map_err(|e| {
            error!("Failed to redeem share code: {}", e);
            ServiceError::InternalServerError
        })?;
    Ok(updated.is_some())
}

// Editor codes upgrade an authenticated redeemer to a real membership, so
// later calls go through the normal authorization path. Idempotent.
pub fn elevate_guest(
    store: &dyn KeyValueStore,
    share: &ShareCode,
    principal: &Principal,
) -> Result<(), ServiceError> {
    if share.role != ShareRole::Editor {
        return Ok(());
    }
    let user_id = match principal.user_id() {
        Some(user_id) => user_id,
        // Anonymous redeemers never become members
        None => return Ok(()),
    };

    let member = RosterMember {
        roster_id: share.roster_id.clone(),
        user_id: user_id.to_string(),
        role: Role::Editor,
        joined_at: time::now_iso(),
    };
    let item = to_item(&member).map_err(|e| {
        error!("Failed to serialize membership: {}", e);
        ServiceError::InternalServerError
    })?;
    store
        .put_if_absent(
            Table::RosterMembers,
            ItemKey::new(&share.roster_id, user_id),
            item,
        )
        .map_err(|e| {
            error!("Failed to upsert guest membership: {}", e);
            ServiceError::InternalServerError
        })?;
    Ok(())
}

fn build_share_code(
    code: &str,
    roster_id: &str,
    role: ShareRole,
    created_by: &str,
    now: &str,
    expires_at: Option<String>,
    max_uses: Option<i64>,
) -> ShareCode {
    ShareCode {
        code: code.to_string(),
        roster_id: roster_id.to_string(),
        role,
        created_by: created_by.to_string(),
        created_at: now.to_string(),
        expires_at,
        max_uses,
        uses: 0,
    }
}

// Conditional create keyed by the code itself
fn claim_code(store: &dyn KeyValueStore, share: &ShareCode) -> Result<bool, ServiceError> {
    let item = to_item(share).map_err(|e| {
        error!("Failed to serialize share code: {}", e);
        ServiceError::InternalServerError
    })?;
    store
        .put_if_absent(Table::ShareCodes, ItemKey::hash_only(&share.code), item)
        .map_err(|e| {
            error!("Failed to store share code: {}", e);
            ServiceError::InternalServerError
        })
}
