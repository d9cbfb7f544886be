// roster-service/src/utils/store.rs
//
// Key-value store adapter. Every table is addressed by a partition key and
// an optional sort key; range queries come back ordered by the sort key.
// Cross-request coordination relies entirely on the atomic update
// primitives here - callers never implement increment as read-then-write.
use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex};

// The store accepts at most this many keys per batch delete call
pub const MAX_BATCH_DELETE: usize = 25;

// Page size for unindexed scans
pub const SCAN_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Rosters,
    RosterMembers,
    RosterData,
    RosterUpdates,
    Orgs,
    OrgMembers,
    Teams,
    TeamMembers,
    AvailabilityRequests,
    SwapRequests,
    ShiftLocks,
    ChangeProposals,
    AuditLogs,
    ShareCodes,
    Presence,
    TimeClock,
    AiFeedback,
    UserProfiles,
}

// Composite key. Tables keyed by a single hash key leave the sort key empty.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemKey {
    pub partition: String,
    pub sort: String,
}

impl ItemKey {
    pub fn new(partition: impl Into<String>, sort: impl Into<String>) -> Self {
        Self {
            partition: partition.into(),
            sort: sort.into(),
        }
    }

    pub fn hash_only(partition: impl Into<String>) -> Self {
        Self {
            partition: partition.into(),
            sort: String::new(),
        }
    }
}

pub type Item = serde_json::Map<String, Value>;

#[derive(Debug)]
pub enum StoreError {
    LockPoisoned,
    Serialization(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StoreError::LockPoisoned => write!(f, "store lock poisoned"),
            StoreError::Serialization(msg) => write!(f, "serialization error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanDirection {
    Ascending,
    Descending,
}

// Semantics every component above assumes: point get/put/delete, atomic
// (conditional) update, partition query ordered by sort key, paginated
// scan, and batch delete capped at MAX_BATCH_DELETE keys per call.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, table: Table, key: &ItemKey) -> StoreResult<Option<Item>>;

    fn put(&self, table: Table, key: ItemKey, item: Item) -> StoreResult<()>;

    // Conditional create; returns false (and writes nothing) if the key exists
    fn put_if_absent(&self, table: Table, key: ItemKey, item: Item) -> StoreResult<bool>;

    // Atomic upsert-update. The closure sees the current item (empty map for
    // a fresh row) and mutates it in place; the new image is returned.
    fn update(
        &self,
        table: Table,
        key: &ItemKey,
        apply: &mut dyn FnMut(&mut Item),
    ) -> StoreResult<Item>;

    // Atomic conditional update. The condition is evaluated against the
    // current item under the same critical section as the mutation; a
    // failed condition returns None and writes nothing.
    fn conditional_update(
        &self,
        table: Table,
        key: &ItemKey,
        condition: &dyn Fn(Option<&Item>) -> bool,
        apply: &mut dyn FnMut(&mut Item),
    ) -> StoreResult<Option<Item>>;

    fn delete(&self, table: Table, key: &ItemKey) -> StoreResult<()>;

    // All items in one partition, ordered by sort key
    fn query(
        &self,
        table: Table,
        partition: &str,
        direction: ScanDirection,
        limit: Option<usize>,
    ) -> StoreResult<Vec<Item>>;

    // Secondary lookup by a non-key attribute (the userId-index analog)
    fn query_by_attribute(
        &self,
        table: Table,
        attribute: &str,
        value: &str,
    ) -> StoreResult<Vec<Item>>;

    // One page of an unindexed scan; the returned key resumes the next page
    fn scan_page(
        &self,
        table: Table,
        start_after: Option<&ItemKey>,
        limit: usize,
    ) -> StoreResult<(Vec<(ItemKey, Item)>, Option<ItemKey>)>;

    fn batch_delete(&self, table: Table, keys: &[ItemKey]) -> StoreResult<()>;

    // Bulk insert, chunked like batch_delete
    fn batch_put(&self, table: Table, items: Vec<(ItemKey, Item)>) -> StoreResult<()>;
}

pub type SharedStore = Arc<dyn KeyValueStore>;

// Serialize a model into a store item
pub fn to_item<T: Serialize>(value: &T) -> StoreResult<Item> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(StoreError::Serialization(format!(
            "expected a JSON object, got {}",
            other
        ))),
        Err(e) => Err(StoreError::Serialization(e.to_string())),
    }
}

// Deserialize a store item back into a model
pub fn from_item<T: DeserializeOwned>(item: Item) -> StoreResult<T> {
    serde_json::from_value(Value::Object(item)).map_err(|e| StoreError::Serialization(e.to_string()))
}

// In-memory store. One mutex guards all tables, so update and
// conditional_update are atomic with respect to every other call - the
// same guarantee a conditional-write backend provides per item.
pub struct MemoryStore {
    tables: Mutex<HashMap<Table, BTreeMap<ItemKey, Item>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(HashMap::new()),
        }
    }

    pub fn shared() -> SharedStore {
        Arc::new(MemoryStore::new())
    }

    fn lock(&self) -> StoreResult<std::sync::MutexGuard<'_, HashMap<Table, BTreeMap<ItemKey, Item>>>> {
        self.tables.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, table: Table, key: &ItemKey) -> StoreResult<Option<Item>> {
        let tables = self.lock()?;
        Ok(tables.get(&table).and_then(|rows| rows.get(key)).cloned())
    }

    fn put(&self, table: Table, key: ItemKey, item: Item) -> StoreResult<()> {
        let mut tables = self.lock()?;
        tables.entry(table).or_default().insert(key, item);
        Ok(())
    }

    fn put_if_absent(&self, table: Table, key: ItemKey, item: Item) -> StoreResult<bool> {
        let mut tables = self.lock()?;
        let rows = tables.entry(table).or_default();
        if rows.contains_key(&key) {
            return Ok(false);
        }
        rows.insert(key, item);
        Ok(true)
    }

    fn update(
        &self,
        table: Table,
        key: &ItemKey,
        apply: &mut dyn FnMut(&mut Item),
    ) -> StoreResult<Item> {
        let mut tables = self.lock()?;
        let rows = tables.entry(table).or_default();
        let item = rows.entry(key.clone()).or_insert_with(Item::new);
        apply(item);
        Ok(item.clone())
    }

    fn conditional_update(
        &self,
        table: Table,
        key: &ItemKey,
        condition: &dyn Fn(Option<&Item>) -> bool,
        apply: &mut dyn FnMut(&mut Item),
    ) -> StoreResult<Option<Item>> {
        let mut tables = self.lock()?;
        let rows = tables.entry(table).or_default();
        if !condition(rows.get(key)) {
            debug!("conditional update refused for {:?}/{:?}", table, key);
            return Ok(None);
        }
        let item = rows.entry(key.clone()).or_insert_with(Item::new);
        apply(item);
        Ok(Some(item.clone()))
    }

    fn delete(&self, table: Table, key: &ItemKey) -> StoreResult<()> {
        let mut tables = self.lock()?;
        if let Some(rows) = tables.get_mut(&table) {
            rows.remove(key);
        }
        Ok(())
    }

    fn query(
        &self,
        table: Table,
        partition: &str,
        direction: ScanDirection,
        limit: Option<usize>,
    ) -> StoreResult<Vec<Item>> {
        let tables = self.lock()?;
        let rows = match tables.get(&table) {
            Some(rows) => rows,
            None => return Ok(Vec::new()),
        };
        let start = ItemKey::hash_only(partition);
        let mut items: Vec<Item> = rows
            .range(start..)
            .take_while(|(k, _)| k.partition == partition)
            .map(|(_, item)| item.clone())
            .collect();
        if direction == ScanDirection::Descending {
            items.reverse();
        }
        if let Some(limit) = limit {
            items.truncate(limit);
        }
        Ok(items)
    }

    fn query_by_attribute(
        &self,
        table: Table,
        attribute: &str,
        value: &str,
    ) -> StoreResult<Vec<Item>> {
        let tables = self.lock()?;
        let rows = match tables.get(&table) {
            Some(rows) => rows,
            None => return Ok(Vec::new()),
        };
        Ok(rows
            .values()
            .filter(|item| item.get(attribute).and_then(Value::as_str) == Some(value))
            .cloned()
            .collect())
    }

    fn scan_page(
        &self,
        table: Table,
        start_after: Option<&ItemKey>,
        limit: usize,
    ) -> StoreResult<(Vec<(ItemKey, Item)>, Option<ItemKey>)> {
        let tables = self.lock()?;
        let rows = match tables.get(&table) {
            Some(rows) => rows,
            None => return Ok((Vec::new(), None)),
        };
        let mut page: Vec<(ItemKey, Item)> = Vec::with_capacity(limit);
        let mut more = false;
        for (key, item) in rows.iter() {
            if let Some(after) = start_after {
                if key <= after {
                    continue;
                }
            }
            if page.len() == limit {
                more = true;
                break;
            }
            page.push((key.clone(), item.clone()));
        }
        let cursor = if more {
            page.last().map(|(key, _)| key.clone())
        } else {
            None
        };
        Ok((page, cursor))
    }

    fn batch_delete(&self, table: Table, keys: &[ItemKey]) -> StoreResult<()> {
        // Chunked like the real backend: no more than 25 keys per write call
        for chunk in keys.chunks(MAX_BATCH_DELETE) {
            let mut tables = self.lock()?;
            if let Some(rows) = tables.get_mut(&table) {
                for key in chunk {
                    rows.remove(key);
                }
            }
        }
        Ok(())
    }

    fn batch_put(&self, table: Table, items: Vec<(ItemKey, Item)>) -> StoreResult<()> {
        for chunk in items.chunks(MAX_BATCH_DELETE) {
            let mut tables = self.lock()?;
            let rows = tables.entry(table).or_default();
            for (key, item) in chunk {
                rows.insert(key.clone(), item.clone());
            }
        }
        Ok(())
    }
}
