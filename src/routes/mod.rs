// roster-service/src/routes/mod.rs
pub mod account_routes;
pub mod activity_routes;
pub mod audit_routes;
pub mod document_routes;
pub mod org_routes;
pub mod request_routes;
pub mod roster_routes;
pub mod share_routes;

use crate::models::ServiceError;
use crate::utils::store::{from_item, to_item, ItemKey, KeyValueStore, ScanDirection, Table};
use log::error;
use serde::de::DeserializeOwned;
use serde::Serialize;

// Shared store plumbing for the route handlers

pub(crate) fn put_record<T: Serialize>(
    store: &dyn KeyValueStore,
    table: Table,
    key: ItemKey,
    record: &T,
) -> Result<(), ServiceError> {
    let item = to_item(record).map_err(|e| {
        error!("Failed to serialize record for {:?}: {}", table, e);
        ServiceError::InternalServerError
    })?;
    store.put(table, key, item).map_err(|e| {
        error!("Failed to write record to {:?}: {}", table, e);
        ServiceError::InternalServerError
    })
}

pub(crate) fn get_record<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    table: Table,
    key: &ItemKey,
) -> Result<Option<T>, ServiceError> {
    let item = store.get(table, key).map_err(|e| {
        error!("Failed to read record from {:?}: {}", table, e);
        ServiceError::InternalServerError
    })?;
    match item {
        Some(item) => {
            let record = from_item(item).map_err(|e| {
                error!("Failed to parse record from {:?}: {}", table, e);
                ServiceError::InternalServerError
            })?;
            Ok(Some(record))
        }
        None => Ok(None),
    }
}

pub(crate) fn query_records<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    table: Table,
    partition: &str,
    direction: ScanDirection,
    limit: Option<usize>,
) -> Result<Vec<T>, ServiceError> {
    let items = store.query(table, partition, direction, limit).map_err(|e| {
        error!("Failed to query {:?}: {}", table, e);
        ServiceError::InternalServerError
    })?;
    items
        .into_iter()
        .map(|item| {
            from_item(item).map_err(|e| {
                error!("Failed to parse record from {:?}: {}", table, e);
                ServiceError::InternalServerError
            })
        })
        .collect()
}
