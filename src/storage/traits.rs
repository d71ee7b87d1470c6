//! Storage trait for id-keyed records.

use crate::error::Result;
use serde::{de::DeserializeOwned, Serialize};

/// Trait for records that have an ID field.
pub trait HasId {
    /// Get the record's unique identifier.
    fn id(&self) -> &str;
}

/// Snapshot storage: records are written whole and replaced by id.
pub trait Storage: Send + Sync {
    /// Get a record by ID.
    fn get<T: DeserializeOwned>(&self, collection: &str, id: &str) -> Result<Option<T>>;

    /// Create the record, or replace the one with the same ID.
    fn upsert<T: Serialize + HasId>(&self, collection: &str, record: &T) -> Result<()>;

    /// List all records in a collection, in insertion order.
    fn list<T: DeserializeOwned>(&self, collection: &str) -> Result<Vec<T>>;
}
