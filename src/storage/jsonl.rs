//! JSONL-based storage with an in-memory cache.
//!
//! One `<collection>.jsonl` file per collection, one JSON record per line.
//! All writes go through the cache's write guard, so concurrent writers in
//! one process are serialized from cache update to file rename.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Serialize, de::DeserializeOwned};

use super::traits::{HasId, Storage};
use crate::error::{AeroforgeError, Result};

type Collections = HashMap<String, Vec<serde_json::Value>>;

/// JSONL-based storage with in-memory caching.
pub struct JsonlStorage {
    base_path: PathBuf,
    cache: RwLock<Collections>,
}

fn record_id(record: &serde_json::Value) -> Option<&str> {
    record.get("id").and_then(|v| v.as_str())
}

impl JsonlStorage {
    /// Create a new JsonlStorage at the given path.
    pub fn new(base_path: impl AsRef<Path>) -> Result<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;
        Ok(Self {
            base_path,
            cache: RwLock::new(HashMap::new()),
        })
    }

    /// Get the file path for a collection.
    fn collection_path(&self, collection: &str) -> PathBuf {
        self.base_path.join(format!("{}.jsonl", collection))
    }

    fn read_collection(&self, collection: &str) -> Result<Vec<serde_json::Value>> {
        let path = self.collection_path(collection);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(File::open(&path)?);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if !line.trim().is_empty() {
                records.push(serde_json::from_str(&line)?);
            }
        }
        Ok(records)
    }

    /// Load a collection into cache if not already loaded.
    fn ensure_loaded(&self, collection: &str) -> Result<()> {
        {
            let cache = self.cache.read().map_err(|e| AeroforgeError::Storage(e.to_string()))?;
            if cache.contains_key(collection) {
                return Ok(());
            }
        }

        let mut cache = self.cache.write().map_err(|e| AeroforgeError::Storage(e.to_string()))?;
        if !cache.contains_key(collection) {
            let records = self.read_collection(collection)?;
            cache.insert(collection.to_string(), records);
        }
        Ok(())
    }

    /// Append a record to the JSONL file.
    fn append_to_file(&self, collection: &str, record: &serde_json::Value) -> Result<()> {
        let path = self.collection_path(collection);
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(file, "{}", serde_json::to_string(record)?)?;
        Ok(())
    }

    /// Rewrite the entire collection file. Callers hold the cache write guard.
    fn rewrite_file(&self, collection: &str, records: &[serde_json::Value]) -> Result<()> {
        // Readers in other processes must never see a half-written file
        let path = self.collection_path(collection);
        let tmp = path.with_extension("jsonl.tmp");
        {
            let mut file = File::create(&tmp)?;
            for record in records {
                writeln!(file, "{}", serde_json::to_string(record)?)?;
            }
            file.flush()?;
        }
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

impl Storage for JsonlStorage {
    fn get<T: DeserializeOwned>(&self, collection: &str, id: &str) -> Result<Option<T>> {
        self.ensure_loaded(collection)?;

        let cache = self.cache.read().map_err(|e| AeroforgeError::Storage(e.to_string()))?;
        let found = cache
            .get(collection)
            .and_then(|records| records.iter().find(|r| record_id(r) == Some(id)));

        match found {
            Some(record) => Ok(Some(serde_json::from_value(record.clone())?)),
            None => Ok(None),
        }
    }

    fn upsert<T: Serialize + HasId>(&self, collection: &str, record: &T) -> Result<()> {
        self.ensure_loaded(collection)?;
        let value = serde_json::to_value(record)?;

        let mut cache = self.cache.write().map_err(|e| AeroforgeError::Storage(e.to_string()))?;
        let records = cache.entry(collection.to_string()).or_default();

        match records.iter().position(|r| record_id(r) == Some(record.id())) {
            Some(index) => {
                let previous = std::mem::replace(&mut records[index], value);
                if let Err(e) = self.rewrite_file(collection, records) {
                    records[index] = previous;
                    return Err(e);
                }
            }
            None => {
                // File first, it is the source of truth
                self.append_to_file(collection, &value)?;
                records.push(value);
            }
        }
        Ok(())
    }

    fn list<T: DeserializeOwned>(&self, collection: &str) -> Result<Vec<T>> {
        self.ensure_loaded(collection)?;

        let cache = self.cache.read().map_err(|e| AeroforgeError::Storage(e.to_string()))?;
        let mut results = Vec::new();
        for record in cache.get(collection).into_iter().flatten() {
            results.push(serde_json::from_value(record.clone())?);
        }
        Ok(results)
    }
}
