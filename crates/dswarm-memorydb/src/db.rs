//! Nested triple table
//!
//! `(resource, configuration) → subject → predicate → object`
//!
//! ## Thread Safety
//!
//! All tables sit behind one `parking_lot::Mutex`. Every public method takes
//! the lock exactly once and never calls another public method while holding
//! it, so operations are linearizable and cannot deadlock. Readers get owned
//! snapshots: a table is seen either whole or not at all.

use dswarm_core::Persisted;
use indexmap::{IndexMap, IndexSet};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Composite key of one inner table
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StoreKey {
    pub resource: String,
    pub configuration: String,
}

impl StoreKey {
    pub fn new(resource: impl Into<String>, configuration: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            configuration: configuration.into(),
        }
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.resource, self.configuration)
    }
}

/// Predicate → object cells of one subject
pub type Row = IndexMap<String, String>;

/// Subject → row, in first-insertion order
pub type Table = IndexMap<String, Row>;

#[derive(Debug, Default)]
pub struct MemoryDb {
    tables: Mutex<HashMap<StoreKey, Table>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set one cell, creating the table on first use
    ///
    /// Returns `Created(None)` if this call created the table, otherwise
    /// `Existing` with the cell's previous object.
    pub fn put(
        &self,
        resource: &str,
        configuration: &str,
        subject: &str,
        predicate: &str,
        object: &str,
    ) -> Persisted<Option<String>> {
        let key = StoreKey::new(resource, configuration);
        let mut tables = self.tables.lock();
        let created = !tables.contains_key(&key);
        let previous = tables
            .entry(key)
            .or_default()
            .entry(subject.to_string())
            .or_default()
            .insert(predicate.to_string(), object.to_string());

        if created {
            Persisted::Created(None)
        } else {
            Persisted::Existing(previous)
        }
    }

    /// Set many cells under one lock
    ///
    /// Readers see either none or all of `cells`. Returns the number of
    /// cells written, as `Created` if this call created the table.
    pub fn put_all<'a>(
        &self,
        resource: &str,
        configuration: &str,
        cells: impl IntoIterator<Item = (&'a str, &'a str, &'a str)>,
    ) -> Persisted<usize> {
        let key = StoreKey::new(resource, configuration);
        let mut tables = self.tables.lock();
        let created = !tables.contains_key(&key);
        let table = tables.entry(key).or_default();

        let mut written = 0;
        for (subject, predicate, object) in cells {
            table
                .entry(subject.to_string())
                .or_default()
                .insert(predicate.to_string(), object.to_string());
            written += 1;
        }

        if created {
            Persisted::Created(written)
        } else {
            Persisted::Existing(written)
        }
    }

    /// Snapshot of every table under `resource`, keyed by configuration
    pub fn get_resource(&self, resource: &str) -> BTreeMap<String, Table> {
        self.tables
            .lock()
            .iter()
            .filter(|(key, _)| key.resource == resource)
            .map(|(key, table)| (key.configuration.clone(), table.clone()))
            .collect()
    }

    /// Snapshot of one table; empty if it was never populated
    pub fn get(&self, resource: &str, configuration: &str) -> Table {
        self.tables
            .lock()
            .get(&StoreKey::new(resource, configuration))
            .cloned()
            .unwrap_or_default()
    }

    /// Distinct predicates of one table, in first-seen order
    pub fn schema(&self, resource: &str, configuration: &str) -> IndexSet<String> {
        self.tables
            .lock()
            .get(&StoreKey::new(resource, configuration))
            .map(|table| table.values().flat_map(|row| row.keys().cloned()).collect())
            .unwrap_or_default()
    }

    /// Remove a whole table; returns whether it existed
    pub fn delete(&self, resource: &str, configuration: &str) -> bool {
        self.tables
            .lock()
            .remove(&StoreKey::new(resource, configuration))
            .is_some()
    }

    pub fn cell(
        &self,
        resource: &str,
        configuration: &str,
        subject: &str,
        predicate: &str,
    ) -> Persisted<String> {
        let tables = self.tables.lock();
        match tables
            .get(&StoreKey::new(resource, configuration))
            .and_then(|table| table.get(subject))
            .and_then(|row| row.get(predicate))
        {
            Some(object) => Persisted::Existing(object.clone()),
            None => Persisted::NotFound,
        }
    }

    /// The first `at_most` rows of one table
    pub fn rows(&self, resource: &str, configuration: &str, at_most: usize) -> Vec<(String, Row)> {
        self.tables
            .lock()
            .get(&StoreKey::new(resource, configuration))
            .map(|table| {
                table
                    .iter()
                    .take(at_most)
                    .map(|(subject, row)| (subject.clone(), row.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Keys of all stored tables, sorted
    pub fn resources(&self) -> Vec<StoreKey> {
        let mut keys: Vec<StoreKey> = self.tables.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Number of stored tables
    pub fn len(&self) -> usize {
        self.tables.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
