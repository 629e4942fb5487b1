//! Reference-table lookups used by the tag validator.
//!
//! The validator only ever needs three point queries, expressed by the
//! [`SubtagStore`] trait. [`MemoryStore`] keeps everything in hash maps;
//! the SQLite implementation lives in [`crate::db`].

use crate::registry::{RecordType, RegistryData, ScriptRange};
use std::collections::HashMap;
use thiserror::Error;

/// Scope value marking language records that denote a collection of languages.
pub const COLLECTION_SCOPE: &str = "collection";

/// Failure of the underlying reference-table storage.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("reference table query failed: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Registry entry returned by a subtag lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtagRecord {
    /// Subtag (or full tag, for grandfathered entries) as spelled in the registry
    pub subtag: String,

    /// First registry description, empty if the entry has none
    pub description: String,
}

/// Read-only access to the subtag reference tables.
pub trait SubtagStore {
    /// IANA equivalent of a legacy ISO 639-2 code, if one is mapped.
    fn iso639_2_alias(&self, code: &str) -> Result<Option<String>, StoreError>;

    /// Look up a registry entry by type and exact value.
    ///
    /// `RecordType::Language` lookups never return entries scoped as a
    /// collection. `RecordType::Grandfathered` lookups match the entry's full
    /// tag rather than a subtag.
    fn find_subtag(
        &self,
        record_type: RecordType,
        value: &str,
    ) -> Result<Option<SubtagRecord>, StoreError>;

    /// Script subtag whose Unicode range contains the code point.
    fn script_for_code_point(&self, code_point: u32) -> Result<Option<String>, StoreError>;
}

impl<S: SubtagStore + ?Sized> SubtagStore for &S {
    fn iso639_2_alias(&self, code: &str) -> Result<Option<String>, StoreError> {
        (**self).iso639_2_alias(code)
    }

    fn find_subtag(
        &self,
        record_type: RecordType,
        value: &str,
    ) -> Result<Option<SubtagRecord>, StoreError> {
        (**self).find_subtag(record_type, value)
    }

    fn script_for_code_point(&self, code_point: u32) -> Result<Option<String>, StoreError> {
        (**self).script_for_code_point(code_point)
    }
}

#[derive(Debug, Clone)]
struct MemoryEntry {
    record: SubtagRecord,
    scope: Option<String>,
}

/// In-memory subtag store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<(RecordType, String), MemoryEntry>,
    aliases: HashMap<String, String>,
    // Sorted by `from`, non-overlapping
    script_ranges: Vec<ScriptRange>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store holding everything parsed from the upstream sources.
    pub fn from_registry(data: &RegistryData) -> Self {
        let mut store = Self::new();

        for record in &data.records {
            if let Some(key) = record.key() {
                store.insert_subtag(
                    record.record_type,
                    key,
                    record.description.as_deref().unwrap_or_default(),
                    record.scope.as_deref(),
                );
            }
        }
        for alias in &data.iso_aliases {
            store.insert_alias(&alias.iso, &alias.iana);
        }
        for range in &data.script_ranges {
            store.insert_script_range(range.clone());
        }

        store
    }

    /// Add a registry entry. The first entry for a given type and value wins.
    pub fn insert_subtag(
        &mut self,
        record_type: RecordType,
        subtag: &str,
        description: &str,
        scope: Option<&str>,
    ) -> &mut Self {
        self.entries
            .entry((record_type, subtag.to_string()))
            .or_insert_with(|| MemoryEntry {
                record: SubtagRecord {
                    subtag: subtag.to_string(),
                    description: description.to_string(),
                },
                scope: scope.map(str::to_string),
            });
        self
    }

    pub fn insert_alias(&mut self, iso: &str, iana: &str) -> &mut Self {
        self.aliases.insert(iso.to_string(), iana.to_string());
        self
    }

    pub fn insert_script_range(&mut self, range: ScriptRange) -> &mut Self {
        let position = self.script_ranges.partition_point(|r| r.from <= range.from);
        self.script_ranges.insert(position, range);
        self
    }

    /// Number of registry entries held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SubtagStore for MemoryStore {
    fn iso639_2_alias(&self, code: &str) -> Result<Option<String>, StoreError> {
        Ok(self.aliases.get(code).cloned())
    }

    fn find_subtag(
        &self,
        record_type: RecordType,
        value: &str,
    ) -> Result<Option<SubtagRecord>, StoreError> {
        let entry = match self.entries.get(&(record_type, value.to_string())) {
            Some(entry) => entry,
            None => return Ok(None),
        };

        if record_type == RecordType::Language
            && entry.scope.as_deref() == Some(COLLECTION_SCOPE)
        {
            return Ok(None);
        }

        Ok(Some(entry.record.clone()))
    }

    fn script_for_code_point(&self, code_point: u32) -> Result<Option<String>, StoreError> {
        let position = self.script_ranges.partition_point(|r| r.from <= code_point);
        let script = position
            .checked_sub(1)
            .map(|index| &self.script_ranges[index])
            .filter(|range| range.to >= code_point)
            .map(|range| range.script.clone());
        Ok(script)
    }
}
