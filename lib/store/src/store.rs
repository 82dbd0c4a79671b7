//! Persistent DeDup ID store
//!
//! Maps canonical fingerprints to stable DeDup IDs that survive across runs.
//! Lookups are concurrent; the read-or-create sequence for one fingerprint
//! is serialized behind a sharded lock so exactly one caller mints the
//! entry. Commits go through an atomic tmp-then-replace, so a partially
//! written store file is never visible.

use crate::fingerprint::{Fingerprint, FingerprintRecipe};
use atomicwrites::{AtomicFile, OverwriteBehavior};
use chrono::{DateTime, Utc};
use dedupx_core::{Error, Record, Result};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::io::Write;
use std::path::{Path, PathBuf};

const STORE_FORMAT_VERSION: u32 = 1;
const SHARD_COUNT: usize = 64;

/// One identity cluster: a stable DeDup ID plus everything resolved to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DedupEntry {
    pub dedup_id: String,
    pub fingerprints: Vec<String>,
    pub identifiers: Vec<String>,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreMetadata {
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub total_runs: u64,
}

impl Default for StoreMetadata {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            last_updated: now,
            total_runs: 0,
        }
    }
}

/// On-disk representation of the store.
#[derive(Debug, Serialize, Deserialize)]
struct StoreFile {
    version: u32,
    recipe: FingerprintRecipe,
    fingerprint_to_id: HashMap<String, String>,
    entries: HashMap<String, DedupEntry>,
    metadata: StoreMetadata,
}

#[derive(Debug, Default)]
struct StoreInner {
    fingerprint_to_id: HashMap<String, String>,
    entries: HashMap<String, DedupEntry>,
    metadata: StoreMetadata,
}

/// New and updated entry ids from one run, for the caller's storage layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreDelta {
    pub created: Vec<String>,
    pub updated: Vec<String>,
}

impl StoreDelta {
    fn note_created(&mut self, id: &str) {
        self.created.push(id.to_string());
    }

    fn note_updated(&mut self, id: &str) {
        if !self.updated.iter().any(|u| u == id) && !self.created.iter().any(|c| c == id) {
            self.updated.push(id.to_string());
        }
    }
}

/// Persistent fingerprint-to-DeDup-ID store.
#[derive(Debug)]
pub struct DedupKeyStore {
    path: Option<PathBuf>,
    recipe: FingerprintRecipe,
    inner: RwLock<StoreInner>,
    shards: Vec<Mutex<()>>,
    delta: Mutex<StoreDelta>,
}

impl DedupKeyStore {
    /// Ephemeral store, useful for single-run and test workloads.
    pub fn in_memory(recipe: FingerprintRecipe) -> Self {
        Self {
            path: None,
            recipe,
            inner: RwLock::new(StoreInner::default()),
            shards: (0..SHARD_COUNT).map(|_| Mutex::new(())).collect(),
            delta: Mutex::new(StoreDelta::default()),
        }
    }

    /// Open (or create) a store file. A corrupt file or a recipe mismatch is
    /// a [`Error::StoreConsistency`]; previously committed data is left
    /// untouched on disk in both cases.
    pub fn open(path: impl AsRef<Path>, recipe: FingerprintRecipe) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut store = Self::in_memory(recipe);
        store.path = Some(path.clone());

        if path.exists() {
            let data = std::fs::read(&path)?;
            let file: StoreFile = serde_json::from_slice(&data).map_err(|e| {
                Error::StoreConsistency(format!(
                    "store file {} is not readable: {}",
                    path.display(),
                    e
                ))
            })?;
            if file.version != STORE_FORMAT_VERSION {
                return Err(Error::StoreConsistency(format!(
                    "store file {} has format version {}, expected {}",
                    path.display(),
                    file.version,
                    STORE_FORMAT_VERSION
                )));
            }
            if file.recipe != store.recipe {
                return Err(Error::StoreConsistency(format!(
                    "store file {} was written with fingerprint recipe v{}, configured recipe is v{}; \
                     migrate the store before changing the recipe",
                    path.display(),
                    file.recipe.version,
                    store.recipe.version
                )));
            }
            let mut inner = store.inner.write();
            inner.fingerprint_to_id = file.fingerprint_to_id;
            inner.entries = file.entries;
            inner.metadata = file.metadata;
        }

        Ok(store)
    }

    pub fn recipe(&self) -> &FingerprintRecipe {
        &self.recipe
    }

    /// Number of identity entries.
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Existing DeDup ID for a fingerprint, if any. Concurrent-safe read.
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<String> {
        self.inner
            .read()
            .fingerprint_to_id
            .get(fingerprint.as_str())
            .cloned()
    }

    /// All `source_type:source_id` identifiers linked to a DeDup ID.
    pub fn identifiers(&self, dedup_id: &str) -> Vec<String> {
        self.inner
            .read()
            .entries
            .get(dedup_id)
            .map(|entry| entry.identifiers.clone())
            .unwrap_or_default()
    }

    /// Resolve a standardized record to a DeDup ID, minting a new entry when
    /// its fingerprint is unknown. Returns `(dedup_id, created)`.
    ///
    /// The read-or-create for one fingerprint is exclusive: concurrent
    /// resolutions of the same fingerprint serialize to a single winner.
    pub fn resolve(&self, record: &Record) -> (String, bool) {
        let fingerprint = self.recipe.fingerprint(record);
        let _shard = self.shards[shard_index(&fingerprint)].lock();

        if let Some(existing) = self.get(&fingerprint) {
            self.attach(&existing, &fingerprint, record);
            self.delta.lock().note_updated(&existing);
            return (existing, false);
        }

        let dedup_id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        {
            let mut inner = self.inner.write();
            inner
                .fingerprint_to_id
                .insert(fingerprint.as_str().to_string(), dedup_id.clone());
            inner.entries.insert(
                dedup_id.clone(),
                DedupEntry {
                    dedup_id: dedup_id.clone(),
                    fingerprints: vec![fingerprint.as_str().to_string()],
                    identifiers: vec![record.identifier()],
                    first_seen: now,
                    last_seen: now,
                },
            );
        }
        self.delta.lock().note_created(&dedup_id);
        (dedup_id, true)
    }

    /// Link a record to an existing DeDup ID, e.g. after a rule match
    /// against a record already carrying an identity.
    pub fn link(&self, dedup_id: &str, record: &Record) {
        let fingerprint = self.recipe.fingerprint(record);
        let _shard = self.shards[shard_index(&fingerprint)].lock();
        self.attach(dedup_id, &fingerprint, record);
        self.delta.lock().note_updated(dedup_id);
    }

    fn attach(&self, dedup_id: &str, fingerprint: &Fingerprint, record: &Record) {
        let mut inner = self.inner.write();
        inner
            .fingerprint_to_id
            .insert(fingerprint.as_str().to_string(), dedup_id.to_string());
        let now = Utc::now();
        let entry = inner
            .entries
            .entry(dedup_id.to_string())
            .or_insert_with(|| DedupEntry {
                dedup_id: dedup_id.to_string(),
                fingerprints: Vec::new(),
                identifiers: Vec::new(),
                first_seen: now,
                last_seen: now,
            });
        entry.last_seen = now;
        if !entry.fingerprints.iter().any(|f| f == fingerprint.as_str()) {
            entry.fingerprints.push(fingerprint.as_str().to_string());
        }
        let identifier = record.identifier();
        if !entry.identifiers.iter().any(|i| i == &identifier) {
            entry.identifiers.push(identifier);
        }
    }

    /// Commit the run: bump metadata, atomically replace the store file (if
    /// file-backed) and hand back the run's delta.
    pub fn commit(&self) -> Result<StoreDelta> {
        {
            let mut inner = self.inner.write();
            inner.metadata.last_updated = Utc::now();
            inner.metadata.total_runs += 1;
        }

        if let Some(path) = &self.path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let payload = {
                let inner = self.inner.read();
                serde_json::to_vec_pretty(&StoreFile {
                    version: STORE_FORMAT_VERSION,
                    recipe: self.recipe.clone(),
                    fingerprint_to_id: inner.fingerprint_to_id.clone(),
                    entries: inner.entries.clone(),
                    metadata: inner.metadata.clone(),
                })?
            };
            AtomicFile::new(path, OverwriteBehavior::AllowOverwrite)
                .write(|f| f.write_all(&payload))
                .map_err(|e| {
                    Error::StoreConsistency(format!(
                        "could not commit store file {}: {}",
                        path.display(),
                        e
                    ))
                })?;
        }

        let mut delta = self.delta.lock();
        Ok(std::mem::take(&mut *delta))
    }
}

fn shard_index(fingerprint: &Fingerprint) -> usize {
    let mut hasher = DefaultHasher::new();
    fingerprint.as_str().hash(&mut hasher);
    (hasher.finish() as usize) % SHARD_COUNT
}

#[cfg(test)]
mod tests {
    use super::*;
    use dedupx_core::field;
    use dedupx_core::normalize::standardize;
    use std::sync::Arc;

    fn record(source_id: &str, company: &str) -> Record {
        standardize(
            &Record::new()
                .with(field::SOURCE_TYPE, "CRM")
                .with(field::SOURCE_ID, source_id)
                .with(field::COMPANY_NAME, company)
                .with(field::ADDRESS_LINE_1, "1 Main St")
                .with(field::PHONE_NUMBER, "404-555-1234"),
        )
    }

    #[test]
    fn test_resolve_mints_once() {
        let store = DedupKeyStore::in_memory(FingerprintRecipe::default());
        let (id1, created1) = store.resolve(&record("42", "Acme"));
        let (id2, created2) = store.resolve(&record("42", "Acme"));
        assert!(created1);
        assert!(!created2);
        assert_eq!(id1, id2);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_distinct_identities_get_distinct_ids() {
        let store = DedupKeyStore::in_memory(FingerprintRecipe::default());
        let (id1, _) = store.resolve(&record("42", "Acme"));
        let (id2, _) = store.resolve(&record("43", "Zenith"));
        assert_ne!(id1, id2);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_link_attaches_membership() {
        let store = DedupKeyStore::in_memory(FingerprintRecipe::default());
        let (id, _) = store.resolve(&record("42", "Acme"));
        store.link(&id, &record("99", "Acme Incorporated"));
        let identifiers = store.identifiers(&id);
        assert_eq!(identifiers, vec!["CRM:42".to_string(), "CRM:99".to_string()]);
        // The linked fingerprint now resolves to the same id.
        let (resolved, created) = store.resolve(&record("99", "Acme Incorporated"));
        assert_eq!(resolved, id);
        assert!(!created);
    }

    #[test]
    fn test_persistence_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dedup_store.json");

        let id = {
            let store = DedupKeyStore::open(&path, FingerprintRecipe::default()).unwrap();
            let (id, created) = store.resolve(&record("42", "Acme"));
            assert!(created);
            let delta = store.commit().unwrap();
            assert_eq!(delta.created, vec![id.clone()]);
            id
        };

        let reopened = DedupKeyStore::open(&path, FingerprintRecipe::default()).unwrap();
        assert_eq!(reopened.len(), 1);
        let (resolved, created) = reopened.resolve(&record("42", "Acme"));
        assert_eq!(resolved, id);
        assert!(!created);
    }

    #[test]
    fn test_corrupt_file_is_consistency_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dedup_store.json");
        std::fs::write(&path, b"{ not json").unwrap();
        let err = DedupKeyStore::open(&path, FingerprintRecipe::default()).unwrap_err();
        assert!(matches!(err, Error::StoreConsistency(_)), "{err}");
    }

    #[test]
    fn test_recipe_mismatch_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dedup_store.json");
        {
            let store = DedupKeyStore::open(&path, FingerprintRecipe::default()).unwrap();
            store.resolve(&record("42", "Acme"));
            store.commit().unwrap();
        }
        let changed = FingerprintRecipe {
            version: 2,
            fields: vec![field::COMPANY_NAME_STD.to_string()],
        };
        let err = DedupKeyStore::open(&path, changed).unwrap_err();
        assert!(matches!(err, Error::StoreConsistency(_)), "{err}");
    }

    #[test]
    fn test_concurrent_resolve_single_winner() {
        let store = Arc::new(DedupKeyStore::in_memory(FingerprintRecipe::default()));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(std::thread::spawn(move || {
                store.resolve(&record("42", "Acme"))
            }));
        }
        let results: Vec<(String, bool)> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();
        let minted: Vec<_> = results.iter().filter(|(_, created)| *created).collect();
        assert_eq!(minted.len(), 1, "exactly one thread mints the entry");
        let first_id = &results[0].0;
        assert!(results.iter().all(|(id, _)| id == first_id));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_delta_reset_after_commit() {
        let store = DedupKeyStore::in_memory(FingerprintRecipe::default());
        store.resolve(&record("42", "Acme"));
        let delta = store.commit().unwrap();
        assert_eq!(delta.created.len(), 1);
        let empty = store.commit().unwrap();
        assert!(empty.created.is_empty() && empty.updated.is_empty());
    }
}
