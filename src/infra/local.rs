//! Local tracker store: whole-document JSON blobs in a data directory.
//!
//! The practice log and dream journal treat this store as the sole
//! source of truth. Reads deserialize defensively, falling back to an
//! empty document instead of failing; writes serialize the full
//! collection each time. Collections are small, so no delta writes.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::warn;

use crate::domain::journal::JournalEntry;
use crate::domain::practice::PracticeEntry;
use crate::infra::error::InfraError;

pub const PRACTICE_NAMESPACE: &str = "practice_log";
pub const JOURNAL_NAMESPACE: &str = "dream_journal";

/// Persisted practice collection, including the carried-forward longest
/// streak so it survives recomputation without retaining full history.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PracticeDocument {
    #[serde(default)]
    pub entries: Vec<PracticeEntry>,
    #[serde(default)]
    pub longest_streak: u32,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct JournalDocument {
    #[serde(default)]
    pub entries: Vec<JournalEntry>,
}

pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, InfraError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn blob_path(&self, namespace: &str) -> PathBuf {
        self.dir.join(format!("{namespace}.json"))
    }

    /// Read a namespaced document, falling back to the default on any
    /// missing, unreadable, or corrupt blob.
    pub fn load<T>(&self, namespace: &str) -> T
    where
        T: DeserializeOwned + Default,
    {
        let path = self.blob_path(namespace);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(_) => return T::default(),
        };

        match serde_json::from_str(&raw) {
            Ok(document) => document,
            Err(err) => {
                warn!(
                    target = "infra::local",
                    namespace,
                    error = %err,
                    "stored blob is unreadable, starting empty"
                );
                T::default()
            }
        }
    }

    /// Serialize the whole collection back to its blob.
    pub fn save<T: Serialize>(&self, namespace: &str, document: &T) -> Result<(), InfraError> {
        let path = self.blob_path(namespace);
        let raw = serde_json::to_string_pretty(document)
            .map_err(|err| InfraError::serialization(namespace, err.to_string()))?;
        write_atomically(&path, &raw)?;
        Ok(())
    }
}

fn write_atomically(path: &Path, contents: &str) -> Result<(), InfraError> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_blob_loads_as_empty_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path()).unwrap();
        let doc: PracticeDocument = store.load(PRACTICE_NAMESPACE);
        assert!(doc.entries.is_empty());
        assert_eq!(doc.longest_streak, 0);
    }

    #[test]
    fn corrupt_blob_fails_soft_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path()).unwrap();
        fs::write(dir.path().join("practice_log.json"), "{not json").unwrap();
        let doc: PracticeDocument = store.load(PRACTICE_NAMESPACE);
        assert!(doc.entries.is_empty());
    }

    #[test]
    fn serialize_failure_names_the_namespace() {
        struct Unserializable;
        impl Serialize for Unserializable {
            fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
                Err(serde::ser::Error::custom("refused"))
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path()).unwrap();
        let err = store.save(PRACTICE_NAMESPACE, &Unserializable).unwrap_err();
        assert!(matches!(
            err,
            InfraError::Serialization { ref namespace, .. } if namespace == PRACTICE_NAMESPACE
        ));
    }

    #[test]
    fn save_then_load_round_trips_the_collection() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path()).unwrap();

        let mut doc = PracticeDocument::default();
        crate::domain::practice::toggle_entry(&mut doc.entries, "breathwork", "2025-06-15");
        doc.longest_streak = 4;
        store.save(PRACTICE_NAMESPACE, &doc).unwrap();

        let loaded: PracticeDocument = store.load(PRACTICE_NAMESPACE);
        assert_eq!(loaded.entries, doc.entries);
        assert_eq!(loaded.longest_streak, 4);
    }
}
