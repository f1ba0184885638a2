// ABOUTME: Persistent allow-list of approved command signatures.
// ABOUTME: JSON-backed, duplicate-safe, re-read on every decision and written atomically.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Canonical string form of an argument vector.
///
/// Arguments are joined with a single space and not escaped, so `["a b"]` and
/// `["a", "b"]` share a signature.
pub fn signature(args: &[String]) -> String {
    args.join(" ")
}

/// Failure to read or write the allow-list file.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to serialize allow-list: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// The set of approved signatures, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowList {
    #[serde(rename = "approved", default)]
    entries: Vec<String>,
}

impl AllowList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether the signature of `args` is approved.
    pub fn contains(&self, args: &[String]) -> bool {
        self.contains_signature(&signature(args))
    }

    pub fn contains_signature(&self, sig: &str) -> bool {
        self.entries.iter().any(|entry| entry == sig)
    }

    /// Add the signature of `args`. Returns false if it was already present.
    pub fn add(&mut self, args: &[String]) -> bool {
        let sig = signature(args);
        if self.contains_signature(&sig) {
            return false;
        }
        self.entries.push(sig);
        true
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// File-backed store for the allow-list.
///
/// `load` takes no lock. `approve` holds a mutex across load, add and save so
/// two "always" approvals in this process cannot overwrite each other.
#[derive(Debug)]
pub struct AllowListStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl AllowListStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the allow-list. A missing file is an empty list.
    pub fn load(&self) -> Result<AllowList, StoreError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(AllowList::new()),
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        serde_json::from_str(&content).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    /// Overwrite the file with `list` (write to a uniquely named sibling, then rename).
    pub fn save(&self, list: &AllowList) -> Result<(), StoreError> {
        use std::io::Write;

        let content = serde_json::to_string_pretty(list)?;
        let write_err = |source| StoreError::Write {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(write_err)?;
        // NamedTempFile is created owner-only (0600 on unix).
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
        tmp.write_all(content.as_bytes()).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(&self.path).map_err(|e| write_err(e.error))?;
        Ok(())
    }

    /// Load, add `args`, and save. Returns false when it was already approved
    /// (the file is left untouched in that case).
    pub fn approve(&self, args: &[String]) -> Result<bool, StoreError> {
        // A poisoned lock only means another writer panicked; the file is still whole.
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut list = self.load()?;
        if !list.add(args) {
            return Ok(false);
        }
        self.save(&list)?;
        Ok(true)
    }
}
