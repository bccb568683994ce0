//! Processed-event ledger
//!
//! Keys are admitted once: a key already in the store is skipped, and a key
//! currently being processed is skipped too. The store is only written when
//! a run finishes, whatever its outcome.

use crate::types::*;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

/// Durable set of processed keys
#[async_trait]
pub trait ProcessedStore: Send + Sync {
    async fn contains(&self, key: &str) -> Result<bool>;

    /// Record `key`, with an optional note on how its run ended
    async fn add(&self, key: &str, annotation: Option<&str>) -> Result<()>;
}

// ============================================================================
// File store
// ============================================================================

/// Append-only text file, one `key` or `key<TAB>annotation` per line.
///
/// Read once on open; later lookups are answered from memory.
pub struct FileStore {
    path: PathBuf,
    keys: Mutex<HashSet<String>>,
    writer: tokio::sync::Mutex<()>,
}

impl FileStore {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_owned();
        let keys = match tokio::fs::read_to_string(&path).await {
            Ok(text) => parse_keys(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashSet::new(),
            Err(e) => return Err(e.into()),
        };
        log::info!("loaded {} processed keys from {}", keys.len(), path.display());

        Ok(Self {
            path,
            keys: Mutex::new(keys),
            writer: tokio::sync::Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.keys.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ProcessedStore for FileStore {
    async fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.keys.lock().contains(key))
    }

    async fn add(&self, key: &str, annotation: Option<&str>) -> Result<()> {
        let line = format_line(key, annotation);
        {
            let _guard = self.writer.lock().await;
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .await?;
            file.write_all(line.as_bytes()).await?;
            file.flush().await?;
        }
        self.keys.lock().insert(key.to_string());
        Ok(())
    }
}

fn parse_keys(text: &str) -> HashSet<String> {
    text.lines()
        .filter_map(|line| line.split('\t').next())
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(String::from)
        .collect()
}

fn format_line(key: &str, annotation: Option<&str>) -> String {
    let clean = |s: &str| s.replace(['\n', '\r', '\t'], " ");
    match annotation {
        Some(note) => format!("{}\t{}\n", clean(key), clean(note)),
        None => format!("{}\n", clean(key)),
    }
}

// ============================================================================
// Memory store
// ============================================================================

/// Non-durable store, for tests and dry runs
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<Vec<(String, Option<String>)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `add` so far, in order
    pub fn entries(&self) -> Vec<(String, Option<String>)> {
        self.entries.lock().clone()
    }
}

#[async_trait]
impl ProcessedStore for MemoryStore {
    async fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.entries.lock().iter().any(|(k, _)| k == key))
    }

    async fn add(&self, key: &str, annotation: Option<&str>) -> Result<()> {
        self.entries
            .lock()
            .push((key.to_string(), annotation.map(String::from)));
        Ok(())
    }
}

// ============================================================================
// Ledger
// ============================================================================

/// Result of asking to process a key
#[derive(Debug)]
pub enum Admission {
    /// First delivery; the claim must be completed once the run ends
    Fresh(Claim),
    AlreadyProcessed,
    InFlight,
}

struct LedgerInner {
    store: Arc<dyn ProcessedStore>,
    in_flight: Mutex<HashSet<String>>,
}

/// Shared gate in front of a [`ProcessedStore`]
#[derive(Clone)]
pub struct Ledger {
    inner: Arc<LedgerInner>,
}

impl Ledger {
    pub fn new(store: impl ProcessedStore + 'static) -> Self {
        Self::shared(Arc::new(store))
    }

    /// Ledger over a store the caller keeps a handle to
    pub fn shared(store: Arc<dyn ProcessedStore>) -> Self {
        Self {
            inner: Arc::new(LedgerInner {
                store,
                in_flight: Mutex::new(HashSet::new()),
            }),
        }
    }

    /// Ledger over the file at `path`, created on first write
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(FileStore::open(path).await?))
    }

    /// Claim `key` unless it is done or already claimed.
    ///
    /// The in-flight mark is taken before the store is consulted, so two
    /// concurrent deliveries of one key can never both be admitted.
    pub async fn admit(&self, key: &str) -> Result<Admission> {
        if !self.inner.in_flight.lock().insert(key.to_string()) {
            log::info!("{key} is already being processed");
            return Ok(Admission::InFlight);
        }
        let claim = Claim {
            ledger: self.inner.clone(),
            key: key.to_string(),
        };

        // Dropping the claim on either early return releases the mark
        if self.inner.store.contains(key).await? {
            log::info!("{key} already processed, skipping");
            return Ok(Admission::AlreadyProcessed);
        }
        Ok(Admission::Fresh(claim))
    }

    pub async fn is_processed(&self, key: &str) -> Result<bool> {
        self.inner.store.contains(key).await
    }

    /// Record `key` without going through [`Ledger::admit`]
    pub async fn mark_processed(&self, key: &str, annotation: Option<&str>) -> Result<()> {
        self.inner.store.add(key, annotation).await
    }

    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.lock().len()
    }
}

/// Exclusive right to process one key; released on drop
pub struct Claim {
    ledger: Arc<LedgerInner>,
    key: String,
}

impl Claim {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Persist the key, then release it
    pub async fn complete(self, annotation: Option<&str>) -> Result<()> {
        self.ledger.store.add(&self.key, annotation).await
    }
}

impl Drop for Claim {
    fn drop(&mut self) {
        self.ledger.in_flight.lock().remove(&self.key);
    }
}

impl std::fmt::Debug for Claim {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Claim").field("key", &self.key).finish()
    }
}
