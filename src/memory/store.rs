//! Memory storage
//!
//! [`MemoryStore`] is the seam the pipeline and gateway depend on.
//! [`InMemoryStore`] keeps entries in insertion order behind a
//! `tokio::sync::RwLock`, optionally mirrored to a JSON snapshot.

use super::types::{AddOutcome, MemoryEntry};
use crate::config::MemoryConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

const SNAPSHOT_FILE: &str = "memories.json";

/// Words of page content used to look up related entries
const RELATED_PHRASE_WORDS: usize = 10;

/// Results taken from each related-content lookup
const RELATED_PER_QUERY: usize = 3;

/// Per-user memory storage with content-hash deduplication
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Insert unless the user already has an entry with the same content hash
    async fn add(&self, entry: MemoryEntry) -> Result<AddOutcome>;

    /// Get an entry by id
    async fn get(&self, id: &Uuid) -> Option<MemoryEntry>;

    /// All entries of a user, oldest first
    async fn list(&self, user_id: &str) -> Vec<MemoryEntry>;

    /// Entries of a user containing `query` (case-insensitive), newest first
    async fn search(&self, user_id: &str, query: &str, limit: usize) -> Vec<MemoryEntry>;

    /// Entry of a user with the given content hash
    async fn find_by_hash(&self, user_id: &str, hash: &str) -> Option<MemoryEntry>;

    /// Total number of entries across users
    async fn count(&self) -> usize;

    /// Entries mentioning the domain or the opening words of `content`,
    /// deduplicated, at most `limit`
    async fn related(
        &self,
        user_id: &str,
        domain: &str,
        content: &str,
        limit: usize,
    ) -> Vec<MemoryEntry> {
        let mut found = Vec::new();
        if !domain.is_empty() {
            found.extend(self.search(user_id, domain, RELATED_PER_QUERY).await);
        }

        let phrase = content
            .split_whitespace()
            .take(RELATED_PHRASE_WORDS)
            .collect::<Vec<_>>()
            .join(" ");
        if !phrase.is_empty() {
            found.extend(self.search(user_id, &phrase, RELATED_PER_QUERY).await);
        }

        let mut seen = HashSet::new();
        found.retain(|entry| seen.insert(entry.id));
        found.truncate(limit);
        found
    }
}

/// In-memory store with optional JSON snapshot
pub struct InMemoryStore {
    entries: Arc<RwLock<Vec<MemoryEntry>>>,
    snapshot: Option<PathBuf>,
}

impl InMemoryStore {
    /// Create an empty, non-persistent store
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
            snapshot: None,
        }
    }

    /// Open a persistent store under `dir`, loading any existing snapshot
    pub async fn open(dir: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(SNAPSHOT_FILE);

        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(data) => serde_json::from_str::<Vec<MemoryEntry>>(&data).map_err(|e| {
                Error::Memory(format!("Failed to parse {}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::info!(
            "Loaded {} memories from {}",
            entries.len(),
            path.display()
        );

        Ok(Self {
            entries: Arc::new(RwLock::new(entries)),
            snapshot: Some(path),
        })
    }

    /// Build the store described by the memory configuration
    pub async fn from_config(config: &MemoryConfig) -> Result<Self> {
        if config.persist {
            Self::open(&config.storage_dir).await
        } else {
            Ok(Self::new())
        }
    }

    /// Snapshot path, when persistent
    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot.as_deref()
    }

    /// Rewrite the snapshot; called with the write lock held so writes stay ordered
    async fn persist(&self, entries: &[MemoryEntry]) {
        let Some(path) = &self.snapshot else {
            return;
        };

        let json = match serde_json::to_string_pretty(entries) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("Failed to serialize memories: {}", e);
                return;
            }
        };

        let tmp = path.with_extension("json.tmp");
        let result = async {
            tokio::fs::write(&tmp, json).await?;
            tokio::fs::rename(&tmp, path).await
        }
        .await;

        if let Err(e) = result {
            tracing::warn!("Failed to persist memories to {}: {}", path.display(), e);
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn add(&self, entry: MemoryEntry) -> Result<AddOutcome> {
        let mut entries = self.entries.write().await;

        if let Some(existing) = entries
            .iter()
            .find(|e| e.user_id == entry.user_id && e.content_hash == entry.content_hash)
        {
            tracing::debug!(
                "Duplicate content for user {}, existing memory {}",
                entry.user_id,
                existing.id
            );
            return Ok(AddOutcome::Duplicate(existing.id));
        }

        let id = entry.id;
        entries.push(entry);
        self.persist(&entries).await;

        Ok(AddOutcome::Added(id))
    }

    async fn get(&self, id: &Uuid) -> Option<MemoryEntry> {
        self.entries.read().await.iter().find(|e| e.id == *id).cloned()
    }

    async fn list(&self, user_id: &str) -> Vec<MemoryEntry> {
        self.entries
            .read()
            .await
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect()
    }

    async fn search(&self, user_id: &str, query: &str, limit: usize) -> Vec<MemoryEntry> {
        let needle = query.to_lowercase();
        self.entries
            .read()
            .await
            .iter()
            .rev()
            .filter(|e| e.user_id == user_id && e.matches(&needle))
            .take(limit)
            .cloned()
            .collect()
    }

    async fn find_by_hash(&self, user_id: &str, hash: &str) -> Option<MemoryEntry> {
        self.entries
            .read()
            .await
            .iter()
            .find(|e| e.user_id == user_id && e.content_hash == hash)
            .cloned()
    }

    async fn count(&self) -> usize {
        self.entries.read().await.len()
    }
}
