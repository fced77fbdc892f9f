use pvr_sync_models::{MediaItem, WantedKind};
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache io failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cache corrupt at {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// On-disk store for wanted items: one JSON file per (pvr, kind)
/// partition under the cache root. Holds at most one item per `item_id`
/// within a partition; callers get full-list reads and writes plus
/// targeted upserts.
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|source| CacheError::Io {
            path: root.clone(),
            source,
        })?;
        Ok(Self { root })
    }

    fn partition_path(&self, pvr: &str, kind: WantedKind) -> PathBuf {
        self.root
            .join(pvr.to_lowercase())
            .join(format!("{}.json", kind.as_str()))
    }

    /// All items in the partition, in stored order. An absent file is an
    /// empty partition, not an error.
    pub fn load(&self, pvr: &str, kind: WantedKind) -> Result<Vec<MediaItem>, CacheError> {
        let path = self.partition_path(pvr, kind);
        if !path.exists() {
            debug!(pvr, kind = %kind, "cache miss (no partition file)");
            return Ok(Vec::new());
        }

        let content = std::fs::read_to_string(&path).map_err(|source| CacheError::Io {
            path: path.clone(),
            source,
        })?;
        let items: Vec<MediaItem> =
            serde_json::from_str(&content).map_err(|source| CacheError::Corrupt {
                path: path.clone(),
                source,
            })?;

        debug!(pvr, kind = %kind, items = items.len(), "cache partition loaded");
        Ok(items)
    }

    /// Wholesale replacement of the partition.
    pub fn replace(
        &self,
        pvr: &str,
        kind: WantedKind,
        items: &[MediaItem],
    ) -> Result<(), CacheError> {
        let path = self.partition_path(pvr, kind);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| CacheError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let json =
            serde_json::to_string_pretty(items).map_err(|source| CacheError::Corrupt {
                path: path.clone(),
                source,
            })?;
        std::fs::write(&path, json).map_err(|source| CacheError::Io {
            path: path.clone(),
            source,
        })?;

        debug!(pvr, kind = %kind, items = items.len(), "cache partition written");
        Ok(())
    }

    /// Upsert by `item_id`: existing entries are overwritten in place,
    /// new ids are appended. Used to stamp `last_search` per batch.
    pub fn update_items(
        &self,
        pvr: &str,
        kind: WantedKind,
        updated: &[MediaItem],
    ) -> Result<(), CacheError> {
        let mut items = self.load(pvr, kind)?;

        for update in updated {
            match items.iter_mut().find(|i| i.item_id == update.item_id) {
                Some(existing) => *existing = update.clone(),
                None => items.push(update.clone()),
            }
        }

        self.replace(pvr, kind, &items)
    }
}
