use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One wanted item as tracked by a PVR server. `item_id` is the server's
/// own primary key for the episode/movie/album/book and is only unique
/// within a single (pvr, wanted kind) cache partition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaItem {
    pub item_id: i64,
    pub air_date_utc: DateTime<Utc>,
    /// Set to the batch's initiation time once a search batch containing
    /// this item has completed; never touched by refresh fetches.
    #[serde(default)]
    pub last_search: Option<DateTime<Utc>>,
}

impl MediaItem {
    pub fn new(item_id: i64, air_date_utc: DateTime<Utc>) -> Self {
        Self {
            item_id,
            air_date_utc,
            last_search: None,
        }
    }
}

/// Which of the server's wanted lists an item came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum WantedKind {
    Missing,
    CutoffUnmet,
}

impl WantedKind {
    /// Stable name used for cache partitions and log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            WantedKind::Missing => "missing",
            WantedKind::CutoffUnmet => "cutoff",
        }
    }
}

impl fmt::Display for WantedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
