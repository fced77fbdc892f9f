use crate::cache::{CacheError, CacheStore};
use pvr_sync_models::{MediaItem, WantedKind};
use std::collections::HashSet;
use tracing::{debug, info};

/// Replace a partition with a fresh server fetch and prune whatever the
/// server no longer wants.
///
/// The previous id set must be captured before the wholesale write:
/// removals are detected by absence from the fresh list, so the diff is
/// against the pre-refresh snapshot. The replace itself drops the
/// vanished entries from disk; the diff exists to count and report them.
/// Returns how many items were pruned.
pub fn refresh_partition(
    cache: &CacheStore,
    pvr: &str,
    kind: WantedKind,
    fresh: &[MediaItem],
) -> Result<usize, CacheError> {
    let previous: HashSet<i64> = cache
        .load(pvr, kind)?
        .iter()
        .map(|i| i.item_id)
        .collect();

    let current: HashSet<i64> = fresh.iter().map(|i| i.item_id).collect();
    let vanished: HashSet<i64> = previous.difference(&current).copied().collect();

    cache.replace(pvr, kind, fresh)?;

    if vanished.is_empty() {
        debug!(pvr, kind = %kind, "no stale cache entries to prune");
        return Ok(0);
    }

    let removed = vanished.len();
    info!(pvr, kind = %kind, removed, "pruned items no longer wanted by the server");
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn item(id: i64) -> MediaItem {
        MediaItem::new(id, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
    }

    #[test]
    fn test_refresh_prunes_vanished_ids() {
        let dir = TempDir::new().unwrap();
        let cache = CacheStore::open(dir.path()).unwrap();
        cache
            .replace("tv", WantedKind::Missing, &[item(1), item(2), item(3)])
            .unwrap();

        let fresh = vec![item(2), item(3), item(4)];
        let removed = refresh_partition(&cache, "tv", WantedKind::Missing, &fresh).unwrap();
        assert_eq!(removed, 1);

        let ids: Vec<i64> = cache
            .load("tv", WantedKind::Missing)
            .unwrap()
            .iter()
            .map(|i| i.item_id)
            .collect();
        assert_eq!(ids, vec![2, 3, 4]);
    }

    #[test]
    fn test_refresh_counts_every_vanished_id() {
        let dir = TempDir::new().unwrap();
        let cache = CacheStore::open(dir.path()).unwrap();
        cache
            .replace(
                "tv",
                WantedKind::Missing,
                &[item(1), item(2), item(3), item(4)],
            )
            .unwrap();

        // The replace drops 1 and 2 from disk; the count must say so.
        let removed =
            refresh_partition(&cache, "tv", WantedKind::Missing, &[item(3), item(4)]).unwrap();
        assert_eq!(removed, 2);
    }

    #[test]
    fn test_refresh_into_empty_partition_prunes_nothing() {
        let dir = TempDir::new().unwrap();
        let cache = CacheStore::open(dir.path()).unwrap();

        let removed =
            refresh_partition(&cache, "tv", WantedKind::Missing, &[item(1), item(2)]).unwrap();
        assert_eq!(removed, 0);
        assert_eq!(cache.load("tv", WantedKind::Missing).unwrap().len(), 2);
    }

    #[test]
    fn test_refresh_with_identical_list_is_a_no_op_prune() {
        let dir = TempDir::new().unwrap();
        let cache = CacheStore::open(dir.path()).unwrap();
        cache
            .replace("tv", WantedKind::Missing, &[item(1), item(2)])
            .unwrap();

        let removed =
            refresh_partition(&cache, "tv", WantedKind::Missing, &[item(1), item(2)]).unwrap();
        assert_eq!(removed, 0);
    }
}
