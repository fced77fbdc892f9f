use crate::cache::CacheStore;
use crate::reconcile::refresh_partition;
use anyhow::{ensure, Context, Result};
use chrono::Utc;
use pvr_sync_clients::WantedSource;
use pvr_sync_models::{MediaItem, WantedKind};
use tracing::{info, warn};

/// What to do with a final batch smaller than the batch size. Historical
/// tools of this family silently dropped it, leaving those items
/// unsearched for the whole run; both behaviors are explicit here so the
/// old one can be reproduced deliberately rather than by accident.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrailingBatch {
    Drop,
    Flush,
}

#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub batch_size: usize,
    /// Refetch from the server even when the cache has items.
    pub refresh_cache: bool,
    pub trailing: TrailingBatch,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            batch_size: 10,
            refresh_cache: false,
            trailing: TrailingBatch::Drop,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SearchReport {
    /// Items in the cache partition when batching started.
    pub cached_items: usize,
    /// Items searched and stamped this run.
    pub searched: usize,
    /// Trailing items left unsearched under `TrailingBatch::Drop`.
    pub skipped: usize,
    /// Items pruned during reconciliation (refresh runs only).
    pub pruned: usize,
}

/// One full sync-and-search pass for a single (pvr, kind) partition.
///
/// Refreshes the cache from the server when forced or when the partition
/// is empty, reconciles removals, then walks the cached list in strictly
/// sequential fixed-size batches: search, stamp, persist, next. Each
/// batch's stamps are written before the next batch starts, so a failed
/// run keeps the progress it already made.
pub async fn run_search<S: WantedSource + ?Sized>(
    client: &S,
    cache: &CacheStore,
    kind: WantedKind,
    options: &SearchOptions,
) -> Result<SearchReport> {
    ensure!(options.batch_size > 0, "batch size must be at least 1");

    let pvr = client.name();
    let mut report = SearchReport::default();

    let cached = cache
        .load(pvr, kind)
        .with_context(|| format!("failed reading {kind} cache for {pvr}"))?;

    let items = if options.refresh_cache || cached.is_empty() {
        info!(pvr, kind = %kind, "refreshing wanted items from server");
        let fresh = client
            .fetch_wanted(kind)
            .await
            .with_context(|| format!("failed retrieving wanted {kind} items from {pvr}"))?;

        report.pruned = refresh_partition(cache, pvr, kind, &fresh)
            .with_context(|| format!("failed reconciling {kind} cache for {pvr}"))?;

        cache
            .load(pvr, kind)
            .with_context(|| format!("failed re-reading {kind} cache for {pvr}"))?
    } else {
        info!(pvr, kind = %kind, items = cached.len(), "reusing cached wanted items");
        cached
    };

    report.cached_items = items.len();

    for batch in items.chunks(options.batch_size) {
        if batch.len() < options.batch_size && options.trailing == TrailingBatch::Drop {
            report.skipped += batch.len();
            warn!(
                pvr,
                kind = %kind,
                remaining = batch.len(),
                "dropping trailing partial batch; rerun with trailing flush to search it"
            );
            continue;
        }

        let ids: Vec<i64> = batch.iter().map(|i| i.item_id).collect();

        // Stamps carry the batch's initiation time, not its completion.
        let search_time = Utc::now();
        client
            .search(&ids)
            .await
            .with_context(|| format!("failed searching batch of {} items on {pvr}", ids.len()))?;

        let stamped: Vec<MediaItem> = batch
            .iter()
            .map(|item| {
                let mut item = item.clone();
                item.last_search = Some(search_time);
                item
            })
            .collect();
        cache
            .update_items(pvr, kind, &stamped)
            .with_context(|| format!("failed stamping searched batch in {kind} cache for {pvr}"))?;

        report.searched += batch.len();
        info!(pvr, kind = %kind, batch = ids.len(), "searched batch");
    }

    info!(
        pvr,
        kind = %kind,
        searched = report.searched,
        skipped = report.skipped,
        "search run finished"
    );
    Ok(report)
}
