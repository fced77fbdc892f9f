use crate::WantedArgs;
use color_eyre::eyre::{eyre, Context};
use color_eyre::Result;
use pvr_sync_clients::{ClientSettings, PvrClient, WantedSource};
use pvr_sync_config::{Config, PathManager};
use pvr_sync_core::{run_search, CacheStore, SearchOptions, TrailingBatch};
use pvr_sync_models::WantedKind;
use std::path::PathBuf;
use tracing::{info, warn};

/// One run to completion for `wantsync missing` / `wantsync cutoff`:
/// load config, bring up the client, admission-check the server queue,
/// then hand over to the batch driver.
pub async fn run(
    kind: WantedKind,
    args: WantedArgs,
    config_path: Option<PathBuf>,
    cache_dir: Option<PathBuf>,
) -> Result<()> {
    let paths = PathManager::new().map_err(|e| eyre!("failed resolving app directories: {e}"))?;
    let config_path = config_path.unwrap_or_else(|| paths.config_file());
    let config = Config::load_from_file(&config_path)
        .wrap_err_with(|| format!("failed loading config from {}", config_path.display()))?;

    let pvr_config = config
        .pvr(&args.pvr)
        .wrap_err("failed validating inputs")?;

    let settings = ClientSettings {
        page_size: pvr_config.page_size.unwrap_or(1000),
        ..ClientSettings::default()
    };

    // Ctrl-C aborts a stuck command wait instead of leaving the process
    // blocked on the server.
    let cancel = settings.cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling in-flight command wait");
            cancel.cancel();
        }
    });

    let client = PvrClient::from_config(&args.pvr, pvr_config, settings)
        .wrap_err_with(|| format!("failed loading pvr object for {:?}", args.pvr))?;
    client
        .initialize()
        .await
        .wrap_err_with(|| format!("failed initializing pvr {:?}", args.pvr))?;

    // Admission control: leave the server alone while its own queue is
    // still busy working through earlier grabs.
    let queue_size = client.queue_size().await.wrap_err("failed retrieving queue size")?;
    if queue_size >= args.max_queue_size {
        warn!(
            queue_size,
            max_queue_size = args.max_queue_size,
            "server queue is at capacity, skipping this run"
        );
        return Ok(());
    }

    let cache_dir = cache_dir.unwrap_or_else(|| paths.cache_dir().to_path_buf());
    let cache = CacheStore::open(&cache_dir)
        .wrap_err_with(|| format!("failed opening cache at {}", cache_dir.display()))?;

    let options = SearchOptions {
        batch_size: args.batch_size as usize,
        refresh_cache: args.refresh_cache,
        trailing: if args.search_trailing {
            TrailingBatch::Flush
        } else {
            TrailingBatch::Drop
        },
    };

    let report = run_search(&client, &cache, kind, &options)
        .await
        .map_err(|e| eyre!("{e:#}"))?;

    info!(
        pvr = %args.pvr,
        kind = %kind,
        searched = report.searched,
        skipped = report.skipped,
        pruned = report.pruned,
        "run complete"
    );
    Ok(())
}
