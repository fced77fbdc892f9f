use crate::backend::{
    Backend, BareDateRecord, EpisodeRecord, Listing, MovieRecord, PagedResponse, QueueShape,
    RecordShape, ReleaseRecord, WantedRecord,
};
use crate::error::PvrError;
use crate::poller;
use crate::transport::{RestClient, RetryPolicy};
use async_trait::async_trait;
use pvr_sync_config::PvrConfig;
use pvr_sync_models::{MediaItem, WantedKind};
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Tunables that used to be package-level globals in older tools of this
/// kind; passed explicitly into the client instead of living as ambient
/// process state.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub page_size: u64,
    pub timeout: Duration,
    pub retry: RetryPolicy,
    /// Interval between command status polls.
    pub poll_interval: Duration,
    /// Overall ceiling on one search-and-wait call. `None` restores the
    /// historical unbounded wait.
    pub poll_deadline: Option<Duration>,
    /// External abort signal observed between polls.
    pub cancel: CancellationToken,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            page_size: 1000,
            timeout: Duration::from_secs(120),
            retry: RetryPolicy::default(),
            poll_interval: Duration::from_secs(10),
            poll_deadline: Some(Duration::from_secs(3600)),
            cancel: CancellationToken::new(),
        }
    }
}

/// The uniform PVR contract: every backend family exposes the same four
/// operations once initialized.
#[async_trait]
pub trait WantedSource: Send + Sync {
    fn name(&self) -> &str;

    /// Items currently active in the server's own download queue. Exposed
    /// for admission control by callers; the batch driver does not block
    /// on it.
    async fn queue_size(&self) -> Result<usize, PvrError>;

    /// The full wanted list for the given kind, fully paginated.
    async fn fetch_wanted(&self, kind: WantedKind) -> Result<Vec<MediaItem>, PvrError>;

    /// Trigger a remote search for the batch and block until the server
    /// reports a terminal state. Success means `completed`; every other
    /// outcome is an error, never a silent no.
    async fn search(&self, item_ids: &[i64]) -> Result<(), PvrError>;
}

#[derive(Debug, Deserialize)]
struct SystemStatus {
    #[serde(default)]
    version: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueuePage {
    #[serde(default)]
    total_records: usize,
}

#[derive(Debug, Deserialize)]
struct CommandQueued {
    id: i64,
}

pub struct PvrClient {
    name: String,
    backend: Backend,
    rest: RestClient,
    settings: ClientSettings,
    initialized: AtomicBool,
}

impl PvrClient {
    /// Build a client for the configured instance. The backend type tag
    /// picks the descriptor; an unknown tag is a configuration error.
    pub fn from_config(
        name: &str,
        config: &PvrConfig,
        settings: ClientSettings,
    ) -> Result<Self, PvrError> {
        let backend = Backend::from_tag(&config.kind)?;
        let descriptor = backend.descriptor();

        // Honor a base URL that already points at the api root.
        let api_url = if config.url.contains("/api") {
            config.url.clone()
        } else {
            format!(
                "{}{}",
                config.url.trim_end_matches('/'),
                descriptor.api_suffix
            )
        };

        let rest = RestClient::new(&api_url, &config.api_key, settings.timeout, settings.retry.clone())?;

        Ok(Self {
            name: name.to_string(),
            backend,
            rest,
            settings,
            initialized: AtomicBool::new(false),
        })
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Fetch the server version and verify it matches this backend's
    /// expectation. Must succeed before any other operation is allowed.
    pub async fn initialize(&self) -> Result<(), PvrError> {
        let status: SystemStatus = self.rest.get_json("/system/status", &[]).await?;
        let descriptor = self.backend.descriptor();

        if status.version.get(0..1) != Some(descriptor.expected_major) {
            return Err(PvrError::IncompatibleVersion {
                backend: descriptor.family,
                version: status.version,
            });
        }

        self.initialized.store(true, Ordering::SeqCst);
        debug!(pvr = %self.name, version = %status.version, "pvr initialized");
        Ok(())
    }

    fn ensure_initialized(&self) -> Result<(), PvrError> {
        if self.initialized.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(PvrError::NotInitialized)
        }
    }

    fn wanted_path(kind: WantedKind) -> &'static str {
        match kind {
            WantedKind::Missing => "/wanted/missing",
            WantedKind::CutoffUnmet => "/wanted/cutoff",
        }
    }

    /// Offset-paginated fetch: page 1 upward at a fixed page size; the
    /// first short page is the last one. When the total is an exact
    /// multiple of the page size the loop makes one extra request that
    /// returns zero records and terminates the same way.
    async fn fetch_paged<R: WantedRecord>(
        &self,
        kind: WantedKind,
        sort_key: &str,
    ) -> Result<Vec<MediaItem>, PvrError> {
        let path = Self::wanted_path(kind);
        let page_size = self.settings.page_size;
        let mut items = Vec::new();
        let mut page: u64 = 1;

        info!(pvr = %self.name, kind = %kind, "retrieving wanted media");

        loop {
            let query = [
                ("sortKey", sort_key.to_string()),
                ("pageSize", page_size.to_string()),
                ("monitored", "true".to_string()),
                ("page", page.to_string()),
            ];

            let response: PagedResponse<R> = self.rest.get_json(path, &query).await?;
            let fetched = response.records.len() as u64;

            items.extend(response.records.into_iter().map(R::into_media_item));
            debug!(pvr = %self.name, page, fetched, "wanted page retrieved");

            if fetched < page_size {
                break;
            }
            page += 1;
        }

        info!(pvr = %self.name, kind = %kind, media_items = items.len(), "finished retrieving wanted media");
        Ok(items)
    }

    /// Radarr-style single bulk listing with client-side eligibility.
    async fn fetch_movies(&self, kind: WantedKind) -> Result<Vec<MediaItem>, PvrError> {
        info!(pvr = %self.name, kind = %kind, "retrieving movie collection");

        let records: Vec<MovieRecord> = self.rest.get_json("/movie", &[]).await?;
        let total = records.len();

        let items: Vec<MediaItem> = records
            .into_iter()
            .filter(|movie| match kind {
                WantedKind::Missing => movie.is_missing(),
                WantedKind::CutoffUnmet => movie.is_cutoff_unmet(),
            })
            .map(MovieRecord::into_media_item)
            .collect();

        info!(pvr = %self.name, kind = %kind, total, media_items = items.len(), "finished retrieving wanted media");
        Ok(items)
    }
}

#[async_trait]
impl WantedSource for PvrClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn queue_size(&self) -> Result<usize, PvrError> {
        self.ensure_initialized()?;

        let size = match self.backend.descriptor().queue_shape {
            QueueShape::TotalRecords => {
                let queue: QueuePage = self.rest.get_json("/queue", &[]).await?;
                queue.total_records
            }
            QueueShape::BareArray => {
                let queue: Vec<serde_json::Value> = self.rest.get_json("/queue", &[]).await?;
                queue.len()
            }
        };

        debug!(pvr = %self.name, queue_size = size, "queue retrieved");
        Ok(size)
    }

    async fn fetch_wanted(&self, kind: WantedKind) -> Result<Vec<MediaItem>, PvrError> {
        self.ensure_initialized()?;

        match &self.backend.descriptor().listing {
            Listing::MovieCollection => self.fetch_movies(kind).await,
            Listing::Paged { sort_key, shape } => match shape {
                RecordShape::Episode => self.fetch_paged::<EpisodeRecord>(kind, sort_key).await,
                RecordShape::Release => self.fetch_paged::<ReleaseRecord>(kind, sort_key).await,
                RecordShape::BareReleaseDate => {
                    self.fetch_paged::<BareDateRecord>(kind, sort_key).await
                }
            },
        }
    }

    async fn search(&self, item_ids: &[i64]) -> Result<(), PvrError> {
        self.ensure_initialized()?;

        let descriptor = self.backend.descriptor();
        let mut payload = serde_json::Map::new();
        payload.insert(
            "name".to_string(),
            serde_json::Value::from(descriptor.search_command),
        );
        payload.insert(
            descriptor.ids_field.to_string(),
            serde_json::Value::from(item_ids.to_vec()),
        );

        let queued: CommandQueued = self
            .rest
            .post_json("/command", &payload, StatusCode::CREATED)
            .await?;

        debug!(pvr = %self.name, command_id = queued.id, "monitoring search status");

        poller::wait_for_completion(
            &self.rest,
            queued.id,
            self.settings.poll_interval,
            self.settings.poll_deadline,
            &self.settings.cancel,
        )
        .await
    }
}
