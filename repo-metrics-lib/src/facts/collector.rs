use super::hosting::{DEFAULT_API_BASE_URL, DEFAULT_REQUEST_TIMEOUT, DEFAULT_USER_AGENT, Provider, RepoMetrics};
use super::progress::Progress;
use super::resilient_http::{DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY};
use super::source_list::SourceList;
use super::{ProviderResult, RepoSpec};
use crate::Result;
use chrono::{DateTime, Utc};
use core::time::Duration;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const LOG_TARGET: &str = " collector";

/// Everything the collector needs to know to talk to the API.
#[derive(Debug, Clone)]
pub struct CollectorSettings {
    /// Bearer token; `None` means anonymous access.
    pub token: Option<String>,
    pub api_base_url: String,
    pub user_agent: String,

    /// Length of the trailing activity window.
    pub window_days: u32,
    pub page_size: u8,

    /// Upper bound on pages fetched from the search endpoint.
    pub max_search_pages: u32,
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub request_timeout: Duration,

    /// The instant the activity window ends at.
    pub now: DateTime<Utc>,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            token: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            window_days: 180,
            page_size: 100,
            max_search_pages: 10,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            now: Utc::now(),
        }
    }
}

/// Metrics of one repository along with the input row it came from.
#[derive(Debug, Clone)]
pub struct CollectedRepo {
    pub source: Vec<String>,
    pub metrics: RepoMetrics,
}

/// A repository left out of the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRepo {
    pub identifier: String,
    pub reason: String,
}

/// Outcome of a collection run.
#[derive(Debug, Clone, Default)]
pub struct Collection {
    /// Collected records, in input order.
    pub records: Vec<CollectedRepo>,
    pub skipped: Vec<SkippedRepo>,

    /// Whether the run stopped early because it was cancelled.
    pub cancelled: bool,
}

/// Collects repository metrics one repository at a time
pub struct Collector {
    provider: Provider,
    cancel: CancellationToken,
    progress: Arc<dyn Progress>,
}

impl core::fmt::Debug for Collector {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Collector")
            .field("provider", &self.provider)
            .field("cancel", &self.cancel)
            .field("progress", &"<dyn Progress>")
            .finish()
    }
}

impl Collector {
    pub fn new(settings: &CollectorSettings, cancel: CancellationToken, progress: impl Progress + 'static) -> Result<Self> {
        Ok(Self {
            provider: Provider::new(settings, cancel.clone())?,
            cancel,
            progress: Arc::new(progress),
        })
    }

    /// Collect metrics for every repository of `sources`.
    ///
    /// Repositories that cannot be resolved or fetched are reported in
    /// [`Collection::skipped`] and never abort the run. Once cancelled, the repository
    /// in flight is discarded and no further repositories are started.
    pub async fn collect(&self, sources: &SourceList) -> Collection {
        let mut collection = Collection::default();

        self.progress.set_phase("Collecting");
        self.progress.set_total(sources.len() as u64);

        for row in sources.rows() {
            if self.cancel.is_cancelled() {
                collection.cancelled = true;
                break;
            }

            let Some(identifier) = row.identifier.as_deref() else {
                log::debug!(target: LOG_TARGET, "Skipping input row without a repository identifier");
                self.progress.advance("");
                continue;
            };

            let repo_spec = match RepoSpec::from_identifier(identifier) {
                Ok(spec) => spec,
                Err(e) => {
                    log::warn!(target: LOG_TARGET, "Skipping '{identifier}': {e}");
                    collection.skipped.push(SkippedRepo {
                        identifier: identifier.to_string(),
                        reason: e.to_string(),
                    });
                    self.progress.advance(identifier);
                    continue;
                }
            };

            let result = self.provider.get_repo_metrics(&repo_spec).await;

            if self.cancel.is_cancelled() {
                log::info!(target: LOG_TARGET, "Collection cancelled, discarding in-flight repository '{repo_spec}'");
                collection.cancelled = true;
                break;
            }

            match result {
                ProviderResult::Found(metrics) => collection.records.push(CollectedRepo {
                    source: row.values.clone(),
                    metrics,
                }),

                failed => {
                    let reason = failed.failure_reason().unwrap_or_default();
                    log::warn!(target: LOG_TARGET, "Skipping repository '{repo_spec}': {reason}");
                    collection.skipped.push(SkippedRepo {
                        identifier: identifier.to_string(),
                        reason,
                    });
                }
            }

            self.progress.advance(identifier);
        }

        self.progress.done();

        log::info!(
            target: LOG_TARGET,
            "Collected {} repositories ({} skipped) using {} request(s)",
            collection.records.len(),
            collection.skipped.len(),
            self.provider.request_count()
        );

        collection
    }
}
