use super::client::{CommitEntry, Repository, Session};
use super::paginator::{Listing, Paginator};
use super::repo_metrics::RepoMetrics;
use super::window::{self, CommitRecord, IssueRecord, Window};
use crate::Result;
use crate::facts::collector::CollectorSettings;
use crate::facts::rate_limit_gate::RateLimitGate;
use crate::facts::resilient_http::{Executor, RetryPolicy};
use crate::facts::{ProviderResult, RepoSpec};
use compact_str::format_compact;
use ohno::IntoAppError;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const LOG_TARGET: &str = "   hosting";

/// Commit-derived inputs of one repository.
#[derive(Debug, Default)]
struct CommitData {
    total: Option<u64>,
    latest_date: Option<String>,
    recent: Vec<CommitRecord>,
    all: Vec<CommitRecord>,
}

/// Issue-derived inputs of one repository. Counts are `None` when their search failed.
#[derive(Debug, Default)]
struct IssueData {
    total: Option<u64>,
    open: Option<u64>,
    closed: Option<u64>,
    opened_in_window: Option<u64>,
    closed_in_window: Vec<IssueRecord>,
}

/// Gathers repository metrics from the GitHub API.
///
/// Requests are issued strictly one at a time. Within a repository, a failed commit
/// or issue request only degrades the fields it feeds.
#[derive(Debug)]
pub struct Provider {
    session: Session,
    executor: Executor,
    page_size: u8,
    max_search_pages: u32,
    window: Window,
}

impl Provider {
    pub fn new(settings: &CollectorSettings, cancel: CancellationToken) -> Result<Self> {
        let session = Session::new(
            settings.token.as_deref(),
            &settings.api_base_url,
            &settings.user_agent,
            settings.request_timeout,
        )?;

        let policy = RetryPolicy {
            max_attempts: settings.max_attempts,
            retry_delay: settings.retry_delay,
            request_timeout: settings.request_timeout,
        };

        let executor = Executor::new(session.http().clone(), policy, RateLimitGate::new(), cancel);
        let window = Window::trailing(settings.now, settings.window_days);
        log::debug!(target: LOG_TARGET, "Activity window runs from {} to {}", window.start(), window.now());

        Ok(Self {
            session,
            executor,
            page_size: settings.page_size,
            max_search_pages: settings.max_search_pages,
            window,
        })
    }

    /// Number of HTTP requests issued so far, retries included.
    #[must_use]
    pub fn request_count(&self) -> u64 {
        self.executor.request_count()
    }

    /// Collect the metrics of one repository.
    ///
    /// A repository whose metadata cannot be fetched yields `Unavailable`. Failures of
    /// the commit and issue endpoints are absorbed into default field values.
    pub async fn get_repo_metrics(&self, repo_spec: &RepoSpec) -> ProviderResult<RepoMetrics> {
        let before = self.executor.request_count();
        log::info!(target: LOG_TARGET, "Querying GitHub for metrics on repository '{repo_spec}'");

        let result = match self.fetch_repo_metrics(repo_spec).await {
            Ok(result) => result,
            Err(e) => {
                log::debug!(target: LOG_TARGET, "Could not collect metrics for repository '{repo_spec}': {e:#}");
                ProviderResult::Error(Arc::new(e))
            }
        };

        log::debug!(
            target: LOG_TARGET,
            "Issued {} request(s) for repository '{repo_spec}'",
            self.executor.request_count() - before
        );

        result
    }

    async fn fetch_repo_metrics(&self, repo_spec: &RepoSpec) -> Result<ProviderResult<RepoMetrics>> {
        let repo = match self.get_repo_info(repo_spec).await? {
            Ok(repo) => repo,
            Err(reason) => return Ok(ProviderResult::Unavailable(reason.into())),
        };

        let commits = self.get_commit_data(repo_spec).await?;
        let issues = self.get_issue_data(repo_spec).await?;

        Ok(ProviderResult::Found(assemble(repo_spec, &repo, &commits, &issues, &self.window)))
    }

    /// Fetch repository metadata, yielding `Err(reason)` for a non-2xx response.
    async fn get_repo_info(&self, repo_spec: &RepoSpec) -> Result<Result<Repository, String>> {
        let url = self.session.repo_url(repo_spec);
        let outcome = self.executor.execute(&url, &[]).await?;

        if !outcome.is_success() {
            log::debug!(target: LOG_TARGET, "Repository info request for '{repo_spec}' returned {}", outcome.status);
            return Ok(Err(format!("repository info request returned {}", outcome.status)));
        }

        let repo = serde_json::from_value(outcome.body).into_app_err_with(|| format!("parsing repository info for '{repo_spec}'"))?;
        Ok(Ok(repo))
    }

    async fn get_commit_data(&self, repo_spec: &RepoSpec) -> Result<CommitData> {
        let url = self.session.commits_url(repo_spec);
        let paginator = Paginator::new(&self.executor, self.page_size);

        let (total, latest_date) = match paginator.probe(&url, &[]).await? {
            Some(probe) => {
                let latest = probe
                    .first
                    .and_then(|first| serde_json::from_value::<CommitEntry>(first).ok())
                    .and_then(|entry| entry.committer_date().map(str::to_string));
                (probe.total, latest)
            }
            None => (None, None),
        };

        let since = [("since", self.window.since_param())];
        let recent: Vec<CommitEntry> = paginator.walk(&url, &since, Listing::Array, None).await?;
        let all: Vec<CommitEntry> = paginator.walk(&url, &[], Listing::Array, None).await?;

        Ok(CommitData {
            total,
            latest_date,
            recent: recent.iter().map(CommitRecord::from).collect(),
            all: all.iter().map(CommitRecord::from).collect(),
        })
    }

    async fn get_issue_data(&self, repo_spec: &RepoSpec) -> Result<IssueData> {
        let url = self.session.search_issues_url();
        let paginator = Paginator::new(&self.executor, self.page_size);
        let start_date = self.window.start_date();
        let search = |qualifiers: &str| format!("repo:{repo_spec} {qualifiers}");

        let total = paginator.search_total(&url, &search("type:issue")).await?;
        let open = paginator.search_total(&url, &search("type:issue state:open")).await?;
        let closed = paginator.search_total(&url, &search("type:issue state:closed")).await?;
        let opened_in_window = paginator
            .search_total(&url, &search(&format!("type:issue created:>={start_date}")))
            .await?;

        let query = [
            ("q", search(&format!("type:issue is:closed closed:>={start_date}"))),
            ("sort", "updated".to_string()),
            ("order", "desc".to_string()),
        ];
        let closed_in_window: Vec<IssueRecord> = paginator
            .walk(&url, &query, Listing::SearchItems, Some(self.max_search_pages))
            .await?;

        Ok(IssueData {
            total,
            open,
            closed,
            opened_in_window,
            closed_in_window,
        })
    }
}

/// Merge fetched data into one record. Pure; performs no I/O.
fn assemble(repo_spec: &RepoSpec, repo: &Repository, commits: &CommitData, issues: &IssueData, window: &Window) -> RepoMetrics {
    let summary = window::summarize(&commits.recent, &commits.all, &issues.closed_in_window, window);

    let created = repo.created_at.as_deref().and_then(window::parse_timestamp);
    let latest = commits.latest_date.as_deref().and_then(window::parse_timestamp);

    RepoMetrics {
        repository: format_compact!("{repo_spec}"),
        language: repo.language.clone(),
        created_at: repo.created_at.clone(),
        repo_age_days: created.map(|c| window::age_days(c, window.now())),
        forks: repo.forks_count.unwrap_or(0),
        watchers: repo.watchers_count.unwrap_or(0),
        stars: repo.stargazers_count.unwrap_or(0),
        open_issues: issues.open.or(repo.open_issues_count).unwrap_or(0),
        closed_issues: issues.closed.unwrap_or(0),
        total_issues: issues.total.unwrap_or(0),
        issues_opened_in_window: issues.opened_in_window.unwrap_or(0),
        avg_issue_close_days: summary.average_duration_days,
        commits: commits.total.unwrap_or(0),
        last_commit_date: commits.latest_date.clone(),
        days_of_activity: created.zip(latest).map(|(c, l)| window::activity_span_days(c, l)),
        commits_in_window: summary.count_in_window,
        active_days_in_window: summary.active_days,
        committers: summary.unique_identities,
    }
}
