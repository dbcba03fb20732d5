//! GitHub API session
//!
//! Minimal GitHub API plumbing: an authenticated HTTP session and the response
//! shapes for the endpoints we query.

use crate::Result;
use crate::facts::RepoSpec;
use core::time::Duration;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Deserialize;

pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";
pub const DEFAULT_USER_AGENT: &str = "repo-metrics";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Authenticated HTTP session with the standard GitHub headers.
///
/// Immutable once built; the underlying connection pool is shared by clones.
#[derive(Debug, Clone)]
pub struct Session {
    client: reqwest::Client,
    base_url: String,
}

impl Session {
    /// Create a session with an optional bearer token.
    ///
    /// A missing or empty token yields anonymous access, which GitHub rate limits heavily.
    pub fn new(token: Option<&str>, base_url: &str, user_agent: &str, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let _ = headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));

        if let Some(t) = token.filter(|t| !t.is_empty()) {
            let mut auth_val = HeaderValue::from_str(&format!("Bearer {t}"))?;
            auth_val.set_sensitive(true);
            let _ = headers.insert(AUTHORIZATION, auth_val);
        }

        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    #[must_use]
    pub const fn http(&self) -> &reqwest::Client {
        &self.client
    }

    #[must_use]
    pub fn repo_url(&self, repo_spec: &RepoSpec) -> String {
        format!("{}/repos/{}/{}", self.base_url, repo_spec.owner(), repo_spec.repo())
    }

    #[must_use]
    pub fn commits_url(&self, repo_spec: &RepoSpec) -> String {
        format!("{}/commits", self.repo_url(repo_spec))
    }

    #[must_use]
    pub fn search_issues_url(&self) -> String {
        format!("{}/search/issues", self.base_url)
    }
}

/// Repository metadata; timestamps stay raw so unparsable values can be reported as-is.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Repository {
    pub language: Option<String>,
    pub created_at: Option<String>,
    pub stargazers_count: Option<u64>,
    pub forks_count: Option<u64>,
    pub watchers_count: Option<u64>,
    pub open_issues_count: Option<u64>,
}

/// One entry of the commits listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommitEntry {
    pub commit: Option<CommitDetail>,
    pub author: Option<Account>,
    pub committer: Option<Account>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommitDetail {
    pub committer: Option<Signature>,
}

/// Git-level identity attached to a commit
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Signature {
    pub date: Option<String>,
    pub email: Option<String>,
}

/// GitHub account linked to a commit, when GitHub could match one
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Account {
    pub login: Option<String>,
}

impl CommitEntry {
    #[must_use]
    pub fn committer_date(&self) -> Option<&str> {
        self.signature()?.date.as_deref()
    }

    #[must_use]
    pub fn committer_email(&self) -> Option<&str> {
        self.signature()?.email.as_deref()
    }

    fn signature(&self) -> Option<&Signature> {
        self.commit.as_ref()?.committer.as_ref()
    }
}

/// Response of the issue search endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResults {
    pub total_count: Option<u64>,
}
