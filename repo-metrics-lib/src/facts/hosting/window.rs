//! Time-windowed aggregation over commit and issue records.
//!
//! All functions here are pure. Records whose timestamps cannot be parsed are left out
//! of every aggregate instead of being reported as errors.

use super::client::{Account, CommitEntry};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::Deserialize;
use std::collections::BTreeSet;

const MILLIS_PER_DAY: f64 = 86_400_000.0;
const SECONDS_PER_DAY: i64 = 86_400;

/// Identity used when a commit carries neither a login nor an email.
pub const UNKNOWN_IDENTITY: &str = "unknown";

/// A trailing period ending at `now`. The lower bound is inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    now: DateTime<Utc>,
    start: DateTime<Utc>,
}

impl Window {
    /// A window of `days` days ending at `now`. A start before the earliest
    /// representable instant is clamped to that instant.
    #[must_use]
    pub fn trailing(now: DateTime<Utc>, days: u32) -> Self {
        Self {
            now,
            start: now
                .checked_sub_signed(chrono::Duration::days(i64::from(days)))
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
        }
    }

    #[must_use]
    pub const fn now(&self) -> DateTime<Utc> {
        self.now
    }

    #[must_use]
    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    #[must_use]
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start
    }

    /// The window start as accepted by the `since` parameter of the commits endpoint.
    #[must_use]
    pub fn since_param(&self) -> String {
        self.start.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    /// The window start as a `YYYY-MM-DD` date, for search qualifiers.
    #[must_use]
    pub fn start_date(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }
}

/// Parse an API timestamp such as `2024-05-01T10:00:00Z`.
#[must_use]
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.with_timezone(&Utc))
}

/// The parts of a commit the aggregates look at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    pub identity: String,
    pub committed_at: Option<DateTime<Utc>>,
}

impl From<&CommitEntry> for CommitRecord {
    fn from(entry: &CommitEntry) -> Self {
        let identity = account_login(entry.author.as_ref())
            .or_else(|| account_login(entry.committer.as_ref()))
            .or_else(|| entry.committer_email().filter(|e| !e.is_empty()))
            .unwrap_or(UNKNOWN_IDENTITY);

        Self {
            identity: identity.to_string(),
            committed_at: entry.committer_date().and_then(parse_timestamp),
        }
    }
}

fn account_login(account: Option<&Account>) -> Option<&str> {
    account.and_then(|a| a.login.as_deref()).filter(|l| !l.is_empty())
}

/// An issue as returned by the search endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IssueRecord {
    pub created_at: Option<String>,
    pub closed_at: Option<String>,
}

/// Aggregates derived from one window.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WindowMetrics {
    pub count_in_window: u64,
    pub unique_identities: u64,
    pub average_duration_days: Option<f64>,
    pub active_days: u64,
}

/// Commits whose committer timestamp falls inside the window.
#[must_use]
pub fn commits_in_window(commits: &[CommitRecord], window: &Window) -> u64 {
    commits
        .iter()
        .filter(|c| c.committed_at.is_some_and(|ts| window.contains(ts)))
        .count() as u64
}

/// Distinct UTC calendar days with at least one commit inside the window.
#[must_use]
pub fn active_days_in_window(commits: &[CommitRecord], window: &Window) -> u64 {
    let days: BTreeSet<NaiveDate> = commits
        .iter()
        .filter_map(|c| c.committed_at)
        .filter(|ts| window.contains(*ts))
        .map(|ts| ts.date_naive())
        .collect();

    days.len() as u64
}

/// Number of distinct commit identities among commits with a parsable timestamp.
#[must_use]
pub fn unique_committers(commits: &[CommitRecord]) -> u64 {
    let identities: BTreeSet<&str> = commits
        .iter()
        .filter(|c| c.committed_at.is_some())
        .map(|c| c.identity.as_str())
        .collect();

    identities.len() as u64
}

/// Mean time in days from creation to close for issues closed inside the window.
///
/// Negative durations are discarded. The result is rounded to two decimals, and is
/// `None` when no issue qualifies.
#[must_use]
#[expect(clippy::cast_precision_loss, reason = "millisecond deltas and issue counts are far below 2^52")]
pub fn average_close_days(issues: &[IssueRecord], window: &Window) -> Option<f64> {
    let deltas: Vec<f64> = issues
        .iter()
        .filter_map(|issue| {
            let created = parse_timestamp(issue.created_at.as_deref()?)?;
            let closed = parse_timestamp(issue.closed_at.as_deref()?)?;
            window.contains(closed).then(|| (closed - created).num_milliseconds() as f64 / MILLIS_PER_DAY)
        })
        .filter(|days| *days >= 0.0)
        .collect();

    if deltas.is_empty() {
        return None;
    }

    let mean = deltas.iter().sum::<f64>() / deltas.len() as f64;
    Some((mean * 100.0).round() / 100.0)
}

/// Whole days from `created` to `latest`, rounded toward the past.
#[must_use]
pub fn activity_span_days(created: DateTime<Utc>, latest: DateTime<Utc>) -> i64 {
    (latest - created).num_seconds().div_euclid(SECONDS_PER_DAY)
}

/// Whole days since `created`, as seen from `now`.
#[must_use]
pub fn age_days(created: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    activity_span_days(created, now)
}

/// Fold commit and closed-issue records into the window aggregates.
#[must_use]
pub fn summarize(recent_commits: &[CommitRecord], all_commits: &[CommitRecord], closed_issues: &[IssueRecord], window: &Window) -> WindowMetrics {
    WindowMetrics {
        count_in_window: commits_in_window(recent_commits, window),
        unique_identities: unique_committers(all_commits),
        average_duration_days: average_close_days(closed_issues, window),
        active_days: active_days_in_window(recent_commits, window),
    }
}
