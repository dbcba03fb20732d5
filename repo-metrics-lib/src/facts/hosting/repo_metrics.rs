use compact_str::CompactString;
use serde_json::Value;

/// Names of the derived columns, in output order.
pub const COLUMNS: [&str; 18] = [
    "repository",
    "language",
    "createdAt",
    "repoAge",
    "forks",
    "watchers",
    "stars",
    "openIssues",
    "closedIssues",
    "totalIssues",
    "issuesOpenedLast6Months",
    "AvgIssueCloseTime",
    "commits",
    "dateOfLastCommit",
    "daysOfActivity",
    "commitsInLast6Months",
    "activeDaysInLast6Months",
    "committersParticipation",
];

/// Metrics derived for one repository.
///
/// Optional fields stay `None` when the upstream data was missing or unparsable, so
/// "no closed issues" can be told apart from an average of zero days.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepoMetrics {
    pub repository: CompactString,
    pub language: Option<String>,
    pub created_at: Option<String>,
    pub repo_age_days: Option<i64>,
    pub forks: u64,
    pub watchers: u64,
    pub stars: u64,
    pub open_issues: u64,
    pub closed_issues: u64,
    pub total_issues: u64,
    pub issues_opened_in_window: u64,
    pub avg_issue_close_days: Option<f64>,
    pub commits: u64,
    pub last_commit_date: Option<String>,
    pub days_of_activity: Option<i64>,
    pub commits_in_window: u64,
    pub active_days_in_window: u64,
    pub committers: u64,
}

/// A single output cell.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue<'a> {
    Text(Option<&'a str>),
    Integer(Option<i64>),
    Count(u64),
    Days(Option<f64>),
}

impl FieldValue<'_> {
    /// Render the value as a CSV cell; absent values become an empty cell.
    #[must_use]
    pub fn to_cell(&self) -> String {
        match self {
            Self::Text(v) => v.unwrap_or_default().to_string(),
            Self::Integer(v) => v.map(|n| n.to_string()).unwrap_or_default(),
            Self::Count(n) => n.to_string(),
            Self::Days(v) => v.map(|d| format!("{d:.2}")).unwrap_or_default(),
        }
    }

    /// Render the value as JSON; absent values become `null`.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Text(v) => v.map_or(Value::Null, |s| Value::String(s.to_string())),
            Self::Integer(v) => v.map_or(Value::Null, Value::from),
            Self::Count(n) => Value::from(*n),
            Self::Days(v) => v.map_or(Value::Null, Value::from),
        }
    }
}

impl RepoMetrics {
    /// The record's values, aligned with [`COLUMNS`].
    #[must_use]
    pub fn fields(&self) -> [FieldValue<'_>; COLUMNS.len()] {
        [
            FieldValue::Text(Some(self.repository.as_str())),
            FieldValue::Text(self.language.as_deref()),
            FieldValue::Text(self.created_at.as_deref()),
            FieldValue::Integer(self.repo_age_days),
            FieldValue::Count(self.forks),
            FieldValue::Count(self.watchers),
            FieldValue::Count(self.stars),
            FieldValue::Count(self.open_issues),
            FieldValue::Count(self.closed_issues),
            FieldValue::Count(self.total_issues),
            FieldValue::Count(self.issues_opened_in_window),
            FieldValue::Days(self.avg_issue_close_days),
            FieldValue::Count(self.commits),
            FieldValue::Text(self.last_commit_date.as_deref()),
            FieldValue::Integer(self.days_of_activity),
            FieldValue::Count(self.commits_in_window),
            FieldValue::Count(self.active_days_in_window),
            FieldValue::Count(self.committers),
        ]
    }
}
