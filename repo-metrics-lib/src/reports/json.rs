use super::common;
use crate::Result;
use crate::facts::CollectedRepo;
use crate::facts::hosting::COLUMNS;
use core::fmt::Write;
use serde_json::{Map, Value, json};

/// Write an array with one object per repository. Absent metric values are `null`.
#[expect(unused_results, reason = "Map::insert intentionally overwrites values")]
pub fn generate<W: Write>(columns: &[String], records: &[CollectedRepo], writer: &mut W) -> Result<()> {
    let passthrough = common::passthrough_columns(columns);
    let mut repos = Vec::with_capacity(records.len());

    for record in records {
        let mut repo_obj = Map::new();

        for (index, name) in &passthrough {
            let value = record.source.get(*index).map_or("", String::as_str);
            repo_obj.insert((*name).to_string(), json!(value));
        }

        for (name, field) in COLUMNS.iter().zip(record.metrics.fields()) {
            repo_obj.insert((*name).to_string(), field.to_json());
        }

        repos.push(Value::Object(repo_obj));
    }

    write!(writer, "{}", serde_json::to_string_pretty(&repos)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::hosting::RepoMetrics;

    fn record(source: &[&str], metrics: RepoMetrics) -> CollectedRepo {
        CollectedRepo {
            source: source.iter().map(ToString::to_string).collect(),
            metrics,
        }
    }

    #[test]
    fn test_generate_empty() {
        let mut output = String::new();
        generate(&[], &[], &mut output).unwrap();
        assert_eq!(output, "[]");
    }

    #[test]
    fn test_generate_record() {
        let columns = vec!["Title".to_string()];
        let metrics = RepoMetrics {
            repository: "owner/game".into(),
            language: Some("Rust".to_string()),
            repo_age_days: Some(10),
            commits: 42,
            avg_issue_close_days: Some(0.0),
            ..RepoMetrics::default()
        };

        let mut output = String::new();
        generate(&columns, &[record(&["My Game"], metrics)], &mut output).unwrap();

        let parsed: Value = serde_json::from_str(&output).unwrap();
        let repo = &parsed[0];
        assert_eq!(repo["Title"], "My Game");
        assert_eq!(repo["repository"], "owner/game");
        assert_eq!(repo["language"], "Rust");
        assert_eq!(repo["repoAge"], 10);
        assert_eq!(repo["commits"], 42);
        assert_eq!(repo["AvgIssueCloseTime"], json!(0.0));
        assert_eq!(repo["dateOfLastCommit"], Value::Null);
        assert_eq!(repo["daysOfActivity"], Value::Null);
        assert_eq!(repo.as_object().unwrap().len(), COLUMNS.len() + 1);
    }

    #[test]
    fn test_keys_follow_column_order() {
        let columns = vec!["Title".to_string(), "Genre".to_string()];
        let metrics = RepoMetrics {
            repository: "owner/game".into(),
            ..RepoMetrics::default()
        };

        let mut output = String::new();
        generate(&columns, &[record(&["My Game", "Puzzle"], metrics)], &mut output).unwrap();

        let parsed: Value = serde_json::from_str(&output).unwrap();
        let keys: Vec<&str> = parsed[0].as_object().unwrap().keys().map(String::as_str).collect();

        let mut expected = vec!["Title", "Genre"];
        expected.extend(COLUMNS.iter().copied());
        assert_eq!(keys, expected);
    }

    #[test]
    fn test_absent_average_is_null() {
        let metrics = RepoMetrics {
            repository: "owner/game".into(),
            ..RepoMetrics::default()
        };

        let mut output = String::new();
        generate(&[], &[record(&[], metrics)], &mut output).unwrap();

        let parsed: Value = serde_json::from_str(&output).unwrap();
        assert!(parsed[0]["AvgIssueCloseTime"].is_null());
        assert_eq!(parsed[0]["openIssues"], 0);
    }
}
