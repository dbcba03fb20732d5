use super::common;
use crate::Result;
use crate::facts::CollectedRepo;
use crate::facts::hosting::COLUMNS;
use core::fmt::Write;
use std::borrow::Cow;

/// Write one row per repository: passthrough input columns first, then the metric columns.
pub fn generate<W: Write>(columns: &[String], records: &[CollectedRepo], writer: &mut W) -> Result<()> {
    let passthrough = common::passthrough_columns(columns);

    let header = passthrough.iter().map(|(_, name)| *name).chain(COLUMNS);
    write_row(writer, header)?;

    for record in records {
        let source = passthrough
            .iter()
            .map(|(index, _)| record.source.get(*index).map_or("", String::as_str).to_string());
        let metrics = record.metrics.fields().into_iter().map(|field| field.to_cell());

        write_row(writer, source.chain(metrics))?;
    }

    Ok(())
}

fn write_row<W: Write, S: AsRef<str>>(writer: &mut W, cells: impl Iterator<Item = S>) -> Result<()> {
    for (i, cell) in cells.enumerate() {
        if i > 0 {
            write!(writer, ",")?;
        }
        write!(writer, "{}", escape_csv(cell.as_ref()))?;
    }
    writeln!(writer)?;
    Ok(())
}

/// Escape a value for RFC compliant CSV output.
///
/// Wraps the value in double quotes if it contains commas, newlines, or double quotes.
/// Internal double quotes are doubled per the RFC.
fn escape_csv(s: &str) -> Cow<'_, str> {
    if s.contains('"') {
        Cow::Owned(format!("\"{}\"", s.replace('"', "\"\"")))
    } else if s.contains(',') || s.contains('\n') || s.contains('\r') {
        Cow::Owned(format!("\"{s}\""))
    } else {
        Cow::Borrowed(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::hosting::RepoMetrics;

    const HEADER: &str = "repository,language,createdAt,repoAge,forks,watchers,stars,openIssues,closedIssues,totalIssues,\
                          issuesOpenedLast6Months,AvgIssueCloseTime,commits,dateOfLastCommit,daysOfActivity,\
                          commitsInLast6Months,activeDaysInLast6Months,committersParticipation";

    fn record(source: &[&str], metrics: RepoMetrics) -> CollectedRepo {
        CollectedRepo {
            source: source.iter().map(ToString::to_string).collect(),
            metrics,
        }
    }

    #[test]
    fn test_escape_csv_no_special_chars() {
        let result = escape_csv("hello world");
        assert_eq!(result, "hello world");
        assert!(matches!(result, Cow::Borrowed(_)));
    }

    #[test]
    fn test_escape_csv_with_quotes() {
        let result = escape_csv("hello \"world\"");
        assert_eq!(result, "\"hello \"\"world\"\"\"");
    }

    #[test]
    fn test_escape_csv_with_comma() {
        assert_eq!(escape_csv("hello,world"), "\"hello,world\"");
    }

    #[test]
    fn test_escape_csv_with_newline() {
        assert_eq!(escape_csv("hello\nworld"), "\"hello\nworld\"");
    }

    #[test]
    fn test_generate_empty() {
        let mut output = String::new();
        generate(&[], &[], &mut output).unwrap();
        assert_eq!(output, format!("{HEADER}\n"));
    }

    #[test]
    fn test_generate_with_passthrough_columns() {
        let columns = vec!["Title".to_string(), "Github_links".to_string()];
        let metrics = RepoMetrics {
            repository: "owner/game".into(),
            language: Some("C#".to_string()),
            stars: 4,
            avg_issue_close_days: Some(3.0),
            ..RepoMetrics::default()
        };

        let mut output = String::new();
        generate(&columns, &[record(&["Game, The", "https://github.com/owner/game"], metrics)], &mut output).unwrap();

        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], format!("Title,Github_links,{HEADER}"));
        assert_eq!(
            lines[1],
            "\"Game, The\",https://github.com/owner/game,owner/game,C#,,,0,0,4,0,0,0,0,3.00,0,,,0,0,0"
        );
    }

    #[test]
    fn test_generate_absent_values_are_empty() {
        let metrics = RepoMetrics {
            repository: "owner/game".into(),
            ..RepoMetrics::default()
        };

        let mut output = String::new();
        generate(&[], &[record(&[], metrics)], &mut output).unwrap();

        let row = output.lines().nth(1).unwrap();
        assert_eq!(row, "owner/game,,,,0,0,0,0,0,0,0,,0,,,0,0,0");
    }

    #[test]
    fn test_generate_short_source_row() {
        let columns = vec!["Title".to_string(), "Genre".to_string()];
        let metrics = RepoMetrics {
            repository: "owner/game".into(),
            ..RepoMetrics::default()
        };

        let mut output = String::new();
        generate(&columns, &[record(&["Only Title"], metrics)], &mut output).unwrap();

        assert!(output.lines().nth(1).unwrap().starts_with("Only Title,,owner/game,"));
    }
}
