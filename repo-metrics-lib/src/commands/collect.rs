use super::Host;
use super::ProgressReporter;
use super::common::{ColorMode, LogLevel, ReportTargets, init_logging, write_reports};
use super::config::Config;
use crate::Result;
use crate::facts::{Collector, SourceList};
use camino::Utf8PathBuf;
use chrono::Utc;
use clap::Parser;
use core::time::Duration;
use ohno::{IntoAppError, bail};
use std::io::Write;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const LOG_TARGET: &str = "   collect";

#[derive(Parser, Debug)]
pub struct CollectArgs {
    /// Repository links to collect (format: `https://github.com/owner/name`)
    #[arg(value_name = "REPO")]
    pub repos: Vec<String>,

    /// CSV file listing the repositories to collect
    #[arg(long, short = 'i', value_name = "PATH")]
    pub input: Option<Utf8PathBuf>,

    /// Column of the input file holding repository links (overrides the configuration)
    #[arg(long, value_name = "NAME")]
    pub identifier_column: Option<String>,

    /// GitHub personal access token
    #[arg(long, value_name = "TOKEN", env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// Path to configuration file (default is `repo-metrics.toml` in the current directory)
    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: Option<Utf8PathBuf>,

    /// Stop starting new repositories after this long and write what was collected (e.g. `90m`)
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub max_duration: Option<Duration>,

    /// Control when to use colored output
    #[arg(long, value_name = "WHEN", default_value = "auto")]
    pub color: ColorMode,

    /// Set the logging level for diagnostic output
    #[arg(long, value_name = "LEVEL", default_value = "none")]
    pub log_level: LogLevel,

    /// Output repository metrics to a CSV file instead of to the terminal
    #[arg(long, value_name = "PATH", help_heading = "Report Output")]
    pub csv: Option<Utf8PathBuf>,

    /// Output repository metrics to a JSON file
    #[arg(long, value_name = "PATH", help_heading = "Report Output")]
    pub json: Option<Utf8PathBuf>,
}

fn parse_duration(s: &str) -> core::result::Result<Duration, String> {
    humantime_serde::re::humantime::parse_duration(s).map_err(|e| e.to_string())
}

pub async fn process_collect<H: Host>(host: &mut H, args: &CollectArgs) -> Result<()> {
    init_logging(args.log_level);

    let base_dir = Utf8PathBuf::try_from(std::env::current_dir().into_app_err("determining the current directory")?)
        .into_app_err("current directory is not valid UTF-8")?;
    let config = Config::load(&base_dir, args.config.as_ref())?;

    let identifier_column = args.identifier_column.as_deref().unwrap_or(&config.identifier_column);
    let mut sources = match &args.input {
        Some(path) => SourceList::from_csv_file(path, identifier_column)?,
        None => SourceList::new(),
    };

    for repo in &args.repos {
        sources.push_identifier(repo);
    }

    if sources.is_empty() {
        bail!("no repositories to collect, pass repository links or an input file with --input");
    }

    let cancel = CancellationToken::new();
    let watchers = spawn_watchers(&cancel, args.max_duration);

    let settings = config.to_settings(args.github_token.clone(), Utc::now());
    let progress = ProgressReporter::new(args.log_level.progress_delay(), args.color.use_colors_for_progress());
    let collector = Collector::new(&settings, cancel, progress)?;

    let collection = collector.collect(&sources).await;

    for watcher in watchers {
        watcher.abort();
    }

    if !collection.skipped.is_empty() {
        let _ = writeln!(host.error(), "Skipped {} repository(ies)", collection.skipped.len());
        for skipped in &collection.skipped {
            let _ = writeln!(host.error(), "  {}: {}", skipped.identifier, skipped.reason);
        }
    }

    if collection.cancelled {
        let _ = writeln!(
            host.error(),
            "Collection stopped early, writing the {} repository(ies) collected so far",
            collection.records.len()
        );
    }

    let targets = ReportTargets {
        csv: args.csv.as_deref(),
        json: args.json.as_deref(),
    };

    write_reports(host, sources.columns(), &collection.records, targets)
}

/// Cancel the run on Ctrl-C, or once `max_duration` has elapsed.
fn spawn_watchers(cancel: &CancellationToken, max_duration: Option<Duration>) -> Vec<JoinHandle<()>> {
    let mut watchers = Vec::with_capacity(2);

    let token = cancel.clone();
    watchers.push(tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!(target: LOG_TARGET, "Interrupted, finishing up");
            token.cancel();
        }
    }));

    if let Some(duration) = max_duration {
        let token = cancel.clone();
        watchers.push(tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            log::info!(target: LOG_TARGET, "Reached the maximum run duration of {}", humantime_serde::re::humantime::format_duration(duration));
            token.cancel();
        }));
    }

    watchers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CollectArgs {
        CollectArgs::parse_from(core::iter::once("collect").chain(args.iter().copied()))
    }

    #[test]
    fn test_parse_args() {
        let args = parse(&[
            "https://github.com/owner/one",
            "--input",
            "games.csv",
            "--max-duration",
            "1h 30m",
            "--json",
            "out.json",
        ]);

        assert_eq!(args.repos, ["https://github.com/owner/one"]);
        assert_eq!(args.input.as_deref().map(camino::Utf8Path::as_str), Some("games.csv"));
        assert_eq!(args.max_duration, Some(Duration::from_secs(90 * 60)));
        assert_eq!(args.json.as_deref().map(camino::Utf8Path::as_str), Some("out.json"));
        assert_eq!(args.log_level, LogLevel::None);
        assert!(args.csv.is_none());
    }

    #[test]
    fn test_invalid_duration_is_rejected() {
        let result = CollectArgs::try_parse_from(["collect", "--max-duration", "soon"]);
        let _ = result.unwrap_err();
    }

    #[tokio::test]
    async fn test_deadline_watcher_cancels() {
        let cancel = CancellationToken::new();
        let watchers = spawn_watchers(&cancel, Some(Duration::from_millis(10)));
        assert_eq!(watchers.len(), 2);

        tokio::time::timeout(Duration::from_secs(5), cancel.cancelled()).await.unwrap();

        for watcher in watchers {
            watcher.abort();
        }
    }

    #[tokio::test]
    async fn test_without_deadline_only_interrupt_is_watched() {
        let cancel = CancellationToken::new();
        let watchers = spawn_watchers(&cancel, None);
        assert_eq!(watchers.len(), 1);
        assert!(!cancel.is_cancelled());

        for watcher in watchers {
            watcher.abort();
        }
    }
}
