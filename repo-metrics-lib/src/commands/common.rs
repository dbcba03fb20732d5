//! Logging setup and report writing shared by the commands.

use super::Host;
use crate::Result;
use crate::facts::CollectedRepo;
use crate::reports::{generate_csv, generate_json};
use camino::Utf8Path;
use clap::ValueEnum;
use core::time::Duration;
use ohno::IntoAppError;
use std::fs;
use std::io::Write;

/// Color mode configuration for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Always use colors
    Always,

    /// Never use colors
    Never,

    /// Use colors if the output is a terminal, otherwise don't use colors
    Auto,
}

impl ColorMode {
    /// Whether the progress indicator, drawn on stderr, should be colored.
    #[must_use]
    pub fn use_colors_for_progress(self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => {
                use std::io::{IsTerminal, stderr};
                stderr().is_terminal()
            }
        }
    }
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// No logging output
    None,

    /// Only error messages
    Error,

    /// Warning and error messages
    Warn,

    /// Info, warning, and error messages
    Info,

    /// Debug, info, warning, and error messages
    Debug,

    /// Trace, debug, info, warning, and error messages
    Trace,
}

impl LogLevel {
    /// How long a run must last before the progress indicator shows up.
    ///
    /// Log lines and a progress bar fight over stderr, so the bar is effectively
    /// disabled whenever logging is on.
    #[must_use]
    pub const fn progress_delay(self) -> Duration {
        match self {
            Self::None => Duration::from_millis(300),
            _ => Duration::from_secs(365 * 24 * 60 * 60),
        }
    }
}

/// Initialize logger based on log level
pub fn init_logging(log_level: LogLevel) {
    let level = match log_level {
        LogLevel::None => return,
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    };

    let env = env_logger::Env::default().filter_or("RUST_LOG", level);

    // A logger may already be installed when several commands run in one process
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(matches!(log_level, LogLevel::Debug | LogLevel::Trace))
        .try_init();
}

/// Where the collected records should be written.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportTargets<'a> {
    pub csv: Option<&'a Utf8Path>,
    pub json: Option<&'a Utf8Path>,
}

impl ReportTargets<'_> {
    const fn is_empty(&self) -> bool {
        self.csv.is_none() && self.json.is_none()
    }
}

/// Write the records to every requested report, or as CSV to the host's output when
/// no report file was requested.
///
/// # Errors
///
/// Returns an error if a report cannot be generated or written
pub fn write_reports<H: Host>(host: &mut H, columns: &[String], records: &[CollectedRepo], targets: ReportTargets<'_>) -> Result<()> {
    if targets.is_empty() {
        let mut output = String::new();
        generate_csv(columns, records, &mut output)?;
        let _ = write!(host.output(), "{output}");
        return Ok(());
    }

    if let Some(filename) = targets.csv {
        let mut output = String::new();
        generate_csv(columns, records, &mut output)?;
        fs::write(filename, output).into_app_err_with(|| format!("writing CSV report to '{filename}'"))?;
        let _ = writeln!(host.error(), "Wrote {} record(s) to '{filename}'", records.len());
    }

    if let Some(filename) = targets.json {
        let mut output = String::new();
        generate_json(columns, records, &mut output)?;
        fs::write(filename, output).into_app_err_with(|| format!("writing JSON report to '{filename}'"))?;
        let _ = writeln!(host.error(), "Wrote {} record(s) to '{filename}'", records.len());
    }

    Ok(())
}
