//! Command dispatch logic for repo-metrics

use super::{CollectArgs, InitArgs, init_config, process_collect};
use crate::{Host, Result};
use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Effects};
use clap::{Parser, Subcommand};

const CLAP_STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

#[derive(Parser, Debug)]
#[command(name = "repo-metrics", author, version, long_about = None)]
#[command(about = "Collect activity metrics for GitHub repositories")]
#[command(styles = CLAP_STYLES)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Collect metrics for repositories and write them as CSV or JSON
    Collect(Box<CollectArgs>),
    /// Generate a default configuration file
    Init(InitArgs),
}

/// Dispatch command-line arguments to the appropriate handler
///
/// # Arguments
///
/// * `args` - An iterator of command-line arguments (typically from `std::env::args()`)
///
/// # Errors
///
/// Returns an error if command parsing fails or if the executed command fails
pub async fn run<I, T, H>(host: &mut H, args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
    H: Host,
{
    match &Cli::parse_from(args).command {
        Command::Collect(collect_args) => process_collect(host, collect_args).await,
        Command::Init(init_args) => init_config(host, init_args),
    }
}
