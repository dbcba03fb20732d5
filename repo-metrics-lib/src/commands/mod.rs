//! Command-line interface and orchestration for repo-metrics
//!
//! ## Commands
//!
//! - **collect**: Read repository links from the command line and/or a CSV file, query
//!   the GitHub REST API for each repository, and write one record per repository as CSV
//!   (to the terminal or a file) and/or JSON
//! - **init**: Generate a default configuration file
//!
//! ## Execution Flow
//!
//! The `run` function parses command-line arguments using clap and routes to the
//! appropriate command handler. `collect` then:
//!
//! 1. Sets up logging and loads the configuration
//! 2. Builds the source list from the input file and the positional arguments
//! 3. Arms the Ctrl-C and maximum-duration watchers that cancel the run
//! 4. Collects metrics one repository at a time
//! 5. Reports skipped repositories on stderr and writes the requested reports
//!
//! A cancelled run still writes every repository completed before the cancellation.

mod collect;
mod common;
mod config;
mod host;
mod init;
mod progress_reporter;
mod run;

#[cfg(debug_assertions)]
pub use config::Config;

pub use collect::{CollectArgs, process_collect};
pub use host::Host;
pub use init::{InitArgs, init_config};
pub use progress_reporter::ProgressReporter;
pub use run::run;
