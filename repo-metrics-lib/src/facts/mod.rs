//! Data collection for GitHub repositories
//!
//! This module gathers activity signals for repositories hosted on GitHub and derives
//! time-windowed metrics from them.
//!
//! # Implementation Model
//!
//! The [`Collector`] walks a [`SourceList`] in input order and hands each resolved
//! [`RepoSpec`] to the hosting provider, which:
//! - fetches repository metadata (mandatory, the repository is skipped without it)
//! - probes and walks the commit listing
//! - runs issue searches for counts and recent close times
//!
//! Every request goes through a resilient executor that retries transient failures
//! and waits out exhausted rate limits on a shared gate. Per-repository outcomes are
//! wrapped in a [`ProviderResult`] so that one failing repository never stops the run.

mod collector;
pub mod hosting;
mod progress;
mod provider_result;
pub mod rate_limit_gate;
mod repo_spec;
pub mod resilient_http;
mod source_list;

pub use collector::{CollectedRepo, Collection, Collector, CollectorSettings, SkippedRepo};
pub use progress::Progress;
pub use provider_result::ProviderResult;
pub use repo_spec::RepoSpec;
pub use source_list::{SourceList, SourceRow};
