//! GitHub repository metrics
//!
//! The [`Provider`] drives the per-repository pipeline: it fetches the repository
//! metadata, walks the commit listing, runs the issue searches, and folds the results
//! into a [`RepoMetrics`] record through the pure functions of the `window` module.

mod client;
mod paginator;
mod provider;
mod repo_metrics;
mod window;

pub use client::{DEFAULT_API_BASE_URL, DEFAULT_REQUEST_TIMEOUT, DEFAULT_USER_AGENT};
pub use paginator::{Listing, MAX_PAGE_SIZE, Paginator, Probe};
pub use provider::Provider;
pub use repo_metrics::{COLUMNS, FieldValue, RepoMetrics};
