#![doc(hidden)]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Core library for repo-metrics
//!
//! This library consolidates all functionality for the repo-metrics tool, which queries
//! the GitHub REST API for per-repository activity signals and derives time-windowed
//! metrics from them.
//!
//! # Module Organization
//!
//! - [`commands`]: Command-line interface and orchestration
//! - [`facts`]: Data collection and aggregation
//! - [`reports`]: Output generation

pub type Result<T, E = ohno::AppError> = core::result::Result<T, E>;

#[cfg(any(debug_assertions, test))]
pub mod commands;
#[cfg(not(any(debug_assertions, test)))]
mod commands;

#[cfg(any(debug_assertions, test))]
pub mod facts;
#[cfg(not(any(debug_assertions, test)))]
mod facts;

#[cfg(any(debug_assertions, test))]
pub mod reports;
#[cfg(not(any(debug_assertions, test)))]
mod reports;

pub use crate::commands::{Host, run};
