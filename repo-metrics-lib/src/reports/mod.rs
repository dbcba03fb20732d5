//! Report generation for collected repository metrics
//!
//! Two generators are provided, each accessed through a `generate` function:
//! - **CSV**: one row per repository, input columns first
//! - **JSON**: an array of objects, one per repository
//!
//! Both take the input column names and the collected records, and emit records in
//! the order they were collected. Absent values are written as an empty cell or
//! `null`, never as zero.

mod common;
mod csv;
mod json;

pub use csv::generate as generate_csv;
pub use json::generate as generate_json;
