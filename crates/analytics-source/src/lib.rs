//! Remote side of the Google Analytics node source.
//!
//! Authenticates a service account, issues reporting queries and parses
//! their rows into typed records.

pub mod auth;
pub mod reporting;
pub mod rows;

#[cfg(test)]
mod test_support;

pub use analytics_core as core;
