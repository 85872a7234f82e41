//! Core types for the Google Analytics node source.
//!
//! Error taxonomy, the record kinds and their node envelope, content
//! fingerprints, ingestion options, reporting date ranges and the CLI
//! settings shared by the binary.

pub mod dates;
pub mod digest;
pub mod error;
pub mod models;
pub mod options;
pub mod settings;

pub use error::{AnalyticsError, Result};
