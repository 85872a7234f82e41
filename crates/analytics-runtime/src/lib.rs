//! Runtime layer for the Google Analytics node source.
//!
//! Drives one ingestion run from authentication to node emission and
//! provides the sinks nodes are emitted into.

pub mod ingestor;
pub mod sink;

pub use analytics_core as core;
pub use analytics_source as source;
