//! Node sinks.
//!
//! The ingestor only produces: it hands each node to [`NodeSink::create_node`]
//! once and never reads, updates or deletes. Storage and versioning belong
//! to whoever implements the sink.

use std::io::Write;

use analytics_core::models::NodeRecord;
use analytics_core::{AnalyticsError, Result};

/// Destination for emitted nodes.
pub trait NodeSink {
    /// Accept one node.
    fn create_node(&mut self, node: NodeRecord) -> Result<()>;

    /// Flush anything buffered. Called by the host once the run is over,
    /// whether or not it succeeded.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

// ── MemorySink ────────────────────────────────────────────────────────────────

/// Keeps nodes in emission order.
#[derive(Debug, Default)]
pub struct MemorySink {
    nodes: Vec<NodeRecord>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> &[NodeRecord] {
        &self.nodes
    }

    /// Nodes carrying the given type tag, in emission order.
    pub fn of_type<'a>(&'a self, node_type: &'a str) -> impl Iterator<Item = &'a NodeRecord> + 'a {
        self.nodes.iter().filter(move |n| n.node_type() == node_type)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl NodeSink for MemorySink {
    fn create_node(&mut self, node: NodeRecord) -> Result<()> {
        self.nodes.push(node);
        Ok(())
    }
}

// ── JsonLinesSink ─────────────────────────────────────────────────────────────

/// Writes each node as one compact JSON object per line.
pub struct JsonLinesSink<W: Write> {
    writer: W,
    written: usize,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    /// Number of nodes written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> NodeSink for JsonLinesSink<W> {
    fn create_node(&mut self, node: NodeRecord) -> Result<()> {
        serde_json::to_writer(&mut self.writer, &node).map_err(|e| write_failed(&node, e))?;
        self.writer
            .write_all(b"\n")
            .map_err(|e| write_failed(&node, e))?;
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer
            .flush()
            .map_err(|e| AnalyticsError::Sink(format!("failed to flush nodes: {}", e)))
    }
}

fn write_failed(node: &NodeRecord, e: impl std::fmt::Display) -> AnalyticsError {
    AnalyticsError::Sink(format!("failed to write node {}: {}", node.id, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use analytics_core::models::{PagePathStat, SiteWideStat};
    use serde_json::Value;

    fn site_node() -> NodeRecord {
        NodeRecord::from_source(&SiteWideStat {
            page_views: 100,
            sessions: 80,
        })
        .unwrap()
    }

    fn page_node(path: &str) -> NodeRecord {
        NodeRecord::from_source(&PagePathStat {
            path: path.to_string(),
            total_count: 5,
            sessions: 4,
        })
        .unwrap()
    }

    #[test]
    fn test_memory_sink_keeps_order() {
        let mut sink = MemorySink::new();
        sink.create_node(site_node()).unwrap();
        sink.create_node(page_node("/a")).unwrap();
        sink.create_node(page_node("/b")).unwrap();

        assert_eq!(sink.len(), 3);
        let ids: Vec<&str> = sink.nodes().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["All-site", "/a", "/b"]);
        assert_eq!(sink.of_type("PageViews").count(), 2);
        assert_eq!(sink.of_type("SiteWideStats").count(), 1);
    }

    #[test]
    fn test_json_lines_sink_writes_one_object_per_line() {
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.create_node(site_node()).unwrap();
        sink.create_node(page_node("/a")).unwrap();
        sink.finish().unwrap();
        assert_eq!(sink.written(), 2);

        let out = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["id"], "All-site");
        assert_eq!(first["pageViews"], 100);
        assert_eq!(first["internal"]["type"], "SiteWideStats");

        let second: Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["id"], "/a");
        assert_eq!(second["path"], "/a");
        assert_eq!(second["totalCount"], 5);
        assert_eq!(second["internal"]["description"], "Page views per path");
    }

    struct BrokenWriter;

    impl Write for BrokenWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }
    }

    #[test]
    fn test_json_lines_sink_surfaces_write_errors() {
        let mut sink = JsonLinesSink::new(BrokenWriter);
        let err = sink.create_node(site_node()).unwrap_err();
        assert!(matches!(err, AnalyticsError::Sink(_)), "got {:?}", err);
        assert!(err.to_string().contains("failed to write node All-site"));
        assert_eq!(sink.written(), 0);
        assert!(matches!(sink.finish(), Err(AnalyticsError::Sink(_))));
    }
}
