use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::digest::digest_json;
use crate::error::{AnalyticsError, Result};

/// Identity key shared by every site-wide node.
pub const SITE_WIDE_ID: &str = "All-site";

/// Node type tag for [`SiteWideStat`] nodes.
pub const SITE_WIDE_NODE_TYPE: &str = "SiteWideStats";

/// Node type tag for [`PagePathStat`] nodes.
pub const PAGE_VIEWS_NODE_TYPE: &str = "PageViews";

/// Media type declared on every emitted node.
pub const NODE_MEDIA_TYPE: &str = "text/plain";

// ── NodeSource ────────────────────────────────────────────────────────────────

/// A record kind that can be published as a node.
///
/// Implementors declare their type tag and description, derive their
/// identity key, and choose which fields feed the content fingerprint.
pub trait NodeSource: Serialize {
    /// Type tag written to `internal.type`.
    const NODE_TYPE: &'static str;
    /// Human description written to `internal.description`.
    const DESCRIPTION: &'static str;

    /// Unique identity key of this record.
    fn node_id(&self) -> String;

    /// Fingerprint over this record kind's fingerprint fields only.
    fn content_digest(&self) -> Result<String>;
}

// ── SiteWideStat ──────────────────────────────────────────────────────────────

/// Page views and sessions across the whole property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteWideStat {
    pub page_views: u64,
    pub sessions: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SiteWideDigest {
    page_views: u64,
    sessions: u64,
}

impl NodeSource for SiteWideStat {
    const NODE_TYPE: &'static str = SITE_WIDE_NODE_TYPE;
    const DESCRIPTION: &'static str = "Page views & sessions for the site";

    fn node_id(&self) -> String {
        SITE_WIDE_ID.to_string()
    }

    fn content_digest(&self) -> Result<String> {
        digest_json(&SiteWideDigest {
            page_views: self.page_views,
            sessions: self.sessions,
        })
    }
}

// ── PagePathStat ──────────────────────────────────────────────────────────────

/// Page views and sessions for one URL path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagePathStat {
    pub path: String,
    pub total_count: u64,
    pub sessions: u64,
}

/// The path is the identity key and stays out of the fingerprint; both
/// metrics are in it so a session-count change is visible downstream.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PagePathDigest {
    total_count: u64,
    sessions: u64,
}

impl NodeSource for PagePathStat {
    const NODE_TYPE: &'static str = PAGE_VIEWS_NODE_TYPE;
    const DESCRIPTION: &'static str = "Page views per path";

    fn node_id(&self) -> String {
        self.path.clone()
    }

    fn content_digest(&self) -> Result<String> {
        digest_json(&PagePathDigest {
            total_count: self.total_count,
            sessions: self.sessions,
        })
    }
}

// ── NodeRecord ────────────────────────────────────────────────────────────────

/// Bookkeeping block attached to every node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeInternal {
    #[serde(rename = "type")]
    pub node_type: String,
    pub content_digest: String,
    pub media_type: String,
    pub description: String,
}

/// A record as handed to a node sink: its fields flattened next to the
/// identity key and the `internal` block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    pub id: String,
    pub internal: NodeInternal,
}

impl NodeRecord {
    /// Wrap a record into its node envelope.
    pub fn from_source<R: NodeSource>(record: &R) -> Result<Self> {
        let fields = match serde_json::to_value(record)? {
            Value::Object(map) => map,
            other => {
                return Err(AnalyticsError::Other(anyhow::anyhow!(
                    "{} record did not encode as an object: {}",
                    R::NODE_TYPE,
                    other
                )))
            }
        };

        Ok(Self {
            fields,
            id: record.node_id(),
            internal: NodeInternal {
                node_type: R::NODE_TYPE.to_string(),
                content_digest: record.content_digest()?,
                media_type: NODE_MEDIA_TYPE.to_string(),
                description: R::DESCRIPTION.to_string(),
            },
        })
    }

    /// Type tag of this node.
    pub fn node_type(&self) -> &str {
        &self.internal.node_type
    }

    /// Look up an unsigned integer field.
    pub fn u64_field(&self, name: &str) -> Option<u64> {
        self.fields.get(name).and_then(Value::as_u64)
    }

    /// Look up a string field.
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(path: &str, total_count: u64, sessions: u64) -> PagePathStat {
        PagePathStat {
            path: path.to_string(),
            total_count,
            sessions,
        }
    }

    // ── fingerprints ──────────────────────────────────────────────────────

    #[test]
    fn test_site_wide_digest_is_deterministic() {
        let a = SiteWideStat {
            page_views: 100,
            sessions: 80,
        };
        let b = a.clone();
        assert_eq!(a.content_digest().unwrap(), b.content_digest().unwrap());
    }

    #[test]
    fn test_page_digest_ignores_path() {
        let a = page("/a", 50, 40);
        let b = page("/b", 50, 40);
        assert_eq!(a.content_digest().unwrap(), b.content_digest().unwrap());
    }

    #[test]
    fn test_page_digest_tracks_sessions() {
        let a = page("/a", 50, 40);
        let b = page("/a", 50, 41);
        assert_ne!(a.content_digest().unwrap(), b.content_digest().unwrap());
    }

    #[test]
    fn test_page_digest_tracks_total_count() {
        let a = page("/a", 50, 40);
        let b = page("/a", 51, 40);
        assert_ne!(a.content_digest().unwrap(), b.content_digest().unwrap());
    }

    #[test]
    fn test_site_wide_digest_matches_plain_json() {
        let stat = SiteWideStat {
            page_views: 7,
            sessions: 3,
        };
        let expected = crate::digest::digest_bytes(br#"{"pageViews":7,"sessions":3}"#);
        assert_eq!(stat.content_digest().unwrap(), expected);
    }

    // ── node envelope ─────────────────────────────────────────────────────

    #[test]
    fn test_site_wide_node_envelope() {
        let stat = SiteWideStat {
            page_views: 100,
            sessions: 80,
        };
        let node = NodeRecord::from_source(&stat).unwrap();

        assert_eq!(node.id, "All-site");
        assert_eq!(node.node_type(), "SiteWideStats");
        assert_eq!(node.internal.media_type, "text/plain");
        assert_eq!(node.internal.description, "Page views & sessions for the site");
        assert_eq!(node.internal.content_digest, stat.content_digest().unwrap());
        assert_eq!(node.u64_field("pageViews"), Some(100));
        assert_eq!(node.u64_field("sessions"), Some(80));
    }

    #[test]
    fn test_page_node_envelope() {
        let node = NodeRecord::from_source(&page("/blog/", 50, 40)).unwrap();

        assert_eq!(node.id, "/blog/");
        assert_eq!(node.node_type(), "PageViews");
        assert_eq!(node.internal.description, "Page views per path");
        assert_eq!(node.str_field("path"), Some("/blog/"));
        assert_eq!(node.u64_field("totalCount"), Some(50));
        assert_eq!(node.u64_field("sessions"), Some(40));
    }

    #[test]
    fn test_node_serializes_flat_camel_case() {
        let node = NodeRecord::from_source(&page("/a", 5, 4)).unwrap();
        let value = serde_json::to_value(&node).unwrap();

        assert_eq!(value["path"], "/a");
        assert_eq!(value["totalCount"], 5);
        assert_eq!(value["sessions"], 4);
        assert_eq!(value["id"], "/a");
        assert_eq!(value["internal"]["type"], "PageViews");
        assert_eq!(value["internal"]["mediaType"], "text/plain");
        assert!(value["internal"]["contentDigest"].is_string());
        assert!(value.get("fields").is_none());
    }

    #[test]
    fn test_node_deserializes_back() {
        let node = NodeRecord::from_source(&page("/a", 5, 4)).unwrap();
        let json = serde_json::to_string(&node).unwrap();
        let parsed: NodeRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, node);
    }
}
