//! Cluster configuration view.
//!
//! The session only extracts what the router above needs from a topology
//! document: the revision number, the node list with their data-plane
//! ports, which node this session is connected to, and the bucket the
//! document describes. Everything else in the document passes through
//! unparsed.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A parsed topology document.
///
/// Views are ordered by `rev`; the session replaces its stored view only
/// when the incoming revision strictly exceeds the stored one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Monotonically increasing revision number.
    #[serde(default)]
    pub rev: u64,
    /// Bucket this document describes, absent for cluster-level documents.
    #[serde(default, rename = "name", skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    /// Cluster nodes with their service ports.
    #[serde(default, rename = "nodesExt")]
    pub nodes: Vec<Node>,
}

/// One node entry of a topology document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Hostname, may be empty for the node that served the document.
    #[serde(default)]
    pub hostname: String,
    /// Service name to port mapping.
    #[serde(default)]
    pub services: Services,
    /// Whether this entry is the node that served the document.
    #[serde(default, rename = "thisNode")]
    pub this_node: bool,
}

/// Known service ports of a node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Services {
    /// Data-plane (key-value) port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kv: Option<u16>,
    /// Management port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mgmt: Option<u16>,
}

impl ClusterConfig {
    /// Parse a topology document.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|err| Error::ProtocolError(format!("malformed configuration: {err}")))
    }

    /// Index of the node served by this session, `None` when the document
    /// does not mark one.
    pub fn this_node_index(&self) -> Option<usize> {
        self.nodes.iter().position(|node| node.this_node)
    }

    /// Synthetic single-node configuration for peers that do not support
    /// cluster-level configuration push.
    pub fn synthetic(addr: SocketAddr) -> Self {
        Self {
            rev: 0,
            bucket: None,
            nodes: vec![Node {
                hostname: addr.ip().to_string(),
                services: Services {
                    kv: Some(addr.port()),
                    mgmt: None,
                },
                this_node: true,
            }],
        }
    }
}
