//! Peer-published error map.
//!
//! When `xerror` is negotiated the peer serves a table of status-code
//! metadata (name, description, retry attributes) fetched once during
//! bootstrap. The session stores it verbatim for diagnostics; status
//! translation itself stays hard-coded in
//! [`map_status`](crate::protocol::map_status).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Parsed error map document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorMap {
    /// Document format version.
    #[serde(default)]
    pub version: u32,
    /// Map revision, bumped by the server when entries change.
    #[serde(default)]
    pub revision: u32,
    /// Status code (lower-case hex, no prefix) to metadata.
    #[serde(default)]
    pub errors: HashMap<String, ErrorMapEntry>,
}

/// Metadata for a single status code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorMapEntry {
    /// Short machine-readable name.
    #[serde(default)]
    pub name: String,
    /// Human-readable description.
    #[serde(default, rename = "desc")]
    pub description: String,
    /// Behavior attributes (e.g. `retry-later`, `conn-state-invalidated`).
    #[serde(default)]
    pub attrs: Vec<String>,
}

impl ErrorMap {
    /// Parse an error map document.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|err| Error::ProtocolError(format!("malformed error map: {err}")))
    }

    /// Look up metadata for a raw status code.
    pub fn get(&self, status: u16) -> Option<&ErrorMapEntry> {
        self.errors.get(&format!("{status:x}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "version": 1,
        "revision": 4,
        "errors": {
            "1": {"name": "KEY_ENOENT", "desc": "key not found", "attrs": ["item-only"]},
            "86": {"name": "ETMPFAIL", "desc": "busy, try again", "attrs": ["temp", "retry-later"]}
        }
    }"#;

    #[test]
    fn parse_and_lookup() {
        let map = ErrorMap::parse(SAMPLE.as_bytes()).unwrap();
        assert_eq!(map.version, 1);
        assert_eq!(map.revision, 4);

        let entry = map.get(0x86).unwrap();
        assert_eq!(entry.name, "ETMPFAIL");
        assert!(entry.attrs.contains(&"retry-later".to_string()));
    }

    #[test]
    fn lookup_unknown_status() {
        let map = ErrorMap::parse(SAMPLE.as_bytes()).unwrap();
        assert!(map.get(0x7777).is_none());
    }

    #[test]
    fn malformed_document_is_protocol_error() {
        assert!(matches!(
            ErrorMap::parse(b"[1, 2]"),
            Err(Error::ProtocolError(_))
        ));
    }
}
