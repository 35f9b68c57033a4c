//! HELLO feature negotiation codes.

/// Features advertised in the HELLO exchange.
///
/// The client sends the codes it wants as a vector of u16 values in the
/// request value; the server echoes back the subset it acknowledges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ServerFeature {
    Tls = 0x02,
    TcpNodelay = 0x03,
    MutationSeqno = 0x04,
    Xattr = 0x06,
    Xerror = 0x07,
    SelectBucket = 0x08,
    Snappy = 0x0a,
    Json = 0x0b,
    Duplex = 0x0c,
    ClustermapChangeNotification = 0x0d,
    UnorderedExecution = 0x0e,
    Tracing = 0x0f,
    AltRequestSupport = 0x10,
    SyncReplication = 0x11,
    Collections = 0x12,
    PreserveTtl = 0x14,
}

impl ServerFeature {
    /// Decode a feature code from a HELLO response, `None` for codes this
    /// client never requests (the server must not acknowledge them, but a
    /// lenient reader skips rather than fails).
    pub fn decode(code: u16) -> Option<Self> {
        match code {
            0x02 => Some(ServerFeature::Tls),
            0x03 => Some(ServerFeature::TcpNodelay),
            0x04 => Some(ServerFeature::MutationSeqno),
            0x06 => Some(ServerFeature::Xattr),
            0x07 => Some(ServerFeature::Xerror),
            0x08 => Some(ServerFeature::SelectBucket),
            0x0a => Some(ServerFeature::Snappy),
            0x0b => Some(ServerFeature::Json),
            0x0c => Some(ServerFeature::Duplex),
            0x0d => Some(ServerFeature::ClustermapChangeNotification),
            0x0e => Some(ServerFeature::UnorderedExecution),
            0x0f => Some(ServerFeature::Tracing),
            0x10 => Some(ServerFeature::AltRequestSupport),
            0x11 => Some(ServerFeature::SyncReplication),
            0x12 => Some(ServerFeature::Collections),
            0x14 => Some(ServerFeature::PreserveTtl),
            _ => None,
        }
    }

    /// The feature set this client requests in HELLO.
    pub fn requested() -> &'static [ServerFeature] {
        &[
            ServerFeature::TcpNodelay,
            ServerFeature::MutationSeqno,
            ServerFeature::Xattr,
            ServerFeature::Xerror,
            ServerFeature::SelectBucket,
            ServerFeature::Snappy,
            ServerFeature::Json,
            ServerFeature::Duplex,
            ServerFeature::ClustermapChangeNotification,
            ServerFeature::UnorderedExecution,
            ServerFeature::AltRequestSupport,
            ServerFeature::SyncReplication,
            ServerFeature::Collections,
            ServerFeature::PreserveTtl,
        ]
    }
}

impl std::fmt::Display for ServerFeature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ServerFeature::Tls => "tls",
            ServerFeature::TcpNodelay => "tcp_nodelay",
            ServerFeature::MutationSeqno => "mutation_seqno",
            ServerFeature::Xattr => "xattr",
            ServerFeature::Xerror => "xerror",
            ServerFeature::SelectBucket => "select_bucket",
            ServerFeature::Snappy => "snappy",
            ServerFeature::Json => "json",
            ServerFeature::Duplex => "duplex",
            ServerFeature::ClustermapChangeNotification => "clustermap_change_notification",
            ServerFeature::UnorderedExecution => "unordered_execution",
            ServerFeature::Tracing => "tracing",
            ServerFeature::AltRequestSupport => "alt_request_support",
            ServerFeature::SyncReplication => "sync_replication",
            ServerFeature::Collections => "collections",
            ServerFeature::PreserveTtl => "preserve_ttl",
        };
        f.write_str(name)
    }
}
