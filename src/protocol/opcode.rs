//! Client and server opcodes consumed by the session.
//!
//! The session interprets only the bootstrap opcodes and
//! `get_cluster_config`; the data-plane opcodes are *routable* — their
//! responses are matched to waiters by opaque but their bodies pass
//! through untouched.

/// Opcodes on client-request / client-response frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    Get = 0x00,
    Upsert = 0x01,
    Insert = 0x02,
    Replace = 0x03,
    Remove = 0x04,
    Increment = 0x05,
    Decrement = 0x06,
    Touch = 0x1c,
    GetAndTouch = 0x1d,
    Hello = 0x1f,
    SaslListMechs = 0x20,
    SaslAuth = 0x21,
    SaslStep = 0x22,
    SelectBucket = 0x89,
    Observe = 0x92,
    GetAndLock = 0x94,
    Unlock = 0x95,
    GetClusterConfig = 0xb5,
    GetCollectionsManifest = 0xba,
    GetCollectionId = 0xbb,
    SubdocMultiLookup = 0xd0,
    SubdocMultiMutation = 0xd1,
    GetErrorMap = 0xfe,
}

impl Opcode {
    /// Decode an opcode byte, `None` for values this session never handles.
    pub fn decode(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Opcode::Get),
            0x01 => Some(Opcode::Upsert),
            0x02 => Some(Opcode::Insert),
            0x03 => Some(Opcode::Replace),
            0x04 => Some(Opcode::Remove),
            0x05 => Some(Opcode::Increment),
            0x06 => Some(Opcode::Decrement),
            0x1c => Some(Opcode::Touch),
            0x1d => Some(Opcode::GetAndTouch),
            0x1f => Some(Opcode::Hello),
            0x20 => Some(Opcode::SaslListMechs),
            0x21 => Some(Opcode::SaslAuth),
            0x22 => Some(Opcode::SaslStep),
            0x89 => Some(Opcode::SelectBucket),
            0x92 => Some(Opcode::Observe),
            0x94 => Some(Opcode::GetAndLock),
            0x95 => Some(Opcode::Unlock),
            0xb5 => Some(Opcode::GetClusterConfig),
            0xba => Some(Opcode::GetCollectionsManifest),
            0xbb => Some(Opcode::GetCollectionId),
            0xd0 => Some(Opcode::SubdocMultiLookup),
            0xd1 => Some(Opcode::SubdocMultiMutation),
            0xfe => Some(Opcode::GetErrorMap),
            _ => None,
        }
    }

    /// Whether responses with this opcode are routed to a registered
    /// waiter by opaque in steady state.
    pub fn is_routable(self) -> bool {
        matches!(
            self,
            Opcode::Get
                | Opcode::Upsert
                | Opcode::Insert
                | Opcode::Replace
                | Opcode::Remove
                | Opcode::Increment
                | Opcode::Decrement
                | Opcode::Touch
                | Opcode::GetAndTouch
                | Opcode::Observe
                | Opcode::GetAndLock
                | Opcode::Unlock
                | Opcode::GetCollectionId
                | Opcode::SubdocMultiLookup
                | Opcode::SubdocMultiMutation
                | Opcode::GetClusterConfig
        )
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Opcode::Get => "get",
            Opcode::Upsert => "upsert",
            Opcode::Insert => "insert",
            Opcode::Replace => "replace",
            Opcode::Remove => "remove",
            Opcode::Increment => "increment",
            Opcode::Decrement => "decrement",
            Opcode::Touch => "touch",
            Opcode::GetAndTouch => "get_and_touch",
            Opcode::Hello => "hello",
            Opcode::SaslListMechs => "sasl_list_mechs",
            Opcode::SaslAuth => "sasl_auth",
            Opcode::SaslStep => "sasl_step",
            Opcode::SelectBucket => "select_bucket",
            Opcode::Observe => "observe",
            Opcode::GetAndLock => "get_and_lock",
            Opcode::Unlock => "unlock",
            Opcode::GetClusterConfig => "get_cluster_config",
            Opcode::GetCollectionsManifest => "get_collections_manifest",
            Opcode::GetCollectionId => "get_collection_id",
            Opcode::SubdocMultiLookup => "subdoc_multi_lookup",
            Opcode::SubdocMultiMutation => "subdoc_multi_mutation",
            Opcode::GetErrorMap => "get_error_map",
        };
        f.write_str(name)
    }
}

/// Opcodes on server-request frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ServerOpcode {
    /// The server advertises a new cluster topology.
    ClusterMapChangeNotification = 0x01,
}

impl ServerOpcode {
    /// Decode a server-request opcode byte.
    pub fn decode(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(ServerOpcode::ClusterMapChangeNotification),
            _ => None,
        }
    }
}

impl std::fmt::Display for ServerOpcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerOpcode::ClusterMapChangeNotification => {
                f.write_str("cluster_map_change_notification")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_roundtrip() {
        for byte in 0..=u8::MAX {
            if let Some(opcode) = Opcode::decode(byte) {
                assert_eq!(opcode as u8, byte);
            }
        }
    }

    #[test]
    fn bootstrap_opcodes_are_not_routable() {
        assert!(!Opcode::Hello.is_routable());
        assert!(!Opcode::SaslAuth.is_routable());
        assert!(!Opcode::SaslStep.is_routable());
        assert!(!Opcode::SelectBucket.is_routable());
        assert!(!Opcode::GetErrorMap.is_routable());
    }

    #[test]
    fn data_plane_opcodes_are_routable() {
        assert!(Opcode::Get.is_routable());
        assert!(Opcode::SubdocMultiMutation.is_routable());
        assert!(Opcode::GetClusterConfig.is_routable());
        assert!(Opcode::GetCollectionId.is_routable());
    }

    #[test]
    fn server_opcode_decode() {
        assert_eq!(
            ServerOpcode::decode(0x01),
            Some(ServerOpcode::ClusterMapChangeNotification)
        );
        assert_eq!(ServerOpcode::decode(0x02), None);
    }
}
