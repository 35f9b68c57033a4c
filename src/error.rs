//! Error types for kvwire.

use thiserror::Error;

/// Main error type for all session and protocol operations.
///
/// The first group covers transport, timeout, handshake and control
/// failures raised by the session itself. The second group is the
/// data-plane taxonomy produced by [`map_status`](crate::protocol::map_status)
/// when a response status is translated for the command's waiter.
#[derive(Debug, Error)]
pub enum Error {
    /// Hostname resolution failed for every candidate address.
    #[error("failed to resolve {authority}: {reason}")]
    ResolveFailed { authority: String, reason: String },

    /// TCP dial failed (refused, unreachable, or connect deadline expired).
    #[error("failed to connect to {addr}: {reason}")]
    ConnectFailed { addr: String, reason: String },

    /// I/O error on the established socket.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer closed the connection.
    #[error("connection closed by peer")]
    ClosedByPeer,

    /// The bootstrap deadline expired before the session became ready.
    #[error("unable to bootstrap in time")]
    UnambiguousTimeout,

    /// HELLO negotiation was rejected by the peer.
    #[error("handshake failure")]
    HandshakeFailure,

    /// Malformed frame, unexpected opcode during bootstrap, unexpected
    /// magic in steady state, or an untranslatable status code.
    #[error("protocol error: {0}")]
    ProtocolError(String),

    /// SASL exchange failed with a non-continue status.
    #[error("authentication failure")]
    AuthenticationFailure,

    /// SELECT-BUCKET was denied by the peer.
    #[error("bucket not found")]
    BucketNotFound,

    /// The command was canceled, or the session stopped before a response.
    #[error("request canceled")]
    RequestCanceled,

    /// The write queue stayed at capacity past the configured wait.
    #[error("backpressure timeout")]
    BackpressureTimeout,

    /// The peer reported an internal failure.
    #[error("internal server failure")]
    InternalServerFailure,

    /// The peer is busy or out of resources; the operation may be retried.
    #[error("temporary failure")]
    TemporaryFailure,

    /// The peer does not implement the requested operation.
    #[error("unsupported operation")]
    UnsupportedOperation,

    // Data-plane status translations, surfaced per-command.
    #[error("document not found")]
    DocumentNotFound,

    #[error("document exists")]
    DocumentExists,

    #[error("cas mismatch")]
    CasMismatch,

    #[error("value too large")]
    ValueTooLarge,

    #[error("invalid argument")]
    InvalidArgument,

    #[error("delta invalid")]
    DeltaInvalid,

    #[error("document locked")]
    DocumentLocked,

    #[error("collection not found")]
    CollectionNotFound,

    #[error("scope not found")]
    ScopeNotFound,

    #[error("path not found")]
    PathNotFound,

    #[error("path mismatch")]
    PathMismatch,

    #[error("path invalid")]
    PathInvalid,

    #[error("path too big")]
    PathTooBig,

    #[error("path exists")]
    PathExists,

    #[error("value too deep")]
    ValueTooDeep,

    #[error("value invalid")]
    ValueInvalid,

    #[error("document not json")]
    DocumentNotJson,

    #[error("number too big")]
    NumberTooBig,

    #[error("durability level not available")]
    DurabilityLevelNotAvailable,

    #[error("durability impossible")]
    DurabilityImpossible,

    #[error("durable write in progress")]
    DurableWriteInProgress,

    #[error("durability ambiguous")]
    DurabilityAmbiguous,

    #[error("durable write re-commit in progress")]
    DurableWriteReCommitInProgress,

    #[error("xattr invalid key combo")]
    XattrInvalidKeyCombo,

    #[error("xattr unknown macro")]
    XattrUnknownMacro,

    #[error("xattr unknown virtual attribute")]
    XattrUnknownVirtualAttribute,

    #[error("xattr cannot modify virtual attribute")]
    XattrCannotModifyVirtualAttribute,
}

/// Result type alias using kvwire's [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
