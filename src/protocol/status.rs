//! Response status codes and their translation into the error taxonomy.

use crate::error::Error;

use super::opcode::Opcode;

/// Status codes carried in the vbucket/status field of responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Status {
    Success = 0x00,
    NotFound = 0x01,
    Exists = 0x02,
    TooBig = 0x03,
    Invalid = 0x04,
    NotStored = 0x05,
    DeltaBadValue = 0x06,
    NotMyVbucket = 0x07,
    NoBucket = 0x08,
    Locked = 0x09,
    AuthStale = 0x1f,
    AuthError = 0x20,
    AuthContinue = 0x21,
    RangeError = 0x22,
    Rollback = 0x23,
    NoAccess = 0x24,
    NotInitialized = 0x25,
    UnknownFrameInfo = 0x26,
    UnknownCommand = 0x81,
    NoMemory = 0x82,
    NotSupported = 0x83,
    Internal = 0x84,
    Busy = 0x85,
    TempFailure = 0x86,
    XattrInvalid = 0x87,
    UnknownCollection = 0x88,
    NoCollectionsManifest = 0x89,
    CannotApplyCollectionsManifest = 0x8a,
    CollectionsManifestIsAhead = 0x8b,
    UnknownScope = 0x8c,
    DcpStreamIdInvalid = 0x8d,
    DurabilityInvalidLevel = 0xa0,
    DurabilityImpossible = 0xa1,
    SyncWriteInProgress = 0xa2,
    SyncWriteAmbiguous = 0xa3,
    SyncWriteReCommitInProgress = 0xa4,
    SubdocPathNotFound = 0xc0,
    SubdocPathMismatch = 0xc1,
    SubdocPathInvalid = 0xc2,
    SubdocPathTooBig = 0xc3,
    SubdocDocTooDeep = 0xc4,
    SubdocValueCannotInsert = 0xc5,
    SubdocDocNotJson = 0xc6,
    SubdocNumRangeError = 0xc7,
    SubdocDeltaInvalid = 0xc8,
    SubdocPathExists = 0xc9,
    SubdocValueTooDeep = 0xca,
    SubdocInvalidCombo = 0xcb,
    SubdocMultiPathFailure = 0xcc,
    SubdocSuccessDeleted = 0xcd,
    SubdocXattrInvalidFlagCombo = 0xce,
    SubdocXattrInvalidKeyCombo = 0xcf,
    SubdocXattrUnknownMacro = 0xd0,
    SubdocXattrUnknownVattr = 0xd1,
    SubdocXattrCannotModifyVattr = 0xd2,
    SubdocMultiPathFailureDeleted = 0xd3,
    SubdocInvalidXattrOrder = 0xd4,
}

impl Status {
    /// Decode a raw status field, `None` for unknown codes.
    pub fn decode(raw: u16) -> Option<Self> {
        match raw {
            0x00 => Some(Status::Success),
            0x01 => Some(Status::NotFound),
            0x02 => Some(Status::Exists),
            0x03 => Some(Status::TooBig),
            0x04 => Some(Status::Invalid),
            0x05 => Some(Status::NotStored),
            0x06 => Some(Status::DeltaBadValue),
            0x07 => Some(Status::NotMyVbucket),
            0x08 => Some(Status::NoBucket),
            0x09 => Some(Status::Locked),
            0x1f => Some(Status::AuthStale),
            0x20 => Some(Status::AuthError),
            0x21 => Some(Status::AuthContinue),
            0x22 => Some(Status::RangeError),
            0x23 => Some(Status::Rollback),
            0x24 => Some(Status::NoAccess),
            0x25 => Some(Status::NotInitialized),
            0x26 => Some(Status::UnknownFrameInfo),
            0x81 => Some(Status::UnknownCommand),
            0x82 => Some(Status::NoMemory),
            0x83 => Some(Status::NotSupported),
            0x84 => Some(Status::Internal),
            0x85 => Some(Status::Busy),
            0x86 => Some(Status::TempFailure),
            0x87 => Some(Status::XattrInvalid),
            0x88 => Some(Status::UnknownCollection),
            0x89 => Some(Status::NoCollectionsManifest),
            0x8a => Some(Status::CannotApplyCollectionsManifest),
            0x8b => Some(Status::CollectionsManifestIsAhead),
            0x8c => Some(Status::UnknownScope),
            0x8d => Some(Status::DcpStreamIdInvalid),
            0xa0 => Some(Status::DurabilityInvalidLevel),
            0xa1 => Some(Status::DurabilityImpossible),
            0xa2 => Some(Status::SyncWriteInProgress),
            0xa3 => Some(Status::SyncWriteAmbiguous),
            0xa4 => Some(Status::SyncWriteReCommitInProgress),
            0xc0 => Some(Status::SubdocPathNotFound),
            0xc1 => Some(Status::SubdocPathMismatch),
            0xc2 => Some(Status::SubdocPathInvalid),
            0xc3 => Some(Status::SubdocPathTooBig),
            0xc4 => Some(Status::SubdocDocTooDeep),
            0xc5 => Some(Status::SubdocValueCannotInsert),
            0xc6 => Some(Status::SubdocDocNotJson),
            0xc7 => Some(Status::SubdocNumRangeError),
            0xc8 => Some(Status::SubdocDeltaInvalid),
            0xc9 => Some(Status::SubdocPathExists),
            0xca => Some(Status::SubdocValueTooDeep),
            0xcb => Some(Status::SubdocInvalidCombo),
            0xcc => Some(Status::SubdocMultiPathFailure),
            0xcd => Some(Status::SubdocSuccessDeleted),
            0xce => Some(Status::SubdocXattrInvalidFlagCombo),
            0xcf => Some(Status::SubdocXattrInvalidKeyCombo),
            0xd0 => Some(Status::SubdocXattrUnknownMacro),
            0xd1 => Some(Status::SubdocXattrUnknownVattr),
            0xd2 => Some(Status::SubdocXattrCannotModifyVattr),
            0xd3 => Some(Status::SubdocMultiPathFailureDeleted),
            0xd4 => Some(Status::SubdocInvalidXattrOrder),
            _ => None,
        }
    }
}

/// Translate a response status into the command's outcome.
///
/// Returns `Ok(())` for success-like statuses. Sub-document path-level
/// failures stay successful so callers can inspect per-path status inside
/// the body. Statuses that must never appear in steady-state responses
/// (`not_my_vbucket`, `auth_continue`, ...) fall through to
/// [`Error::ProtocolError`] together with codes unknown to this client.
pub fn map_status(opcode: Opcode, raw: u16) -> Result<(), Error> {
    let Some(status) = Status::decode(raw) else {
        tracing::warn!(status = raw, %opcode, "unknown status code");
        return Err(Error::ProtocolError(format!(
            "unknown status code {raw:#06x} (opcode={opcode})"
        )));
    };
    match status {
        Status::Success
        | Status::SubdocMultiPathFailure
        | Status::SubdocSuccessDeleted
        | Status::SubdocMultiPathFailureDeleted => Ok(()),

        Status::NotFound | Status::NotStored => Err(Error::DocumentNotFound),

        Status::Exists => {
            if opcode == Opcode::Insert {
                Err(Error::DocumentExists)
            } else {
                Err(Error::CasMismatch)
            }
        }

        Status::TooBig => Err(Error::ValueTooLarge),

        Status::Invalid | Status::XattrInvalid | Status::SubdocInvalidCombo => {
            Err(Error::InvalidArgument)
        }

        Status::DeltaBadValue | Status::SubdocDeltaInvalid => Err(Error::DeltaInvalid),

        Status::NoBucket => Err(Error::BucketNotFound),

        Status::Locked => Err(Error::DocumentLocked),

        Status::AuthStale | Status::AuthError | Status::NoAccess => {
            Err(Error::AuthenticationFailure)
        }

        Status::NotSupported | Status::UnknownCommand => Err(Error::UnsupportedOperation),

        Status::Internal => Err(Error::InternalServerFailure),

        Status::Busy | Status::TempFailure | Status::NoMemory | Status::NotInitialized => {
            Err(Error::TemporaryFailure)
        }

        Status::UnknownCollection => Err(Error::CollectionNotFound),

        Status::UnknownScope => Err(Error::ScopeNotFound),

        Status::DurabilityInvalidLevel => Err(Error::DurabilityLevelNotAvailable),
        Status::DurabilityImpossible => Err(Error::DurabilityImpossible),
        Status::SyncWriteInProgress => Err(Error::DurableWriteInProgress),
        Status::SyncWriteAmbiguous => Err(Error::DurabilityAmbiguous),
        Status::SyncWriteReCommitInProgress => Err(Error::DurableWriteReCommitInProgress),

        Status::SubdocPathNotFound => Err(Error::PathNotFound),
        Status::SubdocPathMismatch => Err(Error::PathMismatch),
        Status::SubdocPathInvalid => Err(Error::PathInvalid),
        Status::SubdocPathTooBig => Err(Error::PathTooBig),
        Status::SubdocPathExists => Err(Error::PathExists),
        Status::SubdocDocTooDeep | Status::SubdocValueTooDeep => Err(Error::ValueTooDeep),
        Status::SubdocValueCannotInsert => Err(Error::ValueInvalid),
        Status::SubdocDocNotJson => Err(Error::DocumentNotJson),
        Status::SubdocNumRangeError => Err(Error::NumberTooBig),

        Status::SubdocXattrInvalidFlagCombo | Status::SubdocXattrInvalidKeyCombo => {
            Err(Error::XattrInvalidKeyCombo)
        }
        Status::SubdocXattrUnknownMacro => Err(Error::XattrUnknownMacro),
        Status::SubdocXattrUnknownVattr => Err(Error::XattrUnknownVirtualAttribute),
        Status::SubdocXattrCannotModifyVattr => Err(Error::XattrCannotModifyVirtualAttribute),

        // Never expected in a steady-state response to an operation.
        Status::NotMyVbucket
        | Status::AuthContinue
        | Status::RangeError
        | Status::Rollback
        | Status::UnknownFrameInfo
        | Status::NoCollectionsManifest
        | Status::CannotApplyCollectionsManifest
        | Status::CollectionsManifestIsAhead
        | Status::DcpStreamIdInvalid
        | Status::SubdocInvalidXattrOrder => {
            tracing::warn!(status = raw, %opcode, "unmappable status code");
            Err(Error::ProtocolError(format!(
                "unexpected status {raw:#06x} (opcode={opcode})"
            )))
        }
    }
}
