//! Wire format encoding and decoding.
//!
//! Implements the fixed 24-byte header shared by every frame:
//!
//! ```text
//! ┌───────┬────────┬─────────┬─────────┬──────────┬───────────────┐
//! │ Magic │ Opcode │ Key len │ Ext len │ Datatype │ Vbucket/Status│
//! │ 1 byte│ 1 byte │ 2 bytes │ 1 byte  │ 1 byte   │ 2 bytes       │
//! ├───────┴────────┴─────────┴─────────┴──────────┴───────────────┤
//! │ Total body length (4 bytes)                                   │
//! │ Opaque (4 bytes)                                              │
//! │ CAS (8 bytes)                                                 │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! All multi-byte integers are Big Endian. Bodies are laid out as
//! `framing extras ++ extras ++ key ++ value`, where framing extras only
//! exist for the alt magics (their length is packed into the high byte of
//! the key-length field).

use crate::error::{Error, Result};

/// Header size in bytes (fixed, exactly 24).
pub const HEADER_SIZE: usize = 24;

/// Default maximum body size (20 MB, the server-side document ceiling).
pub const DEFAULT_MAX_BODY_SIZE: u32 = 20 * 1024 * 1024;

/// Frame magic byte. Distinguishes direction and framing variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Magic {
    /// `0x80` — request originated by the client.
    ClientRequest = 0x80,
    /// `0x81` — response to a client request.
    ClientResponse = 0x81,
    /// `0x08` — client request carrying framing extras.
    AltClientRequest = 0x08,
    /// `0x18` — client response carrying framing extras.
    AltClientResponse = 0x18,
    /// `0x82` — unsolicited request originated by the server.
    ServerRequest = 0x82,
    /// `0x83` — client reply to a server request.
    ServerResponse = 0x83,
}

impl Magic {
    /// Decode a magic byte, `None` for unrecognized values.
    pub fn decode(byte: u8) -> Option<Self> {
        match byte {
            0x80 => Some(Magic::ClientRequest),
            0x81 => Some(Magic::ClientResponse),
            0x08 => Some(Magic::AltClientRequest),
            0x18 => Some(Magic::AltClientResponse),
            0x82 => Some(Magic::ServerRequest),
            0x83 => Some(Magic::ServerResponse),
            _ => None,
        }
    }

    /// Whether the body starts with framing extras.
    #[inline]
    pub fn has_framing_extras(self) -> bool {
        matches!(self, Magic::AltClientRequest | Magic::AltClientResponse)
    }

    /// Whether the vbucket/status field carries a response status.
    #[inline]
    pub fn is_response(self) -> bool {
        matches!(
            self,
            Magic::ClientResponse | Magic::AltClientResponse | Magic::ServerResponse
        )
    }
}

impl std::fmt::Display for Magic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Magic::ClientRequest => "client_request",
            Magic::ClientResponse => "client_response",
            Magic::AltClientRequest => "alt_client_request",
            Magic::AltClientResponse => "alt_client_response",
            Magic::ServerRequest => "server_request",
            Magic::ServerResponse => "server_response",
        };
        f.write_str(name)
    }
}

/// Decoded header from wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Frame magic.
    pub magic: Magic,
    /// Opcode (interpretation depends on magic).
    pub opcode: u8,
    /// Framing extras length (alt magics only, zero otherwise).
    pub framing_extras_len: u8,
    /// Key length in bytes.
    pub key_len: u16,
    /// Extras length in bytes.
    pub extras_len: u8,
    /// Datatype bits (raw/JSON/snappy), carried through untouched.
    pub datatype: u8,
    /// Vbucket id on requests, status code on responses.
    pub specific: u16,
    /// Total body length (framing extras + extras + key + value).
    pub body_len: u32,
    /// Request identifier, echoed by the response.
    pub opaque: u32,
    /// Document version.
    pub cas: u64,
}

impl Header {
    /// Encode header to bytes (Big Endian).
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0] = self.magic as u8;
        buf[1] = self.opcode;
        if self.magic.has_framing_extras() {
            buf[2] = self.framing_extras_len;
            buf[3] = self.key_len as u8;
        } else {
            buf[2..4].copy_from_slice(&self.key_len.to_be_bytes());
        }
        buf[4] = self.extras_len;
        buf[5] = self.datatype;
        buf[6..8].copy_from_slice(&self.specific.to_be_bytes());
        buf[8..12].copy_from_slice(&self.body_len.to_be_bytes());
        buf[12..16].copy_from_slice(&self.opaque.to_be_bytes());
        buf[16..24].copy_from_slice(&self.cas.to_be_bytes());
        buf
    }

    /// Decode header from bytes (Big Endian).
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProtocolError`] if the magic byte is unrecognized —
    /// the stream is no longer interpretable past this point.
    pub fn decode(buf: &[u8]) -> Result<Option<Self>> {
        if buf.len() < HEADER_SIZE {
            return Ok(None);
        }
        let magic = Magic::decode(buf[0])
            .ok_or_else(|| Error::ProtocolError(format!("unknown magic byte: {:#04x}", buf[0])))?;
        let (framing_extras_len, key_len) = if magic.has_framing_extras() {
            (buf[2], u16::from(buf[3]))
        } else {
            (0, u16::from_be_bytes([buf[2], buf[3]]))
        };
        Ok(Some(Self {
            magic,
            opcode: buf[1],
            framing_extras_len,
            key_len,
            extras_len: buf[4],
            datatype: buf[5],
            specific: u16::from_be_bytes([buf[6], buf[7]]),
            body_len: u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]),
            opaque: u32::from_be_bytes([buf[12], buf[13], buf[14], buf[15]]),
            cas: u64::from_be_bytes([
                buf[16], buf[17], buf[18], buf[19], buf[20], buf[21], buf[22], buf[23],
            ]),
        }))
    }

    /// Validate declared sizes for internal consistency.
    ///
    /// Checks that the framing extras, extras and key fit inside the
    /// declared total body, and that the body does not exceed `max_body`.
    pub fn validate(&self, max_body: u32) -> Result<()> {
        let prefix = u32::from(self.framing_extras_len)
            + u32::from(self.extras_len)
            + u32::from(self.key_len);
        if prefix > self.body_len {
            return Err(Error::ProtocolError(format!(
                "inconsistent sizes: framing={} extras={} key={} exceed body={}",
                self.framing_extras_len, self.extras_len, self.key_len, self.body_len
            )));
        }
        if self.body_len > max_body {
            return Err(Error::ProtocolError(format!(
                "body size {} exceeds maximum {}",
                self.body_len, max_body
            )));
        }
        Ok(())
    }
}
