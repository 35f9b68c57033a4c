//! Frame struct with typed accessors and wire builders.
//!
//! A [`Frame`] is a fully parsed message: the decoded header fields plus
//! the body split into its `framing extras ++ extras ++ key ++ value`
//! ranges. Payload ranges are `bytes::Bytes` slices into the single body
//! allocation, so cloning a frame is cheap.

use bytes::{BufMut, Bytes, BytesMut};

use super::wire_format::{Header, Magic, HEADER_SIZE};
use crate::error::{Error, Result};

/// A complete protocol frame.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Frame magic.
    pub magic: Magic,
    /// Raw opcode byte (interpretation depends on magic).
    pub opcode: u8,
    /// Datatype bits, carried through untouched.
    pub datatype: u8,
    /// Vbucket id on requests, status code on responses.
    pub specific: u16,
    /// Request identifier.
    pub opaque: u32,
    /// Document version.
    pub cas: u64,
    /// Framing extras (alt magics only, empty otherwise).
    pub framing_extras: Bytes,
    /// Command extras.
    pub extras: Bytes,
    /// Document key.
    pub key: Bytes,
    /// Command value.
    pub value: Bytes,
}

impl Frame {
    /// Split a complete body into a frame according to its header.
    ///
    /// The header must already have passed [`Header::validate`], so the
    /// declared ranges are known to fit inside `body`.
    pub(crate) fn from_body(header: Header, body: Bytes) -> Self {
        let framing_len = usize::from(header.framing_extras_len);
        let extras_len = usize::from(header.extras_len);
        let key_len = usize::from(header.key_len);

        let framing_extras = body.slice(0..framing_len);
        let extras = body.slice(framing_len..framing_len + extras_len);
        let key = body.slice(framing_len + extras_len..framing_len + extras_len + key_len);
        let value = body.slice(framing_len + extras_len + key_len..);

        Self {
            magic: header.magic,
            opcode: header.opcode,
            datatype: header.datatype,
            specific: header.specific,
            opaque: header.opaque,
            cas: header.cas,
            framing_extras,
            extras,
            key,
            value,
        }
    }

    /// Response status, `None` when the frame is not a response.
    #[inline]
    pub fn status(&self) -> Option<u16> {
        self.magic.is_response().then_some(self.specific)
    }

    /// Re-encode the frame to wire bytes.
    pub fn encode(&self) -> Result<Bytes> {
        if self.magic.has_framing_extras() && self.framing_extras.len() > usize::from(u8::MAX) {
            return Err(Error::ProtocolError(
                "framing extras exceed one byte length".into(),
            ));
        }
        let body_len =
            self.framing_extras.len() + self.extras.len() + self.key.len() + self.value.len();
        let header = Header {
            magic: self.magic,
            opcode: self.opcode,
            framing_extras_len: self.framing_extras.len() as u8,
            key_len: self.key.len() as u16,
            extras_len: self.extras.len() as u8,
            datatype: self.datatype,
            specific: self.specific,
            body_len: body_len as u32,
            opaque: self.opaque,
            cas: self.cas,
        };
        let mut buf = BytesMut::with_capacity(HEADER_SIZE + body_len);
        buf.put_slice(&header.encode());
        buf.put_slice(&self.framing_extras);
        buf.put_slice(&self.extras);
        buf.put_slice(&self.key);
        buf.put_slice(&self.value);
        Ok(buf.freeze())
    }
}

/// Encode a client request.
///
/// Opaques are chosen by the session
/// ([`Session::next_opaque`](crate::session::Session::next_opaque)), not
/// here.
pub fn encode_request(
    opcode: u8,
    opaque: u32,
    cas: u64,
    vbucket: u16,
    extras: &[u8],
    key: &[u8],
    value: &[u8],
) -> Bytes {
    encode_with_magic(Magic::ClientRequest, opcode, opaque, cas, vbucket, extras, key, value)
}

/// Encode a client response. Used by tests standing in for the server.
pub fn encode_response(
    opcode: u8,
    opaque: u32,
    cas: u64,
    status: u16,
    extras: &[u8],
    key: &[u8],
    value: &[u8],
) -> Bytes {
    encode_with_magic(Magic::ClientResponse, opcode, opaque, cas, status, extras, key, value)
}

/// Encode a server request. Used by tests standing in for the server.
pub fn encode_server_request(
    opcode: u8,
    opaque: u32,
    extras: &[u8],
    key: &[u8],
    value: &[u8],
) -> Bytes {
    encode_with_magic(Magic::ServerRequest, opcode, opaque, 0, 0, extras, key, value)
}

#[allow(clippy::too_many_arguments)]
fn encode_with_magic(
    magic: Magic,
    opcode: u8,
    opaque: u32,
    cas: u64,
    specific: u16,
    extras: &[u8],
    key: &[u8],
    value: &[u8],
) -> Bytes {
    let body_len = extras.len() + key.len() + value.len();
    let header = Header {
        magic,
        opcode,
        framing_extras_len: 0,
        key_len: key.len() as u16,
        extras_len: extras.len() as u8,
        datatype: 0,
        specific,
        body_len: body_len as u32,
        opaque,
        cas,
    };
    let mut buf = BytesMut::with_capacity(HEADER_SIZE + body_len);
    buf.put_slice(&header.encode());
    buf.put_slice(extras);
    buf.put_slice(key);
    buf.put_slice(value);
    buf.freeze()
}
