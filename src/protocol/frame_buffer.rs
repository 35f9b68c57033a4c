//! Frame buffer for accumulating partial reads.
//!
//! Uses `bytes::BytesMut` for zero-copy buffer management and a two-state
//! machine for fragmented frames:
//! - `NeedHeader`: need the fixed 24 header bytes
//! - `NeedBody`: header parsed, need its declared body
//!
//! Unlike line protocols there is no resynchronization point: an
//! unrecognized magic or inconsistent declared sizes make the rest of the
//! stream uninterpretable, so those surface as errors and the session
//! terminates.

use bytes::BytesMut;

use super::frame::Frame;
use super::wire_format::{Header, DEFAULT_MAX_BODY_SIZE, HEADER_SIZE};
use crate::error::Result;

/// State machine for frame parsing.
#[derive(Debug, Clone, Copy)]
enum State {
    /// Waiting for a complete 24-byte header.
    NeedHeader,
    /// Header parsed, waiting for `header.body_len` bytes.
    NeedBody(Header),
}

/// Buffer for accumulating incoming bytes and extracting complete frames.
pub struct FrameBuffer {
    /// Accumulated bytes from socket reads.
    buffer: BytesMut,
    /// Current parsing state.
    state: State,
    /// Maximum allowed body size.
    max_body: u32,
}

impl FrameBuffer {
    /// Create a new frame buffer with default settings.
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(16 * 1024),
            state: State::NeedHeader,
            max_body: DEFAULT_MAX_BODY_SIZE,
        }
    }

    /// Create a frame buffer with a custom body size ceiling.
    pub fn with_max_body(max_body: u32) -> Self {
        Self {
            buffer: BytesMut::with_capacity(16 * 1024),
            state: State::NeedHeader,
            max_body,
        }
    }

    /// Append raw bytes from a socket read.
    pub fn feed(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to extract the next complete frame.
    ///
    /// Returns:
    /// - `Ok(Some(frame))` if a complete frame was extracted
    /// - `Ok(None)` if more data is needed
    /// - `Err(...)` on a fatal parse failure (unknown magic, size
    ///   inconsistency, oversized body)
    pub fn next(&mut self) -> Result<Option<Frame>> {
        loop {
            match self.state {
                State::NeedHeader => {
                    let Some(header) = Header::decode(&self.buffer)? else {
                        return Ok(None);
                    };
                    header.validate(self.max_body)?;
                    let _ = self.buffer.split_to(HEADER_SIZE);
                    self.state = State::NeedBody(header);
                }
                State::NeedBody(header) => {
                    let body_len = header.body_len as usize;
                    if self.buffer.len() < body_len {
                        return Ok(None);
                    }
                    let body = self.buffer.split_to(body_len).freeze();
                    self.state = State::NeedHeader;
                    return Ok(Some(Frame::from_body(header, body)));
                }
            }
        }
    }

    /// Number of buffered bytes not yet consumed.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether the buffer holds no unconsumed bytes.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::frame::{encode_request, encode_response};
    use crate::protocol::wire_format::Magic;

    fn drain(buffer: &mut FrameBuffer) -> Vec<Frame> {
        let mut frames = Vec::new();
        while let Some(frame) = buffer.next().unwrap() {
            frames.push(frame);
        }
        frames
    }

    #[test]
    fn single_complete_frame() {
        let mut buffer = FrameBuffer::new();
        buffer.feed(&encode_request(0x00, 42, 0, 0, b"", b"hello", b""));

        let frames = drain(&mut buffer);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].opaque, 42);
        assert_eq!(&frames[0].key[..], b"hello");
        assert!(buffer.is_empty());
    }

    #[test]
    fn multiple_frames_in_one_feed() {
        let mut buffer = FrameBuffer::new();
        let mut wire = Vec::new();
        for opaque in 1u32..=3 {
            wire.extend_from_slice(&encode_response(0x00, opaque, 0, 0, b"", b"", b"v"));
        }
        buffer.feed(&wire);

        let frames = drain(&mut buffer);
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].opaque, 1);
        assert_eq!(frames[2].opaque, 3);
    }

    #[test]
    fn split_feed_equals_whole_feed() {
        let wire = encode_response(0x00, 7, 9, 0, b"\x01\x02", b"k", b"value bytes");

        // Whole
        let mut whole = FrameBuffer::new();
        whole.feed(&wire);
        let expect = drain(&mut whole);

        // Byte at a time
        let mut split = FrameBuffer::new();
        let mut got = Vec::new();
        for byte in &wire {
            split.feed(std::slice::from_ref(byte));
            got.extend(drain(&mut split));
        }

        assert_eq!(expect.len(), 1);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].opaque, expect[0].opaque);
        assert_eq!(got[0].cas, expect[0].cas);
        assert_eq!(got[0].extras, expect[0].extras);
        assert_eq!(got[0].key, expect[0].key);
        assert_eq!(got[0].value, expect[0].value);
    }

    #[test]
    fn one_and_a_half_frames() {
        let first = encode_response(0x00, 1, 0, 0, b"", b"", b"one");
        let second = encode_response(0x00, 2, 0, 0, b"", b"", b"two");

        let mut buffer = FrameBuffer::new();
        let mut wire = first.to_vec();
        wire.extend_from_slice(&second[..second.len() / 2]);
        buffer.feed(&wire);

        assert_eq!(buffer.next().unwrap().unwrap().opaque, 1);
        assert!(buffer.next().unwrap().is_none());

        buffer.feed(&second[second.len() / 2..]);
        assert_eq!(buffer.next().unwrap().unwrap().opaque, 2);
    }

    #[test]
    fn unknown_magic_is_fatal() {
        let mut wire = encode_response(0x00, 1, 0, 0, b"", b"", b"").to_vec();
        wire[0] = 0x42;

        let mut buffer = FrameBuffer::new();
        buffer.feed(&wire);
        assert!(buffer.next().is_err());
    }

    #[test]
    fn inconsistent_sizes_are_fatal() {
        // extras(4) + key(3) declared, but total body of 2.
        let mut wire = encode_response(0x00, 1, 0, 0, b"\x00\x00\x00\x00", b"abc", b"").to_vec();
        wire[8..12].copy_from_slice(&2u32.to_be_bytes());

        let mut buffer = FrameBuffer::new();
        buffer.feed(&wire);
        assert!(buffer.next().is_err());
    }

    #[test]
    fn oversized_body_is_fatal() {
        let mut buffer = FrameBuffer::with_max_body(16);
        buffer.feed(&encode_response(0x00, 1, 0, 0, b"", b"", &[0u8; 32]));
        assert!(buffer.next().is_err());
    }

    #[test]
    fn empty_body_frame() {
        let mut buffer = FrameBuffer::new();
        buffer.feed(&encode_request(0xb5, 9, 0, 0, b"", b"", b""));

        let frame = buffer.next().unwrap().unwrap();
        assert_eq!(frame.magic, Magic::ClientRequest);
        assert!(frame.value.is_empty());
        assert!(buffer.is_empty());
    }
}
