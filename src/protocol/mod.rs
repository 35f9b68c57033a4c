//! Protocol module - wire format, framing, and frame types.
//!
//! This module implements the binary protocol layer:
//! - 24-byte header encoding/decoding with magic/opcode/status vocabularies
//! - Frame buffer for accumulating partial reads
//! - Frame struct with typed accessors and request/response builders
//! - Status translation into the crate error taxonomy

mod feature;
mod frame;
mod frame_buffer;
mod opcode;
mod status;
mod wire_format;

pub use feature::ServerFeature;
pub use frame::{encode_request, encode_response, encode_server_request, Frame};
pub use frame_buffer::FrameBuffer;
pub use opcode::{Opcode, ServerOpcode};
pub use status::{map_status, Status};
pub use wire_format::{Header, Magic, DEFAULT_MAX_BODY_SIZE, HEADER_SIZE};
