use bytemuck::{Pod, Zeroable};

use crate::error::ProtocolError;

use super::ByteReader;

/// The only protocol version this runtime understands.
pub const PROTOCOL_VERSION: u32 = 1;

/// What the payload bytes describe.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PayloadKind {
    Vertex,
    Index,
    Vector,
}

impl PayloadKind {
    /// Maps the wire tag. Anything other than 2 or 3 is vertex data.
    #[inline]
    pub fn from_tag(tag: u32) -> Self {
        match tag {
            2 => PayloadKind::Vector,
            3 => PayloadKind::Index,
            _ => PayloadKind::Vertex,
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct RawHeader {
    version: u32,
    payload_len: u32,
    payload_kind: u32,
}

/// Fixed prefix of every renderlet output.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Header {
    pub version: u32,
    pub payload_len: u32,
    pub kind: PayloadKind,
}

impl Header {
    pub(crate) fn read(reader: &mut ByteReader<'_>) -> Result<Self, ProtocolError> {
        let raw: RawHeader = reader.pod()?;
        Ok(Self {
            version: u32::from_le(raw.version),
            payload_len: u32::from_le(raw.payload_len),
            kind: PayloadKind::from_tag(u32::from_le(raw.payload_kind)),
        })
    }
}
