//! Renderlet output protocol.
//!
//! Layout at the offset an invocation returns:
//!
//! ```text
//! u32 version | u32 payload_len | u32 payload_kind | payload | u32 material_len | material
//! ```
//!
//! All integers are little-endian. Only `version == 1` is understood; any
//! other value means "nothing to render".

mod header;
mod material;
mod reader;

pub use header::{Header, PROTOCOL_VERSION, PayloadKind};
pub use material::{MaterialRecord, parse_material};
pub(crate) use reader::ByteReader;

use crate::error::ProtocolError;

/// Result of decoding one renderlet invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded<'a> {
    /// Header carried an unknown version; no tree is built.
    VersionMismatch(u32),

    /// Vertex or index bytes plus their material records.
    Geometry {
        kind: PayloadKind,
        payload: &'a [u8],
        materials: Vec<MaterialRecord>,
    },

    /// A vector command stream. Vector payloads carry no material section.
    Vector { payload: &'a [u8] },
}

/// Decodes the output found at `offset` within `memory`.
pub fn decode(memory: &[u8], offset: usize) -> Result<Decoded<'_>, ProtocolError> {
    let mut reader = ByteReader::at(memory, offset);
    let header = Header::read(&mut reader)?;

    if header.version != PROTOCOL_VERSION {
        return Ok(Decoded::VersionMismatch(header.version));
    }

    let payload = reader.bytes(header.payload_len as usize)?;

    if header.kind == PayloadKind::Vector {
        return Ok(Decoded::Vector { payload });
    }

    let material_len = reader.u32()? as usize;
    let material = reader.bytes(material_len)?;
    let materials = parse_material(&String::from_utf8_lossy(material))?;

    Ok(Decoded::Geometry {
        kind: header.kind,
        payload,
        materials,
    })
}
