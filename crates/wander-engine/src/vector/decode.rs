use bytemuck::{Pod, Zeroable};

use crate::error::ProtocolError;
use crate::protocol::ByteReader;

use super::{BlendMode, Paint, PaintStyle, PathSegment, PathVerb, StrokeCap, StrokeJoin, VectorCommand};

/// Paint record as laid out by renderlets: five 32-bit fields and a one-byte
/// blend mode, padded to 4-byte alignment.
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct RawPaint {
    style: u32,
    color: u32,
    thickness: f32,
    join: u32,
    cap: u32,
    blend_mode: u8,
    _pad: [u8; 3],
}

/// Size of one encoded paint record.
pub const RAW_PAINT_SIZE: usize = std::mem::size_of::<RawPaint>();

impl From<RawPaint> for Paint {
    fn from(raw: RawPaint) -> Self {
        Paint {
            style: PaintStyle::from_raw(u32::from_le(raw.style)),
            color: u32::from_le(raw.color),
            thickness: f32::from_bits(u32::from_le(raw.thickness.to_bits())),
            join: StrokeJoin::from_raw(u32::from_le(raw.join)),
            cap: StrokeCap::from_raw(u32::from_le(raw.cap)),
            blend_mode: BlendMode::from_raw(raw.blend_mode),
        }
    }
}

/// Decodes `{paint, path count, paths}` records until a zero path count or
/// the end of the stream.
///
/// A record cut short by the end of the stream is dropped. No cross-record
/// validation is done.
pub fn decode_commands(stream: &[u8]) -> Vec<VectorCommand> {
    let mut reader = ByteReader::new(stream);
    let mut commands = Vec::new();

    while reader.remaining() > 0 {
        match read_command(&mut reader) {
            Ok(Some(command)) => commands.push(command),
            Ok(None) => break,
            Err(e) => {
                log::trace!("vector stream ended mid-record: {e}");
                break;
            }
        }
    }

    log::trace!("decoded {} vector commands from {} bytes", commands.len(), stream.len());
    commands
}

fn read_command(reader: &mut ByteReader<'_>) -> Result<Option<VectorCommand>, ProtocolError> {
    let paint: Paint = reader.pod::<RawPaint>()?.into();

    let path_count = reader.i32()?;
    if path_count <= 0 {
        return Ok(None);
    }

    let mut path = Vec::new();
    for _ in 0..path_count {
        let verb = PathVerb::from_raw(reader.i32()?);
        let point_count = reader.i32()?.max(0) as usize;

        // Each point is 8 bytes; refuse counts the stream cannot hold.
        let needed = point_count.saturating_mul(8);
        if needed > reader.remaining() {
            return Err(ProtocolError::Truncated {
                offset: reader.position(),
                needed,
                available: reader.remaining(),
            });
        }

        let mut points = Vec::with_capacity(point_count);
        for _ in 0..point_count {
            points.push([reader.f32()?, reader.f32()?]);
        }
        path.push(PathSegment { verb, points });
    }

    Ok(Some(VectorCommand { paint, path }))
}
