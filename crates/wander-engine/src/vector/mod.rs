//! Vector path commands.
//!
//! This module is responsible for:
//! - the paint/path command model
//! - decoding a renderlet's vector payload into commands
//! - the rasterizer contract backends use to paint commands, plus a CPU
//!   implementation

mod command;
pub(crate) mod decode;
mod raster;

pub use command::{BlendMode, Paint, PaintStyle, PathSegment, PathVerb, StrokeCap, StrokeJoin, VectorCommand};
pub use decode::{RAW_PAINT_SIZE, decode_commands};
pub use raster::{TinySkiaRasterizer, VectorImage, VectorRasterizer, rasterize};
