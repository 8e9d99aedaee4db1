//! OpenGL backend over `glow`.
//!
//! GL keeps its own bound state, so draws bind the buffer's vertex array and
//! leave program, targets and textures to the caller. Vector rendering is not
//! available on this backend.

mod format;
mod pal;

pub use format::{GlFormat, gl_format};
pub use pal::{GlAttribute, GlConfig, GlPal};
