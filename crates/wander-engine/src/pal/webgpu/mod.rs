//! wgpu backend.
//!
//! wgpu has no global device state, so this backend keeps its own
//! [`ImmediateContext`]: the bindings a draw uses are set on the context and
//! every draw records a render pass from whatever is currently bound. This is
//! the state surface the [`crate::state::StateGuard`] captures around vector
//! draws.

mod bindings;
mod context;
mod format;
mod pal;

pub use bindings::TextureBindings;
pub use context::{BoundView, ImmediateContext, WgpuHandles, WgpuState};
pub use format::texture_format;
pub use pal::{SurfaceTarget, WgpuPal};
