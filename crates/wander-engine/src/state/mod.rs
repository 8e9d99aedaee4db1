//! Pipeline state guard.
//!
//! Auxiliary renderers (vector painting in particular) rebind pipeline
//! state as a side effect of drawing. [`StateGuard`] captures everything the
//! main draw loop depends on and puts it back when dropped, on every exit
//! path including unwinding.

mod bound;
mod guard;

pub use bound::{BoundState, MAX_BIND_GROUPS, MAX_COLOR_TARGETS, ScissorRect, StateHandles, Viewport};
pub use guard::{PipelineStateAccess, StateGuard};
