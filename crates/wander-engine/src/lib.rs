//! Wander engine crate.
//!
//! Hosts WebAssembly renderlets, decodes the geometry they emit each frame,
//! and turns it into GPU resources through a backend-agnostic platform layer.

pub mod error;
pub mod id;
pub mod logging;

pub mod host;
pub mod protocol;
pub mod tree;
pub mod pool;
pub mod vector;
pub mod state;
pub mod pal;
pub mod runtime;

mod table;

pub use error::{ProtocolError, WanderError};
pub use id::{BufferId, RenderletId, TreeId, VectorId};
pub use runtime::{Runtime, RuntimeConfig};
