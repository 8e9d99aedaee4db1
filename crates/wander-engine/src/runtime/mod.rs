//! Renderlet orchestration.
//!
//! This module is responsible for:
//! - loading renderlets and driving their invocations
//! - turning decoded output into render trees, directly or through the pool
//! - owning every tree and releasing the backend objects it references
//! - applying the fatal-error policy at the public boundary

mod config;
mod runtime;

pub use config::{DEFAULT_ENTRY, RuntimeConfig};
pub use runtime::Runtime;
