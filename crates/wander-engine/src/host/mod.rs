//! Execution host.
//!
//! This module is responsible for:
//! - owning the single bytecode engine shared by every renderlet
//! - compiling and instantiating renderlets in isolated stores
//! - queueing typed parameters and invoking exports with them
//! - exposing each renderlet's linear memory for decoding

mod config;
mod host;
mod param;
mod renderlet;

pub use config::EngineConfig;
pub use host::Host;
pub use param::{Param, ParamQueue};
