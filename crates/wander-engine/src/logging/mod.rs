//! Logging utilities.
//!
//! Centralizes logger initialization. Library code only talks to the `log`
//! facade; binaries call [`init_logging`] once at startup.

mod init;

pub use init::{LoggingConfig, init_logging};
