//! Interactive renderlet viewer.
//!
//! Loads one renderlet, passes it the surface size and elapsed seconds every
//! frame, and draws whatever it emits with the wgpu platform layer.

mod app;
mod clock;
mod config;
mod gpu;
mod scene;

use anyhow::Result;
use wander_engine::logging::{LoggingConfig, init_logging};

use crate::config::ViewerConfig;

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());
    let config = ViewerConfig::from_args(std::env::args().skip(1))?;
    log::info!("viewing {}", config.renderlet.display());
    app::run(config)
}
