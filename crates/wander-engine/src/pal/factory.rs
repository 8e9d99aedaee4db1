use std::sync::Arc;

use super::opengl::{GlConfig, GlPal};
use super::webgpu::WgpuPal;
use super::{HeadlessPal, Pal, PalKind};

/// Everything needed to construct one backend.
pub enum PalRequest {
    Wgpu {
        device: wgpu::Device,
        queue: wgpu::Queue,
    },
    OpenGl {
        context: Arc<glow::Context>,
        config: GlConfig,
    },
    Headless,
}

impl PalRequest {
    pub fn kind(&self) -> PalKind {
        match self {
            PalRequest::Wgpu { .. } => PalKind::Wgpu,
            PalRequest::OpenGl { .. } => PalKind::OpenGl,
            PalRequest::Headless => PalKind::Headless,
        }
    }
}

/// Constructs the backend named by `request`.
pub fn create_pal(request: PalRequest) -> Box<dyn Pal> {
    log::info!("creating {:?} platform layer", request.kind());
    match request {
        PalRequest::Wgpu { device, queue } => Box::new(WgpuPal::new(device, queue)),
        PalRequest::OpenGl { context, config } => Box::new(GlPal::new(context, config)),
        PalRequest::Headless => Box::new(HeadlessPal::new()),
    }
}
