use anyhow::{Context, Result, bail};
use ouroboros::self_referencing;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use wander_engine::pal::VectorTarget;
use wander_engine::pal::webgpu::{BoundView, WgpuPal};
use wander_engine::tree::NodeResource;
use wander_engine::{RenderletId, Runtime, TreeId};

use crate::clock::{FrameClock, FrameTime};
use crate::config::ViewerConfig;
use crate::gpu::{Gpu, GpuInit, SurfaceErrorAction};
use crate::scene::{DEPTH_FORMAT, ScenePipeline, depth_texture};

const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.05,
    g: 0.05,
    b: 0.08,
    a: 1.0,
};

/// Opens the viewer window and drives the renderlet until it closes.
pub fn run(config: ViewerConfig) -> Result<()> {
    let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
    let mut viewer = Viewer::new(config, GpuInit::default());

    event_loop
        .run_app(&mut viewer)
        .context("winit event loop terminated with error")?;

    match viewer.failure.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[self_referencing]
struct WindowEntry {
    clock: FrameClock,

    window: Window,

    #[borrows(window)]
    #[covariant]
    gpu: Gpu<'this>,
}

/// The loaded renderlet and everything needed to draw what it emits.
struct Scene {
    runtime: Runtime<WgpuPal>,
    renderlet: RenderletId,
    tree: Option<TreeId>,
    pipeline: ScenePipeline,
    depth: BoundView,
    depth_size: PhysicalSize<u32>,
    stride: u32,
    pooled: bool,
}

impl Scene {
    fn new(gpu: &Gpu<'_>, config: &ViewerConfig) -> Result<Self> {
        let pal = WgpuPal::new(gpu.device().clone(), gpu.queue().clone());
        let mut runtime = Runtime::new(pal);
        let renderlet = runtime
            .try_load_from_file(&config.renderlet, config.entry.as_deref())
            .with_context(|| format!("failed to load {}", config.renderlet.display()))?;

        let size = gpu.size();
        Ok(Self {
            runtime,
            renderlet,
            tree: None,
            pipeline: ScenePipeline::new(gpu.device(), gpu.surface_format(), config.stride),
            depth: BoundView {
                view: depth_texture(gpu.device(), size.width, size.height),
                format: DEPTH_FORMAT,
            },
            depth_size: size,
            stride: config.stride,
            pooled: config.pooled,
        })
    }

    fn is_vector(&self, tree: TreeId) -> bool {
        self.runtime
            .render_tree(tree)
            .and_then(|t| t.node_at(0))
            .is_some_and(|n| matches!(n.resource(), NodeResource::Vector(_)))
    }

    /// Invokes the renderlet for this frame. Geometry trees are rebuilt every
    /// frame; vector trees are updated in place.
    fn update(&mut self, width: u32, height: u32, time: FrameTime) {
        let previous = self.tree.take();
        let reuse = previous.filter(|&t| self.is_vector(t));
        if let Some(old) = previous.filter(|_| reuse.is_none()) {
            self.runtime.destroy_render_tree(old);
        }

        let rt = &mut self.runtime;
        rt.push_param(self.renderlet, width);
        rt.push_param(self.renderlet, height);
        rt.push_param(self.renderlet, time.elapsed);
        self.tree = rt.render(self.renderlet, reuse, self.pooled);
        if self.pooled {
            rt.upload_buffer_pool(self.stride);
        }

        if let Some(old) = reuse.filter(|&old| self.tree != Some(old)) {
            self.runtime.destroy_render_tree(old);
        }
    }

    fn draw(&mut self, gpu: &Gpu<'_>, view: &wgpu::TextureView, time: FrameTime) {
        let PhysicalSize { width, height } = gpu.size();
        if self.depth_size != gpu.size() {
            self.depth.view = depth_texture(gpu.device(), width, height);
            self.depth_size = gpu.size();
        }

        self.update(width, height, time);
        self.pipeline.update_camera(gpu.queue(), width, height, time.elapsed);

        let Self {
            runtime,
            tree,
            pipeline,
            depth,
            stride,
            ..
        } = self;

        let pal = runtime.pal_mut();
        pal.begin_frame(view.clone(), gpu.surface_format(), width, height);
        let context = pal.context_mut();
        context.clear_color_target(view, CLEAR_COLOR);
        context.clear_depth_stencil(depth, 1.0, 0);
        let state = context.state_mut();
        state.depth_stencil = Some(depth.clone());
        state.pipeline = Some(pipeline.pipeline.clone());
        state.bind_groups[0] = Some(pipeline.camera_group.clone());

        if let Some(tree) = *tree {
            let nodes: Vec<NodeResource> = runtime
                .render_tree(tree)
                .map(|t| t.iter().map(|n| n.resource()).collect())
                .unwrap_or_default();
            for (index, resource) in nodes.into_iter().enumerate() {
                match resource {
                    NodeResource::Vector(_) => {
                        runtime.draw_vector(tree, index, VectorTarget::Surface, width, height);
                    }
                    _ => {
                        runtime.draw_node(tree, index, *stride);
                    }
                }
            }
        }

        runtime.pal_mut().end_frame();
    }
}

struct Viewer {
    config: ViewerConfig,
    gpu_init: GpuInit,
    // Dropped before the window so GPU objects go before the surface.
    scene: Option<Scene>,
    window: Option<WindowEntry>,
    failure: Option<anyhow::Error>,
}

impl Viewer {
    fn new(config: ViewerConfig, gpu_init: GpuInit) -> Self {
        Self {
            config,
            gpu_init,
            scene: None,
            window: None,
            failure: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{error:#}");
        self.failure.get_or_insert(error);
        event_loop.exit();
    }

    fn open(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let gpu_init = self.gpu_init.clone();
        let entry = WindowEntryTryBuilder {
            clock: FrameClock::default(),
            window,
            gpu_builder: |w| pollster::block_on(Gpu::new(w, gpu_init)),
        }
        .try_build()?;

        self.scene = Some(entry.with_gpu(|gpu| Scene::new(gpu, &self.config))?);
        entry.with_window(|w| w.request_redraw());
        self.window = Some(entry);
        Ok(())
    }

    fn redraw(&mut self) -> Result<()> {
        let (Some(entry), Some(scene)) = (self.window.as_mut(), self.scene.as_mut()) else {
            return Ok(());
        };

        entry.with_mut(|fields| {
            let time = fields.clock.tick();
            let size = fields.gpu.size();
            if size.width == 0 || size.height == 0 {
                return Ok(());
            }

            let frame = match fields.gpu.begin_frame() {
                Ok(frame) => frame,
                Err(e) => {
                    return match fields.gpu.handle_surface_error(e) {
                        SurfaceErrorAction::Fatal => bail!("surface is out of memory"),
                        _ => Ok(()),
                    };
                }
            };

            scene.draw(fields.gpu, &frame.view, time);
            frame.surface_texture.present();
            Ok(())
        })
    }
}

impl ApplicationHandler for Viewer {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.open(event_loop) {
            self.fail(event_loop, e);
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Wait);
        // Renderlets animate with time, so redraw continuously.
        if let Some(entry) = &self.window {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),

            WindowEvent::KeyboardInput { event, .. }
                if event.state == ElementState::Pressed
                    && event.physical_key == PhysicalKey::Code(KeyCode::Escape) =>
            {
                event_loop.exit()
            }

            WindowEvent::Resized(new_size) => {
                if let Some(entry) = self.window.as_mut() {
                    entry.with_gpu_mut(|gpu| gpu.resize(new_size));
                    entry.with_window(|w| w.request_redraw());
                }
            }

            WindowEvent::RedrawRequested => {
                if let Err(e) = self.redraw() {
                    self.fail(event_loop, e);
                }
            }

            _ => {}
        }
    }
}
