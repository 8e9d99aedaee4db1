use std::ops::Range;

use crate::state::{BoundState, PipelineStateAccess, StateHandles};

/// A bound render target and the format that decides its load/store ops.
#[derive(Debug, Clone)]
pub struct BoundView {
    pub view: wgpu::TextureView,
    pub format: wgpu::TextureFormat,
}

pub struct WgpuHandles;

impl StateHandles for WgpuHandles {
    type View = BoundView;
    type BindGroup = wgpu::BindGroup;
    type Pipeline = wgpu::RenderPipeline;
}

pub type WgpuState = BoundState<WgpuHandles>;

/// Immediate-mode layer over wgpu.
///
/// Callers bind targets, bind groups and a pipeline on the state, then call
/// [`ImmediateContext::draw`]; each draw records one render pass that loads
/// and stores whatever is bound. Work accumulates in a lazily created
/// encoder until [`ImmediateContext::flush`].
pub struct ImmediateContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
    state: WgpuState,
    encoder: Option<wgpu::CommandEncoder>,
}

impl ImmediateContext {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self {
            device,
            queue,
            state: WgpuState::default(),
            encoder: None,
        }
    }

    #[inline]
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    #[inline]
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    #[inline]
    pub fn state(&self) -> &WgpuState {
        &self.state
    }

    #[inline]
    pub fn state_mut(&mut self) -> &mut WgpuState {
        &mut self.state
    }

    /// Encoder for work outside the bound state (copies, custom passes).
    pub fn encoder(&mut self) -> &mut wgpu::CommandEncoder {
        let device = &self.device;
        self.encoder.get_or_insert_with(|| {
            device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("wander immediate encoder"),
            })
        })
    }

    /// Draws `vertices` with the bound state and `vertex_buffer` at slot 0.
    ///
    /// Does nothing when no pipeline or no target is bound.
    pub fn draw(&mut self, vertex_buffer: Option<&wgpu::Buffer>, vertices: Range<u32>) {
        let Self {
            device,
            state,
            encoder,
            ..
        } = self;

        let Some(pipeline) = state.pipeline.as_ref() else {
            log::warn!("wgpu: draw without a bound pipeline");
            return;
        };
        let count = state.color_target_count();
        if count == 0 && state.depth_stencil.is_none() {
            log::warn!("wgpu: draw without a bound render target");
            return;
        }

        let color_attachments: Vec<Option<wgpu::RenderPassColorAttachment<'_>>> = state
            .color_targets[..count]
            .iter()
            .flatten()
            .map(|target| {
                Some(wgpu::RenderPassColorAttachment {
                    view: &target.view,
                    resolve_target: None,
                    ops: keep(),
                    depth_slice: None,
                })
            })
            .collect();

        let depth_stencil_attachment =
            state
                .depth_stencil
                .as_ref()
                .map(|target| wgpu::RenderPassDepthStencilAttachment {
                    view: &target.view,
                    depth_ops: target.format.has_depth_aspect().then(keep),
                    stencil_ops: target.format.has_stencil_aspect().then(keep),
                });

        let encoder = encoder.get_or_insert_with(|| {
            device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("wander immediate encoder"),
            })
        });

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("wander draw"),
            color_attachments: &color_attachments,
            depth_stencil_attachment,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        pass.set_pipeline(pipeline);
        for (index, group) in state.bind_groups.iter().enumerate() {
            if let Some(group) = group {
                pass.set_bind_group(index as u32, group, &[]);
            }
        }
        if let Some(v) = state.viewport {
            pass.set_viewport(v.x, v.y, v.width, v.height, v.min_depth, v.max_depth);
        }
        if let Some(s) = state.scissor {
            pass.set_scissor_rect(s.x, s.y, s.width, s.height);
        }
        let [r, g, b, a] = state.blend_constant;
        pass.set_blend_constant(wgpu::Color { r, g, b, a });
        pass.set_stencil_reference(state.stencil_reference);
        if let Some(buffer) = vertex_buffer {
            pass.set_vertex_buffer(0, buffer.slice(..));
        }
        pass.draw(vertices, 0..1);
    }

    pub fn clear_color_target(&mut self, view: &wgpu::TextureView, color: wgpu::Color) {
        let encoder = self.encoder();
        let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("wander clear color"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(color),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
    }

    pub fn clear_depth_stencil(&mut self, target: &BoundView, depth: f32, stencil: u32) {
        let has_depth = target.format.has_depth_aspect();
        let has_stencil = target.format.has_stencil_aspect();
        let encoder = self.encoder();
        let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("wander clear depth"),
            color_attachments: &[],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &target.view,
                depth_ops: has_depth.then_some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(depth),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: has_stencil.then_some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(stencil),
                    store: wgpu::StoreOp::Store,
                }),
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
    }

    /// Submits everything recorded since the last flush.
    pub fn flush(&mut self) {
        if let Some(encoder) = self.encoder.take() {
            self.queue.submit(Some(encoder.finish()));
        }
    }
}

fn keep<V>() -> wgpu::Operations<V> {
    wgpu::Operations {
        load: wgpu::LoadOp::Load,
        store: wgpu::StoreOp::Store,
    }
}

impl PipelineStateAccess for ImmediateContext {
    type Snapshot = WgpuState;

    fn capture(&self) -> WgpuState {
        self.state.capture()
    }

    fn unbind_render_targets(&mut self) {
        self.state.unbind_render_targets();
    }

    fn restore(&mut self, snapshot: WgpuState) {
        self.state.restore(snapshot);
    }
}
