use wgpu::util::DeviceExt;

use crate::id::{BufferId, VectorId};
use crate::pal::{
    BufferDescriptor, BufferType, Pal, PalKind, VECTOR_CLEAR_COLOR, VectorTarget, expand_rgb_to_rgba,
};
use crate::state::{MAX_BIND_GROUPS, StateGuard, Viewport};
use crate::table::ResourceTable;
use crate::vector::{TinySkiaRasterizer, VectorCommand, VectorRasterizer, decode_commands, rasterize};

use super::bindings::{BlitPipeline, TextureBindings};
use super::context::{BoundView, ImmediateContext};
use super::format::texture_format;

const VECTOR_TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

enum GpuResource {
    Buffer {
        buffer: wgpu::Buffer,
    },
    Texture {
        _texture: wgpu::Texture,
        bind_group: wgpu::BindGroup,
    },
}

struct VectorTexture {
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
    width: u32,
    height: u32,
}

impl VectorTexture {
    fn new(device: &wgpu::Device, bindings: &TextureBindings, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("wander vector target"),
            size: extent(width, height),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: VECTOR_TARGET_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = bindings.bind_group(device, &view, true);
        Self {
            texture,
            bind_group,
            width,
            height,
        }
    }
}

struct VectorEntry {
    commands: Vec<VectorCommand>,
    target: Option<VectorTexture>,
}

/// Presentation surface of the frame in flight.
#[derive(Debug, Clone)]
pub struct SurfaceTarget {
    pub view: wgpu::TextureView,
    pub format: wgpu::TextureFormat,
    pub width: u32,
    pub height: u32,
}

/// wgpu backend.
///
/// Geometry draws go through the [`ImmediateContext`]: the caller binds its
/// pipeline and bind groups there, and [`Pal::draw_triangle_list`] issues the
/// draw with the requested buffer at vertex slot 0. Vector commands are
/// painted by `R` on the CPU, uploaded to a per-vector texture and either
/// composited onto the surface or exposed at a bind group slot.
pub struct WgpuPal<R: VectorRasterizer = TinySkiaRasterizer> {
    device: wgpu::Device,
    queue: wgpu::Queue,
    context: ImmediateContext,
    resources: ResourceTable<GpuResource>,
    vectors: ResourceTable<VectorEntry>,
    bindings: TextureBindings,
    blit: Option<BlitPipeline>,
    surface: Option<SurfaceTarget>,
    rasterizer: R,
}

impl WgpuPal {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self::with_rasterizer(device, queue, TinySkiaRasterizer::new())
    }
}

impl<R: VectorRasterizer> WgpuPal<R> {
    pub fn with_rasterizer(device: wgpu::Device, queue: wgpu::Queue, rasterizer: R) -> Self {
        let bindings = TextureBindings::new(&device);
        let context = ImmediateContext::new(device.clone(), queue.clone());
        Self {
            device,
            queue,
            context,
            resources: ResourceTable::default(),
            vectors: ResourceTable::default(),
            bindings,
            blit: None,
            surface: None,
            rasterizer,
        }
    }

    #[inline]
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    #[inline]
    pub fn context(&self) -> &ImmediateContext {
        &self.context
    }

    #[inline]
    pub fn context_mut(&mut self) -> &mut ImmediateContext {
        &mut self.context
    }

    /// Layouts callers use when building pipelines that sample textures.
    #[inline]
    pub fn texture_bindings(&self) -> &TextureBindings {
        &self.bindings
    }

    pub fn buffer(&self, id: BufferId) -> Option<&wgpu::Buffer> {
        match self.resources.get(id.raw())? {
            GpuResource::Buffer { buffer } => Some(buffer),
            GpuResource::Texture { .. } => None,
        }
    }

    pub fn texture_bind_group(&self, id: BufferId) -> Option<&wgpu::BindGroup> {
        match self.resources.get(id.raw())? {
            GpuResource::Texture { bind_group, .. } => Some(bind_group),
            GpuResource::Buffer { .. } => None,
        }
    }

    /// Binds the surface texture as color target 0 for the frame.
    pub fn begin_frame(
        &mut self,
        view: wgpu::TextureView,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) {
        let state = self.context.state_mut();
        state.color_targets[0] = Some(BoundView {
            view: view.clone(),
            format,
        });
        state.viewport = Some(Viewport::full(width, height));
        self.surface = Some(SurfaceTarget {
            view,
            format,
            width,
            height,
        });
    }

    /// Submits the frame and releases the surface view.
    pub fn end_frame(&mut self) {
        self.context.flush();
        self.context.state_mut().color_targets[0] = None;
        self.surface = None;
    }

    fn blit_pipeline(&mut self, format: wgpu::TextureFormat) -> wgpu::RenderPipeline {
        match &self.blit {
            Some(blit) if blit.format == format => blit.pipeline.clone(),
            _ => {
                let blit = BlitPipeline::new(&self.device, &self.bindings, format);
                let pipeline = blit.pipeline.clone();
                self.blit = Some(blit);
                pipeline
            }
        }
    }
}

impl<R: VectorRasterizer> Pal for WgpuPal<R> {
    fn kind(&self) -> PalKind {
        PalKind::Wgpu
    }

    fn create_geometry_buffer(&mut self, desc: &BufferDescriptor, data: &[u8]) -> Option<BufferId> {
        if data.is_empty() {
            log::warn!("wgpu: refusing empty {:?} buffer", desc.kind);
            return None;
        }
        // Index nodes are drawn as triangle lists too, so they also need
        // vertex usage.
        let usage = match desc.kind {
            BufferType::Index => wgpu::BufferUsages::INDEX | wgpu::BufferUsages::VERTEX,
            _ => wgpu::BufferUsages::VERTEX,
        };
        let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("wander geometry buffer"),
            contents: data,
            usage: usage | wgpu::BufferUsages::COPY_DST,
        });
        let id = BufferId::new(self.resources.insert(GpuResource::Buffer { buffer }));
        log::trace!("wgpu: created {id} ({:?}, {} bytes)", desc.kind, data.len());
        Some(id)
    }

    fn create_texture(&mut self, desc: &BufferDescriptor, data: &[u8]) -> Option<BufferId> {
        let (Some(format), Some(layout), Some(expected)) = (
            texture_format(desc.format),
            desc.format.texel_layout(),
            desc.texture_bytes(),
        ) else {
            log::warn!("wgpu: unsupported texture format {:?}", desc.format);
            return None;
        };
        if data.len() < expected || desc.width == 0 || desc.height == 0 {
            log::warn!(
                "wgpu: bad texture upload {}x{} with {} of {expected} bytes",
                desc.width,
                desc.height,
                data.len()
            );
            return None;
        }

        let pixels = expand_rgb_to_rgba(&data[..expected], layout);
        let row_bytes = pixels.len() as u32 / desc.height;

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("wander texture"),
            size: extent(desc.width, desc.height),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        write_texture(&self.queue, &texture, &pixels, row_bytes, desc.width, desc.height);

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let filterable = layout.channel_bytes < 4;
        let bind_group = self.bindings.bind_group(&self.device, &view, filterable);

        let id = BufferId::new(self.resources.insert(GpuResource::Texture {
            _texture: texture,
            bind_group,
        }));
        log::trace!("wgpu: created texture {id} {}x{} {format:?}", desc.width, desc.height);
        Some(id)
    }

    fn delete_buffer(&mut self, id: Option<BufferId>) {
        let Some(id) = id else {
            return;
        };
        if self.resources.remove(id.raw()).is_some() {
            log::trace!("wgpu: deleted {id}");
        }
    }

    fn create_vector(&mut self, data: &[u8]) -> Option<VectorId> {
        let entry = VectorEntry {
            commands: decode_commands(data),
            target: None,
        };
        Some(VectorId::new(self.vectors.insert(entry)))
    }

    fn update_vector(&mut self, data: &[u8], id: VectorId) -> Option<VectorId> {
        let entry = self.vectors.get_mut(id.raw())?;
        entry.commands = decode_commands(data);
        Some(id)
    }

    fn delete_vector(&mut self, id: VectorId) {
        self.vectors.remove(id.raw());
    }

    fn draw_triangle_list(&mut self, buffer: BufferId, offset: u32, length: u32, stride: u32) {
        let Some(GpuResource::Buffer { buffer: vbo }) = self.resources.get(buffer.raw()) else {
            log::warn!("wgpu: draw of unknown {buffer}");
            return;
        };
        let end = u64::from(offset) + u64::from(length);
        if stride > 0 && end * u64::from(stride) > vbo.size() {
            log::warn!(
                "wgpu: draw of {buffer} elements {offset}..{end} exceeds {} bytes",
                vbo.size()
            );
            return;
        }
        self.context.draw(Some(vbo), offset..offset + length);
    }

    fn draw_vector(&mut self, id: VectorId, target: VectorTarget, width: u32, height: u32) {
        let surface = match (target, self.surface.clone()) {
            (VectorTarget::Surface, None) => {
                log::warn!("wgpu: surface vector draw outside a frame");
                return;
            }
            (_, surface) => surface,
        };
        let blit = match (target, &surface) {
            (VectorTarget::Surface, Some(s)) => Some(self.blit_pipeline(s.format)),
            _ => None,
        };

        let Self {
            device,
            queue,
            context,
            vectors,
            bindings,
            rasterizer,
            ..
        } = self;

        let Some(entry) = vectors.get_mut(id.raw()) else {
            log::warn!("wgpu: draw of unknown {id}");
            return;
        };
        let Some(image) = rasterize(rasterizer, &entry.commands, width, height, VECTOR_CLEAR_COLOR)
        else {
            return;
        };

        let stale = entry
            .target
            .as_ref()
            .is_none_or(|t| t.width != width || t.height != height);
        if stale {
            entry.target = Some(VectorTexture::new(device, bindings, width, height));
        }
        let Some(texture) = entry.target.as_ref() else {
            return;
        };

        // Earlier draws must reach the queue before this upload.
        context.flush();
        write_texture(queue, &texture.texture, image.pixels, width * 4, width, height);

        if let (Some(surface), Some(pipeline)) = (surface, blit) {
            let mut guard = StateGuard::new(&mut *context);
            let state = guard.state_mut();
            state.color_targets = std::array::from_fn(|_| None);
            state.color_targets[0] = Some(BoundView {
                view: surface.view,
                format: surface.format,
            });
            state.depth_stencil = None;
            state.bind_groups = std::array::from_fn(|_| None);
            state.bind_groups[0] = Some(texture.bind_group.clone());
            state.pipeline = Some(pipeline);
            state.viewport = Some(Viewport::full(surface.width, surface.height));
            state.scissor = None;
            guard.draw(None, 0..3);
        }

        if let VectorTarget::Slot(slot) = target {
            match context.state_mut().bind_groups.get_mut(slot as usize) {
                Some(binding) => *binding = Some(texture.bind_group.clone()),
                None => log::warn!("wgpu: slot {slot} exceeds {MAX_BIND_GROUPS} bind groups"),
            }
        }
    }

    fn flush(&mut self) {
        self.context.flush();
    }
}

fn extent(width: u32, height: u32) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    }
}

fn write_texture(
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    data: &[u8],
    bytes_per_row: u32,
    width: u32,
    height: u32,
) {
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        data,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(bytes_per_row),
            rows_per_image: Some(height),
        },
        extent(width, height),
    );
}
