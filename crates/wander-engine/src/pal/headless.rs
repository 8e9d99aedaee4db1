use crate::id::{BufferId, VectorId};
use crate::state::{BoundState, MAX_BIND_GROUPS, StateGuard, StateHandles, Viewport};
use crate::table::ResourceTable;
use crate::vector::{TinySkiaRasterizer, VectorCommand, VectorImage, decode_commands, rasterize};

use super::{BufferDescriptor, BufferType, Pal, PalKind, VECTOR_CLEAR_COLOR, VectorTarget};

/// Objects the headless backend can bind.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum HeadlessBinding {
    Surface,
    Texture(BufferId),
    VectorTarget(VectorId),
    /// Caller-defined object.
    External(u32),
}

pub struct HeadlessHandles;

impl StateHandles for HeadlessHandles {
    type View = HeadlessBinding;
    type BindGroup = HeadlessBinding;
    type Pipeline = u32;
}

/// Pipeline id the headless backend binds while compositing vectors onto
/// the surface.
pub const HEADLESS_BLIT_PIPELINE: u32 = u32::MAX;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeadlessResource {
    Buffer { kind: BufferType, data: Vec<u8> },
    Texture { desc: BufferDescriptor, data: Vec<u8> },
}

/// A recorded draw.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DrawCall {
    TriangleList {
        buffer: BufferId,
        offset: u32,
        length: u32,
        stride: u32,
    },
    Vector {
        vector: VectorId,
        target: VectorTarget,
        width: u32,
        height: u32,
    },
}

#[derive(Debug, Clone)]
struct Raster {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Raster {
    fn copy_of(image: VectorImage<'_>) -> Self {
        Self {
            width: image.width,
            height: image.height,
            pixels: image.pixels.to_vec(),
        }
    }

    fn view(&self) -> VectorImage<'_> {
        VectorImage {
            width: self.width,
            height: self.height,
            pixels: &self.pixels,
        }
    }
}

struct VectorEntry {
    commands: Vec<VectorCommand>,
    target: Option<Raster>,
}

/// CPU backend.
///
/// Keeps buffer contents in host memory, records every draw, and paints
/// vector commands with the CPU rasterizer. Suited to tests and offline
/// tools.
pub struct HeadlessPal {
    resources: ResourceTable<HeadlessResource>,
    vectors: ResourceTable<VectorEntry>,
    draws: Vec<DrawCall>,
    state: BoundState<HeadlessHandles>,
    rasterizer: TinySkiaRasterizer,
    surface: Option<Raster>,
}

impl Default for HeadlessPal {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessPal {
    pub fn new() -> Self {
        let mut state = BoundState::default();
        state.color_targets[0] = Some(HeadlessBinding::Surface);
        Self {
            resources: ResourceTable::default(),
            vectors: ResourceTable::default(),
            draws: Vec::new(),
            state,
            rasterizer: TinySkiaRasterizer::new(),
            surface: None,
        }
    }

    #[inline]
    pub fn draw_calls(&self) -> &[DrawCall] {
        &self.draws
    }

    pub fn clear_draw_calls(&mut self) {
        self.draws.clear();
    }

    #[inline]
    pub fn resource(&self, id: BufferId) -> Option<&HeadlessResource> {
        self.resources.get(id.raw())
    }

    /// Contents of a buffer or texture.
    pub fn buffer_data(&self, id: BufferId) -> Option<&[u8]> {
        self.resource(id).map(|r| match r {
            HeadlessResource::Buffer { data, .. } | HeadlessResource::Texture { data, .. } => {
                data.as_slice()
            }
        })
    }

    /// Number of live buffers and textures.
    pub fn live_buffers(&self) -> usize {
        self.resources.live()
    }

    pub fn live_vectors(&self) -> usize {
        self.vectors.live()
    }

    pub fn vector_commands(&self, id: VectorId) -> Option<&[VectorCommand]> {
        self.vectors.get(id.raw()).map(|v| v.commands.as_slice())
    }

    /// Offscreen target painted by the last draw of `id`.
    pub fn vector_target(&self, id: VectorId) -> Option<VectorImage<'_>> {
        self.vectors
            .get(id.raw())
            .and_then(|v| v.target.as_ref())
            .map(Raster::view)
    }

    /// Last frame composited onto the surface.
    pub fn surface_image(&self) -> Option<VectorImage<'_>> {
        self.surface.as_ref().map(Raster::view)
    }

    #[inline]
    pub fn state(&self) -> &BoundState<HeadlessHandles> {
        &self.state
    }

    #[inline]
    pub fn state_mut(&mut self) -> &mut BoundState<HeadlessHandles> {
        &mut self.state
    }
}

impl Pal for HeadlessPal {
    fn kind(&self) -> PalKind {
        PalKind::Headless
    }

    fn create_geometry_buffer(&mut self, desc: &BufferDescriptor, data: &[u8]) -> Option<BufferId> {
        let id = BufferId::new(self.resources.insert(HeadlessResource::Buffer {
            kind: desc.kind,
            data: data.to_vec(),
        }));
        log::trace!("headless: created {id} ({:?}, {} bytes)", desc.kind, data.len());
        Some(id)
    }

    fn create_texture(&mut self, desc: &BufferDescriptor, data: &[u8]) -> Option<BufferId> {
        let Some(expected) = desc.texture_bytes() else {
            log::warn!("headless: unsupported texture format {:?}", desc.format);
            return None;
        };
        if data.len() < expected {
            log::warn!(
                "headless: texture data too short ({} of {expected} bytes)",
                data.len()
            );
            return None;
        }
        let id = BufferId::new(self.resources.insert(HeadlessResource::Texture {
            desc: *desc,
            data: data[..expected].to_vec(),
        }));
        log::trace!("headless: created texture {id} {}x{}", desc.width, desc.height);
        Some(id)
    }

    fn delete_buffer(&mut self, id: Option<BufferId>) {
        let Some(id) = id else {
            return;
        };
        if self.resources.remove(id.raw()).is_some() {
            log::trace!("headless: deleted {id}");
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
        self.draws.push(DrawCall::TriangleList {
            buffer,
            offset,
            length,
            stride,
        });
    }

    fn draw_vector(&mut self, id: VectorId, target: VectorTarget, width: u32, height: u32) {
        let Self {
            vectors,
            draws,
            state,
            rasterizer,
            surface,
            ..
        } = self;

        let Some(entry) = vectors.get_mut(id.raw()) else {
            log::warn!("headless: draw of unknown {id}");
            return;
        };

        {
            let mut guard = StateGuard::new(&mut *state);
            let Some(image) = rasterize(rasterizer, &entry.commands, width, height, VECTOR_CLEAR_COLOR)
            else {
                return;
            };
            let raster = Raster::copy_of(image);

            if target == VectorTarget::Surface {
                guard.color_targets[0] = Some(HeadlessBinding::Surface);
                guard.bind_groups[0] = Some(HeadlessBinding::VectorTarget(id));
                guard.pipeline = Some(HEADLESS_BLIT_PIPELINE);
                guard.viewport = Some(Viewport::full(width, height));
                *surface = Some(raster.clone());
            }
            entry.target = Some(raster);
        }

        if let VectorTarget::Slot(slot) = target {
            match state.bind_groups.get_mut(slot as usize) {
                Some(binding) => *binding = Some(HeadlessBinding::VectorTarget(id)),
                None => log::warn!("headless: slot {slot} exceeds {MAX_BIND_GROUPS} bind groups"),
            }
        }

        draws.push(DrawCall::Vector {
            vector: id,
            target,
            width,
            height,
        });
    }
}
