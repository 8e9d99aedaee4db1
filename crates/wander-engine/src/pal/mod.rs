//! Platform abstraction layer.
//!
//! This module is responsible for:
//! - the backend-agnostic resource/draw contract ([`Pal`])
//! - buffer descriptors and the pixel formats backends understand
//! - backend selection from a tagged construction request
//! - the wgpu, OpenGL and headless backends

mod descriptor;
mod factory;
mod format;
mod headless;

pub mod opengl;
pub mod webgpu;

pub use descriptor::{BufferDescriptor, BufferFormat, BufferType, TexelLayout};
pub use factory::{PalRequest, create_pal};
pub use format::expand_rgb_to_rgba;
pub use headless::{
    DrawCall, HEADLESS_BLIT_PIPELINE, HeadlessBinding, HeadlessHandles, HeadlessPal, HeadlessResource,
};

use crate::id::{BufferId, VectorId};

/// Which backend implements a [`Pal`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PalKind {
    /// Explicit-state API driven through an immediate context.
    Wgpu,
    OpenGl,
    /// CPU-only backend recording every call.
    Headless,
}

/// Where a vector draw lands.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum VectorTarget {
    /// The active presentation surface.
    Surface,
    /// An offscreen target exposed to later draws at this texture slot.
    Slot(u32),
}

impl VectorTarget {
    /// Maps the wire convention where `-1` selects the surface.
    #[inline]
    pub fn from_slot(slot: i32) -> Self {
        if slot < 0 {
            VectorTarget::Surface
        } else {
            VectorTarget::Slot(slot as u32)
        }
    }
}

/// Opaque color used to clear offscreen vector targets.
pub const VECTOR_CLEAR_COLOR: u32 = 0xFF00_0000;

/// Resource and draw contract implemented once per graphics backend.
///
/// Creation calls return `None` when the backend cannot or will not create
/// the object (unsupported format, driver failure, no vector pipeline).
pub trait Pal {
    fn kind(&self) -> PalKind;

    /// Uploads an immutable buffer. Texture descriptors go to
    /// [`Pal::create_texture`]; index and vertex descriptors to
    /// [`Pal::create_geometry_buffer`].
    fn create_buffer(&mut self, desc: &BufferDescriptor, data: &[u8]) -> Option<BufferId> {
        match desc.kind {
            BufferType::Texture2D => self.create_texture(desc, data),
            BufferType::Vertex | BufferType::Index => self.create_geometry_buffer(desc, data),
        }
    }

    fn create_geometry_buffer(&mut self, desc: &BufferDescriptor, data: &[u8]) -> Option<BufferId>;

    fn create_texture(&mut self, desc: &BufferDescriptor, data: &[u8]) -> Option<BufferId>;

    /// Releases a buffer or texture. `None` is a no-op.
    fn delete_buffer(&mut self, id: Option<BufferId>);

    /// Registers a vector command stream.
    fn create_vector(&mut self, data: &[u8]) -> Option<VectorId> {
        let _ = data;
        None
    }

    /// Replaces the commands registered under `id`.
    fn update_vector(&mut self, data: &[u8], id: VectorId) -> Option<VectorId> {
        let _ = (data, id);
        None
    }

    fn delete_vector(&mut self, id: VectorId) {
        let _ = id;
    }

    /// Non-indexed triangle-list draw of `length` elements from `offset`,
    /// with `buffer` as the only vertex input.
    fn draw_triangle_list(&mut self, buffer: BufferId, offset: u32, length: u32, stride: u32);

    fn draw_vector(&mut self, id: VectorId, target: VectorTarget, width: u32, height: u32) {
        let _ = (id, target, width, height);
    }

    /// Submits recorded work.
    fn flush(&mut self) {}
}

impl<P: Pal + ?Sized> Pal for Box<P> {
    fn kind(&self) -> PalKind {
        (**self).kind()
    }

    fn create_buffer(&mut self, desc: &BufferDescriptor, data: &[u8]) -> Option<BufferId> {
        (**self).create_buffer(desc, data)
    }

    fn create_geometry_buffer(&mut self, desc: &BufferDescriptor, data: &[u8]) -> Option<BufferId> {
        (**self).create_geometry_buffer(desc, data)
    }

    fn create_texture(&mut self, desc: &BufferDescriptor, data: &[u8]) -> Option<BufferId> {
        (**self).create_texture(desc, data)
    }

    fn delete_buffer(&mut self, id: Option<BufferId>) {
        (**self).delete_buffer(id)
    }

    fn create_vector(&mut self, data: &[u8]) -> Option<VectorId> {
        (**self).create_vector(data)
    }

    fn update_vector(&mut self, data: &[u8], id: VectorId) -> Option<VectorId> {
        (**self).update_vector(data, id)
    }

    fn delete_vector(&mut self, id: VectorId) {
        (**self).delete_vector(id)
    }

    fn draw_triangle_list(&mut self, buffer: BufferId, offset: u32, length: u32, stride: u32) {
        (**self).draw_triangle_list(buffer, offset, length, stride)
    }

    fn draw_vector(&mut self, id: VectorId, target: VectorTarget, width: u32, height: u32) {
        (**self).draw_vector(id, target, width, height)
    }

    fn flush(&mut self) {
        (**self).flush()
    }
}
