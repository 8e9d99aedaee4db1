use std::sync::Arc;

use glow::HasContext;

use crate::id::BufferId;
use crate::pal::{BufferDescriptor, BufferType, Pal, PalKind};
use crate::table::ResourceTable;

use super::format::gl_format;

/// One float vertex attribute of the interleaved vertex layout.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct GlAttribute {
    pub location: u32,
    pub components: u32,
}

/// Vertex input layout applied when drawing geometry buffers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlConfig {
    pub attributes: Vec<GlAttribute>,
}

impl Default for GlConfig {
    /// Position, normal, texture coordinate, color.
    fn default() -> Self {
        let attr = |location, components| GlAttribute {
            location,
            components,
        };
        Self {
            attributes: vec![attr(0, 3), attr(1, 3), attr(2, 2), attr(3, 3)],
        }
    }
}

impl GlConfig {
    /// Bytes one vertex of this layout occupies.
    pub fn stride(&self) -> u32 {
        self.attributes.iter().map(|a| a.components * 4).sum()
    }
}

enum GlResource {
    Buffer {
        vao: glow::VertexArray,
        vbo: glow::Buffer,
    },
    Texture(glow::Texture),
}

/// OpenGL backend.
///
/// Requires the context to be current on the calling thread for every call.
pub struct GlPal {
    gl: Arc<glow::Context>,
    config: GlConfig,
    resources: ResourceTable<GlResource>,
}

impl GlPal {
    pub fn new(gl: Arc<glow::Context>, config: GlConfig) -> Self {
        Self {
            gl,
            config,
            resources: ResourceTable::default(),
        }
    }

    #[inline]
    pub fn gl(&self) -> &glow::Context {
        &self.gl
    }

    #[inline]
    pub fn config(&self) -> &GlConfig {
        &self.config
    }

    /// Native texture object of a texture buffer.
    pub fn texture(&self, id: BufferId) -> Option<glow::Texture> {
        match self.resources.get(id.raw())? {
            GlResource::Texture(texture) => Some(*texture),
            GlResource::Buffer { .. } => None,
        }
    }

    /// Binds the vertex attribute layout for `stride`-byte vertices.
    ///
    /// # Safety
    /// A vertex array and its array buffer must be bound.
    unsafe fn apply_layout(&self, stride: u32) {
        let mut offset = 0;
        for attr in &self.config.attributes {
            let size = attr.components * 4;
            if offset + size > stride {
                break;
            }
            unsafe {
                self.gl.enable_vertex_attrib_array(attr.location);
                self.gl.vertex_attrib_pointer_f32(
                    attr.location,
                    attr.components as i32,
                    glow::FLOAT,
                    false,
                    stride as i32,
                    offset as i32,
                );
            }
            offset += size;
        }
    }
}

impl Pal for GlPal {
    fn kind(&self) -> PalKind {
        PalKind::OpenGl
    }

    fn create_geometry_buffer(&mut self, desc: &BufferDescriptor, data: &[u8]) -> Option<BufferId> {
        let target = match desc.kind {
            BufferType::Index => glow::ELEMENT_ARRAY_BUFFER,
            _ => glow::ARRAY_BUFFER,
        };
        let gl = &self.gl;
        let (vao, vbo) = unsafe {
            let vao = match gl.create_vertex_array() {
                Ok(vao) => vao,
                Err(e) => {
                    log::error!("gl: cannot create vertex array: {e}");
                    return None;
                }
            };
            let vbo = match gl.create_buffer() {
                Ok(vbo) => vbo,
                Err(e) => {
                    log::error!("gl: cannot create buffer: {e}");
                    gl.delete_vertex_array(vao);
                    return None;
                }
            };
            gl.bind_vertex_array(Some(vao));
            gl.bind_buffer(target, Some(vbo));
            gl.buffer_data_u8_slice(target, data, glow::STATIC_DRAW);
            gl.bind_vertex_array(None);
            (vao, vbo)
        };

        let id = BufferId::new(self.resources.insert(GlResource::Buffer { vao, vbo }));
        log::trace!("gl: created {id} ({:?}, {} bytes)", desc.kind, data.len());
        Some(id)
    }

    fn create_texture(&mut self, desc: &BufferDescriptor, data: &[u8]) -> Option<BufferId> {
        let (Some(format), Some(expected)) = (gl_format(desc.format), desc.texture_bytes()) else {
            log::warn!("gl: unsupported texture format {:?}", desc.format);
            return None;
        };
        if data.len() < expected {
            log::warn!("gl: texture data too short ({} of {expected} bytes)", data.len());
            return None;
        }

        let gl = &self.gl;
        let texture = unsafe {
            let texture = match gl.create_texture() {
                Ok(texture) => texture,
                Err(e) => {
                    log::error!("gl: cannot create texture: {e}");
                    return None;
                }
            };
            gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
            gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                format.internal,
                desc.width as i32,
                desc.height as i32,
                0,
                format.format,
                format.ty,
                Some(&data[..expected]),
            );

            let (min, mag) = if format.filterable() {
                gl.generate_mipmap(glow::TEXTURE_2D);
                (glow::LINEAR_MIPMAP_LINEAR, glow::LINEAR)
            } else {
                (glow::NEAREST, glow::NEAREST)
            };
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, min as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, mag as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE as i32);
            gl.bind_texture(glow::TEXTURE_2D, None);
            texture
        };

        let id = BufferId::new(self.resources.insert(GlResource::Texture(texture)));
        log::trace!("gl: created texture {id} {}x{}", desc.width, desc.height);
        Some(id)
    }

    fn delete_buffer(&mut self, id: Option<BufferId>) {
        let Some(id) = id else {
            return;
        };
        let Some(resource) = self.resources.remove(id.raw()) else {
            return;
        };
        unsafe {
            match resource {
                GlResource::Buffer { vao, vbo } => {
                    self.gl.delete_buffer(vbo);
                    self.gl.delete_vertex_array(vao);
                }
                GlResource::Texture(texture) => self.gl.delete_texture(texture),
            }
        }
        log::trace!("gl: deleted {id}");
    }

    fn draw_triangle_list(&mut self, buffer: BufferId, offset: u32, length: u32, stride: u32) {
        let Some(GlResource::Buffer { vao, vbo }) = self.resources.get(buffer.raw()) else {
            log::warn!("gl: draw of unknown {buffer}");
            return;
        };
        // Index payloads are drawn as plain vertex data too.
        unsafe {
            self.gl.bind_vertex_array(Some(*vao));
            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(*vbo));
            self.apply_layout(stride);
            self.gl.draw_arrays(glow::TRIANGLES, offset as i32, length as i32);
            self.gl.bind_vertex_array(None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout_is_eleven_floats() {
        assert_eq!(GlConfig::default().stride(), 44);
    }
}
