/// Storage a descriptor asks for.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BufferType {
    Vertex,
    Index,
    Texture2D,
}

/// Element format of a buffer or texture.
///
/// Only the pixel formats map to textures; the rest describe buffers.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BufferFormat {
    Unknown,
    Custom,
    CustomVertex,
    Index16,
    Index32,
    R8,
    RG8,
    RGB8,
    RGBA8,
    R16F,
    RG16F,
    RGB16F,
    RGBA16F,
    R32F,
    RG32F,
    RGB32F,
    RGBA32F,
}

/// Per-texel layout of a pixel format.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TexelLayout {
    pub channels: u32,
    pub channel_bytes: u32,
}

impl TexelLayout {
    #[inline]
    pub fn bytes_per_texel(self) -> u32 {
        self.channels * self.channel_bytes
    }

    #[inline]
    pub fn is_float(self) -> bool {
        self.channel_bytes > 1
    }
}

impl BufferFormat {
    /// Layout of pixel formats; `None` for buffer-only formats.
    pub fn texel_layout(self) -> Option<TexelLayout> {
        use BufferFormat::*;
        let (channels, channel_bytes) = match self {
            R8 => (1, 1),
            RG8 => (2, 1),
            RGB8 => (3, 1),
            RGBA8 => (4, 1),
            R16F => (1, 2),
            RG16F => (2, 2),
            RGB16F => (3, 2),
            RGBA16F => (4, 2),
            R32F => (1, 4),
            RG32F => (2, 4),
            RGB32F => (3, 4),
            RGBA32F => (4, 4),
            Unknown | Custom | CustomVertex | Index16 | Index32 => return None,
        };
        Some(TexelLayout {
            channels,
            channel_bytes,
        })
    }
}

/// How raw bytes map to a backend resource.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BufferDescriptor {
    pub kind: BufferType,
    pub format: BufferFormat,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

impl BufferDescriptor {
    pub fn vertex() -> Self {
        Self {
            kind: BufferType::Vertex,
            format: BufferFormat::CustomVertex,
            width: 0,
            height: 0,
            depth: 0,
        }
    }

    pub fn index(format: BufferFormat) -> Self {
        Self {
            kind: BufferType::Index,
            format,
            ..Self::vertex()
        }
    }

    pub fn texture_2d(format: BufferFormat, width: u32, height: u32) -> Self {
        Self {
            kind: BufferType::Texture2D,
            format,
            width,
            height,
            depth: 1,
        }
    }

    /// Bytes a texture upload of this descriptor must supply.
    pub fn texture_bytes(&self) -> Option<usize> {
        let layout = self.format.texel_layout()?;
        Some(self.width as usize * self.height as usize * layout.bytes_per_texel() as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_pixel_formats_have_layouts() {
        assert_eq!(BufferFormat::Unknown.texel_layout(), None);
        assert_eq!(BufferFormat::CustomVertex.texel_layout(), None);
        assert_eq!(BufferFormat::Index32.texel_layout(), None);
        assert_eq!(BufferFormat::RGB8.texel_layout().unwrap().bytes_per_texel(), 3);
        assert_eq!(BufferFormat::RG16F.texel_layout().unwrap().bytes_per_texel(), 4);
        assert_eq!(BufferFormat::RGBA32F.texel_layout().unwrap().bytes_per_texel(), 16);
    }

    #[test]
    fn texture_byte_size() {
        let d = BufferDescriptor::texture_2d(BufferFormat::RGBA8, 4, 2);
        assert_eq!(d.texture_bytes(), Some(32));
        assert_eq!(BufferDescriptor::vertex().texture_bytes(), None);
    }
}
