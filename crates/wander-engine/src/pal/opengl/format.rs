use crate::pal::BufferFormat;

/// Internal format, pixel format and component type of a GL texture upload.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct GlFormat {
    pub internal: i32,
    pub format: u32,
    pub ty: u32,
}

impl GlFormat {
    /// 32-bit float textures are not filterable without extensions.
    #[inline]
    pub fn filterable(self) -> bool {
        self.ty != glow::FLOAT
    }
}

pub fn gl_format(format: BufferFormat) -> Option<GlFormat> {
    use BufferFormat::*;
    let (internal, format, ty) = match format {
        R8 => (glow::R8, glow::RED, glow::UNSIGNED_BYTE),
        RG8 => (glow::RG8, glow::RG, glow::UNSIGNED_BYTE),
        RGB8 => (glow::RGB8, glow::RGB, glow::UNSIGNED_BYTE),
        RGBA8 => (glow::RGBA8, glow::RGBA, glow::UNSIGNED_BYTE),
        R16F => (glow::R16F, glow::RED, glow::HALF_FLOAT),
        RG16F => (glow::RG16F, glow::RG, glow::HALF_FLOAT),
        RGB16F => (glow::RGB16F, glow::RGB, glow::HALF_FLOAT),
        RGBA16F => (glow::RGBA16F, glow::RGBA, glow::HALF_FLOAT),
        R32F => (glow::R32F, glow::RED, glow::FLOAT),
        RG32F => (glow::RG32F, glow::RG, glow::FLOAT),
        RGB32F => (glow::RGB32F, glow::RGB, glow::FLOAT),
        RGBA32F => (glow::RGBA32F, glow::RGBA, glow::FLOAT),
        Unknown | Custom | CustomVertex | Index16 | Index32 => return None,
    };
    Some(GlFormat {
        internal: internal as i32,
        format,
        ty,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_channel_formats_stay_rgb() {
        let f = gl_format(BufferFormat::RGB8).unwrap();
        assert_eq!((f.format, f.ty), (glow::RGB, glow::UNSIGNED_BYTE));
        let f = gl_format(BufferFormat::RGB16F).unwrap();
        assert_eq!(f.internal, glow::RGB16F as i32);
    }

    #[test]
    fn only_full_floats_disable_filtering() {
        assert!(gl_format(BufferFormat::R8).unwrap().filterable());
        assert!(gl_format(BufferFormat::RGBA16F).unwrap().filterable());
        assert!(!gl_format(BufferFormat::RG32F).unwrap().filterable());
    }

    #[test]
    fn buffer_formats_have_no_texture_format() {
        assert_eq!(gl_format(BufferFormat::CustomVertex), None);
        assert_eq!(gl_format(BufferFormat::Index32), None);
    }
}
