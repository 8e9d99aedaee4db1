use crate::pal::BufferFormat;

/// Native texture format for a pixel format.
///
/// Three-channel formats map to their four-channel counterparts; callers
/// expand the data first.
pub fn texture_format(format: BufferFormat) -> Option<wgpu::TextureFormat> {
    use wgpu::TextureFormat as F;
    Some(match format {
        BufferFormat::R8 => F::R8Unorm,
        BufferFormat::RG8 => F::Rg8Unorm,
        BufferFormat::RGB8 | BufferFormat::RGBA8 => F::Rgba8Unorm,
        BufferFormat::R16F => F::R16Float,
        BufferFormat::RG16F => F::Rg16Float,
        BufferFormat::RGB16F | BufferFormat::RGBA16F => F::Rgba16Float,
        BufferFormat::R32F => F::R32Float,
        BufferFormat::RG32F => F::Rg32Float,
        BufferFormat::RGB32F | BufferFormat::RGBA32F => F::Rgba32Float,
        BufferFormat::Unknown
        | BufferFormat::Custom
        | BufferFormat::CustomVertex
        | BufferFormat::Index16
        | BufferFormat::Index32 => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_pixel_format_maps() {
        use BufferFormat::*;
        for f in [R8, RG8, RGB8, RGBA8, R16F, RG16F, RGB16F, RGBA16F, R32F, RG32F, RGB32F, RGBA32F] {
            let native = texture_format(f).unwrap();
            let layout = f.texel_layout().unwrap();
            let padded = if layout.channels == 3 { 4 } else { layout.channels };
            assert_eq!(
                native.block_copy_size(None),
                Some(padded * layout.channel_bytes),
                "{f:?}"
            );
        }
    }

    #[test]
    fn buffer_formats_do_not_map() {
        assert_eq!(texture_format(BufferFormat::Unknown), None);
        assert_eq!(texture_format(BufferFormat::Index16), None);
    }
}
