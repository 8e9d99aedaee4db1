use super::TexelLayout;

/// Alpha = 1.0 encoded per channel width.
fn opaque_alpha(channel_bytes: u32) -> &'static [u8] {
    match channel_bytes {
        1 => &[0xFF],
        2 => &[0x00, 0x3C],
        _ => &[0x00, 0x00, 0x80, 0x3F],
    }
}

/// Pads three-channel texels with an opaque alpha channel.
///
/// Used by backends with no native three-channel texture storage. Other
/// layouts are returned unchanged.
pub fn expand_rgb_to_rgba(data: &[u8], layout: TexelLayout) -> Vec<u8> {
    if layout.channels != 3 {
        return data.to_vec();
    }
    let texel = layout.bytes_per_texel() as usize;
    let alpha = opaque_alpha(layout.channel_bytes);

    let mut out = Vec::with_capacity(data.len() / texel * (texel + alpha.len()));
    for rgb in data.chunks_exact(texel) {
        out.extend_from_slice(rgb);
        out.extend_from_slice(alpha);
    }
    out
}
