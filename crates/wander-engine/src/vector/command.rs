/// Whether a path is filled or stroked.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PaintStyle {
    Stroke,
    Fill,
}

impl PaintStyle {
    #[inline]
    pub fn from_raw(v: u32) -> Self {
        if v == 0 { PaintStyle::Stroke } else { PaintStyle::Fill }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum StrokeJoin {
    Miter,
    Round,
    Bevel,
}

impl StrokeJoin {
    pub fn from_raw(v: u32) -> Self {
        match v {
            1 => StrokeJoin::Round,
            2 => StrokeJoin::Bevel,
            _ => StrokeJoin::Miter,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum StrokeCap {
    Butt,
    Round,
    Square,
}

impl StrokeCap {
    pub fn from_raw(v: u32) -> Self {
        match v {
            1 => StrokeCap::Round,
            2 => StrokeCap::Square,
            _ => StrokeCap::Butt,
        }
    }
}

/// Compositing mode. Wire values are sparse; unknown values fall back to
/// source-over.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BlendMode {
    SrcOver,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    Multiply,
    Hue,
    Saturation,
    Color,
    Luminosity,
}

impl BlendMode {
    pub fn from_raw(v: u8) -> Self {
        match v {
            14 => BlendMode::Screen,
            15 => BlendMode::Overlay,
            16 => BlendMode::Darken,
            17 => BlendMode::Lighten,
            18 => BlendMode::ColorDodge,
            19 => BlendMode::ColorBurn,
            20 => BlendMode::HardLight,
            21 => BlendMode::SoftLight,
            22 => BlendMode::Difference,
            23 => BlendMode::Exclusion,
            24 => BlendMode::Multiply,
            25 => BlendMode::Hue,
            26 => BlendMode::Saturation,
            27 => BlendMode::Color,
            28 => BlendMode::Luminosity,
            _ => BlendMode::SrcOver,
        }
    }
}

/// How a path is painted.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Paint {
    pub style: PaintStyle,
    /// 0xAARRGGBB.
    pub color: u32,
    pub thickness: f32,
    pub join: StrokeJoin,
    pub cap: StrokeCap,
    pub blend_mode: BlendMode,
}

impl Paint {
    /// Color channels as `(r, g, b, a)`.
    #[inline]
    pub fn rgba(&self) -> (u8, u8, u8, u8) {
        let [a, r, g, b] = self.color.to_be_bytes();
        (r, g, b, a)
    }
}

/// Path segment type. Unknown tags are kept so decoding never guesses.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PathVerb {
    Move,
    Line,
    Quad,
    Cubic,
    Close,
    Unknown(i32),
}

impl PathVerb {
    pub fn from_raw(v: i32) -> Self {
        match v {
            1 => PathVerb::Move,
            2 => PathVerb::Line,
            3 => PathVerb::Quad,
            4 => PathVerb::Cubic,
            5 => PathVerb::Close,
            other => PathVerb::Unknown(other),
        }
    }
}

/// One segment with its control points, as emitted.
#[derive(Debug, Clone, PartialEq)]
pub struct PathSegment {
    pub verb: PathVerb,
    pub points: Vec<[f32; 2]>,
}

/// One paint applied to an ordered list of segments.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorCommand {
    pub paint: Paint,
    pub path: Vec<PathSegment>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_is_argb() {
        let p = Paint {
            style: PaintStyle::Fill,
            color: 0x80_10_20_30,
            thickness: 1.0,
            join: StrokeJoin::Miter,
            cap: StrokeCap::Butt,
            blend_mode: BlendMode::SrcOver,
        };
        assert_eq!(p.rgba(), (0x10, 0x20, 0x30, 0x80));
    }

    #[test]
    fn raw_enums() {
        assert_eq!(PaintStyle::from_raw(0), PaintStyle::Stroke);
        assert_eq!(PaintStyle::from_raw(1), PaintStyle::Fill);
        assert_eq!(StrokeJoin::from_raw(2), StrokeJoin::Bevel);
        assert_eq!(StrokeCap::from_raw(1), StrokeCap::Round);
        assert_eq!(BlendMode::from_raw(3), BlendMode::SrcOver);
        assert_eq!(BlendMode::from_raw(24), BlendMode::Multiply);
        assert_eq!(BlendMode::from_raw(99), BlendMode::SrcOver);
        assert_eq!(PathVerb::from_raw(4), PathVerb::Cubic);
        assert_eq!(PathVerb::from_raw(9), PathVerb::Unknown(9));
    }
}
