use tiny_skia::{FillRule, LineCap, LineJoin, PathBuilder, Pixmap, Stroke, Transform};

use super::{BlendMode, Paint, PaintStyle, PathSegment, PathVerb, StrokeCap, StrokeJoin, VectorCommand};

/// Rasterized RGBA8 (premultiplied) pixels.
#[derive(Debug, Copy, Clone)]
pub struct VectorImage<'a> {
    pub width: u32,
    pub height: u32,
    pub pixels: &'a [u8],
}

/// Painter backends use to turn commands into pixels.
pub trait VectorRasterizer {
    type Paint;
    type Path;

    /// Starts a frame cleared to `clear` (0xAARRGGBB). Returns `false` when a
    /// target of that size cannot be created.
    fn begin_frame(&mut self, width: u32, height: u32, clear: u32) -> bool;

    fn make_paint(&mut self, paint: &Paint) -> Self::Paint;

    /// Builds a path. `None` when no drawable geometry remains.
    fn make_path(&mut self, segments: &[PathSegment]) -> Option<Self::Path>;

    fn draw_path(&mut self, path: &Self::Path, paint: &Self::Paint);

    /// Finishes the frame and exposes its pixels.
    fn flush(&mut self) -> Option<VectorImage<'_>>;
}

/// Paints `commands` in order on a `width × height` frame.
pub fn rasterize<'r, R: VectorRasterizer>(
    rasterizer: &'r mut R,
    commands: &[VectorCommand],
    width: u32,
    height: u32,
    clear: u32,
) -> Option<VectorImage<'r>> {
    if !rasterizer.begin_frame(width, height, clear) {
        log::warn!("cannot rasterize vector frame of {width}x{height}");
        return None;
    }
    for command in commands {
        let paint = rasterizer.make_paint(&command.paint);
        if let Some(path) = rasterizer.make_path(&command.path) {
            rasterizer.draw_path(&path, &paint);
        }
    }
    rasterizer.flush()
}

/// CPU rasterizer backed by `tiny-skia`.
#[derive(Default)]
pub struct TinySkiaRasterizer {
    pixmap: Option<Pixmap>,
}

pub struct SkiaPaint {
    paint: tiny_skia::Paint<'static>,
    stroke: Option<Stroke>,
}

impl TinySkiaRasterizer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VectorRasterizer for TinySkiaRasterizer {
    type Paint = SkiaPaint;
    type Path = tiny_skia::Path;

    fn begin_frame(&mut self, width: u32, height: u32, clear: u32) -> bool {
        let reuse = self
            .pixmap
            .as_ref()
            .is_some_and(|p| p.width() == width && p.height() == height);
        if !reuse {
            self.pixmap = Pixmap::new(width, height);
        }
        let Some(pixmap) = self.pixmap.as_mut() else {
            return false;
        };
        let [a, r, g, b] = clear.to_be_bytes();
        pixmap.fill(tiny_skia::Color::from_rgba8(r, g, b, a));
        true
    }

    fn make_paint(&mut self, paint: &Paint) -> SkiaPaint {
        let (r, g, b, a) = paint.rgba();
        let mut sk = tiny_skia::Paint::default();
        sk.set_color_rgba8(r, g, b, a);
        sk.anti_alias = true;
        sk.blend_mode = skia_blend(paint.blend_mode);

        let stroke = (paint.style == PaintStyle::Stroke).then(|| Stroke {
            width: paint.thickness,
            line_cap: match paint.cap {
                StrokeCap::Butt => LineCap::Butt,
                StrokeCap::Round => LineCap::Round,
                StrokeCap::Square => LineCap::Square,
            },
            line_join: match paint.join {
                StrokeJoin::Miter => LineJoin::Miter,
                StrokeJoin::Round => LineJoin::Round,
                StrokeJoin::Bevel => LineJoin::Bevel,
            },
            ..Stroke::default()
        });

        SkiaPaint { paint: sk, stroke }
    }

    fn make_path(&mut self, segments: &[PathSegment]) -> Option<tiny_skia::Path> {
        let mut pb = PathBuilder::new();
        for seg in segments {
            let p = &seg.points;
            match (seg.verb, p.len()) {
                (PathVerb::Move, 1..) => pb.move_to(p[0][0], p[0][1]),
                (PathVerb::Line, 1..) => pb.line_to(p[0][0], p[0][1]),
                (PathVerb::Quad, 2..) => pb.quad_to(p[0][0], p[0][1], p[1][0], p[1][1]),
                (PathVerb::Cubic, 3..) => {
                    pb.cubic_to(p[0][0], p[0][1], p[1][0], p[1][1], p[2][0], p[2][1])
                }
                (PathVerb::Close, _) => pb.close(),
                _ => {}
            }
        }
        pb.finish()
    }

    fn draw_path(&mut self, path: &tiny_skia::Path, paint: &SkiaPaint) {
        let Some(pixmap) = self.pixmap.as_mut() else {
            return;
        };
        match &paint.stroke {
            Some(stroke) => {
                pixmap.stroke_path(path, &paint.paint, stroke, Transform::identity(), None);
            }
            None => {
                pixmap.fill_path(path, &paint.paint, FillRule::Winding, Transform::identity(), None);
            }
        }
    }

    fn flush(&mut self) -> Option<VectorImage<'_>> {
        self.pixmap.as_ref().map(|p| VectorImage {
            width: p.width(),
            height: p.height(),
            pixels: p.data(),
        })
    }
}

fn skia_blend(mode: BlendMode) -> tiny_skia::BlendMode {
    use tiny_skia::BlendMode as Sk;
    match mode {
        BlendMode::SrcOver => Sk::SourceOver,
        BlendMode::Screen => Sk::Screen,
        BlendMode::Overlay => Sk::Overlay,
        BlendMode::Darken => Sk::Darken,
        BlendMode::Lighten => Sk::Lighten,
        BlendMode::ColorDodge => Sk::ColorDodge,
        BlendMode::ColorBurn => Sk::ColorBurn,
        BlendMode::HardLight => Sk::HardLight,
        BlendMode::SoftLight => Sk::SoftLight,
        BlendMode::Difference => Sk::Difference,
        BlendMode::Exclusion => Sk::Exclusion,
        BlendMode::Multiply => Sk::Multiply,
        BlendMode::Hue => Sk::Hue,
        BlendMode::Saturation => Sk::Saturation,
        BlendMode::Color => Sk::Color,
        BlendMode::Luminosity => Sk::Luminosity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::decode::tests::{StreamWriter, triangle_stream};
    use crate::vector::decode_commands;

    fn pixel(image: &VectorImage<'_>, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * image.width + x) * 4) as usize;
        [image.pixels[i], image.pixels[i + 1], image.pixels[i + 2], image.pixels[i + 3]]
    }

    #[test]
    fn fills_triangle_over_clear_color() {
        let commands = decode_commands(&triangle_stream(0xFFFF0000));
        let mut r = TinySkiaRasterizer::new();
        let image = rasterize(&mut r, &commands, 16, 16, 0xFF000000).unwrap();

        assert_eq!((image.width, image.height), (16, 16));
        assert_eq!(pixel(&image, 1, 1), [255, 0, 0, 255]);
        assert_eq!(pixel(&image, 14, 14), [0, 0, 0, 255]);
    }

    #[test]
    fn strokes_use_thickness() {
        let mut w = StreamWriter::new();
        w.paint(0, 0xFF00FF00, 4.0)
            .count(2)
            .segment(1, &[[0.0, 8.0]])
            .segment(2, &[[16.0, 8.0]])
            .paint(0, 0, 0.0)
            .count(0);
        let commands = decode_commands(&w.bytes());

        let mut r = TinySkiaRasterizer::new();
        let image = rasterize(&mut r, &commands, 16, 16, 0x00000000).unwrap();
        assert_eq!(pixel(&image, 8, 7), [0, 255, 0, 255]);
        assert_eq!(pixel(&image, 8, 1), [0, 0, 0, 0]);
    }

    #[test]
    fn zero_sized_frame_is_refused() {
        let mut r = TinySkiaRasterizer::new();
        assert!(rasterize(&mut r, &[], 0, 10, 0).is_none());
    }

    #[test]
    fn segments_missing_points_are_skipped() {
        let mut r = TinySkiaRasterizer::new();
        let path = r.make_path(&[
            PathSegment { verb: PathVerb::Move, points: vec![[0.0, 0.0]] },
            PathSegment { verb: PathVerb::Cubic, points: vec![[1.0, 1.0]] },
            PathSegment { verb: PathVerb::Line, points: vec![[4.0, 0.0]] },
            PathSegment { verb: PathVerb::Unknown(7), points: vec![] },
            PathSegment { verb: PathVerb::Line, points: vec![[4.0, 4.0]] },
        ]);
        assert!(path.is_some());
    }
}
