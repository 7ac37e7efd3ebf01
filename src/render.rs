use tiny_skia as sk;

use crate::error::{TraceError, TraceResult};
use crate::export::Primitive;
use crate::geom::BoundingBox;
use crate::raster::RasterBuffer;
use crate::shape::Polygon;

// Scratch pixmap reused across rasterize calls to avoid allocations.
// One per rayon worker; reallocated only when the mask size changes.
thread_local! {
    static SCRATCH_PIX: std::cell::RefCell<Option<sk::Pixmap>> =
        const { std::cell::RefCell::new(None) };
}

/// per-pixel alpha of a shape over its bounding box. 0 = not covered.
/// the value already includes the paint alpha, so `alpha / 255` is the blend weight.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoverageMask {
    bbox: BoundingBox,
    alpha: Vec<u8>,
}

impl CoverageMask {
    pub fn new(bbox: BoundingBox, alpha: Vec<u8>) -> Self {
        debug_assert_eq!(alpha.len() as u64, bbox.area());
        Self { bbox, alpha }
    }

    #[inline]
    pub fn bounding_box(&self) -> BoundingBox {
        self.bbox
    }

    /// mask value at (mx, my) relative to the bounding box origin
    #[inline]
    pub fn alpha_at(&self, mx: u32, my: u32) -> u8 {
        self.alpha[(my as usize) * (self.bbox.width as usize) + mx as usize]
    }

    /// covered pixels that land on a `width`x`height` canvas, as (x, y, mask alpha).
    /// rows and columns that fall off the canvas are skipped up front.
    pub fn covered_in(&self, width: u32, height: u32) -> impl Iterator<Item = (u32, u32, u8)> + '_ {
        let left = self.bbox.left as i64;
        let top = self.bbox.top as i64;
        let mx0 = (-left).clamp(0, self.bbox.width as i64) as u32;
        let mx1 = (width as i64 - left).clamp(0, self.bbox.width as i64) as u32;
        let my0 = (-top).clamp(0, self.bbox.height as i64) as u32;
        let my1 = (height as i64 - top).clamp(0, self.bbox.height as i64) as u32;

        (my0..my1).flat_map(move |my| {
            (mx0..mx1).filter_map(move |mx| {
                let a = self.alpha_at(mx, my);
                if a == 0 {
                    return None;
                }
                Some(((left + mx as i64) as u32, (top + my as i64) as u32, a))
            })
        })
    }

    /// copy of `buffer` with `color` blended in through this mask
    pub fn paint(&self, buffer: &RasterBuffer, color: [u8; 3]) -> RasterBuffer {
        let mut out = buffer.clone();
        let (w, h) = out.dimensions();
        let data = out.data_mut();
        for (x, y, a) in self.covered_in(w, h) {
            let i = ((y as usize) * (w as usize) + x as usize) * 4;
            for ch in 0..3 {
                data[i + ch] = blend_channel(data[i + ch], color[ch], a);
            }
        }
        out
    }
}

/// source-over of one channel: `src` at weight `a / 255` over `dst`, rounded to nearest.
/// scoring predicts painted pixels with this same function, so the tracked error stays exact.
#[inline]
pub fn blend_channel(dst: u8, src: u8, a: u8) -> u8 {
    let a = a as u32;
    ((src as u32 * a + dst as u32 * (255 - a) + 127) / 255) as u8
}

/// the two drawing primitives the search needs: coverage for scoring, and
/// source-over painting for accepted steps.
pub trait Rasterizer: Sync {
    /// coverage mask of `shape` sized to its bounding box, painted at `alpha`
    fn rasterize(&self, shape: &Polygon, alpha: f32) -> CoverageMask;

    /// copy of `buffer` with `shape` painted on top in `color` at `alpha`.
    /// goes through [`Rasterizer::rasterize`], so painting covers exactly the pixels scoring saw.
    fn composite(&self, buffer: &RasterBuffer, shape: &Polygon, color: [u8; 3], alpha: f32) -> RasterBuffer {
        profiling::scope!("composite");
        self.rasterize(shape, alpha).paint(buffer, color)
    }
}

/// tiny-skia backed rasterizer. nonzero winding fill, same as the SVG default used on export.
#[derive(Clone, Copy, Debug)]
pub struct CpuRenderer {
    pub anti_alias: bool,
}

impl Default for CpuRenderer {
    fn default() -> Self {
        Self { anti_alias: true }
    }
}

impl CpuRenderer {
    pub fn new(anti_alias: bool) -> Self {
        Self { anti_alias }
    }

    fn paint(&self, rgb: [u8; 3], alpha: f32) -> sk::Paint<'static> {
        let color = sk::Color::from_rgba(
            rgb[0] as f32 / 255.0,
            rgb[1] as f32 / 255.0,
            rgb[2] as f32 / 255.0,
            alpha.clamp(0.0, 1.0),
        )
        .unwrap_or(sk::Color::BLACK);
        let mut paint = sk::Paint::default();
        paint.set_color(color);
        paint.anti_alias = self.anti_alias;
        paint
    }

    /// Re-render accepted primitives over a solid background at `scale` times the compute size.
    /// Used for the raster preview at display resolution.
    pub fn render_primitives(
        &self,
        primitives: &[Primitive],
        fill: [u8; 3],
        width: u32,
        height: u32,
        scale: f64,
    ) -> TraceResult<RasterBuffer> {
        profiling::scope!("render_primitives");
        let out_w = ((width as f64 * scale).round() as u32).max(1);
        let out_h = ((height as f64 * scale).round() as u32).max(1);
        let mut pix = sk::Pixmap::new(out_w, out_h).ok_or_else(|| {
            TraceError::invalid_buffer(format!("cannot allocate {out_w}x{out_h} pixmap"))
        })?;
        pix.fill(sk::Color::from_rgba8(fill[0], fill[1], fill[2], 255));

        let transform = sk::Transform::from_scale(scale as f32, scale as f32);
        for prim in primitives {
            if let Some(path) = build_path(&prim.points) {
                let paint = self.paint(prim.color, prim.opacity);
                pix.fill_path(&path, &paint, sk::FillRule::Winding, transform, None);
            }
        }

        // opaque background, so premultiplied bytes are already straight RGBA
        RasterBuffer::from_rgba(out_w, out_h, pix.take())
    }
}

impl Rasterizer for CpuRenderer {
    fn rasterize(&self, shape: &Polygon, alpha: f32) -> CoverageMask {
        profiling::scope!("rasterize");
        let bbox = shape.bounding_box();
        let mut mask = vec![0u8; bbox.area() as usize];

        let Some(path) = build_path(shape.points()) else {
            return CoverageMask::new(bbox, mask);
        };

        SCRATCH_PIX.with(|cell| {
            let mut slot = cell.borrow_mut();
            let need_new = match slot.as_ref() {
                Some(pm) => pm.width() != bbox.width || pm.height() != bbox.height,
                None => true,
            };
            if need_new {
                *slot = sk::Pixmap::new(bbox.width, bbox.height);
            } else if let Some(pm) = slot.as_mut() {
                pm.fill(sk::Color::TRANSPARENT);
            }

            if let Some(pix) = slot.as_mut() {
                let transform = sk::Transform::from_translate(-bbox.left as f32, -bbox.top as f32);
                pix.fill_path(&path, &self.paint([0, 0, 0], alpha), sk::FillRule::Winding, transform, None);
                for (dst, px) in mask.iter_mut().zip(pix.pixels()) {
                    *dst = px.alpha();
                }
            }
        });

        CoverageMask::new(bbox, mask)
    }
}

/// closed path through the vertices. None for paths tiny-skia can't bound (e.g. < 2 points).
fn build_path(points: &[(i32, i32)]) -> Option<sk::Path> {
    let (first, rest) = points.split_first()?;
    let mut pb = sk::PathBuilder::new();
    pb.move_to(first.0 as f32, first.1 as f32);
    for &(x, y) in rest {
        pb.line_to(x as f32, y as f32);
    }
    pb.close();
    pb.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x: i32, y: i32, size: i32) -> Polygon {
        Polygon::from_points(vec![(x, y), (x + size, y), (x + size, y + size), (x, y + size)]).unwrap()
    }

    #[test]
    fn opaque_square_covers_its_box_fully() {
        let mask = CpuRenderer::new(false).rasterize(&square(2, 3, 4), 1.0);
        assert_eq!(mask.bounding_box().width, 4);
        for my in 0..4 {
            for mx in 0..4 {
                assert_eq!(mask.alpha_at(mx, my), 255);
            }
        }

        // anti-aliased edges on pixel boundaries are (nearly) full coverage too
        let mask = CpuRenderer::new(true).rasterize(&square(2, 3, 4), 1.0);
        assert!(mask.covered_in(20, 20).all(|(_, _, a)| a >= 250));
        assert_eq!(mask.covered_in(20, 20).count(), 16);
    }

    #[test]
    fn mask_alpha_scales_with_paint_alpha() {
        let mask = CpuRenderer::new(false).rasterize(&square(0, 0, 3), 0.5);
        let a = mask.alpha_at(1, 1);
        assert!((127..=128).contains(&a), "got {a}");
    }

    #[test]
    fn degenerate_shape_covers_nothing() {
        let line = Polygon::from_points(vec![(0, 0), (5, 0), (9, 0)]).unwrap();
        let mask = CpuRenderer::default().rasterize(&line, 1.0);
        assert_eq!(mask.covered_in(20, 20).count(), 0);
    }

    #[test]
    fn covered_in_clips_to_canvas() {
        // 4x4 square hanging off the top-left corner by 2px each way
        let mask = CpuRenderer::new(false).rasterize(&square(-2, -2, 4), 1.0);
        let covered: Vec<_> = mask.covered_in(10, 10).map(|(x, y, _)| (x, y)).collect();
        assert_eq!(covered, vec![(0, 0), (1, 0), (0, 1), (1, 1)]);
        assert_eq!(mask.covered_in(10, 10).count(), 4);
        // fully off canvas
        let mask = CpuRenderer::new(false).rasterize(&square(20, 20, 3), 1.0);
        assert_eq!(mask.covered_in(10, 10).count(), 0);
    }

    #[test]
    fn composite_paints_opaque_color() {
        let base = RasterBuffer::filled(6, 6, [0, 0, 0]);
        let out = CpuRenderer::new(false).composite(&base, &square(1, 1, 2), [200, 100, 50], 1.0);
        assert_eq!(out.pixel(1, 1), [200, 100, 50, 255]);
        assert_eq!(out.pixel(2, 2), [200, 100, 50, 255]);
        assert_eq!(out.pixel(0, 0), [0, 0, 0, 255]);
        assert_eq!(out.pixel(3, 3), [0, 0, 0, 255]);
        // source untouched
        assert_eq!(base.pixel(1, 1), [0, 0, 0, 255]);
    }

    #[test]
    fn composite_blends_source_over() {
        let base = RasterBuffer::filled(4, 4, [0, 0, 0]);
        let out = CpuRenderer::new(false).composite(&base, &square(0, 0, 4), [200, 0, 0], 0.5);
        let px = out.pixel(1, 1);
        assert!((99..=101).contains(&px[0]), "got {px:?}");
        assert_eq!(px[3], 255);
    }

    #[test]
    fn composite_touches_only_masked_pixels() {
        let base = RasterBuffer::filled(16, 22, [0, 0, 0]);
        let shapes = [
            Polygon::from_points(vec![(10, 20), (13, 12), (-2, 16)]).unwrap(),
            Polygon::from_points(vec![(-8, 5), (11, 4), (11, 5)]).unwrap(),
            Polygon::from_points(vec![(12, -4), (20, 9), (6, 25)]).unwrap(),
        ];
        for anti_alias in [false, true] {
            let renderer = CpuRenderer::new(anti_alias);
            for shape in &shapes {
                let mask = renderer.rasterize(shape, 0.7);
                let covered: std::collections::HashSet<(u32, u32)> =
                    mask.covered_in(16, 22).map(|(x, y, _)| (x, y)).collect();
                let out = renderer.composite(&base, shape, [255, 255, 255], 0.7);
                for y in 0..22 {
                    for x in 0..16 {
                        let painted = out.pixel(x, y) != [0, 0, 0, 255];
                        assert_eq!(painted, covered.contains(&(x, y)), "{shape:?} at ({x}, {y})");
                    }
                }
            }
        }
    }

    #[test]
    fn blend_channel_endpoints_and_rounding() {
        assert_eq!(blend_channel(10, 200, 255), 200);
        assert_eq!(blend_channel(10, 200, 0), 10);
        assert_eq!(blend_channel(0, 255, 128), 128);
        assert_eq!(blend_channel(255, 255, 77), 255);
    }

    #[test]
    fn render_primitives_scales_output() {
        let prim = Primitive {
            points: vec![(0, 0), (5, 0), (5, 5), (0, 5)],
            color: [255, 255, 255],
            opacity: 1.0,
        };
        let out = CpuRenderer::new(false)
            .render_primitives(&[prim], [0, 0, 0], 10, 8, 2.0)
            .unwrap();
        assert_eq!(out.dimensions(), (20, 16));
        assert_eq!(out.pixel(3, 3), [255, 255, 255, 255]);
        assert_eq!(out.pixel(15, 12), [0, 0, 0, 255]);
    }
}
