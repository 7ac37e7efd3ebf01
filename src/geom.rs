// integer geometry shared by shapes, rasterization and scoring
//
// - axis-aligned bounding boxes with a 1px minimum extent
// - random polar offsets used to place and nudge vertices

use rand::Rng;

/// axis-aligned box in canvas pixels. width/height are floored to 1 so that a
/// degenerate shape (all vertices on one row or column) still maps to a real mask.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundingBox {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    /// tight box around `points`. an empty slice yields a 1x1 box at the origin.
    pub fn from_points(points: &[(i32, i32)]) -> Self {
        if points.is_empty() {
            return Self { left: 0, top: 0, width: 1, height: 1 };
        }

        let mut min_x = i32::MAX;
        let mut min_y = i32::MAX;
        let mut max_x = i32::MIN;
        let mut max_y = i32::MIN;
        for &(x, y) in points {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }

        let width = (max_x as i64 - min_x as i64).clamp(1, u32::MAX as i64) as u32;
        let height = (max_y as i64 - min_y as i64).clamp(1, u32::MAX as i64) as u32;

        Self { left: min_x, top: min_y, width, height }
    }

    #[inline]
    pub fn right(&self) -> i64 {
        self.left as i64 + self.width as i64
    }

    #[inline]
    pub fn bottom(&self) -> i64 {
        self.top as i64 + self.height as i64
    }

    /// inclusive on both edges (vertices sit on the far edge of the box)
    #[inline]
    pub fn contains(&self, (x, y): (i32, i32)) -> bool {
        let (x, y) = (x as i64, y as i64);
        x >= self.left as i64 && x <= self.right() && y >= self.top as i64 && y <= self.bottom()
    }

    #[inline]
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// random displacement at a uniform angle in [0, 2π) and uniform radius in [0, max_radius).
/// each component is truncated toward zero, so the result never leaves the disc.
pub fn polar_offset<R: Rng + ?Sized>(rng: &mut R, max_radius: f64) -> (i32, i32) {
    let angle = rng.random::<f64>() * std::f64::consts::TAU;
    let radius = rng.random::<f64>() * max_radius;
    ((radius * angle.cos()) as i32, (radius * angle.sin()) as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn bbox_is_tight() {
        let bbox = BoundingBox::from_points(&[(3, 9), (-2, 4), (7, 5)]);
        assert_eq!(bbox, BoundingBox { left: -2, top: 4, width: 9, height: 5 });
    }

    #[test]
    fn degenerate_bbox_is_floored_to_one() {
        // collinear on a row
        let bbox = BoundingBox::from_points(&[(1, 1), (5, 1), (3, 1)]);
        assert_eq!((bbox.width, bbox.height), (4, 1));
        // single repeated point
        let bbox = BoundingBox::from_points(&[(2, 2), (2, 2), (2, 2)]);
        assert_eq!((bbox.width, bbox.height), (1, 1));
    }

    #[test]
    fn bbox_contains_its_points() {
        let pts = [(0, 0), (10, -3), (4, 12)];
        let bbox = BoundingBox::from_points(&pts);
        assert!(pts.iter().all(|&p| bbox.contains(p)));
        assert!(!bbox.contains((11, 0)));
    }

    #[test]
    fn polar_offsets_stay_inside_radius() {
        let mut rng = Pcg32::seed_from_u64(7);
        for _ in 0..1000 {
            let (dx, dy) = polar_offset(&mut rng, 20.0);
            let r2 = (dx * dx + dy * dy) as f64;
            assert!(r2 < 400.0, "({dx}, {dy})");
        }
    }
}
