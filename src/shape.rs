use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{TraceError, TraceResult};
use crate::geom::{polar_offset, BoundingBox};
use crate::render::{CoverageMask, Rasterizer};

/// vertices are placed (and nudged) at most this far from their anchor.
/// shapes stay small and local instead of spanning the canvas.
pub const MAX_VERTEX_OFFSET: f64 = 20.0;

/// which polygons the search may propose. every kind is a [`Polygon`] with a fixed vertex count.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Triangle,
    Quad,
    Pentagon,
    Hexagon,
}

impl ShapeKind {
    pub fn vertex_count(self) -> usize {
        match self {
            ShapeKind::Triangle => 3,
            ShapeKind::Quad => 4,
            ShapeKind::Pentagon => 5,
            ShapeKind::Hexagon => 6,
        }
    }
}

impl FromStr for ShapeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "triangle" | "triangles" => Ok(ShapeKind::Triangle),
            "quad" | "quads" => Ok(ShapeKind::Quad),
            "pentagon" | "pentagons" => Ok(ShapeKind::Pentagon),
            "hexagon" | "hexagons" => Ok(ShapeKind::Hexagon),
            _ => Err(format!(
                "unknown shape kind '{s}' (expected triangle, quad, pentagon or hexagon)"
            )),
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShapeKind::Triangle => "triangle",
            ShapeKind::Quad => "quad",
            ShapeKind::Pentagon => "pentagon",
            ShapeKind::Hexagon => "hexagon",
        };
        f.write_str(name)
    }
}

/// closed polygon on integer canvas coordinates with its cached bounding box.
/// cloning copies the vertex list, so a mutated copy never aliases the original.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Polygon {
    points: Vec<(i32, i32)>,
    bbox: BoundingBox,
}

impl Polygon {
    /// build from explicit vertices (at least 3).
    pub fn from_points(points: Vec<(i32, i32)>) -> TraceResult<Self> {
        if points.len() < 3 {
            return Err(TraceError::configuration(format!(
                "a polygon needs at least 3 vertices, got {}",
                points.len()
            )));
        }
        let bbox = BoundingBox::from_points(&points);
        Ok(Self { points, bbox })
    }

    /// random polygon of the given kind: one anchor uniformly on the canvas, every other
    /// vertex at a random polar offset from it.
    pub fn random<R: Rng + ?Sized>(rng: &mut R, kind: ShapeKind, width: u32, height: u32) -> Self {
        let anchor = (
            (rng.random::<f64>() * width as f64) as i32,
            (rng.random::<f64>() * height as f64) as i32,
        );

        let count = kind.vertex_count();
        let mut points = Vec::with_capacity(count);
        points.push(anchor);
        for _ in 1..count {
            let (dx, dy) = polar_offset(rng, MAX_VERTEX_OFFSET);
            points.push((anchor.0.saturating_add(dx), anchor.1.saturating_add(dy)));
        }

        let bbox = BoundingBox::from_points(&points);
        Self { points, bbox }
    }

    /// random polygon whose kind is drawn uniformly from `kinds` (triangle if empty).
    pub fn create<R: Rng + ?Sized>(rng: &mut R, kinds: &[ShapeKind], width: u32, height: u32) -> Self {
        let kind = kinds.choose(rng).copied().unwrap_or(ShapeKind::Triangle);
        Self::random(rng, kind, width, height)
    }

    /// copy with exactly one vertex displaced by a fresh polar offset
    pub fn mutate<R: Rng + ?Sized>(&self, rng: &mut R) -> Self {
        let mut points = self.points.clone();
        let index = rng.random_range(0..points.len());
        let (dx, dy) = polar_offset(rng, MAX_VERTEX_OFFSET);
        let p = &mut points[index];
        p.0 = p.0.saturating_add(dx);
        p.1 = p.1.saturating_add(dy);

        let bbox = BoundingBox::from_points(&points);
        Self { points, bbox }
    }

    #[inline]
    pub fn points(&self) -> &[(i32, i32)] {
        &self.points
    }

    #[inline]
    pub fn bounding_box(&self) -> BoundingBox {
        self.bbox
    }

    /// coverage mask over the bounding box, painted at `alpha`
    pub fn rasterize<R: Rasterizer + ?Sized>(&self, renderer: &R, alpha: f32) -> CoverageMask {
        renderer.rasterize(self, alpha)
    }
}
