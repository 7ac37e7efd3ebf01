use rand::Rng;

use crate::error::TraceResult;
use crate::export::Primitive;
use crate::fitness::score;
use crate::render::Rasterizer;
use crate::search_config::SearchConfig;
use crate::shape::Polygon;
use crate::state::SearchState;

/// lowest alpha a step may carry after alpha mutation
pub const MIN_ALPHA: f32 = 0.1;
pub const MAX_ALPHA: f32 = 1.0;
/// alpha mutation draws uniformly from [-ALPHA_JITTER, ALPHA_JITTER)
pub const ALPHA_JITTER: f32 = 0.04;

/// a shape with its paint (color + alpha) and the distance the state would have after painting it.
/// an unscored step has distance = +inf until [`Step::compute`] runs.
#[derive(Clone, Debug, PartialEq)]
pub struct Step {
    pub shape: Polygon,
    pub alpha: f32,
    pub color: [u8; 3],
    pub distance: f64,
}

impl Step {
    pub fn unscored(shape: Polygon, alpha: f32) -> Self {
        Self {
            shape,
            alpha,
            color: [0, 0, 0],
            distance: f64::INFINITY,
        }
    }

    /// optimal color and resulting distance of this step's shape against `state`
    pub fn compute<R: Rasterizer + ?Sized>(
        &self,
        state: &SearchState,
        renderer: &R,
        strict: bool,
    ) -> TraceResult<Step> {
        score(self.shape.clone(), self.alpha, state, renderer, strict)
    }

    /// paint onto a copy of the current buffer. the distance computed during scoring
    /// is carried into the new state as-is. call only on a computed step.
    pub fn apply<R: Rasterizer + ?Sized>(&self, state: &SearchState, renderer: &R) -> SearchState {
        profiling::scope!("Step::apply");
        debug_assert!(self.distance.is_finite(), "apply() on an unscored step");
        let current = renderer.composite(state.current(), &self.shape, self.color, self.alpha);
        state.advance(current, self.distance)
    }

    /// unscored neighbor: one vertex moved, alpha jittered if the config allows it
    pub fn mutate<R: Rng + ?Sized>(&self, rng: &mut R, cfg: &SearchConfig) -> Step {
        let shape = self.shape.mutate(rng);
        let mut alpha = self.alpha;
        if cfg.mutate_alpha {
            alpha = (alpha + rng.random_range(-ALPHA_JITTER..ALPHA_JITTER)).clamp(MIN_ALPHA, MAX_ALPHA);
        }
        Step::unscored(shape, alpha)
    }

    /// what vector export needs: polygon, fill color, fill opacity
    pub fn to_primitive(&self) -> Primitive {
        Primitive {
            points: self.shape.points().to_vec(),
            color: self.color,
            opacity: self.alpha,
        }
    }
}
