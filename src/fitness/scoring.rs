//! Closed-form color choice and incremental error delta for one candidate shape.
//!
//! Both passes only touch pixels inside the shape's bounding box. Pixels outside it have
//! zero coverage, so the local delta equals the change of the global squared difference.

use crate::error::{TraceError, TraceResult};
use crate::render::{blend_channel, CoverageMask, Rasterizer};
use crate::raster::RasterBuffer;
use crate::shape::Polygon;
use crate::state::SearchState;
use crate::step::Step;

use super::metrics::{to_distance, to_squared_diff};

/// relative slack before an improvement counts as larger than the remaining error
const CONSISTENCY_EPSILON: f64 = 1e-9;

/// Least-squares solid color for painting `mask` at `alpha` over `current` toward `target`.
///
/// Inverts source-over (`result = color·a + current·(1−a)`) per covered pixel,
/// `c = (target − current) / alpha + current`, averages, truncates and clamps to [0, 255].
/// Returns [`TraceError::InvalidShape`] when no in-canvas pixel is covered.
pub fn compute_optimal_color(
    mask: &CoverageMask,
    current: &RasterBuffer,
    target: &RasterBuffer,
    alpha: f32,
) -> TraceResult<[u8; 3]> {
    profiling::scope!("compute_optimal_color");
    let alpha = alpha as f64;
    let (cur, tgt) = (current.data(), target.data());

    let mut sum = [0.0f64; 3];
    let mut count = 0u64;
    for (x, y, _) in mask.covered_in(current.width(), current.height()) {
        let i = current.index(x, y);
        for ch in 0..3 {
            let c = cur[i + ch] as f64;
            sum[ch] += (tgt[i + ch] as f64 - c) / alpha + c;
        }
        count += 1;
    }

    if count == 0 {
        return Err(TraceError::InvalidShape);
    }
    let n = count as f64;
    Ok(sum.map(|s| (s / n).trunc().clamp(0.0, 255.0) as u8))
}

/// Change of the squared RGB difference if `color` were painted through `mask`.
/// Negative means the image gets closer to the target. Painted values are predicted
/// with [`blend_channel`], the same rounding [`CoverageMask::paint`] applies.
pub fn compute_difference_change(
    mask: &CoverageMask,
    current: &RasterBuffer,
    target: &RasterBuffer,
    color: [u8; 3],
) -> f64 {
    profiling::scope!("compute_difference_change");
    let (cur, tgt) = (current.data(), target.data());

    let mut sum = 0.0f64;
    for (x, y, a) in mask.covered_in(current.width(), current.height()) {
        let i = current.index(x, y);
        for ch in 0..3 {
            let t = tgt[i + ch] as f64;
            let before = t - cur[i + ch] as f64;
            let after = t - blend_channel(cur[i + ch], color[ch], a) as f64;
            sum += after * after - before * before;
        }
    }
    sum
}

/// Score `shape` painted at `alpha` against `state`: best color plus the distance the
/// state would have afterwards.
///
/// An improvement larger than the existing error means the tracked distance has drifted
/// from the buffers. That is always logged; with `strict` it is also returned as
/// [`TraceError::ConsistencyViolation`].
pub fn score<R: Rasterizer + ?Sized>(
    shape: Polygon,
    alpha: f32,
    state: &SearchState,
    renderer: &R,
    strict: bool,
) -> TraceResult<Step> {
    profiling::scope!("score");
    let mask = shape.rasterize(renderer, alpha);
    let color = compute_optimal_color(&mask, state.current(), state.target(), alpha)?;
    let change = compute_difference_change(&mask, state.current(), state.target(), color);

    let pixels = state.pixel_count();
    let current_sq = to_squared_diff(state.distance(), pixels);
    if -change > current_sq * (1.0 + CONSISTENCY_EPSILON) + CONSISTENCY_EPSILON {
        tracing::warn!(
            improvement = -change,
            available = current_sq,
            "scored improvement exceeds the remaining error"
        );
        if strict {
            return Err(TraceError::ConsistencyViolation {
                improvement: -change,
                available: current_sq,
            });
        }
    }

    let distance = to_distance((current_sq + change).max(0.0), pixels);
    Ok(Step {
        shape,
        alpha,
        color,
        distance,
    })
}
