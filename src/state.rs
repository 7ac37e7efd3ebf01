use std::sync::Arc;

use crate::error::TraceResult;
use crate::fitness::{squared_difference, to_distance};
use crate::raster::RasterBuffer;

/// target + current approximation + the distance between them.
/// buffers sit behind Arc: snapshots handed to scoring workers only copy pointers,
/// and an accepted step swaps in a new current buffer instead of editing the old one.
#[derive(Clone, Debug)]
pub struct SearchState {
    target: Arc<RasterBuffer>,
    current: Arc<RasterBuffer>,
    distance: f64,
}

impl SearchState {
    /// measure the starting distance from scratch. the only full-image metric pass of a run.
    pub fn new(target: Arc<RasterBuffer>, current: RasterBuffer) -> TraceResult<Self> {
        profiling::scope!("SearchState::new");
        let sq = squared_difference(&target, &current)?;
        let distance = to_distance(sq as f64, target.pixel_count());
        Ok(Self {
            target,
            current: Arc::new(current),
            distance,
        })
    }

    /// next state after an accepted step: new current buffer, distance carried over
    /// from scoring rather than re-measured.
    pub(crate) fn advance(&self, current: RasterBuffer, distance: f64) -> Self {
        debug_assert_eq!(current.dimensions(), self.target.dimensions());
        Self {
            target: Arc::clone(&self.target),
            current: Arc::new(current),
            distance,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_distance(&self, distance: f64) -> Self {
        Self {
            target: Arc::clone(&self.target),
            current: Arc::clone(&self.current),
            distance,
        }
    }

    #[inline]
    pub fn target(&self) -> &RasterBuffer {
        &self.target
    }

    #[inline]
    pub fn current(&self) -> &RasterBuffer {
        &self.current
    }

    #[inline]
    pub fn distance(&self) -> f64 {
        self.distance
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.target.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.target.height()
    }

    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.target.pixel_count()
    }
}
