//─────────────────────────────────────────────────────────────────────────────
// resolution-independent distance (normalized RMS over RGB) and PSNR
//─────────────────────────────────────────────────────────────────────────────

/// number of channels that take part in the metric (alpha never does)
pub const FITNESS_CHANNELS_F64: f64 = 3.0;

/// squared difference → normalized distance in [0, 1].
/// sqrt(sq / (3 * pixels)) / 255
#[inline]
pub fn to_distance(squared_diff: f64, pixel_count: usize) -> f64 {
    (squared_diff / (FITNESS_CHANNELS_F64 * pixel_count as f64)).sqrt() / 255.0
}

/// exact inverse of [`to_distance`].
#[inline]
pub fn to_squared_diff(distance: f64, pixel_count: usize) -> f64 {
    let scaled = distance * 255.0;
    scaled * scaled * FITNESS_CHANNELS_F64 * pixel_count as f64
}

/// PSNR in decibels on the normalized scale (peak = 1.0, mse = distance²).
/// a perfect match is capped instead of returning infinity.
#[inline]
pub fn psnr_from_distance(distance: f64) -> f64 {
    let mse = (distance * distance).max(1e-12);
    10.0 * (1.0 / mse).log10()
}

/// cached snapshot of the metrics reported per round.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MetricsSnapshot {
    pub distance: f64,
    pub psnr: f64,
    /// how much of the starting error has been removed (0-100)
    pub improvement_percent: f32,
}

impl MetricsSnapshot {
    pub fn from_distance(distance: f64, baseline: f64) -> Self {
        let denom = if baseline > 0.0 { baseline } else { f64::EPSILON };
        let pct = (1.0 - (distance / denom)) * 100.0;
        Self {
            distance,
            psnr: psnr_from_distance(distance),
            improvement_percent: pct.clamp(0.0, 100.0) as f32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_and_squared_diff_are_inverse() {
        for &pixels in &[1usize, 4, 10_000, 275 * 183] {
            for &sq in &[0.0, 1.0, 12345.678, 3.0 * 255.0 * 255.0 * pixels as f64] {
                let back = to_squared_diff(to_distance(sq, pixels), pixels);
                assert!((back - sq).abs() <= 1e-9 * sq.max(1.0), "{sq} -> {back}");
            }
        }
    }

    #[test]
    fn black_vs_white_is_distance_one() {
        let pixels = 16;
        let sq = 255.0 * 255.0 * 3.0 * pixels as f64;
        assert!((to_distance(sq, pixels) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn psnr_grows_as_distance_shrinks() {
        assert!(psnr_from_distance(0.01) > psnr_from_distance(0.1));
        assert!((psnr_from_distance(0.1) - 20.0).abs() < 1e-9);
        assert!(psnr_from_distance(0.0).is_finite());
    }

    #[test]
    fn snapshot_percent_is_clamped() {
        let snap = MetricsSnapshot::from_distance(0.05, 0.2);
        assert!((snap.improvement_percent - 75.0).abs() < 1e-4);
        assert_eq!(MetricsSnapshot::from_distance(0.3, 0.2).improvement_percent, 0.0);
    }
}
