//! Sum of squared RGB differences between two equally-sized buffers.
//! note: alpha is never compared, only R, G and B contribute.
use rayon::prelude::*;

use crate::error::TraceResult;
use crate::raster::RasterBuffer;

/// minimum rows handed to one rayon task (keeps task overhead low on small canvases)
const MIN_ROWS_PER_TASK: usize = 32;

/// parallel squared difference over rows. integer accumulation keeps the result exact
/// and independent of how rayon splits the work.
pub fn squared_difference(a: &RasterBuffer, b: &RasterBuffer) -> TraceResult<u64> {
    profiling::scope!("squared_difference");
    a.ensure_same_dimensions(b)?;

    let row_bytes = a.width() as usize * 4;
    let total = a
        .data()
        .par_chunks(row_bytes)
        .zip(b.data().par_chunks(row_bytes))
        .with_min_len(MIN_ROWS_PER_TASK)
        .map(|(row_a, row_b)| squared_difference_rgb(row_a, row_b))
        .sum();

    Ok(total)
}

/// scalar kernel over packed RGBA bytes
#[inline]
pub(crate) fn squared_difference_rgb(a: &[u8], b: &[u8]) -> u64 {
    debug_assert_eq!(a.len(), b.len());
    a.chunks_exact(4)
        .zip(b.chunks_exact(4))
        .map(|(p, q)| {
            let dr = p[0] as i64 - q[0] as i64;
            let dg = p[1] as i64 - q[1] as i64;
            let db = p[2] as i64 - q[2] as i64;
            (dr * dr + dg * dg + db * db) as u64
        })
        .sum()
}
