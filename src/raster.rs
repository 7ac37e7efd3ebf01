use crate::error::{TraceError, TraceResult};

/// fixed-size RGBA8 pixel grid, row-major, straight (un-premultiplied) alpha.
/// working canvases are always fully opaque, which lets tiny-skia paint into them directly
/// (premultiplied and straight bytes coincide when alpha == 255).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RasterBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl RasterBuffer {
    /// wrap raw RGBA bytes. fails on zero dimensions or a length that doesn't match.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> TraceResult<Self> {
        if width == 0 || height == 0 {
            return Err(TraceError::invalid_buffer(format!(
                "buffer must be at least 1x1, got {width}x{height}"
            )));
        }
        let expected = (width as usize) * (height as usize) * 4;
        if data.len() != expected {
            return Err(TraceError::invalid_buffer(format!(
                "{width}x{height} RGBA needs {expected} bytes, got {}",
                data.len()
            )));
        }
        Ok(Self { width, height, data })
    }

    /// opaque buffer with every pixel set to `rgb`.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        profiling::scope!("RasterBuffer::filled");
        let width = width.max(1);
        let height = height.max(1);
        let pixel = [rgb[0], rgb[1], rgb[2], 255];
        let data = pixel
            .iter()
            .copied()
            .cycle()
            .take((width as usize) * (height as usize) * 4)
            .collect();
        Self { width, height, data }
    }

    pub fn from_image(img: image::RgbaImage) -> TraceResult<Self> {
        let (w, h) = img.dimensions();
        Self::from_rgba(w, h, img.into_raw())
    }

    pub fn to_image(&self) -> Option<image::RgbaImage> {
        image::RgbaImage::from_raw(self.width, self.height, self.data.clone())
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub(crate) fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// byte offset of pixel (x, y). caller guarantees it's in bounds.
    #[inline]
    pub fn index(&self, x: u32, y: u32) -> usize {
        ((y as usize) * (self.width as usize) + x as usize) * 4
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = self.index(x, y);
        [self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]]
    }

    pub fn ensure_same_dimensions(&self, other: &RasterBuffer) -> TraceResult<()> {
        if self.dimensions() != other.dimensions() {
            return Err(TraceError::DimensionMismatch {
                expected: self.dimensions(),
                actual: other.dimensions(),
            });
        }
        Ok(())
    }

    /// average RGB of every pixel on the outer border, truncated per channel.
    /// used to pick the starting canvas color.
    pub fn border_average(&self) -> [u8; 3] {
        profiling::scope!("border_average");
        let (w, h) = (self.width, self.height);
        let mut sum = [0u64; 3];
        let mut count = 0u64;

        for y in 0..h {
            for x in 0..w {
                if x > 0 && y > 0 && x < w - 1 && y < h - 1 {
                    continue;
                }
                let i = self.index(x, y);
                sum[0] += self.data[i] as u64;
                sum[1] += self.data[i + 1] as u64;
                sum[2] += self.data[i + 2] as u64;
                count += 1;
            }
        }

        // count >= 1 because the buffer is at least 1x1
        sum.map(|s| (s / count).min(255) as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filled_buffer_is_opaque_and_uniform() {
        let buf = RasterBuffer::filled(3, 2, [10, 20, 30]);
        assert_eq!(buf.dimensions(), (3, 2));
        assert_eq!(buf.data().len(), 24);
        for y in 0..2 {
            for x in 0..3 {
                assert_eq!(buf.pixel(x, y), [10, 20, 30, 255]);
            }
        }
    }

    #[test]
    fn from_rgba_rejects_bad_lengths() {
        assert!(RasterBuffer::from_rgba(2, 2, vec![0; 15]).is_err());
        assert!(RasterBuffer::from_rgba(0, 2, vec![]).is_err());
        assert!(RasterBuffer::from_rgba(2, 2, vec![0; 16]).is_ok());
    }

    #[test]
    fn mismatched_dimensions_are_reported() {
        let a = RasterBuffer::filled(2, 2, [0, 0, 0]);
        let b = RasterBuffer::filled(2, 3, [0, 0, 0]);
        match a.ensure_same_dimensions(&b) {
            Err(TraceError::DimensionMismatch { expected, actual }) => {
                assert_eq!(expected, (2, 2));
                assert_eq!(actual, (2, 3));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn border_average_skips_interior() {
        // 3x3 with a bright center; border is uniform (40, 80, 120)
        let mut buf = RasterBuffer::filled(3, 3, [40, 80, 120]);
        let i = buf.index(1, 1);
        buf.data_mut()[i..i + 3].copy_from_slice(&[255, 255, 255]);
        assert_eq!(buf.border_average(), [40, 80, 120]);
    }

    #[test]
    fn border_average_truncates() {
        // 2x1: both pixels are border pixels
        let buf = RasterBuffer::from_rgba(2, 1, vec![0, 0, 0, 255, 1, 3, 255, 255]).unwrap();
        assert_eq!(buf.border_average(), [0, 1, 127]);
    }
}
