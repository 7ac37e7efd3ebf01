use std::path::Path;

use crate::error::{TraceError, TraceResult};
use crate::raster::RasterBuffer;

/// how much an image has to shrink so its longer side fits `limit` (never enlarges)
pub fn scale_factor(width: u32, height: u32, limit: u32) -> f64 {
    let limit = limit.max(1) as f64;
    (width as f64 / limit).max(height as f64 / limit).max(1.0)
}

/// compute resolution (where the search runs) and the factor up to display resolution
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Scaling {
    pub compute_width: u32,
    pub compute_height: u32,
    /// compute pixels → display pixels
    pub display_scale: f64,
}

impl Scaling {
    pub fn new(source_width: u32, source_height: u32, compute_size: u32, view_size: u32) -> TraceResult<Self> {
        if source_width == 0 || source_height == 0 {
            return Err(TraceError::invalid_buffer("source image is empty"));
        }
        if compute_size == 0 || view_size == 0 {
            return Err(TraceError::configuration("compute and view sizes must be positive"));
        }
        let compute = scale_factor(source_width, source_height, compute_size);
        let view = scale_factor(source_width, source_height, view_size);
        Ok(Self {
            compute_width: ((source_width as f64 / compute) as u32).max(1),
            compute_height: ((source_height as f64 / compute) as u32).max(1),
            display_scale: compute / view,
        })
    }

    pub fn display_size(&self) -> (u32, u32) {
        (
            ((self.compute_width as f64 * self.display_scale).round() as u32).max(1),
            ((self.compute_height as f64 * self.display_scale).round() as u32).max(1),
        )
    }
}

/// decode an image file to RGBA8 and shrink it to compute resolution
pub fn load_target(path: &Path, compute_size: u32, view_size: u32) -> TraceResult<(RasterBuffer, Scaling)> {
    profiling::scope!("load_target");
    let img = image::open(path)?.to_rgba8();
    let scaling = Scaling::new(img.width(), img.height(), compute_size, view_size)?;
    tracing::debug!(
        source = ?img.dimensions(),
        compute = ?(scaling.compute_width, scaling.compute_height),
        display_scale = scaling.display_scale,
        "loaded target"
    );
    let target = prepare_target(img, &scaling)?;
    Ok((target, scaling))
}

/// resize an already-decoded image to the compute size in `scaling`
pub fn prepare_target(img: image::RgbaImage, scaling: &Scaling) -> TraceResult<RasterBuffer> {
    let resized = if img.dimensions() == (scaling.compute_width, scaling.compute_height) {
        img
    } else {
        image::imageops::resize(
            &img,
            scaling.compute_width,
            scaling.compute_height,
            image::imageops::FilterType::Triangle,
        )
    };
    RasterBuffer::from_image(resized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_factor_never_enlarges() {
        assert_eq!(scale_factor(50, 40, 100), 1.0);
        assert_eq!(scale_factor(400, 100, 100), 4.0);
        assert_eq!(scale_factor(100, 300, 100), 3.0);
    }

    #[test]
    fn wide_image_scaling() {
        let s = Scaling::new(550, 275, 100, 275).unwrap();
        assert_eq!((s.compute_width, s.compute_height), (100, 50));
        assert!((s.display_scale - 2.75).abs() < 1e-12);
        assert_eq!(s.display_size(), (275, 138));
    }

    #[test]
    fn compute_dimensions_truncate() {
        // factor 3: 275 / 3 = 91.67 -> 91 rows
        let s = Scaling::new(300, 275, 100, 275).unwrap();
        assert_eq!((s.compute_width, s.compute_height), (100, 91));
        let s = Scaling::new(1000, 1, 100, 275).unwrap();
        assert_eq!(s.compute_height, 1);
    }

    #[test]
    fn small_image_runs_at_native_size() {
        let s = Scaling::new(80, 60, 100, 275).unwrap();
        assert_eq!((s.compute_width, s.compute_height), (80, 60));
        assert_eq!(s.display_scale, 1.0);
    }

    #[test]
    fn prepare_target_resizes() {
        let img = image::RgbaImage::from_pixel(40, 20, image::Rgba([9, 9, 9, 255]));
        let s = Scaling::new(40, 20, 10, 10).unwrap();
        let target = prepare_target(img, &s).unwrap();
        assert_eq!(target.dimensions(), (10, 5));
        assert_eq!(target.pixel(3, 2), [9, 9, 9, 255]);
    }

    #[test]
    fn zero_sizes_are_rejected() {
        assert!(Scaling::new(10, 10, 0, 10).is_err());
        assert!(Scaling::new(0, 10, 10, 10).is_err());
    }
}
