//! Path Generation
//!
//! Maps decibel spectra onto renderable polylines in pixel space.
//!
//! x is the log10-mapped bin frequency over [20, 20000] Hz scaled to the
//! target width; y maps [floor, 0] dB onto [bottom, top].

use serde::{Deserialize, Serialize};

use crate::fifo::FifoProducer;
use crate::settings::{MAX_FREQUENCY, MIN_FREQUENCY};

/// Bins stepped over per path vertex
pub const DEFAULT_PATH_RESOLUTION: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Target drawing area in pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PathBounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl PathBounds {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn top(&self) -> f32 {
        self.y
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn left(&self) -> f32 {
        self.x
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// An open polyline
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SpectrumPath {
    points: Vec<Point>,
}

impl SpectrumPath {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
        }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn line_to(&mut self, x: f32, y: f32) {
        self.points.push(Point::new(x, y));
    }
}

/// Linear remap of `value` from one range to another
#[inline]
pub fn jmap(value: f32, source_min: f32, source_max: f32, target_min: f32, target_max: f32) -> f32 {
    target_min + (value - source_min) * (target_max - target_min) / (source_max - source_min)
}

/// Proportion in [0, 1] to a frequency on a log10 scale between `min` and `max`
#[inline]
pub fn map_to_log10(proportion: f64, min: f64, max: f64) -> f64 {
    min * (max / min).powf(proportion)
}

/// Inverse of [`map_to_log10`]
#[inline]
pub fn map_from_log10(value: f64, min: f64, max: f64) -> f64 {
    (value / min).log10() / (max / min).log10()
}

/// Builds one path per spectrum and queues it for the renderer
pub struct PathGenerator {
    paths: FifoProducer<SpectrumPath>,
    resolution: usize,
}

impl PathGenerator {
    pub fn new(paths: FifoProducer<SpectrumPath>, resolution: usize) -> Self {
        Self {
            paths,
            resolution: resolution.max(1),
        }
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    /// Build a path from `spectrum` and push it
    ///
    /// Returns false if the path queue was full and the path dropped.
    pub fn generate(
        &mut self,
        spectrum: &[f32],
        bounds: &PathBounds,
        bin_width: f64,
        floor_db: f32,
    ) -> bool {
        let path = spectrum_path(spectrum, bounds, bin_width, floor_db, self.resolution);
        self.paths.push(path)
    }

    pub fn num_free(&self) -> usize {
        self.paths.num_free()
    }
}

/// Map a decibel spectrum to a polyline inside `bounds`
///
/// Starts at the left edge with bin 0's level, then one vertex every
/// `resolution` bins from bin 1. Only bins between 20 Hz and 20 kHz are
/// drawn, levels are clamped to [floor_db, 0] and non-finite bins are
/// skipped, so every vertex lies within `bounds`.
pub fn spectrum_path(
    spectrum: &[f32],
    bounds: &PathBounds,
    bin_width: f64,
    floor_db: f32,
    resolution: usize,
) -> SpectrumPath {
    let Some(&first) = spectrum.first() else {
        return SpectrumPath::default();
    };

    let top = bounds.top();
    let bottom = bounds.bottom();
    let left = bounds.left();
    let width = bounds.width as f64;
    let map = |db: f32| jmap(db.clamp(floor_db, 0.0), floor_db, 0.0, bottom, top);

    let mut path = SpectrumPath::with_capacity(spectrum.len() / resolution.max(1) + 1);

    path.line_to(left, if first.is_finite() { map(first) } else { bottom });

    let frequencies = MIN_FREQUENCY as f64..=MAX_FREQUENCY as f64;
    for bin in (1..spectrum.len()).step_by(resolution.max(1)) {
        let frequency = bin as f64 * bin_width;
        if frequency > *frequencies.end() {
            break;
        }
        let db = spectrum[bin];
        if !frequencies.contains(&frequency) || !db.is_finite() {
            continue;
        }
        let normalized_x = map_from_log10(frequency, MIN_FREQUENCY as f64, MAX_FREQUENCY as f64);
        path.line_to(left + (normalized_x * width).floor() as f32, map(db));
    }

    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fifo::fifo;

    #[test]
    fn test_jmap() {
        assert_eq!(jmap(-48.0, -48.0, 0.0, 200.0, 0.0), 200.0);
        assert_eq!(jmap(0.0, -48.0, 0.0, 200.0, 0.0), 0.0);
        assert_eq!(jmap(-24.0, -48.0, 0.0, 200.0, 0.0), 100.0);
    }

    #[test]
    fn test_log10_mapping() {
        assert!((map_to_log10(0.0, 20.0, 20000.0) - 20.0).abs() < 1e-9);
        assert!((map_to_log10(1.0, 20.0, 20000.0) - 20000.0).abs() < 1e-6);
        assert!((map_to_log10(0.5, 20.0, 20000.0) - 632.455532).abs() < 1e-4);
        assert!((map_from_log10(2000.0, 20.0, 20000.0) - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_path_shape() {
        let bounds = PathBounds::new(0.0, 0.0, 300.0, 200.0);
        let spectrum = vec![-48.0; 1024];
        let path = spectrum_path(&spectrum, &bounds, 48000.0 / 2048.0, -48.0, 2);

        // Bin 0, then bins 1, 3, 5, ..., 853 (the last one below 20 kHz)
        assert_eq!(path.len(), 1 + 427);
        assert_eq!(path.points()[0], Point::new(0.0, 200.0));
        assert!(path.points().iter().all(|p| p.y == 200.0));
    }

    #[test]
    fn test_x_follows_log_frequency() {
        let bounds = PathBounds::new(0.0, 0.0, 300.0, 100.0);
        // Bin width 20Hz so bin 100 sits at 2kHz, two thirds across
        let spectrum = vec![0.0; 101];
        let path = spectrum_path(&spectrum, &bounds, 20.0, -48.0, 1);

        let last = path.points()[path.len() - 1];
        assert!((last.x - 200.0).abs() <= 1.0, "x = {}", last.x);
        assert_eq!(last.y, 0.0);

        let xs: Vec<f32> = path.points()[1..].iter().map(|p| p.x).collect();
        assert!(xs.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_y_uses_bounds_offset() {
        let bounds = PathBounds::new(10.0, 50.0, 100.0, 100.0);
        let path = spectrum_path(&[-24.0, 0.0], &bounds, 1000.0, -48.0, 2);
        assert_eq!(path.points()[0].y, 100.0);
        assert_eq!(path.points()[1].y, 50.0);
    }

    #[test]
    fn test_path_stays_inside_bounds() {
        let bounds = PathBounds::new(30.0, 40.0, 800.0, 300.0);
        let bin_width = 48000.0 / 8192.0;
        let mut spectrum = vec![-30.0; 4096];
        spectrum[500] = 15.0;
        // Below 20 Hz, never drawn
        spectrum[2] = 6.0;

        let path = spectrum_path(&spectrum, &bounds, bin_width, -48.0, 1);

        for p in path.points() {
            assert!(p.x >= 30.0 && p.x <= 830.0, "x out of bounds: {}", p.x);
            assert!(p.y >= 40.0 && p.y <= 340.0, "y out of bounds: {}", p.y);
        }

        // Bins above 0 dBFS sit on the top edge
        let hot_x = 30.0 + (map_from_log10(500.0 * bin_width, 20.0, 20000.0) * 800.0).floor();
        let hot: Vec<_> = path.points().iter().filter(|p| p.y == 40.0).collect();
        assert_eq!(hot.len(), 1);
        assert_eq!(hot[0].x, hot_x as f32);

        // Bins 1..=3 are below 20 Hz, 3414.. above 20 kHz
        assert_eq!(path.len(), 1 + (3413 - 4 + 1));
        assert_eq!(path.points()[0].x, 30.0);
    }

    #[test]
    fn test_non_finite_bins_skipped() {
        let bounds = PathBounds::new(0.0, 0.0, 100.0, 100.0);
        let spectrum = [f32::NAN, -10.0, f32::INFINITY, -20.0];
        let path = spectrum_path(&spectrum, &bounds, 1000.0, -48.0, 1);

        assert_eq!(path.points()[0].y, 100.0);
        assert_eq!(path.len(), 3);
    }

    #[test]
    fn test_empty_spectrum() {
        let path = spectrum_path(&[], &PathBounds::default(), 1.0, -48.0, 2);
        assert!(path.is_empty());
    }

    #[test]
    fn test_generator_drops_when_full() {
        let (tx, mut rx) = fifo::<SpectrumPath>(1);
        let mut generator = PathGenerator::new(tx, 2);
        let bounds = PathBounds::new(0.0, 0.0, 10.0, 10.0);

        assert!(generator.generate(&[-10.0; 8], &bounds, 100.0, -48.0));
        assert!(!generator.generate(&[-20.0; 8], &bounds, 100.0, -48.0));

        let path = rx.pull().unwrap();
        assert_eq!(path.points()[0].y, jmap(-10.0, -48.0, 0.0, 10.0, 0.0));
    }
}
