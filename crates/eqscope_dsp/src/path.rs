//! Render Paths
//!
//! Screen-space polylines for the analyzer overlay and the mapping helpers
//! shared by the spectrum path and the response curve.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::DspError;
use crate::settings::{MAX_FREQUENCY, MIN_FREQUENCY};
use crate::spectrum::SpectrumFrame;

/// Paths kept before the oldest is discarded
const PATH_BACKLOG: usize = 4;

/// Plot every n-th FFT bin (every bin above ~2 kHz is sub-pixel anyway)
pub const DEFAULT_PATH_RESOLUTION: usize = 2;

/// Map a normalized position (0-1) onto a logarithmic range
pub fn map_to_log10(proportion: f64, min: f64, max: f64) -> f64 {
    let log_min = min.log10();
    let log_max = max.log10();
    10.0_f64.powf(log_min + proportion * (log_max - log_min))
}

/// Inverse of [`map_to_log10`]: where `value` falls between `min` and `max`
pub fn map_from_log10(value: f64, min: f64, max: f64) -> f64 {
    (value.log10() - min.log10()) / (max.log10() - min.log10())
}

/// Linearly remap `value` from one range onto another
pub fn remap(value: f64, source_min: f64, source_max: f64, target_min: f64, target_max: f64) -> f64 {
    target_min + (value - source_min) * (target_max - target_min) / (source_max - source_min)
}

/// Pixel-space rectangle the analyzer draws into
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlotBounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl PlotBounds {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn top(&self) -> f32 {
        self.y
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Finite origin and at least one pixel in each direction
    pub fn validate(&self) -> Result<(), DspError> {
        let finite = [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite());
        if !finite || self.width < 1.0 || self.height < 1.0 {
            return Err(DspError::InvalidPlotBounds(*self));
        }
        Ok(())
    }
}

impl Default for PlotBounds {
    fn default() -> Self {
        Self::new(0.0, 0.0, 600.0, 300.0)
    }
}

/// One vertex of a render path
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// Immutable polyline, replaced wholesale on every refresh
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderPath {
    points: Vec<Point>,
}

impl RenderPath {
    pub fn from_points(points: Vec<Point>) -> Self {
        Self { points }
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
}

/// Turns spectrum frames into render paths, keeping only the newest
pub struct PathGenerator {
    paths: VecDeque<RenderPath>,
    resolution: usize,
}

impl PathGenerator {
    pub fn new() -> Self {
        Self::with_resolution(DEFAULT_PATH_RESOLUTION)
    }

    pub fn with_resolution(resolution: usize) -> Self {
        Self {
            paths: VecDeque::with_capacity(PATH_BACKLOG),
            resolution: resolution.max(1),
        }
    }

    /// Build a path from one frame and queue it
    ///
    /// x: bin frequency on a log10 axis from 20 Hz to 20 kHz.
    /// y: `negative_infinity_db` at the bottom edge, 0 dB at the top,
    /// clamped to the plot.
    pub fn generate(&mut self, frame: &SpectrumFrame, bounds: PlotBounds, negative_infinity_db: f32) {
        let magnitudes = frame.magnitudes_db();
        if magnitudes.is_empty() {
            return;
        }

        let bin_width = frame.bin_width() as f64;
        let top = bounds.top() as f64;
        let bottom = bounds.bottom() as f64;
        let map_y = |db: f32| {
            remap(db as f64, negative_infinity_db as f64, 0.0, bottom, top)
                .max(top)
                .min(bottom) as f32
        };

        let mut points = Vec::with_capacity(magnitudes.len() / self.resolution + 1);
        points.push(Point {
            x: bounds.x,
            y: map_y(magnitudes[0]),
        });

        for bin in (1..magnitudes.len()).step_by(self.resolution) {
            let db = magnitudes[bin];
            if !db.is_finite() {
                continue;
            }

            let frequency = bin as f64 * bin_width;
            if frequency < MIN_FREQUENCY as f64 || frequency > MAX_FREQUENCY as f64 {
                continue;
            }

            let normalized = map_from_log10(frequency, MIN_FREQUENCY as f64, MAX_FREQUENCY as f64);
            points.push(Point {
                x: bounds.x + (normalized * bounds.width as f64).floor() as f32,
                y: map_y(db),
            });
        }

        if self.paths.len() == PATH_BACKLOG {
            self.paths.pop_front();
        }
        self.paths.push_back(RenderPath::from_points(points));
    }

    pub fn available_paths(&self) -> usize {
        self.paths.len()
    }

    /// Drain the backlog, returning only the most recent path
    pub fn latest_path(&mut self) -> Option<RenderPath> {
        let latest = self.paths.pop_back();
        self.paths.clear();
        latest
    }
}

impl Default for PathGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(magnitudes: Vec<f32>, sample_rate: f32) -> SpectrumFrame {
        SpectrumFrame::new(magnitudes, sample_rate)
    }

    #[test]
    fn test_log_mapping_endpoints() {
        assert!((map_to_log10(0.0, 20.0, 20000.0) - 20.0).abs() < 1e-9);
        assert!((map_to_log10(1.0, 20.0, 20000.0) - 20000.0).abs() < 1e-6);
        // 20 Hz → 20 kHz is three decades, so 1/3 lands on 200 Hz
        assert!((map_to_log10(1.0 / 3.0, 20.0, 20000.0) - 200.0).abs() < 1e-6);
        assert!((map_from_log10(2000.0, 20.0, 20000.0) - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_remap() {
        assert_eq!(remap(0.0, -24.0, 24.0, 100.0, 0.0), 50.0);
        assert_eq!(remap(24.0, -24.0, 24.0, 100.0, 0.0), 0.0);
    }

    #[test]
    fn test_plot_bounds_edges() {
        let bounds = PlotBounds::new(10.0, 20.0, 300.0, 150.0);
        assert_eq!(bounds.top(), 20.0);
        assert_eq!(bounds.bottom(), 170.0);
        assert_eq!(bounds.right(), 310.0);
    }

    #[test]
    fn test_plot_bounds_validation() {
        assert!(PlotBounds::default().validate().is_ok());
        assert!(PlotBounds::new(-5.0, 3.0, 1.0, 1.0).validate().is_ok());

        for bad in [
            PlotBounds::new(0.0, 0.0, 600.0, -10.0),
            PlotBounds::new(0.0, 0.0, 0.0, 300.0),
            PlotBounds::new(f32::NAN, 0.0, 600.0, 300.0),
            PlotBounds::new(0.0, 0.0, f32::INFINITY, 300.0),
        ] {
            assert!(matches!(bad.validate(), Err(DspError::InvalidPlotBounds(_))));
        }
    }

    #[test]
    fn test_inverted_bounds_do_not_panic() {
        let mut generator = PathGenerator::new();
        generator.generate(&frame(vec![-20.0; 1024], 48000.0), PlotBounds::new(0.0, 0.0, 600.0, -10.0), -48.0);
        assert_eq!(generator.available_paths(), 1);
    }

    #[test]
    fn test_path_stays_inside_bounds() {
        let bounds = PlotBounds::new(5.0, 10.0, 400.0, 200.0);
        let magnitudes: Vec<f32> = (0..1024).map(|i| if i % 3 == 0 { 12.0 } else { -90.0 }).collect();
        let mut generator = PathGenerator::new();
        generator.generate(&frame(magnitudes, 48000.0), bounds, -48.0);

        let path = generator.latest_path().unwrap();
        assert!(path.len() > 10);
        for point in path.points() {
            assert!(point.x >= bounds.x && point.x <= bounds.right());
            assert!(point.y >= bounds.top() && point.y <= bounds.bottom());
        }
    }

    #[test]
    fn test_x_is_monotonic() {
        let mut generator = PathGenerator::new();
        generator.generate(&frame(vec![-20.0; 1024], 48000.0), PlotBounds::default(), -48.0);
        let path = generator.latest_path().unwrap();
        for pair in path.points().windows(2) {
            assert!(pair[1].x >= pair[0].x);
        }
    }

    #[test]
    fn test_db_maps_linearly_to_height() {
        let bounds = PlotBounds::new(0.0, 0.0, 100.0, 96.0);
        let mut generator = PathGenerator::new();
        generator.generate(&frame(vec![-24.0; 1024], 48000.0), bounds, -48.0);
        let path = generator.latest_path().unwrap();
        for point in path.points() {
            assert!((point.y - 48.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_non_finite_bins_are_skipped() {
        let mut magnitudes = vec![-20.0_f32; 1024];
        for bin in (1..1024).step_by(2) {
            magnitudes[bin] = f32::NAN;
        }
        let mut generator = PathGenerator::with_resolution(2);
        generator.generate(&frame(magnitudes, 48000.0), PlotBounds::default(), -48.0);
        let path = generator.latest_path().unwrap();
        // Only the starting point survives
        assert_eq!(path.len(), 1);
    }

    #[test]
    fn test_latest_path_wins() {
        let mut generator = PathGenerator::new();
        let bounds = PlotBounds::new(0.0, 0.0, 100.0, 48.0);
        generator.generate(&frame(vec![-48.0; 1024], 48000.0), bounds, -48.0);
        generator.generate(&frame(vec![-24.0; 1024], 48000.0), bounds, -48.0);
        generator.generate(&frame(vec![0.0; 1024], 48000.0), bounds, -48.0);
        assert_eq!(generator.available_paths(), 3);

        let path = generator.latest_path().unwrap();
        assert_eq!(path.points()[0].y, 0.0);
        assert_eq!(generator.available_paths(), 0);
        assert!(generator.latest_path().is_none());
    }

    #[test]
    fn test_backlog_is_bounded() {
        let mut generator = PathGenerator::new();
        for _ in 0..(PATH_BACKLOG * 3) {
            generator.generate(&frame(vec![-10.0; 64], 48000.0), PlotBounds::default(), -48.0);
        }
        assert_eq!(generator.available_paths(), PATH_BACKLOG);
    }
}
