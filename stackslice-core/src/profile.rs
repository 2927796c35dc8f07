//! Line profile extraction traits and configuration.
#![allow(clippy::cast_precision_loss, clippy::missing_errors_doc)]
//!

use crate::channel::Channel;
use crate::error::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Point in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn distance(&self, other: &Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

/// Straight line segment the profile is taken along.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProfileLine {
    pub start: Point,
    pub end: Point,
}

impl ProfileLine {
    #[must_use]
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    /// Segment length in pixels.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.start.distance(&self.end)
    }

    /// Evenly spaced sample positions including both end points.
    ///
    /// A single sample sits at the start point.
    pub fn sample_points(&self, samples: usize) -> impl Iterator<Item = Point> + '_ {
        let steps = samples.saturating_sub(1).max(1) as f64;
        (0..samples).map(move |i| {
            let t = i as f64 / steps;
            Point::new(
                self.start.x + (self.end.x - self.start.x) * t,
                self.start.y + (self.end.y - self.start.y) * t,
            )
        })
    }
}

/// One 1D cross-section taken from a channel.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Profile {
    values: Vec<f64>,
}

impl Profile {
    #[must_use]
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    #[must_use]
    pub fn into_values(self) -> Vec<f64> {
        self.values
    }
}

impl From<Vec<f64>> for Profile {
    fn from(values: Vec<f64>) -> Self {
        Self::new(values)
    }
}

impl FromIterator<f64> for Profile {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Configuration for line profile extraction.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LineProfileConfig {
    /// Line the profile is sampled along.
    pub line: ProfileLine,
    /// Number of samples (default: one per pixel of line length, plus one).
    pub samples: usize,
}

impl LineProfileConfig {
    /// Samples the line at roughly one-pixel spacing.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn along(line: ProfileLine) -> Self {
        let samples = (line.length().ceil() as usize).saturating_add(1).max(2);
        Self { line, samples }
    }

    /// Set the number of samples.
    #[must_use]
    pub fn with_samples(mut self, samples: usize) -> Self {
        self.samples = samples;
        self
    }

    /// Sample spacing in pixels.
    #[must_use]
    pub fn spacing(&self) -> f64 {
        if self.samples < 2 {
            0.0
        } else {
            self.line.length() / (self.samples - 1) as f64
        }
    }

    /// Checks the geometry is usable.
    pub fn validate(&self) -> Result<()> {
        if self.samples == 0 {
            return Err(Error::ConfigError("profile needs at least one sample".into()));
        }
        let coords = [
            self.line.start.x,
            self.line.start.y,
            self.line.end.x,
            self.line.end.y,
        ];
        if coords.iter().any(|c| !c.is_finite()) {
            return Err(Error::InvalidPath("non-finite end point".into()));
        }
        if self.samples > 1 && self.line.length() == 0.0 {
            return Err(Error::InvalidPath(
                "zero-length line cannot hold more than one sample".into(),
            ));
        }
        Ok(())
    }
}

/// Trait for per-channel profile extraction.
///
/// Implementations must be pure functions of the channel; the engine calls
/// them concurrently from several worker threads.
pub trait ProfileExtraction: Send + Sync {
    /// Algorithm name.
    fn name(&self) -> &'static str;

    /// Number of samples every successful profile contains.
    fn samples(&self) -> usize;

    /// Extract the profile from one channel.
    fn extract(&self, channel: &Channel) -> Result<Profile>;
}

/// Bilinear interpolation along a straight line.
///
/// Every sample position must lie inside the channel; a line that leaves
/// the channel fails with [`Error::OutOfBounds`].
#[derive(Clone, Debug)]
pub struct BilinearProfileExtraction {
    config: LineProfileConfig,
}

impl BilinearProfileExtraction {
    /// Create with validated configuration.
    pub fn new(config: LineProfileConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Get current configuration.
    #[must_use]
    pub fn config(&self) -> &LineProfileConfig {
        &self.config
    }
}

impl ProfileExtraction for BilinearProfileExtraction {
    fn name(&self) -> &'static str {
        "bilinear"
    }

    fn samples(&self) -> usize {
        self.config.samples
    }

    fn extract(&self, channel: &Channel) -> Result<Profile> {
        self.config
            .line
            .sample_points(self.config.samples)
            .map(|p| bilinear(channel, p))
            .collect::<Result<Vec<_>>>()
            .map(Profile::new)
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn bilinear(channel: &Channel, p: Point) -> Result<f64> {
    if !channel.contains(p.x, p.y) {
        return Err(Error::OutOfBounds {
            x: p.x,
            y: p.y,
            width: channel.width(),
            height: channel.height(),
        });
    }

    // contains() guarantees 0 <= x <= width - 1
    let x0 = (p.x.floor() as usize).min(channel.width() - 1);
    let y0 = (p.y.floor() as usize).min(channel.height() - 1);
    let x1 = (x0 + 1).min(channel.width() - 1);
    let y1 = (y0 + 1).min(channel.height() - 1);
    let fx = p.x - x0 as f64;
    let fy = p.y - y0 as f64;

    let data = channel.data();
    let w = channel.width();
    let v00 = data[y0 * w + x0];
    let v10 = data[y0 * w + x1];
    let v01 = data[y1 * w + x0];
    let v11 = data[y1 * w + x1];

    let top = v00 + (v10 - v00) * fx;
    let bottom = v01 + (v11 - v01) * fx;
    Ok(top + (bottom - top) * fy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ramp() -> Channel {
        // z = 2x + 10y
        Channel::from_fn("ramp", 8, 6, |x, y| 2.0 * x as f64 + 10.0 * y as f64).unwrap()
    }

    #[test]
    fn test_sample_points_include_end_points() {
        let line = ProfileLine::new(Point::new(0.0, 0.0), Point::new(4.0, 0.0));
        let points: Vec<_> = line.sample_points(5).collect();
        assert_eq!(points.len(), 5);
        assert_relative_eq!(points[0].x, 0.0);
        assert_relative_eq!(points[2].x, 2.0);
        assert_relative_eq!(points[4].x, 4.0);
    }

    #[test]
    fn test_bilinear_is_exact_on_planes() {
        let line = ProfileLine::new(Point::new(0.5, 0.5), Point::new(6.5, 4.5));
        let extraction =
            BilinearProfileExtraction::new(LineProfileConfig::along(line).with_samples(7)).unwrap();
        let profile = extraction.extract(&ramp()).unwrap();
        assert_eq!(profile.len(), 7);
        for (p, v) in line.sample_points(7).zip(profile.values()) {
            assert_relative_eq!(*v, 2.0 * p.x + 10.0 * p.y, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_out_of_bounds_line_fails() {
        let line = ProfileLine::new(Point::new(0.0, 0.0), Point::new(20.0, 0.0));
        let extraction = BilinearProfileExtraction::new(LineProfileConfig::along(line)).unwrap();
        assert!(matches!(
            extraction.extract(&ramp()),
            Err(Error::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_config_validation() {
        let point = Point::new(1.0, 1.0);
        let degenerate = LineProfileConfig {
            line: ProfileLine::new(point, point),
            samples: 3,
        };
        assert!(BilinearProfileExtraction::new(degenerate).is_err());

        let line = ProfileLine::new(Point::new(0.0, 0.0), Point::new(3.0, 4.0));
        let config = LineProfileConfig::along(line);
        assert_eq!(config.samples, 6);
        assert_relative_eq!(config.spacing(), 1.0);
        assert!(config.clone().with_samples(0).validate().is_err());
    }
}
