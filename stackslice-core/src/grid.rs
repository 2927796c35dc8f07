//! Composite slice grids.
//!
//! A [`SliceGrid`] stacks one profile per frame into a `frames × samples`
//! matrix stored row-major: `data[frame * samples + sample]`.
//!
//! # Missing frames
//!
//! A frame whose profile could not be computed is kept in the grid as a
//! missing row. Its values are `NaN` and its validity flag is `false`;
//! [`SliceGrid::row`] and [`SliceGrid::get`] return `None` for it. Valid
//! frames may still contain `NaN` samples of their own, so the validity
//! flag, not the value, is authoritative.

use crate::channel::Quantity;
use crate::error::{Error, Result};
use crate::profile::Profile;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Geometry and labeling shared by every row of a grid.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GridDescriptor {
    /// Samples per profile (grid columns).
    pub samples: usize,
    /// Physical distance between neighbouring samples.
    pub spacing: f64,
    /// Unit of the position axis.
    pub axis_unit: String,
    /// Quantity stored in the grid values.
    pub quantity: Quantity,
}

impl GridDescriptor {
    /// Descriptor with unit pixel spacing.
    pub fn new(samples: usize, quantity: Quantity) -> Self {
        Self {
            samples,
            spacing: 1.0,
            axis_unit: "px".to_string(),
            quantity,
        }
    }

    /// Sets the sample spacing and its unit.
    #[must_use]
    pub fn with_spacing(mut self, spacing: f64, unit: impl Into<String>) -> Self {
        self.spacing = spacing;
        self.axis_unit = unit.into();
        self
    }

    /// Position of sample `i` along the profile.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn position(&self, i: usize) -> f64 {
        i as f64 * self.spacing
    }
}

/// Frame × position matrix assembled from per-frame profiles.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SliceGrid {
    descriptor: GridDescriptor,
    frames: usize,
    data: Vec<f64>,
    valid: Vec<bool>,
}

impl SliceGrid {
    /// Assembles the grid from index-aligned profile slots.
    ///
    /// `None` slots become missing rows. Slot order is frame order.
    ///
    /// # Errors
    /// Returns [`Error::ProfileLengthMismatch`] if a present profile does not
    /// have `descriptor.samples` values.
    pub fn assemble(descriptor: GridDescriptor, slots: Vec<Option<Profile>>) -> Result<Self> {
        let samples = descriptor.samples;
        let frames = slots.len();
        let mut data = Vec::with_capacity(frames.saturating_mul(samples));
        let mut valid = Vec::with_capacity(frames);

        for slot in slots {
            match slot {
                Some(profile) => {
                    if profile.len() != samples {
                        return Err(Error::ProfileLengthMismatch {
                            expected: samples,
                            actual: profile.len(),
                        });
                    }
                    data.extend_from_slice(profile.values());
                    valid.push(true);
                }
                None => {
                    data.resize(data.len() + samples, f64::NAN);
                    valid.push(false);
                }
            }
        }

        Ok(Self {
            descriptor,
            frames,
            data,
            valid,
        })
    }

    /// Grid geometry and labels.
    #[must_use]
    pub fn descriptor(&self) -> &GridDescriptor {
        &self.descriptor
    }

    /// Number of frames (rows), including missing ones.
    #[must_use]
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Samples per row.
    #[must_use]
    pub fn samples(&self) -> usize {
        self.descriptor.samples
    }

    /// Raw row-major values, `NaN` in missing rows.
    #[must_use]
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Validity flag per frame.
    #[must_use]
    pub fn validity(&self) -> &[bool] {
        &self.valid
    }

    /// Returns true if frame `i` holds data.
    #[must_use]
    pub fn is_valid(&self, frame: usize) -> bool {
        self.valid.get(frame).copied().unwrap_or(false)
    }

    /// Profile of frame `i`, `None` if missing or out of range.
    #[must_use]
    pub fn row(&self, frame: usize) -> Option<&[f64]> {
        if !self.is_valid(frame) {
            return None;
        }
        let start = frame * self.samples();
        Some(&self.data[start..start + self.samples()])
    }

    /// Value at `(frame, sample)`, `None` if missing or out of range.
    #[must_use]
    pub fn get(&self, frame: usize, sample: usize) -> Option<f64> {
        self.row(frame).and_then(|row| row.get(sample).copied())
    }

    /// Values of one sample position across frames; missing frames are `None`.
    #[must_use]
    pub fn column(&self, sample: usize) -> Vec<Option<f64>> {
        (0..self.frames).map(|f| self.get(f, sample)).collect()
    }

    /// Indices of missing frames.
    #[must_use]
    pub fn missing_frames(&self) -> Vec<usize> {
        self.valid
            .iter()
            .enumerate()
            .filter_map(|(i, ok)| (!ok).then_some(i))
            .collect()
    }

    /// Number of frames that hold data.
    #[must_use]
    pub fn valid_frames(&self) -> usize {
        self.valid.iter().filter(|ok| **ok).count()
    }

    /// Physical position of each column.
    #[must_use]
    pub fn positions(&self) -> Vec<f64> {
        (0..self.samples())
            .map(|i| self.descriptor.position(i))
            .collect()
    }

    /// Minimum and maximum finite value over valid frames.
    #[must_use]
    pub fn value_range(&self) -> Option<(f64, f64)> {
        (0..self.frames)
            .filter_map(|f| self.row(f))
            .flatten()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn descriptor(samples: usize) -> GridDescriptor {
        GridDescriptor::new(samples, Quantity::new("Height", "nm")).with_spacing(0.5, "um")
    }

    #[test]
    fn test_assemble_keeps_frame_order_and_missing_rows() {
        let slots = vec![
            Some(Profile::new(vec![1.0, 2.0, 3.0])),
            None,
            Some(Profile::new(vec![7.0, 8.0, 9.0])),
        ];
        let grid = SliceGrid::assemble(descriptor(3), slots).unwrap();

        assert_eq!(grid.frames(), 3);
        assert_eq!(grid.samples(), 3);
        assert_eq!(grid.row(0), Some(&[1.0, 2.0, 3.0][..]));
        assert_eq!(grid.row(1), None);
        assert!(grid.data()[3..6].iter().all(|v| v.is_nan()));
        assert_eq!(grid.get(2, 1), Some(8.0));
        assert_eq!(grid.get(1, 1), None);
        assert_eq!(grid.missing_frames(), vec![1]);
        assert_eq!(grid.valid_frames(), 2);
        assert_eq!(grid.column(0), vec![Some(1.0), None, Some(7.0)]);
        assert_eq!(grid.value_range(), Some((1.0, 9.0)));
    }

    #[test]
    fn test_assemble_rejects_wrong_length() {
        let slots = vec![Some(Profile::new(vec![1.0, 2.0]))];
        assert_eq!(
            SliceGrid::assemble(descriptor(3), slots),
            Err(Error::ProfileLengthMismatch {
                expected: 3,
                actual: 2
            })
        );
    }

    #[test]
    fn test_empty_and_all_missing() {
        let grid = SliceGrid::assemble(descriptor(4), Vec::new()).unwrap();
        assert_eq!(grid.frames(), 0);
        assert!(grid.data().is_empty());
        assert_eq!(grid.value_range(), None);

        let grid = SliceGrid::assemble(descriptor(2), vec![None, None]).unwrap();
        assert_eq!(grid.data().len(), 4);
        assert_eq!(grid.valid_frames(), 0);
        assert_eq!(grid.value_range(), None);
    }

    #[test]
    fn test_positions_follow_spacing() {
        let grid = SliceGrid::assemble(descriptor(3), vec![None]).unwrap();
        let positions = grid.positions();
        assert_relative_eq!(positions[0], 0.0);
        assert_relative_eq!(positions[2], 1.0);
        assert_eq!(grid.descriptor().axis_unit, "um");
    }
}
