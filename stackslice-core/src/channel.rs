//! Two-dimensional data channels.
//!
//! A `Channel` is one frame of an image stack: a `width × height` grid of
//! `f64` samples stored row-major (`data[y * width + x]`), together with
//! the physical quantity the samples represent.

use crate::error::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Physical quantity label (e.g. `Height` in `nm`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Quantity {
    /// Quantity name.
    pub name: String,
    /// Unit symbol.
    pub unit: String,
}

impl Quantity {
    /// Creates a new quantity label.
    pub fn new(name: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unit: unit.into(),
        }
    }
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.unit.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{} [{}]", self.name, self.unit)
        }
    }
}

/// One 2D data channel of a stack.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Channel {
    /// Display name of the channel.
    pub name: String,
    width: usize,
    height: usize,
    data: Vec<f64>,
    /// Quantity stored in the samples, if known.
    #[cfg_attr(feature = "serde", serde(default))]
    pub quantity: Option<Quantity>,
}

impl Channel {
    /// Creates a channel from row-major samples.
    ///
    /// # Errors
    /// Returns [`Error::InvalidDimensions`] if `data.len() != width * height`
    /// or either dimension is zero.
    pub fn new(
        name: impl Into<String>,
        width: usize,
        height: usize,
        data: Vec<f64>,
    ) -> Result<Self> {
        if width == 0 || height == 0 || width.checked_mul(height) != Some(data.len()) {
            return Err(Error::InvalidDimensions {
                width,
                height,
                len: data.len(),
            });
        }
        Ok(Self {
            name: name.into(),
            width,
            height,
            data,
            quantity: None,
        })
    }

    /// Builds a channel by evaluating `f(x, y)` at every pixel.
    ///
    /// # Errors
    /// Returns [`Error::InvalidDimensions`] if either dimension is zero.
    pub fn from_fn<F>(name: impl Into<String>, width: usize, height: usize, f: F) -> Result<Self>
    where
        F: Fn(usize, usize) -> f64,
    {
        let mut data = Vec::with_capacity(width.saturating_mul(height));
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self::new(name, width, height, data)
    }

    /// Sets the quantity label.
    #[must_use]
    pub fn with_quantity(mut self, quantity: Quantity) -> Self {
        self.quantity = Some(quantity);
        self
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Raw row-major samples.
    #[must_use]
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Sample at integer pixel `(x, y)`.
    #[must_use]
    pub fn value(&self, x: usize, y: usize) -> Option<f64> {
        if x < self.width && y < self.height {
            Some(self.data[y * self.width + x])
        } else {
            None
        }
    }

    /// Returns true if the continuous position lies inside the pixel grid.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x.is_finite()
            && y.is_finite()
            && x >= 0.0
            && y >= 0.0
            && x <= (self.width - 1) as f64
            && y <= (self.height - 1) as f64
    }

    /// Minimum and maximum finite sample.
    #[must_use]
    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.data
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}
