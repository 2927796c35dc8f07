//! Conversions between stackslice types and `ndarray` arrays.

use crate::{Error, Result};
use ndarray::{Array2, ArrayView2};
use stackslice_core::{Channel, SliceGrid};

/// Copies the grid into a `(frames, samples)` array; missing frames are NaN.
pub fn grid_to_array(grid: &SliceGrid) -> Result<Array2<f64>> {
    Array2::from_shape_vec((grid.frames(), grid.samples()), grid.data().to_vec())
        .map_err(|e| Error::InvalidFormat(e.to_string()))
}

/// Builds a channel from a `(height, width)` array.
pub fn channel_from_array(name: impl Into<String>, array: ArrayView2<'_, f64>) -> Result<Channel> {
    let (height, width) = array.dim();
    // iter() walks in logical row-major order regardless of memory layout
    let data: Vec<f64> = array.iter().copied().collect();
    Ok(Channel::new(name, width, height, data)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use stackslice_core::{GridDescriptor, Profile, Quantity};

    #[test]
    fn test_grid_to_array_shape() {
        let grid = SliceGrid::assemble(
            GridDescriptor::new(3, Quantity::new("Height", "nm")),
            vec![Some(Profile::new(vec![1.0, 2.0, 3.0])), None],
        )
        .unwrap();
        let array = grid_to_array(&grid).unwrap();
        assert_eq!(array.dim(), (2, 3));
        assert!((array[[0, 2]] - 3.0).abs() < f64::EPSILON);
        assert!(array[[1, 0]].is_nan());
    }

    #[test]
    fn test_channel_from_transposed_view() {
        let a = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];
        let channel = channel_from_array("t", a.t()).unwrap();
        assert_eq!((channel.width(), channel.height()), (3, 2));
        assert_eq!(channel.value(1, 0), Some(3.0));
        assert_eq!(channel.value(0, 1), Some(2.0));
    }
}
