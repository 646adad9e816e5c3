use ndarray::{Array2, Array3, ArrayView2, Axis, Zip};
use num_traits::Float;

use crate::config::FloodConfig;
use crate::types::{FloodError, FloodResult, Raster};

/// Lower median of the finite values in `values`, reordering the slice.
///
/// For an even count the smaller of the two middle values is returned, so a
/// tie between flooded and not-flooded resolves to not flooded.
pub fn lower_median<T: Float>(values: &mut [T]) -> Option<T> {
    let mut n = 0;
    for i in 0..values.len() {
        if values[i].is_finite() {
            values.swap(n, i);
            n += 1;
        }
    }
    if n == 0 {
        return None;
    }
    let finite = &mut values[..n];
    finite.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    Some(finite[(n - 1) / 2])
}

/// Sliding-window median filter for classification rasters.
///
/// Windows are centered on each pixel and shrink at the grid boundary to
/// the neighbours that exist.
#[derive(Debug, Clone, Copy)]
pub struct MedianFilter {
    window: (usize, usize),
}

impl Default for MedianFilter {
    fn default() -> Self {
        Self { window: (3, 3) }
    }
}

impl MedianFilter {
    /// Create a filter with a `(rows, cols)` window; both must be odd
    pub fn new(window: (usize, usize)) -> FloodResult<Self> {
        let (rows, cols) = window;
        if rows == 0 || cols == 0 || rows % 2 == 0 || cols % 2 == 0 {
            return Err(FloodError::InvalidParameter(format!(
                "median window must be odd in both dimensions, got {}x{}",
                rows, cols
            )));
        }
        Ok(Self { window })
    }

    pub fn from_config(config: &FloodConfig) -> FloodResult<Self> {
        Self::new(config.smoothing_window)
    }

    pub fn window(&self) -> (usize, usize) {
        self.window
    }

    /// Smooth one 2D raster
    pub fn apply(&self, image: ArrayView2<'_, f32>) -> Raster {
        let (height, width) = image.dim();
        let (half_i, half_j) = (self.window.0 / 2, self.window.1 / 2);
        log::debug!(
            "Applying {}x{} median filter to {}x{} raster",
            self.window.0,
            self.window.1,
            height,
            width
        );

        let mut filtered = Array2::<f32>::zeros((height, width));
        let smooth_pixel = |(i, j): (usize, usize), out: &mut f32| {
            let i_start = i.saturating_sub(half_i);
            let i_end = (i + half_i + 1).min(height);
            let j_start = j.saturating_sub(half_j);
            let j_end = (j + half_j + 1).min(width);

            let mut window_values: Vec<f32> = image
                .slice(ndarray::s![i_start..i_end, j_start..j_end])
                .iter()
                .copied()
                .collect();

            *out = lower_median(&mut window_values).unwrap_or(image[[i, j]]);
        };

        #[cfg(feature = "parallel")]
        Zip::indexed(&mut filtered).par_for_each(smooth_pixel);
        #[cfg(not(feature = "parallel"))]
        Zip::indexed(&mut filtered).for_each(smooth_pixel);

        filtered
    }

    /// Smooth every time/band slice of a stack independently
    pub fn apply_stack(&self, stack: &Array3<f32>) -> Array3<f32> {
        let mut out = Array3::<f32>::zeros(stack.dim());
        for (src, mut dst) in stack.axis_iter(Axis(0)).zip(out.axis_iter_mut(Axis(0))) {
            dst.assign(&self.apply(src));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_lower_median() {
        assert_eq!(lower_median(&mut [3.0_f32, 1.0, 2.0]), Some(2.0));
        assert_eq!(lower_median(&mut [0.0_f32, 1.0, 1.0, 0.0]), Some(0.0));
        assert_eq!(lower_median(&mut [f32::NAN, 1.0, f32::NAN]), Some(1.0));
        assert_eq!(lower_median::<f32>(&mut [f32::NAN]), None);
        assert_eq!(lower_median::<f64>(&mut []), None);
    }

    #[test]
    fn test_isolated_hole_filled() {
        let mut image = Array2::<f32>::ones((5, 5));
        image[[2, 2]] = 0.0;
        let smoothed = MedianFilter::default().apply(image.view());
        assert_eq!(smoothed[[2, 2]], 1.0);
    }

    #[test]
    fn test_isolated_speckle_removed() {
        let mut image = Array2::<f32>::zeros((5, 5));
        image[[2, 2]] = 1.0;
        let smoothed = MedianFilter::default().apply(image.view());
        assert!(smoothed.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_uniform_unchanged() {
        for value in [0.0_f32, 1.0] {
            let image = Array2::from_elem((4, 6), value);
            assert_eq!(MedianFilter::default().apply(image.view()), image);
        }
    }

    #[test]
    fn test_corner_window_shrinks() {
        // Corner sees a 2x2 window: two flooded, two not -> lower median
        let image = array![[1.0_f32, 1.0, 1.0], [0.0, 0.0, 1.0], [1.0, 1.0, 1.0]];
        let smoothed = MedianFilter::default().apply(image.view());
        assert_eq!(smoothed[[0, 0]], 0.0);
        // Center sees seven flooded of nine
        assert_eq!(smoothed[[1, 1]], 1.0);
    }

    #[test]
    fn test_stack_slices_independent() {
        let mut stack = Array3::<f32>::zeros((2, 3, 3));
        stack.index_axis_mut(Axis(0), 1).fill(1.0);
        stack[[0, 1, 1]] = 1.0;
        stack[[1, 1, 1]] = 0.0;

        let smoothed = MedianFilter::default().apply_stack(&stack);
        assert!(smoothed.index_axis(Axis(0), 0).iter().all(|&v| v == 0.0));
        assert!(smoothed.index_axis(Axis(0), 1).iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_even_window_rejected() {
        assert!(matches!(MedianFilter::new((2, 3)), Err(FloodError::InvalidParameter(_))));
        assert!(MedianFilter::new((1, 5)).is_ok());
    }
}
