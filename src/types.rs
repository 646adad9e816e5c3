use ndarray::{Array2, Array3, ArrayView2};
use std::collections::HashMap;

/// Real-valued raster (row x column), backscatter in dB or angles in degrees
pub type Raster = Array2<f32>;

/// Binary raster (1 = retain / flooded, 0 = suppress / not flooded)
pub type Mask = Array2<u8>;

/// Stack of binary rasters (time x row x column)
pub type MaskSeries = Array3<u8>;

/// Band names used by the flood mapping pipeline
pub mod bands {
    /// Observed backscatter for the date of interest (dB)
    pub const SIG0: &str = "SIG0";
    /// Projected local incidence angle (degrees)
    pub const PLIA: &str = "PLIA";
    /// Land backscatter standard deviation of the harmonic fit residual
    pub const STD: &str = "STD";
    /// Number of observations used in the harmonic fit
    pub const NOBS: &str = "NOBS";
    pub const M0: &str = "M0";
    pub const S1: &str = "S1";
    pub const S2: &str = "S2";
    pub const S3: &str = "S3";
    pub const C1: &str = "C1";
    pub const C2: &str = "C2";
    pub const C3: &str = "C3";

    /// Harmonic coefficient bands in evaluation order
    pub const HARMONIC: [&str; 7] = [M0, S1, S2, S3, C1, C2, C3];
}

/// Named collection of rasters sharing a common reference grid.
///
/// Bands either match the reference shape or broadcast to it (a 1x1 band
/// acts as a constant over the whole grid).
#[derive(Debug, Clone)]
pub struct BandStack {
    shape: (usize, usize),
    bands: HashMap<String, Raster>,
}

impl BandStack {
    /// Create an empty stack over a `(rows, cols)` grid
    pub fn new(shape: (usize, usize)) -> Self {
        Self {
            shape,
            bands: HashMap::new(),
        }
    }

    /// Builder-style insert
    pub fn with_band(mut self, name: impl Into<String>, data: Raster) -> FloodResult<Self> {
        self.insert(name, data)?;
        Ok(self)
    }

    /// Insert or replace a band, rejecting shapes that cannot broadcast to the grid
    pub fn insert(&mut self, name: impl Into<String>, data: Raster) -> FloodResult<()> {
        let name = name.into();
        if data.broadcast(self.shape).is_none() {
            return Err(FloodError::ShapeMismatch {
                band: name,
                expected: self.shape,
                found: data.dim(),
            });
        }
        log::debug!("Adding band {} ({}x{})", name, data.nrows(), data.ncols());
        self.bands.insert(name, data);
        Ok(())
    }

    /// Grid shape `(rows, cols)`
    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bands.contains_key(name)
    }

    pub fn band_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.bands.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Borrow a band broadcast to the grid shape
    pub fn band(&self, name: &str) -> FloodResult<ArrayView2<'_, f32>> {
        let data = self
            .bands
            .get(name)
            .ok_or_else(|| FloodError::MissingInputBand(name.to_string()))?;

        data.broadcast(self.shape).ok_or_else(|| FloodError::ShapeMismatch {
            band: name.to_string(),
            expected: self.shape,
            found: data.dim(),
        })
    }

    /// Remove a band, returning its data
    pub fn remove(&mut self, name: &str) -> Option<Raster> {
        self.bands.remove(name)
    }
}

/// Error types for flood mapping
#[derive(Debug, thiserror::Error)]
pub enum FloodError {
    #[error("Missing input band: {0}")]
    MissingInputBand(String),

    #[error("Invalid date format: {0}")]
    InvalidDateFormat(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Band {band} has shape {found:?}, expected {expected:?}")]
    ShapeMismatch {
        band: String,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("Degenerate computation: {0}")]
    DegenerateComputation(String),
}

/// Result type for flood mapping operations
pub type FloodResult<T> = Result<T, FloodError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_band() {
        let stack = BandStack::new((2, 2));
        let err = stack.band(bands::SIG0).unwrap_err();
        assert!(matches!(err, FloodError::MissingInputBand(ref b) if b == "SIG0"));
    }

    #[test]
    fn test_constant_band_broadcasts() {
        let stack = BandStack::new((3, 4))
            .with_band(bands::PLIA, Array2::from_elem((1, 1), 30.0))
            .unwrap();

        let plia = stack.band(bands::PLIA).unwrap();
        assert_eq!(plia.dim(), (3, 4));
        assert!(plia.iter().all(|&v| v == 30.0));
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let mut stack = BandStack::new((3, 4));
        let err = stack.insert(bands::STD, Array2::zeros((2, 4))).unwrap_err();
        assert!(matches!(err, FloodError::ShapeMismatch { found: (2, 4), .. }));
        assert!(!stack.contains(bands::STD));
    }
}
