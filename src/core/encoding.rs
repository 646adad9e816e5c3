use ndarray::Array2;

use crate::types::Raster;

/// Packed integer storage of a band: `value = raw * scale_factor`, `fill_value` marks nodata
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandEncoding {
    pub scale_factor: f32,
    pub fill_value: i16,
}

impl BandEncoding {
    /// Backscatter in 0.1 dB steps
    pub const SIG0: BandEncoding = BandEncoding { scale_factor: 0.1, fill_value: -9999 };
    /// Harmonic coefficients and STD in 0.1 dB steps
    pub const HARMONIC: BandEncoding = BandEncoding { scale_factor: 0.1, fill_value: -9999 };
    /// Incidence angle in 0.01 degree steps
    pub const PLIA: BandEncoding = BandEncoding { scale_factor: 0.01, fill_value: -9999 };
    /// Observation counts, unscaled
    pub const NOBS: BandEncoding = BandEncoding { scale_factor: 1.0, fill_value: -9999 };

    pub fn decode_value(&self, raw: i16) -> f32 {
        if raw == self.fill_value {
            f32::NAN
        } else {
            raw as f32 * self.scale_factor
        }
    }

    /// Decode a packed band, fill values become NaN
    pub fn decode(&self, raw: &Array2<i16>) -> Raster {
        let decoded = raw.mapv(|v| self.decode_value(v));
        let nodata = decoded.iter().filter(|v| v.is_nan()).count();
        if nodata > 0 {
            log::debug!("Decoded band with {} nodata pixels of {}", nodata, decoded.len());
        }
        decoded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_decode_scales_and_masks_fill() {
        let raw = array![[-105_i16, -9999], [0, 123]];
        let decoded = BandEncoding::SIG0.decode(&raw);

        assert_relative_eq!(decoded[[0, 0]], -10.5, epsilon = 1e-5);
        assert!(decoded[[0, 1]].is_nan());
        assert_eq!(decoded[[1, 0]], 0.0);
        assert_relative_eq!(decoded[[1, 1]], 12.3, epsilon = 1e-5);
    }

    #[test]
    fn test_plia_hundredths() {
        assert_relative_eq!(BandEncoding::PLIA.decode_value(3050), 30.5, epsilon = 1e-4);
        assert_eq!(BandEncoding::NOBS.decode_value(42), 42.0);
    }
}
