use serde::{Deserialize, Serialize};

use crate::types::{FloodError, FloodResult};

/// Slope of the global water backscatter vs. incidence angle regression (dB/degree)
pub const WATER_SLOPE: f32 = -0.394181;
/// Intercept of the global water backscatter regression (dB)
pub const WATER_INTERCEPT: f32 = -4.142015;
/// Standard deviation of water backscatter, shared by all pixels (dB)
pub const WATER_STD: f32 = 2.754041;

/// Which post-classification masks are applied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskToggles {
    /// Reject pixels outside the valid incidence angle range
    pub incidence_angle: bool,
    /// Reject pixels where land and water distributions overlap
    pub distribution_conflict: bool,
    /// Reject observations implausible under both models
    pub outlier: bool,
    /// Reject low-confidence decisions
    pub decision_confidence: bool,
}

impl Default for MaskToggles {
    fn default() -> Self {
        Self {
            incidence_angle: true,
            distribution_conflict: true,
            outlier: true,
            decision_confidence: true,
        }
    }
}

/// Flood model configuration.
///
/// A single instance is shared by every stage of the pipeline. Missing
/// fields fall back to the defaults when deserialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FloodConfig {
    /// Water model slope (dB/degree)
    pub water_slope: f32,
    /// Water model intercept (dB)
    pub water_intercept: f32,
    /// Water backscatter standard deviation (dB)
    pub water_std: f32,
    /// Minimum valid incidence angle (degrees)
    pub angle_min: f32,
    /// Maximum valid incidence angle (degrees)
    pub angle_max: f32,
    /// Required separation of land above water, in water standard deviations
    pub conflict_margin: f32,
    /// Outlier bound width, in standard deviations
    pub outlier_sigma: f32,
    /// Decision values must exceed this to survive the confidence mask
    pub decision_threshold: f32,
    /// Median window (rows, cols), both odd
    pub smoothing_window: (usize, usize),
    pub masks: MaskToggles,
    /// Apply median smoothing after masking
    pub smoothing: bool,
}

impl Default for FloodConfig {
    fn default() -> Self {
        Self {
            water_slope: WATER_SLOPE,
            water_intercept: WATER_INTERCEPT,
            water_std: WATER_STD,
            angle_min: 27.0,
            angle_max: 48.0,
            conflict_margin: 0.5,
            outlier_sigma: 3.0,
            decision_threshold: 0.8,
            smoothing_window: (3, 3),
            masks: MaskToggles::default(),
            smoothing: true,
        }
    }
}

impl FloodConfig {
    /// Check that all values are usable
    pub fn validate(&self) -> FloodResult<()> {
        let scalars = [
            ("water_slope", self.water_slope),
            ("water_intercept", self.water_intercept),
            ("water_std", self.water_std),
            ("angle_min", self.angle_min),
            ("angle_max", self.angle_max),
            ("conflict_margin", self.conflict_margin),
            ("outlier_sigma", self.outlier_sigma),
            ("decision_threshold", self.decision_threshold),
        ];
        if let Some((name, value)) = scalars.iter().find(|(_, v)| !v.is_finite()) {
            return Err(FloodError::InvalidParameter(format!(
                "{} must be finite, got {}",
                name, value
            )));
        }

        if self.water_std <= 0.0 {
            return Err(FloodError::InvalidParameter(format!(
                "water_std must be positive, got {}",
                self.water_std
            )));
        }

        if self.angle_min > self.angle_max {
            return Err(FloodError::InvalidParameter(format!(
                "angle_min ({}) exceeds angle_max ({})",
                self.angle_min, self.angle_max
            )));
        }

        if self.conflict_margin < 0.0 {
            return Err(FloodError::InvalidParameter(format!(
                "conflict_margin must not be negative, got {}",
                self.conflict_margin
            )));
        }

        if self.outlier_sigma <= 0.0 {
            return Err(FloodError::InvalidParameter(format!(
                "outlier_sigma must be positive, got {}",
                self.outlier_sigma
            )));
        }

        // Decision values are 0 or 1; a threshold of 1 or more rejects every pixel
        if !(0.0..1.0).contains(&self.decision_threshold) {
            return Err(FloodError::InvalidParameter(format!(
                "decision_threshold must be in [0, 1), got {}",
                self.decision_threshold
            )));
        }

        let (rows, cols) = self.smoothing_window;
        if rows == 0 || cols == 0 || rows % 2 == 0 || cols % 2 == 0 {
            return Err(FloodError::InvalidParameter(format!(
                "smoothing_window must be odd in both dimensions, got {}x{}",
                rows, cols
            )));
        }

        Ok(())
    }
}
