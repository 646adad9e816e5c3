use ndarray::Zip;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::FloodConfig;
use crate::types::{bands, BandStack, FloodError, FloodResult, Mask, Raster};

/// Post-classification masks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaskKind {
    /// Incidence angle outside the valid range (steep terrain)
    IncidenceAngle,
    /// Land and water backscatter distributions too close to separate
    DistributionConflict,
    /// Observation implausible under both land and water models
    Outlier,
    /// Decision value at or below the confidence threshold
    DecisionConfidence,
}

impl MaskKind {
    pub const ALL: [MaskKind; 4] = [
        MaskKind::IncidenceAngle,
        MaskKind::DistributionConflict,
        MaskKind::Outlier,
        MaskKind::DecisionConfidence,
    ];

    /// Masks switched on in the configuration
    pub fn enabled(config: &FloodConfig) -> Vec<MaskKind> {
        let toggles = &config.masks;
        Self::ALL
            .into_iter()
            .filter(|kind| match kind {
                MaskKind::IncidenceAngle => toggles.incidence_angle,
                MaskKind::DistributionConflict => toggles.distribution_conflict,
                MaskKind::Outlier => toggles.outlier,
                MaskKind::DecisionConfidence => toggles.decision_confidence,
            })
            .collect()
    }
}

impl fmt::Display for MaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaskKind::IncidenceAngle => write!(f, "incidence-angle"),
            MaskKind::DistributionConflict => write!(f, "distribution-conflict"),
            MaskKind::Outlier => write!(f, "outlier"),
            MaskKind::DecisionConfidence => write!(f, "decision-confidence"),
        }
    }
}

/// Rasters the masks are computed from. None of them is modified by the cascade.
#[derive(Debug, Clone, Copy)]
pub struct MaskInputs<'a> {
    /// Source of PLIA, SIG0 and STD
    pub stack: &'a BandStack,
    pub wbsc: &'a Raster,
    pub hbsc: &'a Raster,
    /// Raw classifier decision, before any mask
    pub decision: &'a Raster,
}

impl MaskInputs<'_> {
    fn check_shapes(&self) -> FloodResult<()> {
        let expected = self.stack.shape();
        for (name, raster) in [("wbsc", self.wbsc), ("hbsc", self.hbsc), ("decision", self.decision)] {
            if raster.dim() != expected {
                return Err(FloodError::ShapeMismatch {
                    band: name.to_string(),
                    expected,
                    found: raster.dim(),
                });
            }
        }
        Ok(())
    }
}

/// Result of running the cascade
#[derive(Debug, Clone)]
pub struct MaskedRaster {
    pub raster: Raster,
    /// Flooded pixels of the raw decision rejected by each mask
    pub suppressed: Vec<(MaskKind, usize)>,
}

/// Multiply a binary mask onto a raster, producing a new raster
pub fn apply_mask(raster: &Raster, mask: &Mask) -> Raster {
    let mut out = raster.clone();
    Zip::from(&mut out).and(mask).for_each(|v, &m| *v *= m as f32);
    out
}

fn as_mask(keep: bool) -> u8 {
    keep as u8
}

/// Cascade of independent, multiplicative post-classification masks
#[derive(Debug, Clone)]
pub struct MaskCascade {
    angle_min: f32,
    angle_max: f32,
    conflict_margin: f32,
    outlier_sigma: f32,
    decision_threshold: f32,
    water_std: f32,
    enabled: Vec<MaskKind>,
}

impl MaskCascade {
    /// Cascade with the masks enabled in `config`
    pub fn from_config(config: &FloodConfig) -> Self {
        Self::with_masks(config, &MaskKind::enabled(config))
    }

    /// Cascade with an explicit mask selection
    pub fn with_masks(config: &FloodConfig, masks: &[MaskKind]) -> Self {
        let mut enabled = Vec::with_capacity(masks.len());
        for kind in masks {
            if !enabled.contains(kind) {
                enabled.push(*kind);
            }
        }
        Self {
            angle_min: config.angle_min,
            angle_max: config.angle_max,
            conflict_margin: config.conflict_margin,
            outlier_sigma: config.outlier_sigma,
            decision_threshold: config.decision_threshold,
            water_std: config.water_std,
            enabled,
        }
    }

    pub fn enabled(&self) -> &[MaskKind] {
        &self.enabled
    }

    /// Compute one mask (1 = retain, 0 = suppress). NaN inputs suppress.
    pub fn compute_mask(&self, kind: MaskKind, inputs: &MaskInputs<'_>) -> FloodResult<Mask> {
        inputs.check_shapes()?;

        let mask = match kind {
            MaskKind::IncidenceAngle => {
                let plia = inputs.stack.band(bands::PLIA)?;
                let (lo, hi) = (self.angle_min, self.angle_max);
                zip_map_collect!(Zip::from(&plia), move |&theta| as_mask(
                    lo <= theta && theta <= hi
                ))
            }
            MaskKind::DistributionConflict => {
                let separation = self.conflict_margin * self.water_std;
                zip_map_collect!(
                    Zip::from(inputs.hbsc).and(inputs.wbsc),
                    move |&h, &w| as_mask(h > w + separation)
                )
            }
            MaskKind::Outlier => {
                let sig0 = inputs.stack.band(bands::SIG0)?;
                let std = inputs.stack.band(bands::STD)?;
                let k = self.outlier_sigma;
                let water_upper = k * self.water_std;
                zip_map_collect!(
                    Zip::from(&sig0).and(&std).and(inputs.hbsc).and(inputs.wbsc),
                    move |&s, &sd, &h, &w| {
                        let plausible_land = h - k * sd < s && s < h + k * sd;
                        let plausible_water = s < w + water_upper;
                        as_mask(plausible_land || plausible_water)
                    }
                )
            }
            MaskKind::DecisionConfidence => {
                let threshold = self.decision_threshold;
                zip_map_collect!(Zip::from(inputs.decision), move |&d| as_mask(d > threshold))
            }
        };

        log::debug!(
            "{} mask retains {} of {} pixels",
            kind,
            mask.iter().filter(|&&m| m == 1).count(),
            mask.len()
        );
        Ok(mask)
    }

    /// Apply every enabled mask to `raster`
    pub fn apply(&self, raster: &Raster, inputs: &MaskInputs<'_>) -> FloodResult<MaskedRaster> {
        if raster.dim() != inputs.stack.shape() {
            return Err(FloodError::ShapeMismatch {
                band: "classification".to_string(),
                expected: inputs.stack.shape(),
                found: raster.dim(),
            });
        }

        let mut out = raster.clone();
        let mut suppressed = Vec::with_capacity(self.enabled.len());

        for &kind in &self.enabled {
            let mask = self.compute_mask(kind, inputs)?;
            let rejected = Zip::from(inputs.decision)
                .and(&mask)
                .fold(0usize, |n, &d, &m| n + (d > 0.0 && m == 0) as usize);
            log::info!("{} mask rejects {} flooded pixels", kind, rejected);

            out = apply_mask(&out, &mask);
            suppressed.push((kind, rejected));
        }

        Ok(MaskedRaster {
            raster: out,
            suppressed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    struct Fixture {
        stack: BandStack,
        wbsc: Raster,
        hbsc: Raster,
        decision: Raster,
    }

    impl Fixture {
        fn inputs(&self) -> MaskInputs<'_> {
            MaskInputs {
                stack: &self.stack,
                wbsc: &self.wbsc,
                hbsc: &self.hbsc,
                decision: &self.decision,
            }
        }
    }

    fn fixture() -> Fixture {
        let stack = BandStack::new((2, 3))
            .with_band(bands::PLIA, array![[20.0, 27.0, 30.0], [48.0, 50.0, 35.0]])
            .unwrap()
            .with_band(bands::SIG0, array![[-16.0, -10.0, 5.0], [-18.0, -17.0, -11.0]])
            .unwrap()
            .with_band(bands::STD, Array2::from_elem((1, 1), 1.0))
            .unwrap();
        Fixture {
            stack,
            wbsc: array![[-16.0, -15.0, -16.0], [-17.0, -18.0, -16.0]],
            hbsc: array![[-10.0, -14.5, -10.0], [-9.0, -8.0, -11.0]],
            decision: array![[1.0, 0.0, 1.0], [1.0, 1.0, 0.0]],
        }
    }

    #[test]
    fn test_incidence_angle_bounds_inclusive() {
        let f = fixture();
        let cascade = MaskCascade::from_config(&FloodConfig::default());
        let mask = cascade.compute_mask(MaskKind::IncidenceAngle, &f.inputs()).unwrap();
        assert_eq!(mask, array![[0, 1, 1], [1, 0, 1]]);
    }

    #[test]
    fn test_distribution_conflict() {
        let f = fixture();
        let cascade = MaskCascade::from_config(&FloodConfig::default());
        let mask = cascade.compute_mask(MaskKind::DistributionConflict, &f.inputs()).unwrap();
        // -14.5 is within 0.5 * 2.754 of -15
        assert_eq!(mask, array![[1, 0, 1], [1, 1, 1]]);
    }

    #[test]
    fn test_outlier_is_either_model() {
        let f = fixture();
        let cascade = MaskCascade::from_config(&FloodConfig::default());
        let mask = cascade.compute_mask(MaskKind::Outlier, &f.inputs()).unwrap();
        // 5 dB is far above both the land band and the water upper bound
        assert_eq!(mask, array![[1, 1, 0], [1, 1, 1]]);
    }

    #[test]
    fn test_decision_confidence_threshold() {
        let mut f = fixture();
        f.decision = array![[0.8, 0.81, 1.0], [0.0, 0.5, 0.9]];
        let cascade = MaskCascade::from_config(&FloodConfig::default());
        let mask = cascade.compute_mask(MaskKind::DecisionConfidence, &f.inputs()).unwrap();
        assert_eq!(mask, array![[0, 1, 1], [0, 0, 1]]);
    }

    #[test]
    fn test_nan_suppresses() {
        let mut f = fixture();
        f.stack
            .insert(bands::PLIA, array![[f32::NAN, 30.0, 30.0], [30.0, 30.0, 30.0]])
            .unwrap();
        let cascade = MaskCascade::from_config(&FloodConfig::default());
        let mask = cascade.compute_mask(MaskKind::IncidenceAngle, &f.inputs()).unwrap();
        assert_eq!(mask[[0, 0]], 0);
    }

    #[test]
    fn test_cascade_idempotent() {
        let f = fixture();
        let config = FloodConfig::default();
        for kind in MaskKind::ALL {
            let once = MaskCascade::with_masks(&config, &[kind])
                .apply(&f.decision, &f.inputs())
                .unwrap();
            let twice = MaskCascade::with_masks(&config, &[kind])
                .apply(&once.raster, &f.inputs())
                .unwrap();
            assert_eq!(once.raster, twice.raster, "{}", kind);
        }
    }

    #[test]
    fn test_cascade_commutative() {
        let f = fixture();
        let config = FloodConfig::default();
        for a in MaskKind::ALL {
            for b in MaskKind::ALL {
                let ab = MaskCascade::with_masks(&config, &[a, b])
                    .apply(&f.decision, &f.inputs())
                    .unwrap();
                let ba = MaskCascade::with_masks(&config, &[b, a])
                    .apply(&f.decision, &f.inputs())
                    .unwrap();
                assert_eq!(ab.raster, ba.raster, "{} / {}", a, b);
            }
        }
    }

    #[test]
    fn test_suppression_counts() {
        let f = fixture();
        let result = MaskCascade::from_config(&FloodConfig::default())
            .apply(&f.decision, &f.inputs())
            .unwrap();

        assert_eq!(result.raster, array![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]]);
        assert_eq!(
            result.suppressed,
            vec![
                (MaskKind::IncidenceAngle, 2),
                (MaskKind::DistributionConflict, 0),
                (MaskKind::Outlier, 1),
                (MaskKind::DecisionConfidence, 0),
            ]
        );
    }

    #[test]
    fn test_missing_band_for_enabled_mask() {
        let mut f = fixture();
        f.stack.remove(bands::PLIA);
        let cascade = MaskCascade::with_masks(&FloodConfig::default(), &[MaskKind::IncidenceAngle]);
        let err = cascade.apply(&f.decision, &f.inputs()).unwrap_err();
        assert!(matches!(err, FloodError::MissingInputBand(ref b) if b == "PLIA"));

        // Masks that do not read PLIA still run
        let cascade = MaskCascade::with_masks(&FloodConfig::default(), &[MaskKind::Outlier]);
        assert!(cascade.apply(&f.decision, &f.inputs()).is_ok());
    }

    #[test]
    fn test_toggles_select_masks() {
        let mut config = FloodConfig::default();
        config.masks.outlier = false;
        config.masks.decision_confidence = false;
        assert_eq!(
            MaskKind::enabled(&config),
            vec![MaskKind::IncidenceAngle, MaskKind::DistributionConflict]
        );
    }
}
