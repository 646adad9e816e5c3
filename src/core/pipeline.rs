use ndarray::{Array3, Axis};

use crate::config::FloodConfig;
use crate::core::bayes::BayesianClassifier;
use crate::core::harmonic::HarmonicModel;
use crate::core::masking::{MaskCascade, MaskInputs, MaskKind};
use crate::core::smoothing::MedianFilter;
use crate::core::water_model::WaterModel;
use crate::types::{bands, BandStack, FloodError, FloodResult, Mask, MaskSeries, Raster};

/// Per-run statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FloodMapStats {
    pub total_pixels: usize,
    /// Flooded according to the raw Bayesian decision
    pub decision_flooded: usize,
    /// Flooded after masking and smoothing
    pub flooded_pixels: usize,
    /// Pixels resolved as not flooded because of zero evidence or nodata
    pub degenerate_pixels: usize,
    /// Raw flooded pixels rejected by each mask
    pub suppressed: Vec<(MaskKind, usize)>,
    pub flooded_percentage: f64,
}

/// Output of a single-date run
#[derive(Debug, Clone)]
pub struct FloodMap {
    /// Final classification (1 = flooded)
    pub classification: Mask,
    /// Raw Bayesian decision (`dec`)
    pub decision: Raster,
    pub flood_posterior: Raster,
    /// Expected water backscatter
    pub wbsc: Raster,
    /// Expected land backscatter
    pub hbsc: Raster,
    pub stats: FloodMapStats,
}

/// Output of a time-series run
#[derive(Debug, Clone)]
pub struct FloodMapSeries {
    /// Classifications indexed (time, row, col)
    pub classification: MaskSeries,
    pub dates: Vec<String>,
    pub stats: Vec<FloodMapStats>,
}

/// End-to-end flood mapper.
///
/// Static inputs (harmonic coefficients, STD, PLIA) and the observation
/// (SIG0) are read from a [`BandStack`].
#[derive(Debug, Clone)]
pub struct FloodMapper {
    config: FloodConfig,
    harmonic: HarmonicModel,
    water: WaterModel,
    classifier: BayesianClassifier,
    cascade: MaskCascade,
    smoothing: Option<MedianFilter>,
}

impl FloodMapper {
    pub fn new(config: FloodConfig) -> FloodResult<Self> {
        config.validate()?;

        let smoothing = if config.smoothing {
            Some(MedianFilter::from_config(&config)?)
        } else {
            None
        };

        Ok(Self {
            harmonic: HarmonicModel::new(),
            water: WaterModel::from_config(&config),
            classifier: BayesianClassifier::from_config(&config),
            cascade: MaskCascade::from_config(&config),
            smoothing,
            config,
        })
    }

    /// Mapper with default constants and all masks enabled
    pub fn standard() -> Self {
        let config = FloodConfig::default();
        Self {
            harmonic: HarmonicModel::new(),
            water: WaterModel::from_config(&config),
            classifier: BayesianClassifier::from_config(&config),
            cascade: MaskCascade::from_config(&config),
            smoothing: Some(MedianFilter::default()),
            config,
        }
    }

    pub fn config(&self) -> &FloodConfig {
        &self.config
    }

    /// Classify the SIG0 band of `stack` for `date`
    pub fn map_floods(&self, stack: &BandStack, date: &str) -> FloodResult<FloodMap> {
        let (rows, cols) = stack.shape();
        log::info!("Mapping floods for {} on {}x{} grid", date.trim(), rows, cols);

        let hbsc = self.harmonic.expected_backscatter(stack, date)?;
        let wbsc = self.water.expected_backscatter(stack)?;
        let classification = self.classifier.classify_stack(stack, &wbsc, &hbsc)?;

        let inputs = MaskInputs {
            stack,
            wbsc: &wbsc,
            hbsc: &hbsc,
            decision: &classification.decision,
        };
        let masked = self.cascade.apply(&classification.decision, &inputs)?;

        let result = match &self.smoothing {
            Some(filter) => filter.apply(masked.raster.view()),
            None => masked.raster,
        };
        let flood_mask: Mask = result.mapv(|v| (v > 0.5) as u8);

        let total_pixels = rows * cols;
        let flooded_pixels = flood_mask.iter().filter(|&&v| v == 1).count();
        let stats = FloodMapStats {
            total_pixels,
            decision_flooded: classification.flooded_pixels(),
            flooded_pixels,
            degenerate_pixels: classification.degenerate_pixels,
            suppressed: masked.suppressed,
            flooded_percentage: if total_pixels > 0 {
                100.0 * flooded_pixels as f64 / total_pixels as f64
            } else {
                0.0
            },
        };
        log::info!(
            "Flood map complete: {} of {} pixels flooded ({:.2}%)",
            stats.flooded_pixels,
            stats.total_pixels,
            stats.flooded_percentage
        );

        Ok(FloodMap {
            classification: flood_mask,
            decision: classification.decision,
            flood_posterior: classification.flood_posterior,
            wbsc,
            hbsc,
            stats,
        })
    }

    /// Classify a series of `(date, sig0)` observations against the static bands of `stack`
    pub fn map_flood_series(
        &self,
        stack: &BandStack,
        observations: &[(String, Raster)],
    ) -> FloodResult<FloodMapSeries> {
        if observations.is_empty() {
            return Err(FloodError::MissingInputBand(bands::SIG0.to_string()));
        }

        let (rows, cols) = stack.shape();
        log::info!("Mapping floods for {} observations", observations.len());

        let map_one = |(date, sig0): &(String, Raster)| -> FloodResult<FloodMap> {
            let mut working = stack.clone();
            working.insert(bands::SIG0, sig0.clone())?;
            self.map_floods(&working, date)
        };

        // Dates are independent; each run gets its own copy of the static bands
        #[cfg(feature = "parallel")]
        let maps: Vec<FloodMap> = {
            use rayon::prelude::*;
            observations.par_iter().map(map_one).collect::<FloodResult<_>>()?
        };
        #[cfg(not(feature = "parallel"))]
        let maps: Vec<FloodMap> = observations.iter().map(map_one).collect::<FloodResult<_>>()?;

        let mut classification = Array3::<u8>::zeros((observations.len(), rows, cols));
        let mut dates = Vec::with_capacity(observations.len());
        let mut stats = Vec::with_capacity(observations.len());
        for (((date, _), map), mut slot) in observations
            .iter()
            .zip(maps)
            .zip(classification.axis_iter_mut(Axis(0)))
        {
            slot.assign(&map.classification);
            dates.push(date.clone());
            stats.push(map.stats);
        }

        Ok(FloodMapSeries {
            classification,
            dates,
            stats,
        })
    }
}
