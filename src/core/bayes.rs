use ndarray::{ArrayView2, Zip};
use std::f64::consts::PI;

use crate::config::FloodConfig;
use crate::types::{bands, BandStack, FloodError, FloodResult, Raster};

/// Prior probability of each class
const PRIOR: f64 = 0.5;

/// Gaussian probability density
pub fn normal_pdf(x: f64, mean: f64, std: f64) -> f64 {
    let z = (x - mean) / std;
    (-0.5 * z * z).exp() / (std * (2.0 * PI).sqrt())
}

/// Outcome of the two-class decision for one pixel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelDecision {
    /// Posterior probability of the water class, NaN when degenerate
    pub flood_posterior: f32,
    pub flooded: bool,
    /// Evidence vanished or an input was NaN; `flooded` is false
    pub degenerate: bool,
}

impl PixelDecision {
    const DEGENERATE: PixelDecision = PixelDecision {
        flood_posterior: f32::NAN,
        flooded: false,
        degenerate: true,
    };

    /// Decision as a raster value (1.0 flooded, 0.0 otherwise)
    pub fn value(&self) -> f32 {
        if self.flooded {
            1.0
        } else {
            0.0
        }
    }
}

/// Classify one pixel.
///
/// The water class uses the global `water_std` as its scale while the land
/// class uses the pixel's own `std`. Degenerate pixels are reported as not
/// flooded.
pub fn classify_pixel(sig0: f32, std: f32, wbsc: f32, hbsc: f32, water_std: f32) -> PixelDecision {
    if sig0.is_nan() || std.is_nan() || wbsc.is_nan() || hbsc.is_nan() {
        return PixelDecision::DEGENERATE;
    }

    let sig0 = sig0 as f64;
    let flood_density = normal_pdf(sig0, wbsc as f64, water_std as f64);
    let land_density = normal_pdf(sig0, hbsc as f64, std as f64);
    let evidence = PRIOR * flood_density + PRIOR * land_density;

    if !(evidence > 0.0) || !evidence.is_finite() {
        return PixelDecision::DEGENERATE;
    }

    let flood_posterior = PRIOR * flood_density / evidence;
    let land_posterior = PRIOR * land_density / evidence;

    PixelDecision {
        flood_posterior: flood_posterior as f32,
        flooded: flood_posterior > land_posterior,
        degenerate: false,
    }
}

/// Like [`classify_pixel`] but fails on degenerate input instead of applying the not-flooded policy
pub fn classify_pixel_strict(
    sig0: f32,
    std: f32,
    wbsc: f32,
    hbsc: f32,
    water_std: f32,
) -> FloodResult<PixelDecision> {
    if !(std > 0.0) || !(water_std > 0.0) {
        return Err(FloodError::InvalidParameter(format!(
            "standard deviations must be positive (std={}, water_std={})",
            std, water_std
        )));
    }
    let decision = classify_pixel(sig0, std, wbsc, hbsc, water_std);
    if decision.degenerate {
        return Err(FloodError::DegenerateComputation(format!(
            "zero evidence at sig0={} (wbsc={}, hbsc={}, std={})",
            sig0, wbsc, hbsc, std
        )));
    }
    Ok(decision)
}

/// Rasters produced by the classifier
#[derive(Debug, Clone)]
pub struct Classification {
    /// 1.0 where flooded, 0.0 elsewhere (`dec`)
    pub decision: Raster,
    /// Posterior probability of the water class
    pub flood_posterior: Raster,
    /// Pixels resolved by the degenerate policy
    pub degenerate_pixels: usize,
}

impl Classification {
    pub fn flooded_pixels(&self) -> usize {
        self.decision.iter().filter(|&&v| v > 0.0).count()
    }
}

/// Two-class Bayesian flood classifier with equal priors
#[derive(Debug, Clone, Copy)]
pub struct BayesianClassifier {
    water_std: f32,
}

impl Default for BayesianClassifier {
    fn default() -> Self {
        Self::from_config(&FloodConfig::default())
    }
}

impl BayesianClassifier {
    pub fn from_config(config: &FloodConfig) -> Self {
        Self {
            water_std: config.water_std,
        }
    }

    pub fn water_std(&self) -> f32 {
        self.water_std
    }

    /// Classify using SIG0 and STD from the stack
    pub fn classify_stack(
        &self,
        stack: &BandStack,
        wbsc: &Raster,
        hbsc: &Raster,
    ) -> FloodResult<Classification> {
        let sig0 = stack.band(bands::SIG0)?;
        let std = stack.band(bands::STD)?;
        self.classify(sig0, std, wbsc.view(), hbsc.view())
    }

    /// Classify every pixel of same-shaped rasters
    pub fn classify(
        &self,
        sig0: ArrayView2<'_, f32>,
        std: ArrayView2<'_, f32>,
        wbsc: ArrayView2<'_, f32>,
        hbsc: ArrayView2<'_, f32>,
    ) -> FloodResult<Classification> {
        let shape = sig0.dim();
        for (name, dim) in [(bands::STD, std.dim()), ("wbsc", wbsc.dim()), ("hbsc", hbsc.dim())] {
            if dim != shape {
                return Err(FloodError::ShapeMismatch {
                    band: name.to_string(),
                    expected: shape,
                    found: dim,
                });
            }
        }

        if !(self.water_std > 0.0) {
            return Err(FloodError::InvalidParameter(format!(
                "water_std must be positive, got {}",
                self.water_std
            )));
        }
        if let Some(bad) = std.iter().find(|&&s| s <= 0.0) {
            return Err(FloodError::InvalidParameter(format!(
                "land backscatter std must be positive, found {}",
                bad
            )));
        }

        log::info!("Classifying {}x{} pixels", shape.0, shape.1);

        let water_std = self.water_std;
        let pixels = zip_map_collect!(
            Zip::from(&sig0).and(&std).and(&wbsc).and(&hbsc),
            move |&s, &sd, &w, &h| classify_pixel(s, sd, w, h, water_std)
        );

        let decision = pixels.mapv(|p| p.value());
        let flood_posterior = pixels.mapv(|p| p.flood_posterior);
        let degenerate_pixels = pixels.iter().filter(|p| p.degenerate).count();

        if degenerate_pixels > 0 {
            log::warn!(
                "{} degenerate pixels (zero evidence or nodata) classified as not flooded",
                degenerate_pixels
            );
        }

        let classification = Classification {
            decision,
            flood_posterior,
            degenerate_pixels,
        };
        log::debug!(
            "Bayesian decision: {} of {} pixels flooded",
            classification.flooded_pixels(),
            shape.0 * shape.1
        );
        Ok(classification)
    }
}
