//! Flood mapping processing modules

/// Collect a `Zip` through a per-pixel closure, in parallel when the `parallel` feature is on
macro_rules! zip_map_collect {
    ($zip:expr, $f:expr) => {{
        let zip = $zip;
        #[cfg(feature = "parallel")]
        let collected = zip.par_map_collect($f);
        #[cfg(not(feature = "parallel"))]
        let collected = zip.map_collect($f);
        collected
    }};
}

pub mod encoding;
pub mod harmonic;
pub mod water_model;
pub mod bayes;
pub mod masking;
pub mod smoothing;
pub mod pipeline;

// Re-export main types
pub use encoding::BandEncoding;
pub use harmonic::{day_of_year, HarmonicCoefficients, HarmonicModel};
pub use water_model::WaterModel;
pub use bayes::{classify_pixel, classify_pixel_strict, BayesianClassifier, Classification, PixelDecision};
pub use masking::{apply_mask, MaskCascade, MaskInputs, MaskKind, MaskedRaster};
pub use smoothing::{lower_median, MedianFilter};
pub use pipeline::{FloodMap, FloodMapSeries, FloodMapStats, FloodMapper};
