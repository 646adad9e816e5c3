//! sarflood: Bayesian flood mapping from Sentinel-1 backscatter
//!
//! Classifies each pixel of a backscatter observation as flooded or not by
//! comparing it against an expected water backscatter (linear in incidence
//! angle) and an expected land backscatter (a harmonic seasonal model), then
//! suppresses unreliable decisions with a cascade of masks and removes
//! speckle with a median filter.

pub mod types;
pub mod config;
pub mod core;

// Re-export main types and functions for easier access
pub use types::{bands, BandStack, FloodError, FloodResult, Mask, MaskSeries, Raster};
pub use config::{FloodConfig, MaskToggles};
pub use crate::core::{
    BandEncoding, BayesianClassifier, FloodMap, FloodMapSeries, FloodMapStats, FloodMapper,
    HarmonicModel, MaskCascade, MaskKind, MedianFilter, WaterModel,
};
