use chrono::{Datelike, NaiveDate, NaiveDateTime};
use std::f64::consts::PI;

use crate::types::{bands, BandStack, FloodError, FloodResult, Raster};

/// Days per harmonic period. Leap days are not folded in.
pub const DAYS_PER_PERIOD: f64 = 365.0;

/// Number of sine/cosine pairs in the seasonal model
pub const HARMONIC_ORDER: usize = 3;

/// Convert an ISO date (or upstream event timestamp) to its calendar ordinal day, 1..=366
pub fn day_of_year(date: &str) -> FloodResult<u32> {
    let date = date.trim();

    if let Ok(d) = NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        return Ok(d.ordinal());
    }
    // Event timestamps, e.g. "2018-02-28 04:39:08"
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(date, fmt) {
            return Ok(dt.ordinal());
        }
    }

    Err(FloodError::InvalidDateFormat(format!(
        "'{}' is not a YYYY-MM-DD date",
        date
    )))
}

/// Angular position `w * t` within the seasonal cycle
pub fn seasonal_phase(day: f64) -> f64 {
    2.0 * PI / DAYS_PER_PERIOD * day
}

/// Harmonic coefficients of a single pixel
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HarmonicCoefficients {
    /// Mean backscatter
    pub m0: f32,
    /// Sine amplitudes for harmonics 1..=3
    pub s: [f32; HARMONIC_ORDER],
    /// Cosine amplitudes for harmonics 1..=3
    pub c: [f32; HARMONIC_ORDER],
}

impl HarmonicCoefficients {
    /// Expected land backscatter on day `t`
    pub fn evaluate(&self, day: f64) -> f32 {
        let wt = seasonal_phase(day);
        let seasonal: f64 = (0..HARMONIC_ORDER)
            .map(|k| {
                let kwt = (k + 1) as f64 * wt;
                self.s[k] as f64 * kwt.sin() + self.c[k] as f64 * kwt.cos()
            })
            .sum();
        (self.m0 as f64 + seasonal) as f32
    }
}

/// Seasonal land backscatter model over a raster of harmonic coefficients
#[derive(Debug, Clone, Default)]
pub struct HarmonicModel;

impl HarmonicModel {
    pub fn new() -> Self {
        Self
    }

    /// Expected land backscatter (`hbsc`) for a date string
    pub fn expected_backscatter(&self, stack: &BandStack, date: &str) -> FloodResult<Raster> {
        let day = day_of_year(date)?;
        log::debug!("Harmonic model date {} -> day of year {}", date.trim(), day);
        self.expected_backscatter_for_day(stack, day as f64)
    }

    /// Expected land backscatter for a day of year
    pub fn expected_backscatter_for_day(&self, stack: &BandStack, day: f64) -> FloodResult<Raster> {
        // Fail before allocating if any coefficient is absent
        for name in bands::HARMONIC {
            stack.band(name)?;
        }

        let wt = seasonal_phase(day);
        let mut hbsc = stack.band(bands::M0)?.to_owned();

        let pairs = [
            (bands::S1, bands::C1),
            (bands::S2, bands::C2),
            (bands::S3, bands::C3),
        ];
        for (k, (sin_band, cos_band)) in pairs.iter().enumerate() {
            let kwt = (k + 1) as f64 * wt;
            hbsc.scaled_add(kwt.sin() as f32, &stack.band(sin_band)?);
            hbsc.scaled_add(kwt.cos() as f32, &stack.band(cos_band)?);
        }

        log::info!(
            "Evaluated harmonic model for day {} over {}x{} pixels",
            day,
            hbsc.nrows(),
            hbsc.ncols()
        );
        Ok(hbsc)
    }
}
