use crate::config::FloodConfig;
use crate::types::{bands, BandStack, FloodResult, Raster};

/// Linear model of water backscatter against projected local incidence angle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaterModel {
    pub slope: f32,
    pub intercept: f32,
}

impl Default for WaterModel {
    fn default() -> Self {
        Self::from_config(&FloodConfig::default())
    }
}

impl WaterModel {
    pub fn from_config(config: &FloodConfig) -> Self {
        Self {
            slope: config.water_slope,
            intercept: config.water_intercept,
        }
    }

    /// Expected water backscatter (dB) at incidence angle `plia` (degrees)
    pub fn evaluate(&self, plia: f32) -> f32 {
        plia * self.slope + self.intercept
    }

    /// Expected water backscatter raster (`wbsc`) from the PLIA band
    pub fn expected_backscatter(&self, stack: &BandStack) -> FloodResult<Raster> {
        let plia = stack.band(bands::PLIA)?;
        log::debug!(
            "Water model: wbsc = PLIA * {} + {}",
            self.slope,
            self.intercept
        );
        Ok(plia.mapv(|theta| self.evaluate(theta)))
    }
}
