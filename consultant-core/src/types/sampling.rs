use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::RagError;

/// Sampling parameters for a single generation call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingConfig {
    pub temperature: f32,
    pub top_p: f32,
}

impl SamplingConfig {
    pub const MAX_TEMPERATURE: f32 = 2.0;

    pub const fn new(temperature: f32, top_p: f32) -> Self {
        Self { temperature, top_p }
    }

    /// Check the parameters against the ranges accepted by OpenAI-compatible APIs:
    /// temperature in [0, 2], top_p in (0, 1].
    pub fn validate(&self) -> Result<(), RagError> {
        if !self.temperature.is_finite()
            || self.temperature < 0.0
            || self.temperature > Self::MAX_TEMPERATURE
        {
            return Err(RagError::InvalidSampling(format!(
                "temperature must be within [0, {}], got {:?}",
                Self::MAX_TEMPERATURE,
                self.temperature
            )));
        }

        if !self.top_p.is_finite() || self.top_p <= 0.0 || self.top_p > 1.0 {
            return Err(RagError::InvalidSampling(format!(
                "top_p must be within (0, 1], got {:?}",
                self.top_p
            )));
        }

        Ok(())
    }
}

impl fmt::Display for SamplingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Debug formatting keeps the decimal point for whole numbers (0.0, not 0)
        write!(f, "Temp={:?}, Top_P={:?}", self.temperature, self.top_p)
    }
}
