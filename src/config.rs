use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{MarginError, Result};
use crate::reference::ReferenceCostTable;

/// Seasonal price adjustment per calendar month, January first.
/// Positive in spring/summer, negative in autumn/winter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeasonalFactors(pub [f64; 12]);

impl SeasonalFactors {
    /// `month0` is 0-based (0 = January).
    pub fn factor(&self, month0: u32) -> f64 {
        self.0[(month0 % 12) as usize]
    }
}

impl Default for SeasonalFactors {
    fn default() -> Self {
        Self([
            -0.02, -0.01, 0.01, 0.03, 0.05, 0.06, 0.04, 0.02, -0.01, -0.03, -0.04, -0.03,
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Trailing observations used for the moving average and the trend.
    pub window: usize,
    /// Below this many observations the estimator degrades to the last price.
    pub min_observations: usize,
    pub base_confidence: f64,
    pub confidence_decay_per_week: f64,
    pub min_confidence: f64,
    pub max_confidence: f64,
    /// Confidence reported on the insufficient-data path.
    pub fallback_confidence: f64,
    pub seasonal: SeasonalFactors,
}

impl EstimatorConfig {
    /// Reject settings the estimator cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.window == 0 {
            return Err(MarginError::InvalidInput(
                "estimator.window must be at least 1".into(),
            ));
        }
        if self.min_observations == 0 {
            return Err(MarginError::InvalidInput(
                "estimator.min_observations must be at least 1".into(),
            ));
        }
        if !(self.min_confidence.is_finite() && self.max_confidence.is_finite()) {
            return Err(MarginError::InvalidInput(
                "estimator confidence bounds must be finite".into(),
            ));
        }
        if self.min_confidence > self.max_confidence {
            return Err(MarginError::InvalidInput(format!(
                "estimator.min_confidence ({}) exceeds max_confidence ({})",
                self.min_confidence, self.max_confidence
            )));
        }
        Ok(())
    }
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            window: 8,
            min_observations: 4,
            base_confidence: 0.85,
            confidence_decay_per_week: 0.05,
            min_confidence: 0.10,
            max_confidence: 0.95,
            fallback_confidence: 0.1,
            seasonal: SeasonalFactors::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub costs: ReferenceCostTable,
    pub estimator: EstimatorConfig,
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.estimator.validate()?;
        Ok(config)
    }

    pub fn from_json_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&raw)?;
        info!(path = %path.display(), "loaded engine config");
        Ok(config)
    }
}
