//! Profitability of selling pigs at 5-7 kg, 20-21 kg or finished weight,
//! with a recommendation across the three and short-horizon price forecasts.

pub mod config;
pub mod engine;
pub mod error;
pub mod estimator;
pub mod market;
pub mod offer;
pub mod recommend;
pub mod reference;
pub mod scenario;
pub mod schema;
pub mod series;

#[cfg(feature = "python")]
mod python;

pub use config::{EngineConfig, EstimatorConfig, SeasonalFactors};
pub use engine::{evaluate, Evaluation, EvaluationRequest};
pub use error::{MarginError, Result};
pub use estimator::{estimate_future_price, PriceEstimate};
pub use market::{MarketQuote, PriceOverrides, PriceSource};
pub use recommend::{recommend, Recommendation};
pub use reference::{Phase, PhaseCost, ReferenceCostTable};
pub use scenario::{
    compute_scenario, compute_scenario_by_id, CostMode, ManualParams, MarketPrices, PriceUnit,
    Scenario, ScenarioInput, ScenarioResult,
};
pub use series::{PriceObservation, PriceSeries};

/// Round to `decimals` places, halves toward positive infinity
/// (-0.125 becomes -0.12). Applied only to outputs.
pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor + 0.5).floor() / factor
}
