use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::EngineConfig;
use crate::error::Result;
use crate::estimator::{estimate_future_price, PriceEstimate};
use crate::market::{MarketQuote, PriceOverrides};
use crate::recommend::{recommend, Recommendation};
use crate::scenario::{
    compute_scenario, CostMode, ManualParams, MarketPrices, Scenario, ScenarioInput,
    ScenarioResult,
};
use crate::schema::product;
use crate::series::PriceSeries;

/// Forecasts attached to every evaluation: (key, product, weeks ahead).
pub const STANDARD_FORECASTS: [(&str, &str, u32); 4] = [
    ("finisher_4w", product::FINISHER, 4),
    ("finisher_8w", product::FINISHER, 8),
    ("finisher_16w", product::FINISHER, 16),
    ("weaner_4w", product::WEANER_20KG, 4),
];

/// A finishing barn as reported by the capacity source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinishingUnit {
    pub total_slots: u32,
    pub occupied_slots: u32,
}

/// Free finishing pen-slots across all units.
pub fn free_pen_slots(units: &[FinishingUnit]) -> u32 {
    units
        .iter()
        .map(|u| u.total_slots.saturating_sub(u.occupied_slots))
        .sum()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationRequest {
    pub animal_count: u32,
    pub cost_mode: CostMode,
    /// Farm parameters. Without them the evaluation runs in estimated mode.
    pub manual: Option<ManualParams>,
    pub overrides: PriceOverrides,
    pub available_pen_slots: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub scenarios: Vec<ScenarioResult>,
    pub recommendation: Recommendation,
    pub available_pen_slots: u32,
    pub market: MarketPrices,
    pub estimates: BTreeMap<String, PriceEstimate>,
    pub cost_mode: CostMode,
}

impl Evaluation {
    pub fn scenario(&self, scenario: Scenario) -> Option<&ScenarioResult> {
        self.scenarios.iter().find(|r| r.scenario == scenario)
    }
}

/// Every scenario, the recommendation and the standard forecasts for one request.
pub fn evaluate(
    config: &EngineConfig,
    series: &PriceSeries,
    quotes: &[MarketQuote],
    request: &EvaluationRequest,
    as_of: NaiveDate,
) -> Result<Evaluation> {
    let market = MarketPrices::from_quotes(quotes).with_overrides(&request.overrides);

    let cost_mode = match (request.cost_mode, &request.manual) {
        (CostMode::Manual, Some(_)) => CostMode::Manual,
        _ => CostMode::Estimated,
    };

    let input = ScenarioInput {
        animal_count: request.animal_count,
        cost_mode,
        available_pen_slots: request.available_pen_slots,
        market: &market,
        params: request.manual.as_ref(),
    };

    let scenarios = Scenario::ALL
        .iter()
        .map(|s| compute_scenario(*s, &input, &config.costs))
        .collect::<Result<Vec<_>>>()?;

    let recommendation = recommend(&scenarios, request.available_pen_slots);

    let estimates = STANDARD_FORECASTS
        .iter()
        .map(|(key, product, weeks)| {
            (
                key.to_string(),
                estimate_future_price(series, product, *weeks, as_of, &config.estimator),
            )
        })
        .collect();

    info!(
        animals = request.animal_count,
        cost_mode = ?cost_mode,
        recommended = recommendation.recommended_id(),
        "evaluation complete"
    );

    Ok(Evaluation {
        scenarios,
        recommendation,
        available_pen_slots: request.available_pen_slots,
        market,
        estimates,
        cost_mode,
    })
}
