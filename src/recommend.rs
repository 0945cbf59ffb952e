use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::round_to;
use crate::scenario::{Scenario, ScenarioResult};
use crate::schema::scenario as ids;

const BASE_CONFIDENCE: f64 = 0.70;
const TOTAL_MARGIN_BONUS: f64 = 0.10;
const MAX_CONFIDENCE: f64 = 0.95;
/// Occupancy below this many days counts as a fast turnover.
const FAST_TURNOVER_DAYS: u32 = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    /// `None` when no scenario is viable.
    pub recommended: Option<Scenario>,
    pub rationale: String,
    pub factors: Vec<String>,
    pub confidence: f64,
    pub alternative: Option<Scenario>,
    pub alternative_rationale: Option<String>,
}

impl Recommendation {
    /// Scenario id, or `"none"`.
    pub fn recommended_id(&self) -> &'static str {
        self.recommended.map_or(ids::NONE, |s| s.id())
    }
}

/// Stable descending sort on one metric.
fn ranked_by<'a, F>(results: &[&'a ScenarioResult], metric: F) -> Vec<&'a ScenarioResult>
where
    F: Fn(&ScenarioResult) -> f64,
{
    let mut ranked = results.to_vec();
    ranked.sort_by(|a, b| metric(b).partial_cmp(&metric(a)).unwrap_or(Ordering::Equal));
    ranked
}

/// Picks the viable scenario with the best margin per pen-slot-day. Total
/// margin and return on cost only shape the explanation and the confidence.
pub fn recommend(results: &[ScenarioResult], available_pen_slots: u32) -> Recommendation {
    let viable: Vec<&ScenarioResult> = results.iter().filter(|r| r.viable).collect();

    if viable.is_empty() {
        info!("no viable scenario");
        return Recommendation {
            recommended: None,
            rationale: "No scenario is viable with the current capacity. Consider adding \
                        finishing pen-slots or reducing the lot size."
                .to_string(),
            factors: vec!["Insufficient capacity in every scenario".to_string()],
            confidence: 0.0,
            alternative: None,
            alternative_rationale: None,
        };
    }

    let by_efficiency = ranked_by(&viable, |r| r.margin_per_pen_slot_day);
    let by_total_margin = ranked_by(&viable, |r| r.total_margin);
    let by_return = ranked_by(&viable, |r| r.return_on_cost_pct);

    let best = by_efficiency[0];
    let top_margin = by_total_margin[0];
    let mut confidence = BASE_CONFIDENCE;
    let mut factors = Vec::new();

    factors.push(format!(
        "Best margin per pen-slot-day: {:.2} €/slot/day",
        best.margin_per_pen_slot_day
    ));

    if top_margin.scenario == best.scenario {
        factors.push(format!(
            "Also the highest total margin: {:.2} €",
            best.total_margin
        ));
        confidence += TOTAL_MARGIN_BONUS;
    } else {
        factors.push(format!(
            "Total margin: {:.2} € (vs {:.2} € for \"{}\")",
            best.total_margin, top_margin.total_margin, top_margin.name
        ));
    }

    if by_return[0].scenario == best.scenario {
        factors.push(format!(
            "Return on cost: {:.1}% (highest)",
            best.return_on_cost_pct
        ));
    } else {
        factors.push(format!(
            "Return on cost: {:.1}%",
            best.return_on_cost_pct
        ));
    }

    factors.push(format!(
        "Occupancy: {} days (frees pen-slots {})",
        best.occupancy_days,
        if best.occupancy_days < FAST_TURNOVER_DAYS {
            "faster"
        } else {
            "slower"
        }
    ));

    if best.scenario == Scenario::Finisher {
        factors.push(format!(
            "Uses {} of {} available finishing pen-slots",
            best.surviving_animals, available_pen_slots
        ));
    }

    factors.push(format!(
        "Sale price: {:.2} {} ({})",
        best.sale_price,
        best.price_unit.label(),
        best.price_source
    ));

    let (alternative, alternative_rationale) = match by_efficiency.get(1) {
        Some(second) => (
            Some(second.scenario),
            Some(format!(
                "\"{}\" as an alternative with {:.2} €/slot/day",
                second.name, second.margin_per_pen_slot_day
            )),
        ),
        None => (None, None),
    };

    let confidence = round_to(confidence.min(MAX_CONFIDENCE), 2);
    info!(
        recommended = best.scenario.id(),
        confidence,
        "scenario recommended"
    );

    Recommendation {
        recommended: Some(best.scenario),
        rationale: format!(
            "\"{}\" is recommended for the best balance of return on cost ({:.1}%), \
             margin per pen-slot-day ({:.2} €) and total margin ({:.2} €).",
            best.name, best.return_on_cost_pct, best.margin_per_pen_slot_day, best.total_margin
        ),
        factors,
        confidence,
        alternative,
        alternative_rationale,
    }
}
