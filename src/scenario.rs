//! Scenario calculator: the financial outcome of selling a lot at one of the
//! three growth stages.
//!
//! All static per-scenario facts live in one table ([`ScenarioFacts`]); the
//! calculation itself only branches on the cost mode.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{MarginError, Result};
use crate::reference::{Phase, ReferenceCostTable};
use crate::round_to;
use crate::schema::{scenario as ids, source};

// ── Scenario and its static facts ───────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scenario {
    #[serde(rename = "5-7kg")]
    Piglet,
    #[serde(rename = "20-21kg")]
    Weaner,
    #[serde(rename = "cebo")]
    Finisher,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceUnit {
    #[serde(rename = "per-unit")]
    PerUnit,
    #[serde(rename = "per-kg-liveweight")]
    PerKgLiveweight,
}

impl PriceUnit {
    pub fn label(&self) -> &'static str {
        match self {
            Self::PerUnit => "€/unit",
            Self::PerKgLiveweight => "€/kg liveweight",
        }
    }
}

/// Share of each manual cost bucket attributed to one phase.
#[derive(Debug, Clone, Copy)]
pub struct PhaseShare {
    pub phase: Phase,
    pub feed: f64,
    pub health: f64,
    pub fixed: f64,
}

#[derive(Debug)]
pub struct ScenarioFacts {
    pub name: &'static str,
    pub sale_weight_kg: f64,
    pub price_unit: PriceUnit,
    /// Used when neither a market nor a manual price is available.
    pub standard_price: f64,
    /// Phases the animal goes through before sale, in order.
    pub phases: &'static [Phase],
    /// Label for a market-resolved price.
    pub market_source: &'static str,
    /// Manual-mode phase apportionment. Literal splits, not derived from
    /// durations or reference costs.
    pub manual_split: &'static [PhaseShare],
}

const fn share(phase: Phase, feed: f64, health: f64, fixed: f64) -> PhaseShare {
    PhaseShare {
        phase,
        feed,
        health,
        fixed,
    }
}

static FACTS: [ScenarioFacts; 3] = [
    ScenarioFacts {
        name: "Piglet sale 5-7 kg",
        sale_weight_kg: 7.0,
        price_unit: PriceUnit::PerUnit,
        // ~60% of a 20 kg weaner
        standard_price: 10.20,
        phases: &[Phase::Cria],
        market_source: source::MARKET_DERIVED,
        manual_split: &[share(Phase::Cria, 1.0, 1.0, 1.0)],
    },
    ScenarioFacts {
        name: "Weaner sale 20-21 kg",
        sale_weight_kg: 21.0,
        price_unit: PriceUnit::PerUnit,
        standard_price: 17.00,
        phases: &[Phase::Cria, Phase::Transicion],
        market_source: source::MARKET,
        manual_split: &[
            share(Phase::Cria, 0.35, 0.4, 0.4),
            share(Phase::Transicion, 0.65, 0.6, 0.6),
        ],
    },
    ScenarioFacts {
        name: "Finished pig 100-110 kg",
        sale_weight_kg: 110.0,
        price_unit: PriceUnit::PerKgLiveweight,
        standard_price: 1.00,
        phases: &[Phase::Cria, Phase::Transicion, Phase::Cebo],
        market_source: source::MARKET,
        manual_split: &[
            share(Phase::Cria, 0.1, 0.2, 0.15),
            share(Phase::Transicion, 0.2, 0.3, 0.2),
            share(Phase::Cebo, 0.7, 0.5, 0.65),
        ],
    },
];

impl Scenario {
    pub const ALL: [Scenario; 3] = [Scenario::Piglet, Scenario::Weaner, Scenario::Finisher];

    pub fn id(&self) -> &'static str {
        match self {
            Self::Piglet => ids::PIGLET,
            Self::Weaner => ids::WEANER,
            Self::Finisher => ids::FINISHER,
        }
    }

    pub fn facts(&self) -> &'static ScenarioFacts {
        &FACTS[*self as usize]
    }

    pub fn name(&self) -> &'static str {
        self.facts().name
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Scenario {
    type Err = MarginError;

    fn from_str(s: &str) -> Result<Self> {
        Scenario::ALL
            .into_iter()
            .find(|sc| sc.id() == s)
            .ok_or_else(|| MarginError::InvalidScenario(s.to_string()))
    }
}

// ── Inputs ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CostMode {
    #[default]
    Estimated,
    Manual,
}

/// Resolved market prices, in each scenario's own unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketPrices {
    /// €/unit
    pub piglet_7kg: Option<f64>,
    /// €/unit
    pub weaner_20kg: Option<f64>,
    /// €/kg liveweight
    pub finisher: Option<f64>,
}

impl MarketPrices {
    /// Usable price for `scenario`. Zero or non-finite quotes count as absent.
    pub fn for_scenario(&self, scenario: Scenario) -> Option<f64> {
        let price = match scenario {
            Scenario::Piglet => self.piglet_7kg,
            Scenario::Weaner => self.weaner_20kg,
            Scenario::Finisher => self.finisher,
        };
        price.filter(|p| p.is_finite() && *p > 0.0)
    }
}

/// Farm-specific figures, consulted only in manual cost mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManualParams {
    pub sale_price_piglet: Option<f64>,
    pub sale_price_weaner: Option<f64>,
    pub sale_price_finisher: Option<f64>,

    pub feed_cost_piglet: f64,
    pub feed_cost_weaner: f64,
    pub feed_cost_finisher: f64,

    pub health_cost_piglet: f64,
    pub health_cost_weaner: f64,
    pub health_cost_finisher: f64,

    /// Observed death rate up to the sale point, 0-100. Taken as is, not
    /// compounded per phase.
    pub mortality_pct_piglet: f64,
    pub mortality_pct_weaner: f64,
    pub mortality_pct_finisher: f64,

    /// Monthly farm overhead, €.
    pub monthly_labor: f64,
    pub monthly_energy: f64,
    pub monthly_depreciation: f64,
    pub monthly_waste_management: f64,

    pub occupancy_days_piglet: u32,
    pub occupancy_days_weaner: u32,
    pub occupancy_days_finisher: u32,

    // informational, not used by the calculation
    pub feed_conversion_piglet: f64,
    pub feed_conversion_weaner: f64,
    pub feed_conversion_finisher: f64,
}

impl Default for ManualParams {
    fn default() -> Self {
        Self {
            sale_price_piglet: None,
            sale_price_weaner: None,
            sale_price_finisher: None,
            feed_cost_piglet: 8.50,
            feed_cost_weaner: 22.00,
            feed_cost_finisher: 95.00,
            health_cost_piglet: 1.50,
            health_cost_weaner: 3.00,
            health_cost_finisher: 5.50,
            mortality_pct_piglet: 8.00,
            mortality_pct_weaner: 3.00,
            mortality_pct_finisher: 2.00,
            monthly_labor: 3500.00,
            monthly_energy: 1200.00,
            monthly_depreciation: 800.00,
            monthly_waste_management: 400.00,
            occupancy_days_piglet: 28,
            occupancy_days_weaner: 65,
            occupancy_days_finisher: 160,
            feed_conversion_piglet: 1.80,
            feed_conversion_weaner: 2.20,
            feed_conversion_finisher: 2.80,
        }
    }
}

impl ManualParams {
    pub fn monthly_overhead(&self) -> f64 {
        self.monthly_labor
            + self.monthly_energy
            + self.monthly_depreciation
            + self.monthly_waste_management
    }

    pub fn sale_price(&self, scenario: Scenario) -> Option<f64> {
        let price = match scenario {
            Scenario::Piglet => self.sale_price_piglet,
            Scenario::Weaner => self.sale_price_weaner,
            Scenario::Finisher => self.sale_price_finisher,
        };
        price.filter(|p| p.is_finite() && *p > 0.0)
    }

    fn feed_cost(&self, scenario: Scenario) -> f64 {
        match scenario {
            Scenario::Piglet => self.feed_cost_piglet,
            Scenario::Weaner => self.feed_cost_weaner,
            Scenario::Finisher => self.feed_cost_finisher,
        }
    }

    fn health_cost(&self, scenario: Scenario) -> f64 {
        match scenario {
            Scenario::Piglet => self.health_cost_piglet,
            Scenario::Weaner => self.health_cost_weaner,
            Scenario::Finisher => self.health_cost_finisher,
        }
    }

    pub fn occupancy_days(&self, scenario: Scenario) -> u32 {
        match scenario {
            Scenario::Piglet => self.occupancy_days_piglet,
            Scenario::Weaner => self.occupancy_days_weaner,
            Scenario::Finisher => self.occupancy_days_finisher,
        }
    }

    pub fn mortality_pct(&self, scenario: Scenario) -> f64 {
        match scenario {
            Scenario::Piglet => self.mortality_pct_piglet,
            Scenario::Weaner => self.mortality_pct_weaner,
            Scenario::Finisher => self.mortality_pct_finisher,
        }
    }
}

/// Everything a single scenario calculation needs besides the cost table.
#[derive(Debug, Clone, Copy)]
pub struct ScenarioInput<'a> {
    pub animal_count: u32,
    pub cost_mode: CostMode,
    /// Free finishing pen-slots. 0 disables the capacity check.
    pub available_pen_slots: u32,
    pub market: &'a MarketPrices,
    pub params: Option<&'a ManualParams>,
}

// ── Output ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub cria: f64,
    pub transicion: f64,
    pub cebo: f64,
    pub feed_total: f64,
    pub health_total: f64,
    pub fixed_total: f64,
    pub mortality_cost: f64,
}

/// Outcome of one scenario. Monetary fields are rounded to 2 decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario: Scenario,
    pub name: String,
    pub animal_count: u32,
    pub sale_weight_kg: f64,
    pub sale_price: f64,
    pub price_unit: PriceUnit,
    pub price_source: String,
    pub revenue_per_animal: f64,
    pub total_revenue: f64,
    pub costs: CostBreakdown,
    /// Production cost, before mortality.
    pub cost_per_animal: f64,
    /// `cost_per_animal` plus the mortality cost.
    pub total_cost_per_animal: f64,
    /// Over the whole starting lot, dead animals included.
    pub total_cost: f64,
    /// Cumulative over the included phases, 0-100.
    pub mortality_pct: f64,
    pub surviving_animals: u32,
    pub margin_per_animal: f64,
    pub total_margin: f64,
    pub occupancy_days: u32,
    pub margin_per_pen_slot_day: f64,
    pub return_on_cost_pct: f64,
    pub viable: bool,
    pub non_viable_reason: Option<String>,
    pub uses_estimated_costs: bool,
}

// ── Calculation ─────────────────────────────────────────────────────────────

/// `1 - Π(1 - m)` over phase death rates given as fractions.
pub fn cumulative_mortality<I: IntoIterator<Item = f64>>(rates: I) -> f64 {
    1.0 - rates.into_iter().map(|m| 1.0 - m).product::<f64>()
}

/// Unrounded per-animal cost figures for one scenario.
struct CostBasis {
    breakdown: CostBreakdown,
    cost_per_animal: f64,
    mortality: f64,
    occupancy_days: u32,
}

fn estimated_costs(scenario: Scenario, table: &ReferenceCostTable) -> CostBasis {
    let mut breakdown = CostBreakdown::default();
    let phases = scenario.facts().phases;

    for &phase in phases {
        let cost = table.phase(phase);
        match phase {
            Phase::Cria => breakdown.cria = cost.total,
            Phase::Transicion => breakdown.transicion = cost.total,
            Phase::Cebo => breakdown.cebo = cost.total,
        }
        breakdown.feed_total += cost.feed;
        breakdown.health_total += cost.health;
        breakdown.fixed_total += cost.fixed();
    }

    CostBasis {
        cost_per_animal: breakdown.cria + breakdown.transicion + breakdown.cebo,
        mortality: cumulative_mortality(phases.iter().map(|p| table.phase(*p).mortality_fraction())),
        occupancy_days: phases.iter().map(|p| table.phase(*p).duration_days).sum(),
        breakdown,
    }
}

fn manual_costs(scenario: Scenario, animal_count: u32, params: &ManualParams) -> CostBasis {
    let occupancy_days = params.occupancy_days(scenario);
    let feed = params.feed_cost(scenario);
    let health = params.health_cost(scenario);
    let fixed = if animal_count > 0 {
        params.monthly_overhead() / 30.0 / animal_count as f64 * occupancy_days as f64
    } else {
        0.0
    };

    let mut breakdown = CostBreakdown {
        feed_total: feed,
        health_total: health,
        fixed_total: fixed,
        ..CostBreakdown::default()
    };
    for s in scenario.facts().manual_split {
        let amount = feed * s.feed + health * s.health + fixed * s.fixed;
        match s.phase {
            Phase::Cria => breakdown.cria = amount,
            Phase::Transicion => breakdown.transicion = amount,
            Phase::Cebo => breakdown.cebo = amount,
        }
    }

    CostBasis {
        breakdown,
        cost_per_animal: feed + health + fixed,
        mortality: params.mortality_pct(scenario) / 100.0,
        occupancy_days,
    }
}

fn resolve_price(
    scenario: Scenario,
    input: &ScenarioInput<'_>,
    params: &ManualParams,
) -> (f64, &'static str) {
    let facts = scenario.facts();
    if let Some(price) = input.market.for_scenario(scenario) {
        return (price, facts.market_source);
    }
    if input.cost_mode == CostMode::Manual {
        if let Some(price) = params.sale_price(scenario) {
            return (price, source::MANUAL);
        }
    }
    (facts.standard_price, source::STANDARD)
}

pub fn compute_scenario(
    scenario: Scenario,
    input: &ScenarioInput<'_>,
    costs: &ReferenceCostTable,
) -> Result<ScenarioResult> {
    if input.animal_count == 0 {
        return Err(MarginError::InvalidInput(
            "animal count must be positive".into(),
        ));
    }

    let defaults = ManualParams::default();
    let params = input.params.unwrap_or(&defaults);
    let facts = scenario.facts();
    let n = input.animal_count;

    let basis = match input.cost_mode {
        CostMode::Estimated => estimated_costs(scenario, costs),
        CostMode::Manual => manual_costs(scenario, n, params),
    };
    let (price, price_source) = resolve_price(scenario, input, params);

    // Lechones are sold per head, the finisher per kg liveweight.
    let revenue_per_animal = match facts.price_unit {
        PriceUnit::PerUnit => price,
        PriceUnit::PerKgLiveweight => facts.sale_weight_kg * price,
    };

    let cost = basis.cost_per_animal;
    let surviving = (n as f64 * (1.0 - basis.mortality)).round() as u32;
    let mortality_cost = cost * basis.mortality;

    // Cost is carried by the whole lot, revenue only by survivors.
    let total_revenue = revenue_per_animal * surviving as f64;
    let total_cost = (cost + mortality_cost) * n as f64;
    let margin_per_animal = revenue_per_animal - cost - mortality_cost;
    let total_margin = total_revenue - total_cost;
    let margin_per_pen_slot_day = if basis.occupancy_days > 0 {
        margin_per_animal / basis.occupancy_days as f64
    } else {
        0.0
    };
    let return_on_cost_pct = if cost > 0.0 {
        margin_per_animal / cost * 100.0
    } else {
        0.0
    };

    let (viable, non_viable_reason) = if scenario == Scenario::Finisher
        && n > input.available_pen_slots
        && input.available_pen_slots > 0
    {
        (
            false,
            Some(format!(
                "{n} finishing pen-slots needed but only {} available",
                input.available_pen_slots
            )),
        )
    } else {
        (true, None)
    };

    debug!(
        scenario = scenario.id(),
        price,
        price_source,
        margin_per_pen_slot_day,
        viable,
        "scenario computed"
    );

    let r = |v: f64| round_to(v, 2);
    let b = &basis.breakdown;

    Ok(ScenarioResult {
        scenario,
        name: facts.name.to_string(),
        animal_count: n,
        sale_weight_kg: facts.sale_weight_kg,
        sale_price: r(price),
        price_unit: facts.price_unit,
        price_source: price_source.to_string(),
        revenue_per_animal: r(revenue_per_animal),
        total_revenue: r(total_revenue),
        costs: CostBreakdown {
            cria: r(b.cria),
            transicion: r(b.transicion),
            cebo: r(b.cebo),
            feed_total: r(b.feed_total),
            health_total: r(b.health_total),
            fixed_total: r(b.fixed_total),
            mortality_cost: r(mortality_cost),
        },
        cost_per_animal: r(cost),
        total_cost_per_animal: r(cost + mortality_cost),
        total_cost: r(total_cost),
        mortality_pct: r(basis.mortality * 100.0),
        surviving_animals: surviving,
        margin_per_animal: r(margin_per_animal),
        total_margin: r(total_margin),
        occupancy_days: basis.occupancy_days,
        margin_per_pen_slot_day: r(margin_per_pen_slot_day),
        return_on_cost_pct: r(return_on_cost_pct),
        viable,
        non_viable_reason,
        uses_estimated_costs: input.cost_mode == CostMode::Estimated,
    })
}

/// [`compute_scenario`] keyed by the textual scenario id.
pub fn compute_scenario_by_id(
    scenario_id: &str,
    input: &ScenarioInput<'_>,
    costs: &ReferenceCostTable,
) -> Result<ScenarioResult> {
    compute_scenario(scenario_id.parse()?, input, costs)
}
