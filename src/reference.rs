//! Standard sector cost table, one entry per growth phase.
//!
//! Figures are €/animal for the whole phase. The table is plain data handed to
//! the calculator through [`crate::config::EngineConfig`]; nothing mutates it.

use serde::{Deserialize, Serialize};

/// Growth phases, in lifecycle order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Farrowing and suckling, 0-7 kg.
    Cria,
    /// Nursery, 7-21 kg.
    Transicion,
    /// Finishing, 21-110 kg.
    Cebo,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Cria, Phase::Transicion, Phase::Cebo];
}

/// Per-animal cost of one phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseCost {
    pub feed: f64,
    pub health: f64,
    pub labor: f64,
    pub energy: f64,
    pub depreciation: f64,
    pub waste_management: f64,
    pub other: f64,
    /// Stated total. Must equal [`PhaseCost::component_sum`].
    pub total: f64,
    /// Phase death rate, 0-100.
    pub mortality_pct: f64,
    pub duration_days: u32,
}

impl PhaseCost {
    pub fn component_sum(&self) -> f64 {
        self.feed
            + self.health
            + self.labor
            + self.energy
            + self.depreciation
            + self.waste_management
            + self.other
    }

    /// Everything that is neither feed nor health.
    pub fn fixed(&self) -> f64 {
        self.labor + self.energy + self.depreciation + self.waste_management + self.other
    }

    pub fn mortality_fraction(&self) -> f64 {
        self.mortality_pct / 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceCostTable {
    pub cria: PhaseCost,
    pub transicion: PhaseCost,
    pub cebo: PhaseCost,
}

impl ReferenceCostTable {
    pub fn phase(&self, phase: Phase) -> &PhaseCost {
        match phase {
            Phase::Cria => &self.cria,
            Phase::Transicion => &self.transicion,
            Phase::Cebo => &self.cebo,
        }
    }

    pub fn full_cycle_total(&self) -> f64 {
        Phase::ALL.iter().map(|p| self.phase(*p).total).sum()
    }

    pub fn full_cycle_days(&self) -> u32 {
        Phase::ALL.iter().map(|p| self.phase(*p).duration_days).sum()
    }
}

impl Default for ReferenceCostTable {
    fn default() -> Self {
        Self {
            cria: PhaseCost {
                // 2.80 sow feed share + 1.20 pre-starter
                feed: 4.00,
                health: 1.50,
                labor: 2.00,
                energy: 1.00,
                depreciation: 0.0,
                waste_management: 0.0,
                other: 0.50,
                total: 9.00,
                mortality_pct: 8.0,
                duration_days: 28,
            },
            transicion: PhaseCost {
                feed: 12.50,
                health: 2.50,
                labor: 1.80,
                energy: 0.80,
                depreciation: 0.0,
                waste_management: 0.0,
                other: 0.40,
                total: 18.00,
                mortality_pct: 3.0,
                duration_days: 37,
            },
            cebo: PhaseCost {
                // feed conversion ~2.8
                feed: 78.00,
                health: 4.50,
                labor: 5.00,
                energy: 2.50,
                depreciation: 3.00,
                waste_management: 2.00,
                other: 1.00,
                total: 96.00,
                mortality_pct: 2.0,
                duration_days: 120,
            },
        }
    }
}
