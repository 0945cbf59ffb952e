/// Column-name and key constants for swine-margin.
/// Single source of truth - exported to Python via PyO3.

// ── Price history columns ───────────────────────────────────────────────────
pub mod history {
    pub const DATE: &str = "date";
    pub const PRICE: &str = "price";
    pub const SOURCE: &str = "source";
    pub const PRODUCT: &str = "product";

    pub const ALL: [&str; 4] = [DATE, PRICE, SOURCE, PRODUCT];

    /// ISO calendar date, weekly granularity.
    pub const DATE_FORMAT: &str = "%Y-%m-%d";
}

// ── Product keys ────────────────────────────────────────────────────────────
pub mod product {
    /// Finished pig, €/kg liveweight.
    pub const FINISHER: &str = "cerdo_cebado";
    /// 20 kg weaner, €/unit.
    pub const WEANER_20KG: &str = "lechon_20kg";
    /// 5-7 kg piglet, €/unit. Never quoted directly, derived from the weaner.
    pub const PIGLET_7KG: &str = "lechon_5_7kg";
    /// Finishing feed, €/tonne.
    pub const FINISHING_FEED: &str = "pienso_cebo";
}

// ── Scenario ids ────────────────────────────────────────────────────────────
pub mod scenario {
    pub const PIGLET: &str = "5-7kg";
    pub const WEANER: &str = "20-21kg";
    pub const FINISHER: &str = "cebo";
    pub const NONE: &str = "none";

    pub const ALL: [&str; 3] = [PIGLET, WEANER, FINISHER];
}

// ── Price source labels ─────────────────────────────────────────────────────
pub mod source {
    pub const MARKET: &str = "Market (Mercolleida)";
    pub const MARKET_DERIVED: &str = "Market (estimated from Mercolleida reference)";
    pub const MANUAL: &str = "Manual parameters";
    pub const STANDARD: &str = "Sector standard";
}
