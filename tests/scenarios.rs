use swine_margin::{
    compute_scenario, compute_scenario_by_id, recommend, CostMode, MarginError, MarketPrices,
    ReferenceCostTable, Scenario, ScenarioInput, ScenarioResult,
};

fn run_all(animals: u32, slots: u32, market: &MarketPrices) -> Vec<ScenarioResult> {
    let input = ScenarioInput {
        animal_count: animals,
        cost_mode: CostMode::Estimated,
        available_pen_slots: slots,
        market,
        params: None,
    };
    let table = ReferenceCostTable::default();
    Scenario::ALL
        .iter()
        .map(|s| compute_scenario(*s, &input, &table).unwrap())
        .collect()
}

#[test]
fn standard_figures_for_a_lot_of_500() {
    let results = run_all(500, 0, &MarketPrices::default());

    let piglet = &results[0];
    assert_eq!(piglet.scenario, Scenario::Piglet);
    assert_eq!(piglet.surviving_animals, 460);
    assert_eq!(piglet.margin_per_animal, 0.48);
    assert_eq!(piglet.margin_per_pen_slot_day, 0.02);
    assert_eq!(piglet.total_margin, -168.00);

    let weaner = &results[1];
    assert_eq!(weaner.margin_per_pen_slot_day, -0.20);

    let finisher = &results[2];
    assert_eq!(finisher.cost_per_animal, 123.00);
    assert_eq!(finisher.occupancy_days, 185);
    assert_eq!(finisher.margin_per_pen_slot_day, -0.15);
}

#[test]
fn revenue_is_carried_by_survivors_only() {
    let market = MarketPrices {
        piglet_7kg: Some(11.0),
        weaner_20kg: Some(19.5),
        finisher: Some(1.25),
    };
    for r in run_all(321, 0, &market) {
        let expected = r.revenue_per_animal * r.surviving_animals as f64;
        assert!(
            (r.total_revenue - expected).abs() < 0.01 * r.surviving_animals as f64,
            "{}",
            r.scenario
        );
        assert!(r.surviving_animals < r.animal_count);
    }
}

#[test]
fn recommends_piglets_when_finishing_capacity_is_short() {
    let results = run_all(500, 300, &MarketPrices::default());
    assert!(!results[2].viable);

    let rec = recommend(&results, 300);
    assert_eq!(rec.recommended, Some(Scenario::Piglet));
    assert_eq!(rec.recommended_id(), "5-7kg");
    assert_eq!(rec.confidence, 0.8);
    assert_eq!(rec.alternative, Some(Scenario::Weaner));
    assert!(!rec.factors.is_empty());
}

#[test]
fn nothing_viable_recommends_none() {
    let mut results = run_all(500, 0, &MarketPrices::default());
    for r in &mut results {
        r.viable = false;
    }
    let rec = recommend(&results, 0);
    assert_eq!(rec.recommended, None);
    assert_eq!(rec.recommended_id(), "none");
    assert_eq!(rec.confidence, 0.0);
    assert!(rec.alternative.is_none());
}

#[test]
fn unknown_scenario_id_is_rejected() {
    let market = MarketPrices::default();
    let input = ScenarioInput {
        animal_count: 10,
        cost_mode: CostMode::Estimated,
        available_pen_slots: 0,
        market: &market,
        params: None,
    };
    let err = compute_scenario_by_id("30kg", &input, &ReferenceCostTable::default()).unwrap_err();
    assert!(matches!(err, MarginError::InvalidScenario(ref id) if id == "30kg"));
}
