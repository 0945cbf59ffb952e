use chrono::{Datelike, NaiveDate};
use uuid::Uuid;

use crate::error::{MarginError, Result};
use crate::round_to;
use crate::scenario::{PriceUnit, Scenario};

/// Total price of an offer, rounded to cents.
///
/// Lechon tiers are priced per head; the finisher per kg liveweight, so its
/// total also scales with the estimated weight.
pub fn offer_total_price(
    scenario: Scenario,
    unit_price: f64,
    estimated_weight_kg: f64,
    animal_count: u32,
) -> Result<f64> {
    if !(unit_price.is_finite() && unit_price >= 0.0) {
        return Err(MarginError::InvalidInput(format!(
            "unit price must be non-negative, got {unit_price}"
        )));
    }

    let total = match scenario.facts().price_unit {
        PriceUnit::PerUnit => unit_price * animal_count as f64,
        PriceUnit::PerKgLiveweight => {
            if !(estimated_weight_kg.is_finite() && estimated_weight_kg > 0.0) {
                return Err(MarginError::InvalidInput(format!(
                    "estimated weight must be positive, got {estimated_weight_kg}"
                )));
            }
            unit_price * estimated_weight_kg * animal_count as f64
        }
    };
    Ok(round_to(total, 2))
}

/// Offer reference of the form `VP-YYMM-XXXXXX`.
pub fn offer_code(as_of: NaiveDate) -> String {
    let suffix: String = Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(6)
        .collect::<String>()
        .to_uppercase();
    format!(
        "VP-{:02}{:02}-{}",
        as_of.year().rem_euclid(100),
        as_of.month(),
        suffix
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lechon_totals_ignore_weight() {
        assert_eq!(offer_total_price(Scenario::Piglet, 10.20, 7.0, 500).unwrap(), 5100.00);
        assert_eq!(offer_total_price(Scenario::Weaner, 17.00, 21.0, 333).unwrap(), 5661.00);
    }

    #[test]
    fn finisher_total_scales_with_weight() {
        assert_eq!(
            offer_total_price(Scenario::Finisher, 1.255, 108.5, 120).unwrap(),
            16340.10
        );
        assert!(offer_total_price(Scenario::Finisher, 1.0, 0.0, 10).is_err());
    }

    #[test]
    fn totals_have_two_decimals() {
        let total = offer_total_price(Scenario::Piglet, 10.333, 7.0, 3).unwrap();
        assert_eq!(total, 31.0);
        let total = offer_total_price(Scenario::Finisher, 1.111, 100.0, 7).unwrap();
        assert_eq!(total, 777.70);
    }

    #[test]
    fn rejects_negative_price() {
        assert!(matches!(
            offer_total_price(Scenario::Piglet, -1.0, 7.0, 1),
            Err(MarginError::InvalidInput(_))
        ));
    }

    #[test]
    fn code_format() {
        let code = offer_code(NaiveDate::from_ymd_opt(2026, 3, 4).unwrap());
        assert!(code.starts_with("VP-2603-"), "{code}");
        let suffix = &code[8..];
        assert_eq!(suffix.len(), 6);
        assert!(suffix
            .chars()
            .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));
    }
}
