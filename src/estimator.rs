//! Near-term price projection from the historical series.
//!
//! Weighted moving average over the trailing window, plus the least-squares
//! trend carried `weeks_ahead` forward, plus a monthly seasonal adjustment.
//! The reference date is an explicit input so forecasts are reproducible.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EstimatorConfig;
use crate::round_to;
use crate::series::PriceSeries;

pub const METHOD_INSUFFICIENT: &str = "insufficient data";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceEstimate {
    pub price: f64,
    pub confidence: f64,
    pub method: String,
    /// Intermediate values, absent on the insufficient-data path.
    pub components: Option<ForecastComponents>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastComponents {
    pub weighted_average: f64,
    /// Price change per week.
    pub slope: f64,
    pub seasonal_factor: f64,
    /// 0-based month the forecast lands in.
    pub target_month0: u32,
    pub window_len: usize,
}

/// Weighted mean with weight `i + 1` for the i-th value, oldest first.
pub fn linear_weighted_average(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let (sum, weights) = values
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(sum, weights), (i, v)| {
            let w = (i + 1) as f64;
            (sum + v * w, weights + w)
        });
    Some(sum / weights)
}

/// Ordinary least-squares slope of `values` against 0, 1, 2, ...
/// Returns 0 when the slope is undefined (fewer than two points).
pub fn trend_slope(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let (sum_x, sum_y, sum_xy, sum_x2) = values.iter().enumerate().fold(
        (0.0, 0.0, 0.0, 0.0),
        |(sx, sy, sxy, sx2), (i, &y)| {
            let x = i as f64;
            (sx + x, sy + y, sxy + x * y, sx2 + x * x)
        },
    );
    let denominator = n * sum_x2 - sum_x * sum_x;
    if denominator == 0.0 {
        return 0.0;
    }
    (n * sum_xy - sum_x * sum_y) / denominator
}

/// Confidence for a horizon, clamped to the configured band.
pub fn horizon_confidence(weeks_ahead: u32, config: &EstimatorConfig) -> f64 {
    let raw = config.base_confidence - weeks_ahead as f64 * config.confidence_decay_per_week;
    // max/min rather than clamp: an unvalidated band must not panic
    raw.max(config.min_confidence).min(config.max_confidence)
}

pub fn estimate_future_price(
    series: &PriceSeries,
    product: &str,
    weeks_ahead: u32,
    as_of: NaiveDate,
    config: &EstimatorConfig,
) -> PriceEstimate {
    let history = series.for_product(product);

    if config.window == 0 || history.len() < config.min_observations.max(1) {
        debug!(
            product,
            observations = history.len(),
            "not enough history to estimate, returning last price"
        );
        return PriceEstimate {
            price: history.last().map_or(0.0, |o| o.price),
            confidence: config.fallback_confidence,
            method: METHOD_INSUFFICIENT.to_string(),
            components: None,
        };
    }

    let start = history.len().saturating_sub(config.window);
    let window: Vec<f64> = history[start..].iter().map(|o| o.price).collect();

    let weighted_average = linear_weighted_average(&window).unwrap_or(0.0);
    let slope = trend_slope(&window);
    let projected = weighted_average + slope * weeks_ahead as f64;

    let target_month0 = (as_of.month0() + weeks_ahead / 4) % 12;
    let seasonal_factor = config.seasonal.factor(target_month0);
    let price = projected + projected * seasonal_factor;

    let confidence = horizon_confidence(weeks_ahead, config);

    debug!(
        product,
        weeks_ahead,
        weighted_average,
        slope,
        seasonal_factor,
        "price estimate"
    );

    PriceEstimate {
        price: round_to(price, 3),
        confidence: round_to(confidence, 2),
        method: format!(
            "weighted moving average ({} wk) + linear trend + seasonal adjustment",
            config.window
        ),
        components: Some(ForecastComponents {
            weighted_average,
            slope,
            seasonal_factor,
            target_month0,
            window_len: window.len(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::product;
    use crate::series::PriceObservation;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn weekly(prices: &[f64]) -> PriceSeries {
        let start = date(2025, 1, 2);
        PriceSeries::new(
            prices
                .iter()
                .enumerate()
                .map(|(i, &p)| {
                    PriceObservation::new(start + chrono::Duration::weeks(i as i64), p, "test", "p")
                })
                .collect(),
        )
    }

    #[test]
    fn weighted_average_favours_recent() {
        // (1*1 + 2*2 + 3*3) / 6
        let avg = linear_weighted_average(&[1.0, 2.0, 3.0]).unwrap();
        assert!((avg - 14.0 / 6.0).abs() < 1e-12);
        assert!(linear_weighted_average(&[]).is_none());
    }

    #[test]
    fn slope_of_straight_line() {
        assert!((trend_slope(&[10.0, 8.0, 6.0, 4.0]) + 2.0).abs() < 1e-12);
        assert_eq!(trend_slope(&[5.0, 5.0, 5.0]), 0.0);
        assert_eq!(trend_slope(&[5.0]), 0.0);
    }

    #[test]
    fn insufficient_history_returns_last_price() {
        let series = weekly(&[1.2, 1.3, 1.4]);
        let est = estimate_future_price(&series, "p", 4, date(2025, 3, 1), &EstimatorConfig::default());
        assert_eq!(est.price, 1.4);
        assert_eq!(est.confidence, 0.1);
        assert_eq!(est.method, METHOD_INSUFFICIENT);
        assert!(est.components.is_none());

        let none = estimate_future_price(&series, "missing", 4, date(2025, 3, 1), &EstimatorConfig::default());
        assert_eq!(none.price, 0.0);
    }

    #[test]
    fn four_observations_take_the_trend_path() {
        let series = weekly(&[1.2, 1.3, 1.4, 1.5]);
        let est = estimate_future_price(&series, "p", 4, date(2025, 3, 1), &EstimatorConfig::default());
        assert_ne!(est.method, METHOD_INSUFFICIENT);
        let c = est.components.unwrap();
        assert_eq!(c.window_len, 4);
        assert!((c.slope - 0.1).abs() < 1e-9);
        assert_eq!(est.confidence, 0.65);
    }

    #[test]
    fn unusable_settings_degrade_without_panicking() {
        let series = weekly(&[1.0; 10]);
        let inverted = EstimatorConfig {
            min_confidence: 0.9,
            max_confidence: 0.5,
            ..EstimatorConfig::default()
        };
        let est = estimate_future_price(&series, "p", 4, date(2025, 3, 1), &inverted);
        assert_eq!(est.confidence, 0.5);

        let no_window = EstimatorConfig {
            window: 0,
            ..EstimatorConfig::default()
        };
        let est = estimate_future_price(&series, "p", 4, date(2025, 3, 1), &no_window);
        assert_eq!(est.method, METHOD_INSUFFICIENT);
        assert_eq!(est.price, 1.0);
    }

    #[test]
    fn flat_series_only_moves_by_season() {
        let series = weekly(&[2.0; 10]);
        let config = EstimatorConfig::default();
        // as_of January, 8 weeks ahead -> March (+1%)
        let est = estimate_future_price(&series, "p", 8, date(2026, 1, 15), &config);
        let c = est.components.as_ref().unwrap();
        assert_eq!(c.target_month0, 2);
        assert_eq!(c.window_len, 8);
        assert_eq!(c.slope, 0.0);
        assert_eq!(est.price, 2.02);
        assert_eq!(est.confidence, 0.45);
    }

    #[test]
    fn only_the_trailing_window_counts() {
        let mut prices = vec![100.0; 5];
        prices.extend([1.0; 8]);
        let series = weekly(&prices);
        let est = estimate_future_price(&series, "p", 0, date(2026, 3, 1), &EstimatorConfig::default());
        let c = est.components.unwrap();
        assert_eq!(c.weighted_average, 1.0);
        assert_eq!(c.slope, 0.0);
    }

    #[test]
    fn target_month_wraps_year_end() {
        let series = weekly(&[1.0; 8]);
        let est = estimate_future_price(&series, "p", 12, date(2025, 11, 20), &EstimatorConfig::default());
        assert_eq!(est.components.unwrap().target_month0, 1);
    }

    #[test]
    fn confidence_shrinks_with_horizon() {
        let config = EstimatorConfig::default();
        let series = PriceSeries::reference();
        let as_of = date(2026, 2, 10);
        let near = estimate_future_price(&series, product::FINISHER, 4, as_of, &config);
        let mid = estimate_future_price(&series, product::FINISHER, 8, as_of, &config);
        let far = estimate_future_price(&series, product::FINISHER, 16, as_of, &config);
        assert!(near.confidence > mid.confidence);
        assert!(mid.confidence > far.confidence);
        assert_eq!(near.confidence, 0.65);
        assert_eq!(far.confidence, 0.10);
        assert_eq!(horizon_confidence(0, &config), 0.85);
    }
}
