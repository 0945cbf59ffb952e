//! Market quotes and their resolution into per-scenario prices.
//!
//! Live price fetching belongs to the host; it plugs in through
//! [`PriceSource`]. Whatever it returns (or fails to return), the engine can
//! always fall back to quotes derived from the reference price series.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::round_to;
use crate::scenario::MarketPrices;
use crate::schema::product;
use crate::series::PriceSeries;

/// Share of a 20 kg weaner's price fetched by a 5-7 kg piglet.
pub const PIGLET_TO_WEANER_RATIO: f64 = 0.60;

const CACHE_VALIDITY_MINUTES: i64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Rising,
    Falling,
    Stable,
}

impl Trend {
    /// Classify a week-on-week change against a dead band of `±threshold`.
    pub fn from_variation(variation: f64, threshold: f64) -> Self {
        if variation > threshold {
            Self::Rising
        } else if variation < -threshold {
            Self::Falling
        } else {
            Self::Stable
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketQuote {
    /// Product key, see [`crate::schema::product`].
    pub product: String,
    pub label: String,
    pub source: String,
    pub market: String,
    pub price: f64,
    pub unit: String,
    pub date: NaiveDate,
    pub variation: Option<f64>,
    pub trend: Option<Trend>,
}

/// Anything able to produce current quotes.
pub trait PriceSource {
    fn quotes(&self, as_of: DateTime<Utc>) -> Result<Vec<MarketQuote>>;
}

impl MarketPrices {
    /// Pick the three scenario prices out of a quote list. Later quotes for
    /// the same product win.
    pub fn from_quotes(quotes: &[MarketQuote]) -> Self {
        let mut prices = MarketPrices::default();
        for q in quotes {
            match q.product.as_str() {
                product::FINISHER => prices.finisher = Some(q.price),
                product::WEANER_20KG => prices.weaner_20kg = Some(q.price),
                product::PIGLET_7KG => prices.piglet_7kg = Some(q.price),
                _ => {}
            }
        }
        prices
    }

    /// Apply user quick overrides on top of the market.
    pub fn with_overrides(mut self, overrides: &PriceOverrides) -> Self {
        if let Some(p) = overrides.piglet_per_unit {
            self.piglet_7kg = Some(p);
        }
        if let Some(p) = overrides.weaner_per_kg {
            self.weaner_20kg = Some(p * WEANER_REFERENCE_KG);
        }
        if let Some(p) = overrides.finisher_per_kg {
            self.finisher = Some(p);
        }
        self
    }
}

/// Weight the 20 kg weaner quote refers to.
const WEANER_REFERENCE_KG: f64 = 20.0;

/// Prices typed in by the user for a quick what-if.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceOverrides {
    /// €/unit
    pub piglet_per_unit: Option<f64>,
    /// €/kg, converted to €/unit of a 20 kg weaner.
    pub weaner_per_kg: Option<f64>,
    /// €/kg liveweight
    pub finisher_per_kg: Option<f64>,
}

// ── Reference fallback ──────────────────────────────────────────────────────

/// Quotes derived from the last known reference observations.
#[derive(Debug, Clone, Copy)]
pub struct ReferencePriceSource<'a> {
    series: &'a PriceSeries,
}

impl<'a> ReferencePriceSource<'a> {
    pub fn new(series: &'a PriceSeries) -> Self {
        Self { series }
    }

    /// Latest price, its change from the previous week and the trend.
    fn latest_with_variation(
        &self,
        key: &str,
        decimals: i32,
        threshold: f64,
    ) -> Option<(f64, NaiveDate, f64, Trend)> {
        let history = self.series.for_product(key);
        let last = history.last()?;
        let variation = match history.len() {
            n if n >= 2 => last.price - history[n - 2].price,
            _ => 0.0,
        };
        Some((
            last.price,
            last.date,
            round_to(variation, decimals),
            Trend::from_variation(variation, threshold),
        ))
    }

    pub fn reference_quotes(&self) -> Vec<MarketQuote> {
        let mut quotes = Vec::new();

        if let Some((price, date, variation, trend)) =
            self.latest_with_variation(product::FINISHER, 3, 0.005)
        {
            quotes.push(MarketQuote {
                product: product::FINISHER.to_string(),
                label: "Finished pig (100-110 kg)".to_string(),
                source: "Mercolleida (ref.)".to_string(),
                market: "Spain".to_string(),
                price,
                unit: "€/kg liveweight".to_string(),
                date,
                variation: Some(variation),
                trend: Some(trend),
            });
        }

        if let Some((price, date, variation, trend)) =
            self.latest_with_variation(product::WEANER_20KG, 2, 0.5)
        {
            quotes.push(MarketQuote {
                product: product::WEANER_20KG.to_string(),
                label: "Weaner 20 kg".to_string(),
                source: "Mercolleida (ref.)".to_string(),
                market: "Spain".to_string(),
                price,
                unit: "€/unit 20 kg".to_string(),
                date,
                variation: Some(variation),
                trend: Some(trend),
            });
            quotes.push(MarketQuote {
                product: product::PIGLET_7KG.to_string(),
                label: "Piglet 5-7 kg".to_string(),
                source: "Estimated (ref. Mercolleida)".to_string(),
                market: "Spain".to_string(),
                price: round_to(price * PIGLET_TO_WEANER_RATIO, 2),
                unit: "€/unit".to_string(),
                date,
                variation: None,
                trend: Some(trend),
            });
        }

        if let Some(feed) = self.series.latest(product::FINISHING_FEED) {
            quotes.push(MarketQuote {
                product: product::FINISHING_FEED.to_string(),
                label: "Finishing feed".to_string(),
                source: "Lonja Barcelona (ref.)".to_string(),
                market: "Spain".to_string(),
                price: feed.price,
                unit: "€/tonne".to_string(),
                date: feed.date,
                variation: None,
                trend: Some(Trend::Rising),
            });
        }

        quotes
    }
}

impl PriceSource for ReferencePriceSource<'_> {
    fn quotes(&self, _as_of: DateTime<Utc>) -> Result<Vec<MarketQuote>> {
        Ok(self.reference_quotes())
    }
}

/// Tries `primary`, falls back to reference quotes when it errors or comes
/// back empty. Never fails.
pub struct FallbackPriceSource<'a, P> {
    primary: P,
    reference: ReferencePriceSource<'a>,
}

impl<'a, P: PriceSource> FallbackPriceSource<'a, P> {
    pub fn new(primary: P, series: &'a PriceSeries) -> Self {
        Self {
            primary,
            reference: ReferencePriceSource::new(series),
        }
    }

    pub fn current_quotes(&self, as_of: DateTime<Utc>) -> Vec<MarketQuote> {
        match self.primary.quotes(as_of) {
            Ok(quotes) if !quotes.is_empty() => quotes,
            Ok(_) => {
                debug!("primary price source returned nothing, using reference quotes");
                self.reference.reference_quotes()
            }
            Err(e) => {
                warn!(error = %e, "primary price source failed, using reference quotes");
                self.reference.reference_quotes()
            }
        }
    }
}

impl<P: PriceSource> PriceSource for FallbackPriceSource<'_, P> {
    fn quotes(&self, as_of: DateTime<Utc>) -> Result<Vec<MarketQuote>> {
        Ok(self.current_quotes(as_of))
    }
}

/// Keeps the last non-empty quote list for one hour of the caller's clock.
#[derive(Debug)]
pub struct CachedPriceSource<S> {
    inner: S,
    validity: Duration,
    cached: Option<(DateTime<Utc>, Vec<MarketQuote>)>,
}

impl<S: PriceSource> CachedPriceSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            validity: Duration::minutes(CACHE_VALIDITY_MINUTES),
            cached: None,
        }
    }

    pub fn quotes(&mut self, now: DateTime<Utc>) -> Result<Vec<MarketQuote>> {
        if let Some((fetched_at, quotes)) = &self.cached {
            if now - *fetched_at < self.validity {
                debug!("price cache hit");
                return Ok(quotes.clone());
            }
        }

        let quotes = self.inner.quotes(now)?;
        if !quotes.is_empty() {
            self.cached = Some((now, quotes.clone()));
        }
        Ok(quotes)
    }

    pub fn invalidate(&mut self) {
        self.cached = None;
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use chrono::TimeZone;

    use super::*;
    use crate::error::MarginError;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 10, 9, 0, 0).unwrap()
    }

    struct Failing;

    impl PriceSource for Failing {
        fn quotes(&self, _: DateTime<Utc>) -> Result<Vec<MarketQuote>> {
            Err(MarginError::InvalidData("scrape failed".into()))
        }
    }

    struct Counting<'a> {
        calls: &'a Cell<u32>,
        series: &'a PriceSeries,
    }

    impl PriceSource for Counting<'_> {
        fn quotes(&self, _: DateTime<Utc>) -> Result<Vec<MarketQuote>> {
            self.calls.set(self.calls.get() + 1);
            Ok(ReferencePriceSource::new(self.series).reference_quotes())
        }
    }

    #[test]
    fn reference_quotes_from_latest_observations() {
        let series = PriceSeries::reference();
        let quotes = ReferencePriceSource::new(&series).reference_quotes();
        assert_eq!(quotes.len(), 4);

        let finisher = &quotes[0];
        assert_eq!(finisher.price, 1.000);
        assert_eq!(finisher.variation, Some(0.0));
        assert_eq!(finisher.trend, Some(Trend::Stable));

        let weaner = &quotes[1];
        assert_eq!(weaner.price, 17.0);
        assert_eq!(weaner.variation, Some(1.0));
        assert_eq!(weaner.trend, Some(Trend::Rising));

        let piglet = &quotes[2];
        assert_eq!(piglet.product, product::PIGLET_7KG);
        assert_eq!(piglet.price, 10.20);

        assert_eq!(quotes[3].price, 305.0);
    }

    #[test]
    fn resolves_scenario_prices_from_quotes() {
        let series = PriceSeries::reference();
        let quotes = ReferencePriceSource::new(&series).reference_quotes();
        let prices = MarketPrices::from_quotes(&quotes);
        assert_eq!(prices.finisher, Some(1.0));
        assert_eq!(prices.weaner_20kg, Some(17.0));
        assert_eq!(prices.piglet_7kg, Some(10.20));
    }

    #[test]
    fn overrides_replace_market() {
        let prices = MarketPrices {
            finisher: Some(1.0),
            weaner_20kg: Some(17.0),
            piglet_7kg: Some(10.2),
        }
        .with_overrides(&PriceOverrides {
            piglet_per_unit: Some(12.0),
            weaner_per_kg: Some(1.10),
            finisher_per_kg: None,
        });
        assert_eq!(prices.piglet_7kg, Some(12.0));
        assert!((prices.weaner_20kg.unwrap() - 22.0).abs() < 1e-9);
        assert_eq!(prices.finisher, Some(1.0));
    }

    #[test]
    fn trend_dead_band() {
        assert_eq!(Trend::from_variation(0.004, 0.005), Trend::Stable);
        assert_eq!(Trend::from_variation(-0.006, 0.005), Trend::Falling);
        assert_eq!(Trend::from_variation(0.6, 0.5), Trend::Rising);
    }

    #[test]
    fn failing_source_falls_back() {
        let series = PriceSeries::reference();
        let source = FallbackPriceSource::new(Failing, &series);
        let quotes = source.current_quotes(now());
        assert_eq!(quotes.len(), 4);
        assert!(quotes[0].source.contains("ref."));
    }

    #[test]
    fn empty_series_gives_no_quotes() {
        let series = PriceSeries::default();
        let source = FallbackPriceSource::new(Failing, &series);
        assert!(source.current_quotes(now()).is_empty());
        assert_eq!(MarketPrices::from_quotes(&[]), MarketPrices::default());
    }

    #[test]
    fn cache_expires_after_an_hour() {
        let series = PriceSeries::reference();
        let calls = Cell::new(0);
        let mut cached = CachedPriceSource::new(Counting {
            calls: &calls,
            series: &series,
        });

        cached.quotes(now()).unwrap();
        cached.quotes(now() + Duration::minutes(59)).unwrap();
        assert_eq!(calls.get(), 1);

        cached.quotes(now() + Duration::minutes(61)).unwrap();
        assert_eq!(calls.get(), 2);

        cached.invalidate();
        cached.quotes(now() + Duration::minutes(62)).unwrap();
        assert_eq!(calls.get(), 3);
    }
}
