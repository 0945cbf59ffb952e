//! Historical price series: dated weekly observations per product.
//!
//! The series is append-only reference data. It can be loaded from a CSV file
//! (columns `date,price,source,product`) or taken from the built-in
//! Mercolleida / Lonja Barcelona reference figures.

use std::collections::BTreeSet;
use std::path::Path;

use chrono::{Months, NaiveDate};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{MarginError, Result};
use crate::schema::{history, product};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    pub date: NaiveDate,
    pub price: f64,
    pub source: String,
    pub product: String,
}

impl PriceObservation {
    pub fn new(date: NaiveDate, price: f64, source: &str, product: &str) -> Self {
        Self {
            date,
            price,
            source: source.to_string(),
            product: product.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    observations: Vec<PriceObservation>,
}

impl PriceSeries {
    pub fn new(observations: Vec<PriceObservation>) -> Self {
        Self { observations }
    }

    pub fn push(&mut self, observation: PriceObservation) {
        self.observations.push(observation);
    }

    pub fn extend<I: IntoIterator<Item = PriceObservation>>(&mut self, observations: I) {
        self.observations.extend(observations);
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn observations(&self) -> &[PriceObservation] {
        &self.observations
    }

    /// Distinct product keys, sorted.
    pub fn products(&self) -> Vec<String> {
        self.observations
            .iter()
            .map(|o| o.product.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Observations for `product`, oldest first. Equal dates keep insertion order.
    pub fn for_product(&self, product: &str) -> Vec<&PriceObservation> {
        let mut rows: Vec<&PriceObservation> = self
            .observations
            .iter()
            .filter(|o| o.product == product)
            .collect();
        rows.sort_by_key(|o| o.date);
        rows
    }

    /// Most recent observation for `product`.
    pub fn latest(&self, product: &str) -> Option<&PriceObservation> {
        self.for_product(product).last().copied()
    }

    /// Observations for `product` oldest first, optionally restricted to the
    /// `months` calendar months before `as_of`.
    pub fn history(
        &self,
        product: &str,
        months: Option<u32>,
        as_of: NaiveDate,
    ) -> Vec<&PriceObservation> {
        let cutoff = months.and_then(|m| as_of.checked_sub_months(Months::new(m)));
        self.for_product(product)
            .into_iter()
            .filter(|o| cutoff.map_or(true, |c| o.date >= c))
            .collect()
    }

    // ── CSV / DataFrame ─────────────────────────────────────────────────────

    /// Load a price-history CSV. All columns are read as strings, then parsed.
    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0)) // all columns as String
            .try_into_reader_with_file_path(Some(path.clone()))?
            .finish()?;

        // Trim whitespace from column names
        let trimmed: Vec<String> = df
            .get_column_names_str()
            .iter()
            .map(|c| c.trim().to_string())
            .collect();
        df.set_column_names(trimmed.as_slice())?;

        let series = Self::from_frame(&df)?;
        info!(
            path = %path.display(),
            rows = series.len(),
            "loaded price history"
        );
        Ok(series)
    }

    /// Build a series from a string-typed DataFrame with the history columns.
    pub fn from_frame(df: &DataFrame) -> Result<Self> {
        for &name in history::ALL.iter() {
            if df.column(name).is_err() {
                return Err(MarginError::MissingColumn(name.to_string()));
            }
        }

        let dates = df.column(history::DATE)?.str()?;
        let prices = df.column(history::PRICE)?.str()?;
        let sources = df.column(history::SOURCE)?.str()?;
        let products = df.column(history::PRODUCT)?.str()?;

        let mut observations = Vec::with_capacity(df.height());
        for i in 0..df.height() {
            let (Some(date), Some(price), Some(product)) =
                (dates.get(i), prices.get(i), products.get(i))
            else {
                debug!(row = i, "skipping incomplete price row");
                continue;
            };

            let date = NaiveDate::parse_from_str(date.trim(), history::DATE_FORMAT)
                .map_err(|e| MarginError::InvalidData(format!("row {i}: date '{date}': {e}")))?;
            let price: f64 = price
                .trim()
                .replace(',', ".")
                .parse()
                .map_err(|e| MarginError::InvalidData(format!("row {i}: price '{price}': {e}")))?;
            if !(price.is_finite() && price > 0.0) {
                return Err(MarginError::InvalidData(format!(
                    "row {i}: price must be positive, got {price}"
                )));
            }

            observations.push(PriceObservation {
                date,
                price,
                source: sources.get(i).unwrap_or("").trim().to_string(),
                product: product.trim().to_string(),
            });
        }

        Ok(Self { observations })
    }

    /// DataFrame view with dates rendered as ISO strings.
    pub fn to_frame(&self) -> Result<DataFrame> {
        let dates: Vec<String> = self
            .observations
            .iter()
            .map(|o| o.date.format(history::DATE_FORMAT).to_string())
            .collect();
        let prices: Vec<f64> = self.observations.iter().map(|o| o.price).collect();
        let sources: Vec<&str> = self.observations.iter().map(|o| o.source.as_str()).collect();
        let products: Vec<&str> = self
            .observations
            .iter()
            .map(|o| o.product.as_str())
            .collect();

        let df = df!(
            history::DATE => dates,
            history::PRICE => prices,
            history::SOURCE => sources,
            history::PRODUCT => products
        )?;
        Ok(df)
    }

    // ── Built-in reference data ─────────────────────────────────────────────

    /// Last known Mercolleida / Lonja Barcelona quotes, used whenever live
    /// data is unavailable.
    pub fn reference() -> Self {
        const MERCOLLEIDA: &str = "Mercolleida";
        const LONJA_BCN: &str = "Lonja Barcelona";

        // Weekly, Thursdays from 2025-06-05.
        const FINISHER: [f64; 36] = [
            1.555, 1.545, 1.520, 1.490, 1.460, 1.430, 1.400, 1.380, 1.350, 1.330, 1.310, 1.290,
            1.270, 1.250, 1.230, 1.210, 1.195, 1.180, 1.165, 1.150, 1.140, 1.125, 1.110, 1.095,
            1.080, 1.065, 1.050, 1.040, 1.030, 1.020, 1.010, 1.000, 1.000, 1.000, 1.000, 1.000,
        ];
        const WEANER: [f64; 36] = [
            57.0, 57.0, 54.0, 51.0, 48.0, 45.0, 42.0, 40.0, 38.0, 36.0, 34.0, 32.0, 30.0, 28.0,
            27.0, 26.0, 25.0, 24.0, 23.0, 22.0, 22.0, 21.0, 20.0, 19.0, 18.0, 18.0, 17.0, 17.0,
            16.0, 16.0, 15.0, 15.0, 15.0, 16.0, 16.0, 17.0,
        ];
        // €/tonne, monthly from 2025-09-01.
        const FEED: [f64; 6] = [285.0, 290.0, 295.0, 298.0, 302.0, 305.0];

        let mut observations = Vec::with_capacity(FINISHER.len() + WEANER.len() + FEED.len());

        let first_week = NaiveDate::from_ymd_opt(2025, 6, 5).unwrap_or_default();
        for (week, (&finisher, &weaner)) in FINISHER.iter().zip(WEANER.iter()).enumerate() {
            let date = first_week + chrono::Duration::weeks(week as i64);
            observations.push(PriceObservation::new(date, finisher, MERCOLLEIDA, product::FINISHER));
            observations.push(PriceObservation::new(date, weaner, MERCOLLEIDA, product::WEANER_20KG));
        }

        let first_month = NaiveDate::from_ymd_opt(2025, 9, 1).unwrap_or_default();
        for (month, &price) in FEED.iter().enumerate() {
            let date = first_month
                .checked_add_months(Months::new(month as u32))
                .unwrap_or(first_month);
            observations.push(PriceObservation::new(
                date,
                price,
                LONJA_BCN,
                product::FINISHING_FEED,
            ));
        }

        Self { observations }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn reference_series_shape() {
        let series = PriceSeries::reference();
        assert_eq!(series.for_product(product::FINISHER).len(), 36);
        assert_eq!(series.for_product(product::WEANER_20KG).len(), 36);
        assert_eq!(series.for_product(product::FINISHING_FEED).len(), 6);

        let last = series.latest(product::FINISHER).unwrap();
        assert_eq!(last.date, date(2026, 2, 5));
        assert_eq!(last.price, 1.000);

        let feed = series.latest(product::FINISHING_FEED).unwrap();
        assert_eq!(feed.date, date(2026, 2, 1));
        assert_eq!(feed.price, 305.0);
    }

    #[test]
    fn for_product_sorts_out_of_order_appends() {
        let mut series = PriceSeries::default();
        series.push(PriceObservation::new(date(2025, 3, 13), 3.0, "x", "p"));
        series.push(PriceObservation::new(date(2025, 3, 6), 2.0, "x", "p"));
        series.push(PriceObservation::new(date(2025, 2, 27), 1.0, "x", "p"));
        series.push(PriceObservation::new(date(2025, 3, 6), 9.0, "x", "other"));

        let prices: Vec<f64> = series.for_product("p").iter().map(|o| o.price).collect();
        assert_eq!(prices, vec![1.0, 2.0, 3.0]);
        assert_eq!(series.products(), vec!["other".to_string(), "p".to_string()]);
    }

    #[test]
    fn history_window_in_months() {
        let series = PriceSeries::reference();
        let all = series.history(product::FINISHER, None, date(2026, 2, 10));
        assert_eq!(all.len(), 36);

        let recent = series.history(product::FINISHER, Some(1), date(2026, 2, 10));
        assert!(recent.iter().all(|o| o.date >= date(2026, 1, 10)));
        assert_eq!(recent.len(), 4);
    }

    #[test]
    fn frame_round_trip_keeps_rows() {
        let series = PriceSeries::reference();
        let df = series.to_frame().unwrap();
        assert_eq!(df.height(), series.len());
        // Price column is numeric in the export; re-import expects strings.
        let prices = df.column(history::PRICE).unwrap().f64().unwrap();
        assert_eq!(prices.get(0), Some(1.555));
    }

    #[test]
    fn missing_column_is_reported() {
        let df = df!(
            history::DATE => ["2025-01-02"],
            history::PRICE => ["1.0"]
        )
        .unwrap();
        match PriceSeries::from_frame(&df) {
            Err(MarginError::MissingColumn(c)) => assert_eq!(c, history::SOURCE),
            other => panic!("expected MissingColumn, got {other:?}"),
        }
    }

    #[test]
    fn rejects_non_positive_price() {
        let df = df!(
            history::DATE => ["2025-01-02"],
            history::PRICE => ["0"],
            history::SOURCE => ["x"],
            history::PRODUCT => ["p"]
        )
        .unwrap();
        assert!(matches!(
            PriceSeries::from_frame(&df),
            Err(MarginError::InvalidData(_))
        ));
    }
}
