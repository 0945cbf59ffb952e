use chrono::{NaiveDate, Utc};
use pyo3::prelude::*;
use pyo3::types::PyModule;
use pyo3_polars::PyDataFrame;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::EngineConfig;
use crate::engine::{evaluate, EvaluationRequest};
use crate::error::MarginError;
use crate::estimator::estimate_future_price;
use crate::market::{MarketQuote, ReferencePriceSource};
use crate::offer;
use crate::scenario::{
    compute_scenario_by_id, CostMode, ManualParams, MarketPrices, Scenario, ScenarioInput,
};
use crate::schema;
use crate::series::PriceSeries;

fn to_py<T: Serialize>(py: Python<'_>, value: &T) -> PyResult<PyObject> {
    let json = serde_json::to_string(value).map_err(MarginError::from)?;
    let obj = py.import("json")?.call_method1("loads", (json,))?;
    Ok(obj.unbind())
}

fn from_py<T: DeserializeOwned>(obj: &Bound<'_, PyAny>) -> PyResult<T> {
    let json: String = obj
        .py()
        .import("json")?
        .call_method1("dumps", (obj,))?
        .extract()?;
    Ok(serde_json::from_str(&json).map_err(MarginError::from)?)
}

fn parse_cost_mode(mode: &str) -> Result<CostMode, MarginError> {
    match mode {
        "estimated" => Ok(CostMode::Estimated),
        "manual" => Ok(CostMode::Manual),
        other => Err(MarginError::InvalidInput(format!(
            "Invalid cost_mode: '{other}'. Must be 'estimated' or 'manual'"
        ))),
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[pyclass]
pub struct MarginEngine {
    config: EngineConfig,
    series: PriceSeries,
}

#[pymethods]
impl MarginEngine {
    /// Without a history CSV the built-in reference series is used.
    #[new]
    #[pyo3(signature = (config_path=None, history_path=None))]
    fn new(config_path: Option<String>, history_path: Option<String>) -> PyResult<Self> {
        let config = match config_path {
            Some(path) => EngineConfig::from_json_path(path)?,
            None => EngineConfig::default(),
        };
        let series = match history_path {
            Some(path) => PriceSeries::from_csv(path)?,
            None => PriceSeries::reference(),
        };
        Ok(Self { config, series })
    }

    /// Full calculation. `quotes` is a list of quote dicts from the live
    /// market; when missing or empty the reference quotes are used.
    #[pyo3(signature = (request, quotes=None, as_of=None))]
    fn evaluate(
        &self,
        py: Python<'_>,
        request: &Bound<'_, PyAny>,
        quotes: Option<&Bound<'_, PyAny>>,
        as_of: Option<NaiveDate>,
    ) -> PyResult<PyObject> {
        let request: EvaluationRequest = from_py(request)?;
        let mut quotes: Vec<MarketQuote> = match quotes {
            Some(q) => from_py(q)?,
            None => Vec::new(),
        };
        if quotes.is_empty() {
            quotes = ReferencePriceSource::new(&self.series).reference_quotes();
        }
        let evaluation = evaluate(
            &self.config,
            &self.series,
            &quotes,
            &request,
            as_of.unwrap_or_else(today),
        )?;
        to_py(py, &evaluation)
    }

    #[pyo3(signature = (
        scenario_id,
        animal_count,
        cost_mode="estimated",
        available_pen_slots=0,
        market_prices=None,
        params=None
    ))]
    fn compute_scenario(
        &self,
        py: Python<'_>,
        scenario_id: &str,
        animal_count: u32,
        cost_mode: &str,
        available_pen_slots: u32,
        market_prices: Option<&Bound<'_, PyAny>>,
        params: Option<&Bound<'_, PyAny>>,
    ) -> PyResult<PyObject> {
        let market: MarketPrices = match market_prices {
            Some(m) => from_py(m)?,
            None => MarketPrices::default(),
        };
        let params = params.map(from_py::<ManualParams>).transpose()?;
        let input = ScenarioInput {
            animal_count,
            cost_mode: parse_cost_mode(cost_mode)?,
            available_pen_slots,
            market: &market,
            params: params.as_ref(),
        };
        let result = compute_scenario_by_id(scenario_id, &input, &self.config.costs)?;
        to_py(py, &result)
    }

    #[pyo3(signature = (product, weeks_ahead, as_of=None))]
    fn estimate_future_price(
        &self,
        py: Python<'_>,
        product: &str,
        weeks_ahead: u32,
        as_of: Option<NaiveDate>,
    ) -> PyResult<PyObject> {
        let estimate = estimate_future_price(
            &self.series,
            product,
            weeks_ahead,
            as_of.unwrap_or_else(today),
            &self.config.estimator,
        );
        to_py(py, &estimate)
    }

    /// Price history as a DataFrame, optionally one product and the last
    /// `months` months.
    #[pyo3(signature = (product=None, months=None, as_of=None))]
    fn price_history(
        &self,
        product: Option<&str>,
        months: Option<u32>,
        as_of: Option<NaiveDate>,
    ) -> PyResult<PyDataFrame> {
        let as_of = as_of.unwrap_or_else(today);
        let products = match product {
            Some(p) => vec![p.to_string()],
            None => self.series.products(),
        };
        let mut selected = PriceSeries::default();
        for p in &products {
            selected.extend(self.series.history(p, months, as_of).into_iter().cloned());
        }
        Ok(PyDataFrame(selected.to_frame()?))
    }

    #[staticmethod]
    #[pyo3(signature = (scenario_id, unit_price, estimated_weight_kg, animal_count))]
    fn offer_total_price(
        scenario_id: &str,
        unit_price: f64,
        estimated_weight_kg: f64,
        animal_count: u32,
    ) -> PyResult<f64> {
        let scenario: Scenario = scenario_id.parse()?;
        Ok(offer::offer_total_price(
            scenario,
            unit_price,
            estimated_weight_kg,
            animal_count,
        )?)
    }

    #[staticmethod]
    #[pyo3(signature = (as_of=None))]
    fn offer_code(as_of: Option<NaiveDate>) -> String {
        offer::offer_code(as_of.unwrap_or_else(today))
    }

    fn config_json(&self) -> PyResult<String> {
        Ok(serde_json::to_string_pretty(&self.config).map_err(MarginError::from)?)
    }
}

/// Export schema constants as Python submodules
fn add_schema_exports(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // History columns
    let history = PyModule::new(m.py(), "history")?;
    history.add("DATE", schema::history::DATE)?;
    history.add("PRICE", schema::history::PRICE)?;
    history.add("SOURCE", schema::history::SOURCE)?;
    history.add("PRODUCT", schema::history::PRODUCT)?;
    m.add_submodule(&history)?;

    // Products
    let product = PyModule::new(m.py(), "product")?;
    product.add("FINISHER", schema::product::FINISHER)?;
    product.add("WEANER_20KG", schema::product::WEANER_20KG)?;
    product.add("PIGLET_7KG", schema::product::PIGLET_7KG)?;
    product.add("FINISHING_FEED", schema::product::FINISHING_FEED)?;
    m.add_submodule(&product)?;

    // Scenarios
    let scenario = PyModule::new(m.py(), "scenario")?;
    scenario.add("PIGLET", schema::scenario::PIGLET)?;
    scenario.add("WEANER", schema::scenario::WEANER)?;
    scenario.add("FINISHER", schema::scenario::FINISHER)?;
    scenario.add("NONE", schema::scenario::NONE)?;
    m.add_submodule(&scenario)?;

    Ok(())
}

#[pymodule]
fn swine_margin(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<MarginEngine>()?;
    add_schema_exports(m)?;
    Ok(())
}
