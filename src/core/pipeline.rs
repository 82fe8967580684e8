//! Batch price retrieval with per-instrument fallback and day-over-day metrics

use super::catalog::{Category, InstrumentSpec};
use super::price::{BatchHistory, HistoryRequest, MarketDataProvider, PriceSeries};
use anyhow::{Result, anyhow, bail};
use chrono::NaiveDate;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::fmt::Display;
use tracing::{debug, info, warn};

/// Changes smaller than this (in percent) are reported as flat.
const FLAT_THRESHOLD_PCT: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Flat,
}

impl Direction {
    pub fn classify(change_pct: f64) -> Self {
        if change_pct.abs() < FLAT_THRESHOLD_PCT {
            Direction::Flat
        } else if change_pct > 0.0 {
            Direction::Up
        } else {
            Direction::Down
        }
    }

    pub fn arrow(&self) -> &'static str {
        match self {
            Direction::Up => "▲",
            Direction::Down => "▼",
            Direction::Flat => "●",
        }
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Direction::Up => "up",
                Direction::Down => "down",
                Direction::Flat => "flat",
            }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceObservation {
    pub price: f64,
    pub prev_close: f64,
    pub change_pct: f64,
    pub change_str: String,
    pub direction: Direction,
    pub arrow: &'static str,
    pub category: Category,
    #[serde(rename = "date")]
    pub as_of_date: NaiveDate,
    #[serde(skip)]
    pub decimals: u32,
}

impl PriceObservation {
    /// Builds an observation from unrounded closes. Rounding happens after all arithmetic.
    pub fn from_closes(
        current: f64,
        previous: f64,
        as_of_date: NaiveDate,
        spec: &InstrumentSpec,
    ) -> Result<Self> {
        if previous == 0.0 {
            bail!("Previous close is zero; change is undefined");
        }
        let change_pct = (current - previous) / previous * 100.0;
        if !change_pct.is_finite() {
            bail!("Change for {} is not a finite number", spec.name);
        }
        let direction = Direction::classify(change_pct);

        Ok(PriceObservation {
            price: round_to(current, spec.decimals),
            prev_close: round_to(previous, spec.decimals),
            change_pct: round_to(change_pct, 2),
            change_str: format_change(change_pct),
            direction,
            arrow: direction.arrow(),
            category: spec.category,
            as_of_date,
            decimals: spec.decimals,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureRecord {
    #[serde(rename = "error")]
    pub message: String,
    pub category: Category,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Outcome {
    Observed(PriceObservation),
    Failed(FailureRecord),
}

impl Outcome {
    pub fn category(&self) -> Category {
        match self {
            Outcome::Observed(o) => o.category,
            Outcome::Failed(f) => f.category,
        }
    }

    pub fn as_observation(&self) -> Option<&PriceObservation> {
        match self {
            Outcome::Observed(o) => Some(o),
            Outcome::Failed(_) => None,
        }
    }
}

/// One outcome per catalog entry, in catalog order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceReport {
    entries: Vec<(String, Outcome)>,
}

impl PriceReport {
    pub fn entries(&self) -> &[(String, Outcome)] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&Outcome> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, outcome)| outcome)
    }

    pub fn failure_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, o)| matches!(o, Outcome::Failed(_)))
            .count()
    }

    /// Session date of the first catalog entry, if it resolved.
    pub fn data_date(&self) -> Option<NaiveDate> {
        self.entries
            .first()
            .and_then(|(_, o)| o.as_observation())
            .map(|o| o.as_of_date)
    }

    pub fn push(&mut self, name: &str, outcome: Outcome) {
        self.entries.push((name.to_string(), outcome));
    }
}

impl Serialize for PriceReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, outcome) in &self.entries {
            map.serialize_entry(name, outcome)?;
        }
        map.end()
    }
}

/// Rounds to `decimals` fractional digits, ties to even on the exact binary value.
///
/// Goes through the same decimal conversion as `format_change`, so a rounded
/// field and its formatted text never disagree.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    format!("{:.*}", decimals as usize, value)
        .parse()
        .unwrap_or(value)
}

/// Signed two-decimal percentage, e.g. `+2.00%`.
pub fn format_change(change_pct: f64) -> String {
    let sign = if change_pct >= 0.0 { "+" } else { "" };
    format!("{sign}{change_pct:.2}%")
}

/// Fetches all instruments with one batch query, falling back to individual
/// queries for instruments the batch response cannot serve.
///
/// Only a failure of the batch query itself is returned as an error. Every
/// other problem is recorded against the instrument it affects.
pub async fn fetch_all(
    catalog: &[InstrumentSpec],
    provider: &(dyn MarketDataProvider + Send + Sync),
) -> Result<PriceReport> {
    let request = HistoryRequest::default();
    let keys: Vec<String> = catalog.iter().map(|i| i.lookup_key.to_string()).collect();

    info!(count = keys.len(), "Fetching batch price history");
    let batch = provider
        .batch_history(&keys, &request)
        .await
        .map_err(|e| anyhow!("Batch price query failed: {e}"))?;
    if batch.is_empty() {
        warn!("Batch response carried no series, every instrument falls back");
    } else {
        debug!(series = batch.len(), "Received batch price history");
    }

    let mut report = PriceReport::default();
    for spec in catalog {
        let outcome = match resolve(spec, &batch, provider, &request).await {
            Ok(observation) => Outcome::Observed(observation),
            Err(e) => {
                warn!(instrument = spec.name, error = %e, "Instrument failed");
                Outcome::Failed(FailureRecord {
                    message: e.to_string(),
                    category: spec.category,
                })
            }
        };
        report.push(spec.name, outcome);
    }

    info!(
        total = report.entries().len(),
        failed = report.failure_count(),
        "Price fetch complete"
    );
    Ok(report)
}

async fn resolve(
    spec: &InstrumentSpec,
    batch: &BatchHistory,
    provider: &(dyn MarketDataProvider + Send + Sync),
    request: &HistoryRequest,
) -> Result<PriceObservation> {
    let closes = match batch
        .close_series(spec.lookup_key)
        .map(PriceSeries::valid_closes)
    {
        Some(closes) if !closes.is_empty() => closes,
        _ => {
            debug!(
                instrument = spec.name,
                key = spec.lookup_key,
                "Batch has no usable series, querying individually"
            );
            provider
                .history(spec.lookup_key, request)
                .await?
                .valid_closes()
        }
    };

    // Provider order is trusted to be oldest first
    let [.., (_, previous), (as_of_date, current)] = closes.as_slice() else {
        bail!("Insufficient data");
    };

    PriceObservation::from_closes(*current, *previous, *as_of_date, spec)
}
