//! Price history abstractions and core types

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interval {
    Daily,
}

impl Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Interval::Daily => "1d",
            }
        )
    }
}

/// Parameters shared by batch and single-symbol history queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRequest {
    /// Number of most recent calendar days to cover.
    pub window_days: u32,
    pub interval: Interval,
    /// Request split/dividend adjusted closes.
    pub adjusted: bool,
}

impl HistoryRequest {
    /// Provider range parameter, e.g. `5d`.
    pub fn range(&self) -> String {
        format!("{}d", self.window_days)
    }
}

impl Default for HistoryRequest {
    fn default() -> Self {
        HistoryRequest {
            window_days: 5,
            interval: Interval::Daily,
            adjusted: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: Option<f64>,
}

/// Close prices for one symbol in the order the provider returned them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(points: Vec<PricePoint>) -> Self {
        PriceSeries { points }
    }

    /// Sessions with a reported close. Missing and non-finite values are dropped.
    pub fn valid_closes(&self) -> Vec<(NaiveDate, f64)> {
        self.points
            .iter()
            .filter_map(|p| match p.close {
                Some(close) if close.is_finite() => Some((p.date, close)),
                _ => None,
            })
            .collect()
    }
}

impl FromIterator<PricePoint> for PriceSeries {
    fn from_iter<T: IntoIterator<Item = PricePoint>>(iter: T) -> Self {
        PriceSeries::new(iter.into_iter().collect())
    }
}

/// Result of a batch query. Keys the provider could not serve are simply absent.
#[derive(Debug, Clone, Default)]
pub struct BatchHistory {
    series: HashMap<String, PriceSeries>,
}

impl BatchHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, series: PriceSeries) {
        self.series.insert(key.into(), series);
    }

    /// Close series for `key`, if the response carried one.
    pub fn close_series(&self, key: &str) -> Option<&PriceSeries> {
        self.series.get(key)
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Fetches history for all `keys` in a single request.
    async fn batch_history(&self, keys: &[String], request: &HistoryRequest)
    -> Result<BatchHistory>;

    /// Fetches history for one key.
    async fn history(&self, key: &str, request: &HistoryRequest) -> Result<PriceSeries>;
}
