use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::DateTime;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::core::config::YahooProviderConfig;
use crate::core::price::{
    BatchHistory, HistoryRequest, MarketDataProvider, PricePoint, PriceSeries,
};

// YahooFinanceProvider implementation for MarketDataProvider
pub struct YahooFinanceProvider {
    base_url: String,
    client: reqwest::Client,
}

impl YahooFinanceProvider {
    pub fn new(config: &YahooProviderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("mufx/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(YahooFinanceProvider {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, what: &str) -> Result<T> {
        debug!("Requesting price data from {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for {} URL: {}", e, what, url))?;

        if !response.status().is_success() {
            return Err(anyhow!("HTTP error: {} for {}", response.status(), what));
        }

        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", what, e))
    }
}

fn adjusted_param(request: &HistoryRequest) -> &'static str {
    if request.adjusted {
        "&includeAdjustedClose=true"
    } else {
        ""
    }
}

#[derive(Deserialize, Debug)]
struct YahooChartResponse {
    chart: ChartResult,
}

#[derive(Deserialize, Debug)]
struct ChartResult {
    result: Option<Vec<ChartItem>>,
}

#[derive(Deserialize, Debug)]
struct YahooSparkResponse {
    spark: SparkResult,
}

#[derive(Deserialize, Debug)]
struct SparkResult {
    result: Option<Vec<SparkItem>>,
}

#[derive(Deserialize, Debug)]
struct SparkItem {
    symbol: String,
    response: Option<Vec<ChartItem>>,
}

#[derive(Deserialize, Debug, Default)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
    #[serde(default)]
    adjclose: Vec<AdjClose>,
}

#[derive(Deserialize, Debug)]
struct Quote {
    close: Option<Vec<Option<f64>>>,
}

#[derive(Deserialize, Debug)]
struct AdjClose {
    adjclose: Option<Vec<Option<f64>>>,
}

#[derive(Deserialize, Debug)]
struct ChartItem {
    #[serde(default)]
    meta: ChartMeta,
    timestamp: Option<Vec<i64>>,
    indicators: Option<Indicators>,
}

#[derive(Deserialize, Debug, Default)]
struct ChartMeta {
    /// Exchange offset from UTC in seconds
    #[serde(default)]
    gmtoffset: i64,
}

impl ChartItem {
    fn closes(&self, adjusted: bool) -> Option<&Vec<Option<f64>>> {
        let indicators = self.indicators.as_ref()?;
        let adj = adjusted
            .then(|| indicators.adjclose.first())
            .flatten()
            .and_then(|a| a.adjclose.as_ref());
        adj.or_else(|| indicators.quote.first().and_then(|q| q.close.as_ref()))
    }

    /// Close series keyed by exchange-local session date. `None` when the item
    /// carries no bars.
    fn to_series(&self, adjusted: bool) -> Option<PriceSeries> {
        let timestamps = self.timestamp.as_ref()?;
        let closes = self.closes(adjusted)?;
        Some(
            timestamps
                .iter()
                .zip(closes)
                .filter_map(|(ts, close)| {
                    DateTime::from_timestamp(ts + self.meta.gmtoffset, 0).map(|dt| PricePoint {
                        date: dt.date_naive(),
                        close: *close,
                    })
                })
                .collect(),
        )
    }
}

#[async_trait]
impl MarketDataProvider for YahooFinanceProvider {
    #[instrument(name = "YahooBatchFetch", skip(self, keys), fields(count = keys.len()))]
    async fn batch_history(
        &self,
        keys: &[String],
        request: &HistoryRequest,
    ) -> Result<BatchHistory> {
        let url = format!(
            "{}/v7/finance/spark?symbols={}&range={}&interval={}{}",
            self.base_url,
            keys.join(","),
            request.range(),
            request.interval,
            adjusted_param(request),
        );
        let data: YahooSparkResponse = self.get_json(&url, "batch spark query").await?;

        let mut batch = BatchHistory::new();
        for item in data.spark.result.unwrap_or_default() {
            let series = item
                .response
                .as_ref()
                .and_then(|r| r.first())
                .and_then(|chart| chart.to_series(request.adjusted));
            match series {
                Some(series) => batch.insert(item.symbol, series),
                None => debug!(symbol = %item.symbol, "Spark result has no bars"),
            }
        }
        Ok(batch)
    }

    #[instrument(name = "YahooPriceFetch", skip(self, request), fields(symbol = %key))]
    async fn history(&self, key: &str, request: &HistoryRequest) -> Result<PriceSeries> {
        let url = format!(
            "{}/v8/finance/chart/{}?range={}&interval={}{}",
            self.base_url,
            key,
            request.range(),
            request.interval,
            adjusted_param(request),
        );
        let data: YahooChartResponse = self.get_json(&url, &format!("symbol: {key}")).await?;

        let item = data
            .chart
            .result
            .unwrap_or_default()
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No price data found for symbol: {}", key))?;

        Ok(item.to_series(request.adjusted).unwrap_or_default())
    }
}
