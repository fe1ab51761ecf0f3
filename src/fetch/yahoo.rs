// src/fetch/yahoo.rs
//! Daily bars from the Yahoo Finance chart API (the data behind yfinance).

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use serde::Deserialize;

use super::{decode, fetch_text};
use crate::error::FetchError;

#[derive(Debug, Clone, PartialEq)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

/// Anything that can answer "daily bars for this ticker over this range".
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Bars oldest first. `range` uses Yahoo's vocabulary: "1d", "5d", "1mo".
    async fn daily_bars(&self, symbol: &str, range: &str) -> Result<Vec<DailyBar>, FetchError>;
}

#[derive(Debug, Deserialize)]
struct Envelope {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: Meta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Meta {
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteColumns>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteColumns {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<i64>>,
}

pub struct YahooChartClient {
    client: reqwest::Client,
    base_url: String,
}

impl YahooChartClient {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Parse a chart payload. Bars with any null field (halted sessions) are dropped.
    pub fn parse_bars(url: &str, body: &str) -> Result<Vec<DailyBar>, FetchError> {
        let env: Envelope = decode(url, body)?;
        if let Some(err) = env.chart.error {
            return Err(FetchError::Decode {
                url: url.to_string(),
                reason: format!(
                    "{}: {}",
                    err.code.unwrap_or_default(),
                    err.description.unwrap_or_default()
                ),
            });
        }
        let result = env
            .chart
            .result
            .and_then(|r| r.into_iter().next())
            .ok_or(FetchError::MissingField("chart.result".to_string()))?;
        let q = result.indicators.quote.into_iter().next().unwrap_or_default();

        let mut bars = Vec::with_capacity(result.timestamp.len());
        for (i, ts) in result.timestamp.iter().enumerate() {
            let at = |col: &[Option<f64>]| col.get(i).copied().flatten();
            let (Some(open), Some(high), Some(low), Some(close)) =
                (at(&q.open), at(&q.high), at(&q.low), at(&q.close))
            else {
                continue;
            };
            // exchange-local trading day
            let Some(dt) = ts
                .checked_add(result.meta.gmtoffset)
                .and_then(|local| DateTime::from_timestamp(local, 0))
            else {
                continue;
            };
            bars.push(DailyBar {
                date: dt.date_naive(),
                open,
                high,
                low,
                close,
                volume: q.volume.get(i).copied().flatten().unwrap_or(0),
            });
        }
        Ok(bars)
    }
}

/// Yahoo tickers carry `^` (indices) and `&` (M&M.NS); both must be escaped in the path.
fn encode_symbol(symbol: &str) -> String {
    symbol.replace('^', "%5E").replace('&', "%26")
}

#[async_trait]
impl QuoteSource for YahooChartClient {
    async fn daily_bars(&self, symbol: &str, range: &str) -> Result<Vec<DailyBar>, FetchError> {
        let url = format!(
            "{}/v8/finance/chart/{}?range={range}&interval=1d",
            self.base_url,
            encode_symbol(symbol)
        );
        let body = fetch_text(self.client.get(&url), &url).await?;
        Self::parse_bars(&url, &body)
    }
}
