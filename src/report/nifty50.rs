// src/report/nifty50.rs
//! Daily OHLCV for the configured NIFTY 50 constituents plus the index itself.
//!
//! Stock rows accumulate in a CSV keyed by (date, symbol); the latest session
//! is also written as a JSON snapshot for the dashboard. Nothing is charted.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;

use super::{finish, persist_step, Report, ReportOutcome, ReportPaths};
use crate::config::AppConfig;
use crate::fetch::round2;
use crate::fetch::yahoo::{DailyBar, QuoteSource};
use crate::store::{self, ColumnType, Observation, Schema, TimeSeriesAppendStore};

pub const DATA_FILE: &str = "nifty50_stocks.csv";
pub const SNAPSHOT_FILE: &str = "nifty50_data.json";
pub const KEY: &[&str] = &[COL_DATE, COL_SYMBOL];

pub const COL_DATE: &str = "date";
pub const COL_SYMBOL: &str = "symbol";
pub const COL_OPEN: &str = "open";
pub const COL_CLOSE: &str = "close";
pub const COL_HIGH: &str = "high";
pub const COL_LOW: &str = "low";
pub const COL_VOLUME: &str = "volume";

pub fn schema() -> Schema {
    Schema::new([
        (COL_DATE, ColumnType::Date),
        (COL_SYMBOL, ColumnType::Text),
        (COL_OPEN, ColumnType::Float),
        (COL_CLOSE, ColumnType::Float),
        (COL_HIGH, ColumnType::Float),
        (COL_LOW, ColumnType::Float),
        (COL_VOLUME, ColumnType::Integer),
    ])
}

/// "RELIANCE.NS" → "RELIANCE".
pub fn display_symbol(symbol: &str) -> &str {
    symbol.strip_suffix(".NS").unwrap_or(symbol)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockQuote {
    pub symbol: String,
    pub open: f64,
    pub close: f64,
    pub high: f64,
    pub low: f64,
    pub volume: i64,
}

impl StockQuote {
    fn from_bar(symbol: &str, bar: &DailyBar) -> Self {
        Self {
            symbol: display_symbol(symbol).to_string(),
            open: round2(bar.open),
            close: round2(bar.close),
            high: round2(bar.high),
            low: round2(bar.low),
            volume: bar.volume,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexQuote {
    pub current_value: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub volume: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub nifty50_index: Option<IndexQuote>,
    pub stocks: Vec<StockQuote>,
    pub last_updated: String,
}

pub fn stock_observation(date: chrono::NaiveDate, q: &StockQuote) -> Observation {
    Observation::new()
        .with(COL_DATE, date)
        .with(COL_SYMBOL, q.symbol.as_str())
        .with(COL_OPEN, q.open)
        .with(COL_CLOSE, q.close)
        .with(COL_HIGH, q.high)
        .with(COL_LOW, q.low)
        .with(COL_VOLUME, q.volume)
}

pub struct Nifty50Report {
    source: Box<dyn QuoteSource>,
    symbols: Vec<String>,
    index_symbol: String,
    store: TimeSeriesAppendStore,
    paths: ReportPaths,
    snapshot_file: std::path::PathBuf,
}

impl Nifty50Report {
    pub fn new(
        source: Box<dyn QuoteSource>,
        symbols: Vec<String>,
        index_symbol: String,
        paths: ReportPaths,
    ) -> Self {
        let snapshot_file = paths
            .data_file
            .parent()
            .map(|p| p.join(SNAPSHOT_FILE))
            .unwrap_or_else(|| SNAPSHOT_FILE.into());
        Self {
            source,
            symbols,
            index_symbol,
            store: TimeSeriesAppendStore::new(schema()),
            paths,
            snapshot_file,
        }
    }

    pub fn default_paths(cfg: &AppConfig) -> ReportPaths {
        ReportPaths::new(cfg.data_dir().join(DATA_FILE), None)
    }

    pub fn snapshot_file(&self) -> &std::path::Path {
        &self.snapshot_file
    }

    async fn latest_bar(&self, symbol: &str) -> Option<DailyBar> {
        match self.source.daily_bars(symbol, "1d").await {
            Ok(bars) => {
                let last = bars.last().cloned();
                if last.is_none() {
                    tracing::warn!(target: "report", symbol, "no bars returned");
                }
                last
            }
            Err(e) => {
                tracing::warn!(target: "report", symbol, error = %e, "quote fetch failed");
                None
            }
        }
    }
}

#[async_trait]
impl Report for Nifty50Report {
    fn name(&self) -> &'static str {
        "nifty50"
    }

    async fn run(&self) -> Result<ReportOutcome> {
        let mut outcome = ReportOutcome::new(self.name());
        if self.symbols.is_empty() {
            tracing::warn!(target: "report", "no nifty50 symbols configured");
        }

        let mut stocks = Vec::with_capacity(self.symbols.len());
        let mut rows = Vec::with_capacity(self.symbols.len());
        for symbol in &self.symbols {
            if let Some(bar) = self.latest_bar(symbol).await {
                let quote = StockQuote::from_bar(symbol, &bar);
                rows.push(stock_observation(bar.date, &quote));
                stocks.push(quote);
            }
        }
        let failed = self.symbols.len() - stocks.len();
        if failed > 0 {
            outcome.fetch_error = Some(format!("{failed} of {} symbols failed", self.symbols.len()));
        }
        outcome.fetched = rows.len();
        tracing::info!(target: "report", fetched = rows.len(), failed, "nifty50 quotes fetched");

        let nifty50_index = self.latest_bar(&self.index_symbol).await.map(|b| IndexQuote {
            current_value: round2(b.close),
            open: round2(b.open),
            high: round2(b.high),
            low: round2(b.low),
            volume: b.volume,
        });

        persist_step(&self.store, &rows, KEY, &self.paths.data_file, &mut outcome)?;

        let snapshot = Snapshot {
            nifty50_index,
            stocks,
            last_updated: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        };
        let json = serde_json::to_vec_pretty(&snapshot).context("encoding nifty50 snapshot")?;
        store::write_atomic(&self.snapshot_file, &json)
            .with_context(|| format!("{}: saving snapshot", self.name()))?;
        tracing::info!(target: "report", path = %self.snapshot_file.display(), "snapshot saved");

        finish(&outcome);
        Ok(outcome)
    }
}
