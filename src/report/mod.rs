// src/report/mod.rs
//! Report pipelines: fetch → merge into history → chart.
//!
//! Each step logs its own status line. A failed fetch degrades to charting the
//! existing history (or a fallback observation where one is defined); a failed
//! render is logged and never undoes the merge. Only store errors abort a run.

pub mod exchange_rate;
pub mod fii_dii;
pub mod gainers_losers;
pub mod gold;
pub mod nifty50;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;
use serde::Deserialize;

use crate::chart::{self, Chart};
use crate::config::AppConfig;
use crate::fetch::{self, Fetcher};
use crate::history::History;
use crate::store::{Observation, TimeSeriesAppendStore};

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("report_runs_total", "Report pipeline runs.");
        describe_counter!(
            "report_fetch_errors_total",
            "Fetch failures (fallback or existing data used)."
        );
        describe_counter!("report_render_errors_total", "Chart rendering failures.");
        describe_gauge!(
            "report_last_run_ts",
            "Unix ts when a report pipeline last finished."
        );
    });
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ReportKind {
    ExchangeRate,
    FiiDii,
    Gold,
    #[value(name = "nifty50")]
    Nifty50,
    GainersLosers,
}

impl ReportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::ExchangeRate => "exchange-rate",
            ReportKind::FiiDii => "fii-dii",
            ReportKind::Gold => "gold",
            ReportKind::Nifty50 => "nifty50",
            ReportKind::GainersLosers => "gainers-losers",
        }
    }
}

impl std::fmt::Display for ReportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What one run did; errors that were recovered from are recorded, not raised.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportOutcome {
    pub report: String,
    pub fetched: usize,
    pub rows: usize,
    pub used_fallback: bool,
    pub fetch_error: Option<String>,
    pub data_file: Option<PathBuf>,
    pub chart: Option<PathBuf>,
    pub render_error: Option<String>,
}

impl ReportOutcome {
    pub fn new(report: &str) -> Self {
        Self {
            report: report.to_string(),
            ..Self::default()
        }
    }

    pub fn is_clean(&self) -> bool {
        self.fetch_error.is_none() && self.render_error.is_none()
    }
}

#[async_trait::async_trait]
pub trait Report: Send + Sync {
    fn name(&self) -> &'static str;
    async fn run(&self) -> Result<ReportOutcome>;
}

/// Where a report keeps its history and chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportPaths {
    pub data_file: PathBuf,
    pub chart_file: Option<PathBuf>,
}

impl ReportPaths {
    pub fn new(data_file: impl Into<PathBuf>, chart_file: Option<PathBuf>) -> Self {
        Self {
            data_file: data_file.into(),
            chart_file,
        }
    }
}

/// Fetch step. `None` when the fetch failed (already logged and recorded).
pub(crate) async fn fetch_step(
    fetcher: &dyn Fetcher,
    outcome: &mut ReportOutcome,
) -> Option<Vec<Observation>> {
    ensure_metrics_described();
    match fetcher.fetch().await {
        Ok(rows) => {
            tracing::info!(target: "report", report = %outcome.report, source = fetcher.name(), rows = rows.len(), "fetched");
            outcome.fetched = rows.len();
            Some(rows)
        }
        Err(e) => {
            tracing::warn!(target: "report", report = %outcome.report, source = fetcher.name(), error = %e, "fetch failed");
            counter!("report_fetch_errors_total", "report" => outcome.report.clone()).increment(1);
            outcome.fetch_error = Some(e.to_string());
            None
        }
    }
}

/// Merge step. Empty `rows` just reads the existing history back.
pub(crate) fn persist_step(
    store: &TimeSeriesAppendStore,
    rows: &[Observation],
    key: &[&str],
    path: &Path,
    outcome: &mut ReportOutcome,
) -> Result<History> {
    let history = store
        .merge_and_persist(rows, key, path)
        .with_context(|| format!("{}: saving history", outcome.report))?;
    if rows.is_empty() {
        tracing::info!(target: "report", report = %outcome.report, rows = history.len(), "no new data; using existing history");
    } else {
        tracing::info!(target: "report", report = %outcome.report, path = %path.display(), rows = history.len(), "data saved");
    }
    outcome.rows = history.len();
    outcome.data_file = Some(path.to_path_buf());
    Ok(history)
}

/// Render step. Failures are recorded on the outcome only.
pub(crate) fn render_step(chart: &Chart, path: &Path, outcome: &mut ReportOutcome) {
    ensure_metrics_described();
    match chart::render(chart, path) {
        Ok(()) => outcome.chart = Some(path.to_path_buf()),
        Err(e) => {
            tracing::warn!(target: "report", report = %outcome.report, error = %e, "chart not rendered");
            counter!("report_render_errors_total", "report" => outcome.report.clone()).increment(1);
            outcome.render_error = Some(e.to_string());
        }
    }
}

pub(crate) fn finish(outcome: &ReportOutcome) {
    ensure_metrics_described();
    counter!("report_runs_total", "report" => outcome.report.clone()).increment(1);
    let now = chrono::Utc::now().timestamp().max(0) as f64;
    gauge!("report_last_run_ts", "report" => outcome.report.clone()).set(now);
}

/// Build the report for `kind` from configuration.
pub fn build(kind: ReportKind, cfg: &AppConfig, client: &reqwest::Client) -> Result<Box<dyn Report>> {
    let report: Box<dyn Report> = match kind {
        ReportKind::ExchangeRate => {
            let fetcher = fetch::exchange_rate::ExchangeRateFetcher::new(client.clone(), &cfg.exchange_rate)?;
            Box::new(exchange_rate::ExchangeRateReport::new(
                Box::new(fetcher),
                exchange_rate::ExchangeRateReport::default_paths(cfg),
            ))
        }
        ReportKind::FiiDii => {
            let fetcher = fetch::fii_dii::FiiDiiFetcher::new(client.clone(), &cfg.fii_dii);
            Box::new(fii_dii::FiiDiiReport::new(
                Box::new(fetcher),
                fii_dii::FiiDiiReport::default_paths(cfg),
                cfg.fii_dii.clone(),
            ))
        }
        ReportKind::Gold => {
            let fetcher = fetch::gold::GoldPriceFetcher::new(client.clone(), &cfg.gold);
            Box::new(gold::GoldReport::new(
                Box::new(fetcher),
                gold::GoldReport::default_paths(cfg),
                cfg.gold.clone(),
            ))
        }
        ReportKind::Nifty50 => {
            let source = fetch::yahoo::YahooChartClient::new(client.clone(), &cfg.nifty50.base_url);
            Box::new(nifty50::Nifty50Report::new(
                Box::new(source),
                cfg.nifty50.symbols.clone(),
                cfg.nifty50.index_symbol.clone(),
                nifty50::Nifty50Report::default_paths(cfg),
            ))
        }
        ReportKind::GainersLosers => {
            let source = fetch::yahoo::YahooChartClient::new(client.clone(), &cfg.nifty50.base_url);
            Box::new(gainers_losers::GainersLosersReport::new(
                Box::new(source),
                cfg.nifty50.symbols.clone(),
                cfg.nifty50.top_n,
                cfg.data_dir().join(gainers_losers::OUTPUT_FILE),
            ))
        }
    };
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_parse_from_kebab_case() {
        #[derive(Deserialize)]
        struct W {
            r: Vec<ReportKind>,
        }
        let w: W = toml::from_str(r#"r = ["exchange-rate", "fii-dii", "gainers-losers"]"#).unwrap();
        assert_eq!(
            w.r,
            vec![ReportKind::ExchangeRate, ReportKind::FiiDii, ReportKind::GainersLosers]
        );
        assert_eq!(ReportKind::Nifty50.to_string(), "nifty50");
    }
}
