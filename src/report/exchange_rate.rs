// src/report/exchange_rate.rs
use anyhow::Result;
use async_trait::async_trait;

use super::{fetch_step, finish, persist_step, render_step, Report, ReportOutcome, ReportPaths};
use crate::chart::{Chart, Panel, Series, BLUE};
use crate::config::AppConfig;
use crate::fetch::exchange_rate::{COL_CURRENCY, COL_DATE, COL_RATE};
use crate::fetch::Fetcher;
use crate::history::History;
use crate::store::{ColumnType, Schema, TimeSeriesAppendStore};

pub const DATA_FILE: &str = "usd_to_inr_exchange_rate.csv";
pub const CHART_FILE: &str = "usd_to_inr_exchange_rate.svg";
pub const KEY: &[&str] = &[COL_DATE];

pub fn schema() -> Schema {
    Schema::new([
        (COL_DATE, ColumnType::Date),
        (COL_CURRENCY, ColumnType::Text),
        (COL_RATE, ColumnType::Float),
    ])
}

/// Whole history, one labelled line.
pub fn chart(history: &History) -> Chart {
    let points = history.sorted_by_date(COL_DATE).series(COL_DATE, COL_RATE);
    Chart::single(
        Panel {
            title: "USD to INR Exchange Rate".to_string(),
            y_label: "Exchange Rate (INR)".to_string(),
            series: vec![Series::new("USD to INR", points, BLUE).with_value_labels(2)],
        },
        (1000, 600),
    )
}

pub struct ExchangeRateReport {
    fetcher: Box<dyn Fetcher>,
    store: TimeSeriesAppendStore,
    paths: ReportPaths,
}

impl ExchangeRateReport {
    pub fn new(fetcher: Box<dyn Fetcher>, paths: ReportPaths) -> Self {
        Self {
            fetcher,
            store: TimeSeriesAppendStore::new(schema()),
            paths,
        }
    }

    pub fn default_paths(cfg: &AppConfig) -> ReportPaths {
        ReportPaths::new(
            cfg.data_dir().join(DATA_FILE),
            Some(cfg.chart_dir().join(CHART_FILE)),
        )
    }
}

#[async_trait]
impl Report for ExchangeRateReport {
    fn name(&self) -> &'static str {
        "exchange-rate"
    }

    async fn run(&self) -> Result<ReportOutcome> {
        let mut outcome = ReportOutcome::new(self.name());
        let rows = fetch_step(self.fetcher.as_ref(), &mut outcome)
            .await
            .unwrap_or_default();
        let history = persist_step(&self.store, &rows, KEY, &self.paths.data_file, &mut outcome)?;
        if let Some(path) = &self.paths.chart_file {
            render_step(&chart(&history), path, &mut outcome);
        }
        finish(&outcome);
        Ok(outcome)
    }
}
