// src/report/gold.rs
use anyhow::Result;
use async_trait::async_trait;
use chrono::{Local, NaiveDate};

use super::{fetch_step, finish, persist_step, render_step, Report, ReportOutcome, ReportPaths};
use crate::chart::{Chart, Panel, Series, BLUE, RGBColor};
use crate::config::{AppConfig, GoldConfig};
use crate::fetch::gold::{gold_observation, COL_22K, COL_24K, COL_DATE};
use crate::fetch::Fetcher;
use crate::history::History;
use crate::store::{ColumnType, Observation, Schema, TimeSeriesAppendStore};

pub const DATA_FILE: &str = "gold_price_data.csv";
pub const CHART_FILE: &str = "gold_price_trend.svg";
pub const KEY: &[&str] = &[COL_DATE];

const GOLD: RGBColor = RGBColor(212, 175, 55);

pub fn schema() -> Schema {
    Schema::new([
        (COL_DATE, ColumnType::Date),
        (COL_24K, ColumnType::Float),
        (COL_22K, ColumnType::Float),
    ])
}

pub fn fallback(cfg: &GoldConfig, today: NaiveDate) -> Observation {
    gold_observation(today, cfg.fallback_24k, cfg.fallback_22k)
}

pub fn chart(history: &History, window_days: i64, today: NaiveDate) -> Chart {
    let recent = history
        .last_days(COL_DATE, today, window_days)
        .sorted_by_date(COL_DATE);
    Chart::single(
        Panel {
            title: format!("Gold Price Trend (Last {window_days} Days)"),
            y_label: "Price per gram (INR)".to_string(),
            series: vec![
                Series::new("22K Gold", recent.series(COL_DATE, COL_22K), BLUE),
                Series::new("24K Gold", recent.series(COL_DATE, COL_24K), GOLD),
            ],
        },
        (1000, 600),
    )
}

pub struct GoldReport {
    fetcher: Box<dyn Fetcher>,
    store: TimeSeriesAppendStore,
    paths: ReportPaths,
    cfg: GoldConfig,
}

impl GoldReport {
    pub fn new(fetcher: Box<dyn Fetcher>, paths: ReportPaths, cfg: GoldConfig) -> Self {
        Self {
            fetcher,
            store: TimeSeriesAppendStore::new(schema()),
            paths,
            cfg,
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
impl Report for GoldReport {
    fn name(&self) -> &'static str {
        "gold"
    }

    async fn run(&self) -> Result<ReportOutcome> {
        let mut outcome = ReportOutcome::new(self.name());
        let today = Local::now().date_naive();
        let rows = match fetch_step(self.fetcher.as_ref(), &mut outcome).await {
            Some(rows) if !rows.is_empty() => rows,
            _ => {
                tracing::warn!(
                    target: "report",
                    price_24k = self.cfg.fallback_24k,
                    price_22k = self.cfg.fallback_22k,
                    "using fallback gold prices"
                );
                outcome.used_fallback = true;
                vec![fallback(&self.cfg, today)]
            }
        };
        let history = persist_step(&self.store, &rows, KEY, &self.paths.data_file, &mut outcome)?;
        if let Some(path) = &self.paths.chart_file {
            render_step(&chart(&history, self.cfg.chart_window_days, today), path, &mut outcome);
        }
        finish(&outcome);
        Ok(outcome)
    }
}
