// src/report/fii_dii.rs
//! FII/DII cash-market flows: history plus a three-panel trend chart.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Local, NaiveDate};

use super::{fetch_step, finish, persist_step, render_step, Report, ReportOutcome, ReportPaths};
use crate::chart::{Chart, Panel, Series, BLUE, GREEN, RED};
use crate::config::{AppConfig, FiiDiiConfig};
use crate::fetch::fii_dii::{COL_BUY, COL_CATEGORY, COL_DATE, COL_NET, COL_SELL};
use crate::fetch::Fetcher;
use crate::history::History;
use crate::store::{ColumnType, Schema, TimeSeriesAppendStore};

pub const DATA_FILE: &str = "fii_dii_buy_sell_data.csv";
pub const CHART_FILE: &str = "fii_dii_trends.svg";
pub const KEY: &[&str] = &[COL_DATE, COL_CATEGORY];

pub fn schema() -> Schema {
    Schema::new([
        (COL_CATEGORY, ColumnType::Text),
        (COL_DATE, ColumnType::Date),
        (COL_BUY, ColumnType::Float),
        (COL_SELL, ColumnType::Float),
        (COL_NET, ColumnType::Float),
    ])
}

/// Buy/sell panels per category and a net comparison, over `window_days` ending `today`.
pub fn chart(history: &History, cfg: &FiiDiiConfig, today: NaiveDate) -> Chart {
    let recent = history
        .last_days(COL_DATE, today, cfg.chart_window_days)
        .sorted_by_date(COL_DATE);
    let of = |category: &str| recent.filter(|r| r.text(COL_CATEGORY) == Some(category));
    let fii = of(&cfg.fii_category);
    let dii = of(&cfg.dii_category);

    let buy_sell = |who: &str, h: &History| Panel {
        title: format!("{who} Buy vs Sell (Last {} Days)", cfg.chart_window_days),
        y_label: "Value (₹ Crores)".to_string(),
        series: vec![
            Series::new(format!("{who} Buy"), h.series(COL_DATE, COL_BUY), GREEN),
            Series::new(format!("{who} Sell"), h.series(COL_DATE, COL_SELL), RED),
        ],
    };

    Chart {
        panels: vec![
            buy_sell("FII", &fii),
            buy_sell("DII", &dii),
            Panel {
                title: "FII vs DII Net Investment".to_string(),
                y_label: "Net Value (₹ Crores)".to_string(),
                series: vec![
                    Series::new("FII Net", fii.series(COL_DATE, COL_NET), BLUE),
                    Series::new("DII Net", dii.series(COL_DATE, COL_NET), RED),
                ],
            },
        ],
        size: (1200, 1400),
    }
}

pub struct FiiDiiReport {
    fetcher: Box<dyn Fetcher>,
    store: TimeSeriesAppendStore,
    paths: ReportPaths,
    cfg: FiiDiiConfig,
}

impl FiiDiiReport {
    pub fn new(fetcher: Box<dyn Fetcher>, paths: ReportPaths, cfg: FiiDiiConfig) -> Self {
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
impl Report for FiiDiiReport {
    fn name(&self) -> &'static str {
        "fii-dii"
    }

    async fn run(&self) -> Result<ReportOutcome> {
        let mut outcome = ReportOutcome::new(self.name());
        let rows = fetch_step(self.fetcher.as_ref(), &mut outcome)
            .await
            .unwrap_or_default();
        let history = persist_step(&self.store, &rows, KEY, &self.paths.data_file, &mut outcome)?;
        if let Some(path) = &self.paths.chart_file {
            let today = Local::now().date_naive();
            render_step(&chart(&history, &self.cfg, today), path, &mut outcome);
        }
        finish(&outcome);
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Observation;

    fn row(cat: &str, day: u32, net: f64) -> Observation {
        Observation::new()
            .with(COL_CATEGORY, cat)
            .with(COL_DATE, NaiveDate::from_ymd_opt(2025, 10, day).unwrap())
            .with(COL_BUY, 100.0)
            .with(COL_SELL, 100.0 - net)
            .with(COL_NET, net)
    }

    #[test]
    fn chart_splits_categories_and_windows_dates() {
        let cfg = FiiDiiConfig::default();
        let history = History::new(
            schema(),
            vec![
                row("FII/FPI *", 17, 5.0),
                row("DII **", 17, -3.0),
                row("FII/FPI *", 1, 9.0),
                row("DII **", 2, 1.0),
            ],
        );
        let today = NaiveDate::from_ymd_opt(2025, 11, 10).unwrap();
        let c = chart(&history, &cfg, today);
        assert_eq!(c.panels.len(), 3);
        // 10 Oct cutoff drops the early rows
        let net = &c.panels[2].series;
        assert_eq!(net[0].points, vec![(NaiveDate::from_ymd_opt(2025, 10, 17).unwrap(), 5.0)]);
        assert_eq!(net[1].points, vec![(NaiveDate::from_ymd_opt(2025, 10, 17).unwrap(), -3.0)]);
    }

    #[test]
    fn huge_window_charts_all_rows() {
        let cfg = FiiDiiConfig {
            chart_window_days: 200_000_000,
            ..FiiDiiConfig::default()
        };
        let history = History::new(schema(), vec![row("FII/FPI *", 17, 5.0), row("FII/FPI *", 1, 9.0)]);
        let today = NaiveDate::from_ymd_opt(2025, 11, 10).unwrap();
        let c = chart(&history, &cfg, today);
        assert_eq!(c.panels[2].series[0].points.len(), 2);
    }
}
