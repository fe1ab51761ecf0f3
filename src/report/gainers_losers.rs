// src/report/gainers_losers.rs
use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;

use super::{finish, Report, ReportOutcome};
use crate::fetch::round2;
use crate::fetch::yahoo::QuoteSource;
use crate::report::nifty50::display_symbol;
use crate::store;

pub const OUTPUT_FILE: &str = "nifty50_gainers_losers.json";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mover {
    pub symbol: String,
    pub current_price: f64,
    pub change_percent: f64,
}

impl Mover {
    /// Change between the last two closes; `None` with fewer than two or a zero base.
    pub fn from_closes(symbol: &str, closes: &[f64]) -> Option<Self> {
        let [.., prev, last] = closes else {
            return None;
        };
        if *prev == 0.0 {
            return None;
        }
        Some(Self {
            symbol: display_symbol(symbol).to_string(),
            current_price: round2(*last),
            change_percent: round2((last - prev) / prev * 100.0),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Movers {
    pub gainers: Vec<Mover>,
    pub losers: Vec<Mover>,
    pub last_updated: String,
}

/// Top `n` by change, and the bottom `n` with the biggest loser first.
/// With fewer than `2n` symbols the two lists overlap.
pub fn rank_movers(mut all: Vec<Mover>, n: usize) -> (Vec<Mover>, Vec<Mover>) {
    all.sort_by(|a, b| b.change_percent.total_cmp(&a.change_percent));
    let gainers = all.iter().take(n).cloned().collect();
    let losers = all.iter().rev().take(n).cloned().collect();
    (gainers, losers)
}

pub struct GainersLosersReport {
    source: Box<dyn QuoteSource>,
    symbols: Vec<String>,
    top_n: usize,
    output: PathBuf,
}

impl GainersLosersReport {
    pub fn new(source: Box<dyn QuoteSource>, symbols: Vec<String>, top_n: usize, output: PathBuf) -> Self {
        Self {
            source,
            symbols,
            top_n,
            output,
        }
    }
}

#[async_trait]
impl Report for GainersLosersReport {
    fn name(&self) -> &'static str {
        "gainers-losers"
    }

    async fn run(&self) -> Result<ReportOutcome> {
        let mut outcome = ReportOutcome::new(self.name());
        let mut all = Vec::with_capacity(self.symbols.len());
        for symbol in &self.symbols {
            match self.source.daily_bars(symbol, "5d").await {
                Ok(bars) => {
                    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
                    match Mover::from_closes(symbol, &closes) {
                        Some(m) => all.push(m),
                        None => tracing::warn!(target: "report", symbol = %symbol, bars = bars.len(), "not enough history"),
                    }
                }
                Err(e) => tracing::warn!(target: "report", symbol = %symbol, error = %e, "quote fetch failed"),
            }
        }
        let failed = self.symbols.len() - all.len();
        if failed > 0 {
            outcome.fetch_error = Some(format!("{failed} of {} symbols failed", self.symbols.len()));
        }
        outcome.fetched = all.len();
        outcome.rows = all.len();

        let (gainers, losers) = rank_movers(all, self.top_n);
        let movers = Movers {
            gainers,
            losers,
            last_updated: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        };
        let json = serde_json::to_vec_pretty(&movers).context("encoding movers")?;
        store::write_atomic(&self.output, &json)
            .with_context(|| format!("{}: saving movers", self.name()))?;
        tracing::info!(
            target: "report",
            path = %self.output.display(),
            gainers = movers.gainers.len(),
            losers = movers.losers.len(),
            "movers saved"
        );
        outcome.data_file = Some(self.output.clone());

        finish(&outcome);
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(symbol: &str, pct: f64) -> Mover {
        Mover {
            symbol: symbol.to_string(),
            current_price: 100.0,
            change_percent: pct,
        }
    }

    #[test]
    fn change_uses_last_two_closes() {
        let mv = Mover::from_closes("TCS.NS", &[90.0, 100.0, 103.456]).unwrap();
        assert_eq!(mv.symbol, "TCS");
        assert_eq!(mv.current_price, 103.46);
        assert_eq!(mv.change_percent, 3.46);
        assert!(Mover::from_closes("X", &[100.0]).is_none());
        assert!(Mover::from_closes("X", &[0.0, 5.0]).is_none());
    }

    #[test]
    fn biggest_loser_comes_first() {
        let all = vec![m("A", 1.5), m("B", -4.0), m("C", 3.0), m("D", -0.5), m("E", 0.0)];
        let (gainers, losers) = rank_movers(all, 2);
        let names = |v: &[Mover]| v.iter().map(|x| x.symbol.clone()).collect::<Vec<_>>();
        assert_eq!(names(&gainers), ["C", "A"]);
        assert_eq!(names(&losers), ["B", "D"]);
    }
}
