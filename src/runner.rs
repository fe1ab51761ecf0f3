// src/runner.rs
//! Batch runner: reports run one after another; a failure is summarised and
//! the batch moves on.

use anyhow::{Context, Result};

use crate::config::AppConfig;
use crate::fetch::build_client;
use crate::report::{self, Report, ReportKind, ReportOutcome};

/// Result line for one report in a batch.
#[derive(Debug)]
pub struct RunSummary {
    pub report: String,
    pub result: Result<ReportOutcome>,
}

impl RunSummary {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }

    /// One human-readable status line.
    pub fn line(&self) -> String {
        match &self.result {
            Ok(o) => {
                let mut s = format!("{}: ok, {} rows", self.report, o.rows);
                if o.used_fallback {
                    s.push_str(", fallback used");
                }
                if let Some(e) = &o.fetch_error {
                    s.push_str(&format!(", fetch error: {e}"));
                }
                if let Some(e) = &o.render_error {
                    s.push_str(&format!(", chart error: {e}"));
                }
                s
            }
            Err(e) => format!("{}: failed: {e:#}", self.report),
        }
    }
}

/// Run already-built reports in order.
pub async fn run_reports(reports: &[Box<dyn Report>]) -> Vec<RunSummary> {
    let mut out = Vec::with_capacity(reports.len());
    for r in reports {
        tracing::info!(target: "report", report = r.name(), "running");
        let result = r.run().await;
        if let Err(e) = &result {
            tracing::error!(target: "report", report = r.name(), error = %format!("{e:#}"), "report failed");
        }
        out.push(RunSummary {
            report: r.name().to_string(),
            result,
        });
    }
    out
}

/// Build and run `kinds` from configuration. A report that cannot be built
/// (e.g. missing API key) is summarised as failed.
pub async fn run_kinds(kinds: &[ReportKind], cfg: &AppConfig) -> Result<Vec<RunSummary>> {
    let client = build_client(&cfg.http).context("building http client")?;
    let mut out = Vec::with_capacity(kinds.len());
    for &kind in kinds {
        match report::build(kind, cfg, &client) {
            Ok(r) => out.extend(run_reports(std::slice::from_ref(&r)).await),
            Err(e) => {
                tracing::error!(target: "report", report = %kind, error = %format!("{e:#}"), "report not started");
                out.push(RunSummary {
                    report: kind.to_string(),
                    result: Err(e),
                });
            }
        }
    }
    Ok(out)
}
