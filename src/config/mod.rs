// src/config/mod.rs
//! Run configuration, loaded once at startup and passed down explicitly.

pub mod symbols;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::report::ReportKind;

pub const ENV_CONFIG_PATH: &str = "MARKET_REPORTS_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/reports.toml";
pub const ENV_EXCHANGE_RATE_API_KEY: &str = "EXCHANGE_RATE_API_KEY";
/// Upper bound for `chart_window_days`, roughly ten years.
pub const MAX_CHART_WINDOW_DAYS: i64 = 3650;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Repository root; data and chart dirs default to subfolders of it.
    pub root_dir: PathBuf,
    pub data_dir: Option<PathBuf>,
    pub chart_dir: Option<PathBuf>,
    pub http: HttpConfig,
    pub exchange_rate: ExchangeRateConfig,
    pub fii_dii: FiiDiiConfig,
    pub gold: GoldConfig,
    pub nifty50: Nifty50Config,
    pub run_all: RunAllConfig,
    pub publish: PublishConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("."),
            data_dir: None,
            chart_dir: None,
            http: HttpConfig::default(),
            exchange_rate: ExchangeRateConfig::default(),
            fii_dii: FiiDiiConfig::default(),
            gold: GoldConfig::default(),
            nifty50: Nifty50Config::default(),
            run_all: RunAllConfig::default(),
            publish: PublishConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExchangeRateConfig {
    pub base_url: String,
    /// "ENV" means: read from EXCHANGE_RATE_API_KEY.
    pub api_key: String,
    pub base_currency: String,
    pub target_currency: String,
}

impl Default for ExchangeRateConfig {
    fn default() -> Self {
        Self {
            base_url: "https://v6.exchangerate-api.com/v6".to_string(),
            api_key: "ENV".to_string(),
            base_currency: "USD".to_string(),
            target_currency: "INR".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FiiDiiConfig {
    pub base_url: String,
    pub warmup_delay_ms: u64,
    pub chart_window_days: i64,
    pub fii_category: String,
    pub dii_category: String,
}

impl Default for FiiDiiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.nseindia.com".to_string(),
            warmup_delay_ms: 1000,
            chart_window_days: 30,
            fii_category: "FII/FPI *".to_string(),
            dii_category: "DII **".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GoldConfig {
    /// JSON endpoint answering `{gold_24k_price, gold_22k_price}`; fallback prices when unset.
    pub quote_url: Option<String>,
    pub fallback_24k: f64,
    pub fallback_22k: f64,
    pub chart_window_days: i64,
}

impl Default for GoldConfig {
    fn default() -> Self {
        Self {
            quote_url: None,
            fallback_24k: 6450.75,
            fallback_22k: 5915.25,
            chart_window_days: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Nifty50Config {
    pub base_url: String,
    pub index_symbol: String,
    pub symbols: Vec<String>,
    /// Optional TOML/JSON list merged with `symbols`.
    pub symbols_file: Option<PathBuf>,
    pub top_n: usize,
}

impl Default for Nifty50Config {
    fn default() -> Self {
        Self {
            base_url: "https://query1.finance.yahoo.com".to_string(),
            index_symbol: "^NSEI".to_string(),
            symbols: Vec::new(),
            symbols_file: None,
            top_n: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunAllConfig {
    pub reports: Vec<ReportKind>,
}

impl Default for RunAllConfig {
    fn default() -> Self {
        Self {
            reports: vec![ReportKind::FiiDii, ReportKind::ExchangeRate, ReportKind::Gold],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    pub git_bin: String,
    pub push: bool,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            git_bin: "git".to_string(),
            push: true,
        }
    }
}

impl AppConfig {
    /// Config rooted at `root`, all other settings default.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root.into(),
            ..Self::default()
        }
    }

    pub fn data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| self.root_dir.join("data"))
    }

    pub fn chart_dir(&self) -> PathBuf {
        self.chart_dir
            .clone()
            .unwrap_or_else(|| self.root_dir.join("charts"))
    }

    /// Load from an explicit TOML file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let cfg: AppConfig =
            toml::from_str(&content).with_context(|| format!("parsing config {}", path.display()))?;
        cfg.finalize()
    }

    /// Resolution order:
    /// 1) $MARKET_REPORTS_CONFIG
    /// 2) config/reports.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
        let default = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default.exists() {
            return Self::load_from(&default);
        }
        Self::default().finalize()
    }

    /// Resolve "ENV" secrets and merge the external symbol list.
    fn finalize(mut self) -> Result<Self> {
        if self.exchange_rate.api_key.trim().eq_ignore_ascii_case("env") {
            // A missing key only disables the exchange-rate report.
            self.exchange_rate.api_key =
                std::env::var(ENV_EXCHANGE_RATE_API_KEY).unwrap_or_default();
        }

        let mut all = std::mem::take(&mut self.nifty50.symbols);
        if let Some(file) = &self.nifty50.symbols_file {
            let file = if file.is_relative() {
                self.root_dir.join(file)
            } else {
                file.clone()
            };
            all.extend(symbols::load_symbols_from(&file)?);
        }
        let cleaned = symbols::clean_symbols(all);
        if !cleaned.rejected.is_empty() {
            tracing::warn!(
                rejected = ?cleaned.rejected,
                "ignoring entries that are not NSE tickers"
            );
        }
        self.nifty50.symbols = cleaned.accepted;

        for (section, days) in [
            ("fii_dii", self.fii_dii.chart_window_days),
            ("gold", self.gold.chart_window_days),
        ] {
            if !(1..=MAX_CHART_WINDOW_DAYS).contains(&days) {
                return Err(anyhow!(
                    "[{section}] chart_window_days = {days} is outside 1..={MAX_CHART_WINDOW_DAYS}"
                ));
            }
        }
        Ok(self)
    }
}
