// src/fetch/mod.rs
pub mod exchange_rate;
pub mod fii_dii;
pub mod gold;
pub mod yahoo;

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::HttpConfig;
use crate::error::FetchError;
use crate::store::Observation;

/// Source of fresh observations for one report.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self) -> Result<Vec<Observation>, FetchError>;
    fn name(&self) -> &'static str;
}

/// Shared client: bounded timeout, browser UA, cookie jar (NSE needs its session cookies).
pub fn build_client(http: &HttpConfig) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(http.timeout_secs))
        .user_agent(http.user_agent.as_str())
        .cookie_store(true)
        .build()
}

/// Send, require 2xx and a non-blank body.
pub(crate) async fn fetch_text(req: reqwest::RequestBuilder, url: &str) -> Result<String, FetchError> {
    let resp = req.send().await.map_err(|source| FetchError::Http {
        url: url.to_string(),
        source,
    })?;
    let status = resp.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    let body = resp.text().await.map_err(|source| FetchError::Http {
        url: url.to_string(),
        source,
    })?;
    if body.trim().is_empty() {
        return Err(FetchError::EmptyResponse(url.to_string()));
    }
    Ok(body)
}

pub(crate) fn decode<T: DeserializeOwned>(url: &str, body: &str) -> Result<T, FetchError> {
    serde_json::from_str(body).map_err(|e| FetchError::Decode {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

/// APIs disagree on whether amounts are numbers or strings ("12,345.67").
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum Numeric {
    Number(f64),
    Text(String),
}

impl Numeric {
    pub(crate) fn value(&self) -> Option<f64> {
        match self {
            Numeric::Number(n) => Some(*n),
            Numeric::Text(s) => crate::store::observation::parse_number(s),
        }
    }
}

pub(crate) fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
