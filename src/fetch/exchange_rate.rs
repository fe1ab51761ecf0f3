// src/fetch/exchange_rate.rs
//! exchangerate-api.com v6 `latest` endpoint.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};

use super::{decode, fetch_text, Fetcher};
use crate::config::ExchangeRateConfig;
use crate::error::FetchError;
use crate::store::Observation;

pub const COL_DATE: &str = "time_last_update_utc";
pub const COL_CURRENCY: &str = "Currency";
pub const COL_RATE: &str = "Rate";

#[derive(Debug, Deserialize)]
struct Latest {
    result: Option<String>,
    #[serde(rename = "error-type")]
    error_type: Option<String>,
    time_last_update_utc: Option<String>,
    conversion_rates: Option<HashMap<String, f64>>,
}

fn parse_rfc2822_date(ts: &str) -> Option<NaiveDate> {
    let d = OffsetDateTime::parse(ts, &Rfc2822)
        .ok()?
        .to_offset(UtcOffset::UTC)
        .date();
    NaiveDate::from_ymd_opt(d.year(), u8::from(d.month()) as u32, d.day() as u32)
}

pub struct ExchangeRateFetcher {
    client: reqwest::Client,
    url: String,
    // same URL with the key masked, for logs and errors
    display_url: String,
    target: String,
}

impl ExchangeRateFetcher {
    pub fn new(client: reqwest::Client, cfg: &ExchangeRateConfig) -> Result<Self, FetchError> {
        let key = cfg.api_key.trim();
        if key.is_empty() {
            return Err(FetchError::NotConfigured("exchange-rate API key"));
        }
        let base = cfg.base_url.trim_end_matches('/');
        Ok(Self {
            client,
            url: format!("{base}/{key}/latest/{}", cfg.base_currency),
            display_url: format!("{base}/***/latest/{}", cfg.base_currency),
            target: cfg.target_currency.clone(),
        })
    }

    /// Turn a `latest` payload into one `{date, Currency, Rate}` observation.
    pub fn parse(target: &str, url: &str, body: &str) -> Result<Observation, FetchError> {
        let latest: Latest = decode(url, body)?;
        if latest.result.as_deref() == Some("error") {
            return Err(FetchError::Decode {
                url: url.to_string(),
                reason: latest
                    .error_type
                    .unwrap_or_else(|| "unspecified api error".to_string()),
            });
        }
        let rates = latest
            .conversion_rates
            .ok_or(FetchError::MissingField("conversion_rates".to_string()))?;
        let rate = *rates
            .get(target)
            .ok_or_else(|| FetchError::MissingField(format!("conversion_rates.{target}")))?;
        let stamp = latest
            .time_last_update_utc
            .ok_or(FetchError::MissingField(COL_DATE.to_string()))?;
        let date = parse_rfc2822_date(&stamp).ok_or_else(|| FetchError::Decode {
            url: url.to_string(),
            reason: format!("bad {COL_DATE} `{stamp}`"),
        })?;

        Ok(Observation::new()
            .with(COL_DATE, date)
            .with(COL_CURRENCY, target)
            .with(COL_RATE, rate))
    }
}

#[async_trait]
impl Fetcher for ExchangeRateFetcher {
    async fn fetch(&self) -> Result<Vec<Observation>, FetchError> {
        let body = fetch_text(self.client.get(&self.url), &self.display_url).await?;
        let obs = Self::parse(&self.target, &self.display_url, &body)?;
        tracing::info!(target: "report", rate = ?obs.f64(COL_RATE), currency = %self.target, "exchange rate fetched");
        Ok(vec![obs])
    }

    fn name(&self) -> &'static str {
        "exchange-rate"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"{
        "result": "success",
        "time_last_update_utc": "Fri, 17 Oct 2025 00:00:01 +0000",
        "base_code": "USD",
        "conversion_rates": {"USD": 1, "INR": 88.0123, "EUR": 0.86}
    }"#;

    #[test]
    fn parses_target_rate_and_day_first_date() {
        let obs = ExchangeRateFetcher::parse("INR", "u", BODY).unwrap();
        assert_eq!(obs.date(COL_DATE), NaiveDate::from_ymd_opt(2025, 10, 17));
        assert_eq!(obs.text(COL_CURRENCY), Some("INR"));
        assert_eq!(obs.f64(COL_RATE), Some(88.0123));
    }

    #[test]
    fn missing_currency_is_missing_field() {
        let err = ExchangeRateFetcher::parse("JPY", "u", BODY).unwrap_err();
        assert!(matches!(err, FetchError::MissingField(f) if f == "conversion_rates.JPY"));
    }

    #[test]
    fn api_error_payload_is_reported() {
        let body = r#"{"result":"error","error-type":"invalid-key"}"#;
        let err = ExchangeRateFetcher::parse("INR", "u", body).unwrap_err();
        assert!(err.to_string().contains("invalid-key"));
    }

    #[test]
    fn empty_key_is_not_configured() {
        let cfg = ExchangeRateConfig {
            api_key: String::new(),
            ..ExchangeRateConfig::default()
        };
        assert!(matches!(
            ExchangeRateFetcher::new(reqwest::Client::new(), &cfg),
            Err(FetchError::NotConfigured(_))
        ));
    }
}
