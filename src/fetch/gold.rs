// src/fetch/gold.rs
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;

use super::{decode, fetch_text, Fetcher, Numeric};
use crate::config::GoldConfig;
use crate::error::FetchError;
use crate::store::Observation;

pub const COL_DATE: &str = "date";
pub const COL_24K: &str = "gold_24k_price";
pub const COL_22K: &str = "gold_22k_price";

#[derive(Debug, Deserialize)]
struct GoldQuote {
    gold_24k_price: Option<Numeric>,
    gold_22k_price: Option<Numeric>,
}

/// Per-gram INR prices for one day.
pub fn gold_observation(date: NaiveDate, price_24k: f64, price_22k: f64) -> Observation {
    Observation::new()
        .with(COL_DATE, date)
        .with(COL_24K, price_24k)
        .with(COL_22K, price_22k)
}

pub struct GoldPriceFetcher {
    client: reqwest::Client,
    quote_url: Option<String>,
}

impl GoldPriceFetcher {
    pub fn new(client: reqwest::Client, cfg: &GoldConfig) -> Self {
        Self {
            client,
            quote_url: cfg.quote_url.clone().filter(|u| !u.trim().is_empty()),
        }
    }

    /// Quotes carry no date; they are stamped with the local day of the fetch.
    pub fn parse(url: &str, body: &str, today: NaiveDate) -> Result<Observation, FetchError> {
        let q: GoldQuote = decode(url, body)?;
        let p24 = q
            .gold_24k_price
            .as_ref()
            .and_then(Numeric::value)
            .ok_or(FetchError::MissingField(COL_24K.to_string()))?;
        let p22 = q
            .gold_22k_price
            .as_ref()
            .and_then(Numeric::value)
            .ok_or(FetchError::MissingField(COL_22K.to_string()))?;
        Ok(gold_observation(today, p24, p22))
    }
}

#[async_trait]
impl Fetcher for GoldPriceFetcher {
    async fn fetch(&self) -> Result<Vec<Observation>, FetchError> {
        let Some(url) = &self.quote_url else {
            return Err(FetchError::NotConfigured("gold quote endpoint"));
        };
        let body = fetch_text(self.client.get(url), url).await?;
        let today = chrono::Local::now().date_naive();
        Ok(vec![Self::parse(url, &body, today)?])
    }

    fn name(&self) -> &'static str {
        "gold"
    }
}
