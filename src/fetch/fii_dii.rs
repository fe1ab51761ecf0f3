// src/fetch/fii_dii.rs
//! NSE FII/DII provisional cash-market activity.
//!
//! NSE rejects API calls without the cookies set by its landing page, so the
//! fetch first loads the site root on the same (cookie-keeping) client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, REFERER};
use serde::Deserialize;

use super::{decode, fetch_text, Fetcher, Numeric};
use crate::config::FiiDiiConfig;
use crate::error::FetchError;
use crate::store::observation::parse_date;
use crate::store::Observation;

pub const COL_CATEGORY: &str = "category";
pub const COL_DATE: &str = "date";
pub const COL_BUY: &str = "buyValue";
pub const COL_SELL: &str = "sellValue";
pub const COL_NET: &str = "netValue";

const API_PATH: &str = "/api/fiidiiTradeReact";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlowRow {
    category: Option<String>,
    date: Option<String>,
    buy_value: Option<Numeric>,
    sell_value: Option<Numeric>,
    net_value: Option<Numeric>,
}

pub struct FiiDiiFetcher {
    client: reqwest::Client,
    base_url: String,
    warmup_delay: Duration,
}

impl FiiDiiFetcher {
    pub fn new(client: reqwest::Client, cfg: &FiiDiiConfig) -> Self {
        Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            warmup_delay: Duration::from_millis(cfg.warmup_delay_ms),
        }
    }

    fn request(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .get(url)
            .header(ACCEPT, "application/json, text/plain, */*")
            .header(ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .header(REFERER, format!("{}/", self.base_url))
    }

    /// One observation per category row of the API response.
    pub fn parse(url: &str, body: &str) -> Result<Vec<Observation>, FetchError> {
        let rows: Vec<FlowRow> = decode(url, body)?;
        let mut out = Vec::with_capacity(rows.len());
        for (i, r) in rows.into_iter().enumerate() {
            let field = |name: &str| FetchError::MissingField(format!("[{i}].{name}"));
            let category = r.category.ok_or_else(|| field(COL_CATEGORY))?;
            let raw_date = r.date.ok_or_else(|| field(COL_DATE))?;
            let date = parse_date(&raw_date).ok_or_else(|| FetchError::Decode {
                url: url.to_string(),
                reason: format!("bad date `{raw_date}`"),
            })?;
            let amount = |v: Option<Numeric>, name: &str| {
                v.as_ref().and_then(Numeric::value).ok_or_else(|| field(name))
            };
            out.push(
                Observation::new()
                    .with(COL_CATEGORY, category)
                    .with(COL_DATE, date)
                    .with(COL_BUY, amount(r.buy_value, COL_BUY)?)
                    .with(COL_SELL, amount(r.sell_value, COL_SELL)?)
                    .with(COL_NET, amount(r.net_value, COL_NET)?),
            );
        }
        Ok(out)
    }
}

#[async_trait]
impl Fetcher for FiiDiiFetcher {
    async fn fetch(&self) -> Result<Vec<Observation>, FetchError> {
        let home = format!("{}/", self.base_url);
        fetch_text(self.request(&home), &home).await?;
        tokio::time::sleep(self.warmup_delay).await;

        let url = format!("{}{API_PATH}", self.base_url);
        let body = fetch_text(self.request(&url), &url).await?;
        let rows = Self::parse(&url, &body)?;
        tracing::info!(target: "report", rows = rows.len(), "fii/dii activity fetched");
        Ok(rows)
    }

    fn name(&self) -> &'static str {
        "fii-dii"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn parses_string_amounts_and_nse_dates() {
        let body = r#"[
            {"category":"DII **","date":"17-Oct-2025","buyValue":"14,256.31","sellValue":"12,729.06","netValue":"1,527.25"},
            {"category":"FII/FPI *","date":"17-Oct-2025","buyValue":11029.5,"sellValue":10721.09,"netValue":308.41}
        ]"#;
        let rows = FiiDiiFetcher::parse("u", body).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].text(COL_CATEGORY), Some("DII **"));
        assert_eq!(rows[0].date(COL_DATE), NaiveDate::from_ymd_opt(2025, 10, 17));
        assert_eq!(rows[0].f64(COL_BUY), Some(14256.31));
        assert_eq!(rows[1].f64(COL_NET), Some(308.41));
    }

    #[test]
    fn missing_amount_is_reported_with_row_index() {
        let body = r#"[{"category":"DII **","date":"17-Oct-2025","buyValue":"1","sellValue":"2"}]"#;
        let err = FiiDiiFetcher::parse("u", body).unwrap_err();
        assert!(matches!(err, FetchError::MissingField(f) if f == "[0].netValue"));
    }

    #[test]
    fn html_instead_of_json_is_a_decode_error() {
        let err = FiiDiiFetcher::parse("u", "<html>Access Denied</html>").unwrap_err();
        assert!(matches!(err, FetchError::Decode { .. }));
    }
}
