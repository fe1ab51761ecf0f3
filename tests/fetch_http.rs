// tests/fetch_http.rs
use chrono::NaiveDate;
use market_reports::config::{ExchangeRateConfig, FiiDiiConfig, GoldConfig, HttpConfig};
use market_reports::fetch::exchange_rate::{ExchangeRateFetcher, COL_CURRENCY, COL_DATE, COL_RATE};
use market_reports::fetch::fii_dii::{self, FiiDiiFetcher};
use market_reports::fetch::gold::{GoldPriceFetcher, COL_22K, COL_24K};
use market_reports::fetch::yahoo::{QuoteSource, YahooChartClient};
use market_reports::fetch::{build_client, Fetcher};
use market_reports::FetchError;
use mockito::Matcher;

fn fixture(name: &str) -> String {
    std::fs::read_to_string(format!("tests/fixtures/{name}")).expect("fixture")
}

fn client() -> reqwest::Client {
    build_client(&HttpConfig::default()).unwrap()
}

#[tokio::test]
async fn exchange_rate_latest_becomes_one_observation() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/secret-key/latest/USD")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(fixture("exchange_rate_latest.json"))
        .create_async()
        .await;

    let cfg = ExchangeRateConfig {
        base_url: server.url(),
        api_key: "secret-key".into(),
        ..ExchangeRateConfig::default()
    };
    let rows = ExchangeRateFetcher::new(client(), &cfg).unwrap().fetch().await.unwrap();

    mock.assert_async().await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].date(COL_DATE), NaiveDate::from_ymd_opt(2025, 10, 17));
    assert_eq!(rows[0].text(COL_CURRENCY), Some("INR"));
    assert_eq!(rows[0].f64(COL_RATE), Some(87.9843));
}

#[tokio::test]
async fn exchange_rate_errors_do_not_leak_the_key() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/secret-key/latest/USD")
        .with_status(403)
        .create_async()
        .await;

    let cfg = ExchangeRateConfig {
        base_url: server.url(),
        api_key: "secret-key".into(),
        ..ExchangeRateConfig::default()
    };
    let err = ExchangeRateFetcher::new(client(), &cfg).unwrap().fetch().await.unwrap_err();
    assert!(matches!(err, FetchError::Status { status: 403, .. }));
    assert!(!err.to_string().contains("secret-key"), "{err}");
}

#[test]
fn exchange_rate_without_key_is_not_configured() {
    let cfg = ExchangeRateConfig {
        api_key: String::new(),
        ..ExchangeRateConfig::default()
    };
    assert!(matches!(
        ExchangeRateFetcher::new(client(), &cfg),
        Err(FetchError::NotConfigured(_))
    ));
}

#[tokio::test]
async fn fii_dii_warms_up_then_reads_the_api() {
    let mut server = mockito::Server::new_async().await;
    let home = server
        .mock("GET", "/")
        .with_status(200)
        .with_header("set-cookie", "nsit=abc; Path=/")
        .with_body("<html></html>")
        .create_async()
        .await;
    let referer = format!("{}/", server.url());
    let api = server
        .mock("GET", "/api/fiidiiTradeReact")
        .match_header("referer", referer.as_str())
        .with_status(200)
        .with_body(fixture("fii_dii.json"))
        .create_async()
        .await;

    let cfg = FiiDiiConfig {
        base_url: server.url(),
        warmup_delay_ms: 0,
        ..FiiDiiConfig::default()
    };
    let rows = FiiDiiFetcher::new(client(), &cfg).fetch().await.unwrap();

    home.assert_async().await;
    api.assert_async().await;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].text(fii_dii::COL_CATEGORY), Some("FII/FPI *"));
    assert_eq!(rows[1].f64(fii_dii::COL_BUY), Some(11029.5));
}

#[tokio::test]
async fn fii_dii_blank_body_is_empty_response() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/")
        .with_status(200)
        .with_body("<html></html>")
        .create_async()
        .await;
    server
        .mock("GET", "/api/fiidiiTradeReact")
        .with_status(200)
        .with_body("  ")
        .create_async()
        .await;

    let cfg = FiiDiiConfig {
        base_url: server.url(),
        warmup_delay_ms: 0,
        ..FiiDiiConfig::default()
    };
    let err = FiiDiiFetcher::new(client(), &cfg).fetch().await.unwrap_err();
    assert!(matches!(err, FetchError::EmptyResponse(_)), "{err}");
}

#[tokio::test]
async fn gold_quote_endpoint() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/gold")
        .with_status(200)
        .with_body(r#"{"gold_24k_price":"12,480.00","gold_22k_price":"11,440.00"}"#)
        .create_async()
        .await;

    let cfg = GoldConfig {
        quote_url: Some(format!("{}/gold", server.url())),
        ..GoldConfig::default()
    };
    let rows = GoldPriceFetcher::new(client(), &cfg).fetch().await.unwrap();
    assert_eq!(rows[0].f64(COL_24K), Some(12480.0));
    assert_eq!(rows[0].f64(COL_22K), Some(11440.0));
}

#[tokio::test]
async fn gold_without_endpoint_is_not_configured() {
    let err = GoldPriceFetcher::new(client(), &GoldConfig::default())
        .fetch()
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::NotConfigured(_)));
}

#[tokio::test]
async fn yahoo_daily_bars() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/v8/finance/chart/TCS.NS")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("range".into(), "1d".into()),
            Matcher::UrlEncoded("interval".into(), "1d".into()),
        ]))
        .with_status(200)
        .with_body(fixture("yahoo_chart_1d.json"))
        .create_async()
        .await;

    let yahoo = YahooChartClient::new(client(), &server.url());
    let bars = yahoo.daily_bars("TCS.NS", "1d").await.unwrap();

    mock.assert_async().await;
    assert_eq!(bars.len(), 1);
    assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2025, 10, 17).unwrap());
    assert_eq!(bars[0].close, 3042.789);
    assert_eq!(bars[0].volume, 2345678);
}

#[tokio::test]
async fn yahoo_unknown_symbol_is_status_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/v8/finance/chart/NOPE.NS")
        .match_query(Matcher::Any)
        .with_status(404)
        .with_body(r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found"}}}"#)
        .create_async()
        .await;

    let yahoo = YahooChartClient::new(client(), &server.url());
    let err = yahoo.daily_bars("NOPE.NS", "5d").await.unwrap_err();
    assert!(matches!(err, FetchError::Status { status: 404, .. }));
}

#[tokio::test]
async fn yahoo_five_day_history_feeds_change_percent() {
    use market_reports::report::gainers_losers::Mover;

    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/v8/finance/chart/INFY.NS")
        .match_query(Matcher::UrlEncoded("range".into(), "5d".into()))
        .with_status(200)
        .with_body(fixture("yahoo_chart_5d.json"))
        .create_async()
        .await;

    let yahoo = YahooChartClient::new(client(), &server.url());
    let bars = yahoo.daily_bars("INFY.NS", "5d").await.unwrap();
    // trailing null session dropped
    assert_eq!(bars.len(), 3);

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let mover = Mover::from_closes("INFY.NS", &closes).unwrap();
    assert_eq!(mover.symbol, "INFY");
    assert_eq!(mover.current_price, 1500.0);
    assert_eq!(mover.change_percent, 0.67);
}
