//! Exchange-rate fetching with one fallback endpoint and per-currency default substitution.

use crate::config::RatesConfig;
use crate::currency::{Currency, RateSnapshot};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::value::RawValue;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

const PREVIEW_CHARS: usize = 200;

#[derive(Error, Debug)]
pub enum RateError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("all endpoints failed (primary: {primary}; fallback: {fallback})")]
    Unreachable {
        primary: Box<RateError>,
        fallback: Box<RateError>,
    },

    #[error("invalid response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("response has neither `rates` nor `conversion_rates`")]
    MissingRates,
}

impl From<reqwest::Error> for RateError {
    fn from(err: reqwest::Error) -> Self {
        RateError::Http(err.to_string())
    }
}

/// Where response bodies come from. The app uses HTTP; tests script it.
pub trait RateSource: Send + Sync {
    /// Returns the body of a successful (2xx) response.
    fn get(&self, url: &str) -> Result<String, RateError>;
}

pub struct HttpRateSource {
    client: reqwest::blocking::Client,
}

impl HttpRateSource {
    pub fn new(timeout: Duration) -> Result<Self, RateError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("calc_fx/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

impl RateSource for HttpRateSource {
    fn get(&self, url: &str) -> Result<String, RateError> {
        let response = self.client.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(RateError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.text()?)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Endpoints {
    pub primary: String,
    pub fallback: String,
}

impl Endpoints {
    /// The primary endpoint is asked for the supported set only; the fallback returns
    /// everything it has and gets filtered while parsing.
    pub fn new(primary_url: &str, fallback_url: &str, base: &str) -> Self {
        let primary = format!(
            "{}?base={}&symbols={}",
            primary_url,
            urlencoding::encode(base),
            urlencoding::encode(&Currency::joined_codes())
        );
        Self {
            primary,
            fallback: fallback_url.to_string(),
        }
    }

    pub fn from_config(config: &RatesConfig) -> Self {
        Self::new(&config.primary_url, &config.fallback_url, &config.base)
    }
}

pub struct RateProvider<S> {
    source: S,
    endpoints: Endpoints,
}

impl<S: RateSource> RateProvider<S> {
    pub fn new(source: S, endpoints: Endpoints) -> Self {
        Self { source, endpoints }
    }

    pub fn fetch_rates(&self) -> Result<RateSnapshot, RateError> {
        let body = self.fetch_body()?;
        log::debug!("response: {}", preview(&body));
        parse_rates(&body, Utc::now())
    }

    fn fetch_body(&self) -> Result<String, RateError> {
        let primary = match self.source.get(&self.endpoints.primary) {
            Ok(body) => {
                log::info!("rates received from primary endpoint");
                return Ok(body);
            }
            Err(e) => e,
        };
        log::warn!("primary endpoint failed, trying fallback: {}", primary);

        match self.source.get(&self.endpoints.fallback) {
            Ok(body) => {
                log::info!("rates received from fallback endpoint");
                Ok(body)
            }
            Err(fallback) => Err(RateError::Unreachable {
                primary: Box::new(primary),
                fallback: Box::new(fallback),
            }),
        }
    }
}

/// A rate as it appears on the wire.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RateValue {
    Integer(i64),
    Float(f64),
    Text(String),
    Other(serde_json::Value),
}

impl RateValue {
    /// `None` means "use the default": wrong type, unparsable, or not a positive number.
    fn coerce(&self) -> Option<f64> {
        let value = match self {
            RateValue::Integer(i) => *i as f64,
            RateValue::Float(f) => *f,
            RateValue::Text(s) => s.trim().parse::<f64>().ok()?,
            RateValue::Other(_) => return None,
        };
        (value.is_finite() && value > 0.0).then_some(value)
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Stamp {
    Text(String),
    Unix(i64),
    Other(serde_json::Value),
}

impl Stamp {
    fn render(&self) -> Option<String> {
        match self {
            Stamp::Text(s) => Some(s.clone()),
            Stamp::Unix(secs) => DateTime::from_timestamp(*secs, 0)
                .map(|dt| dt.format("%Y-%m-%d %H:%M UTC").to_string()),
            Stamp::Other(_) => None,
        }
    }
}

/// Fields are kept raw and decoded one by one, so a value serde_json rejects outright
/// (e.g. a number out of `f64` range) only costs that one field.
#[derive(Debug, Deserialize)]
struct RateResponse {
    rates: Option<Box<RawValue>>,
    conversion_rates: Option<Box<RawValue>>,
    date: Option<Box<RawValue>>,
    time_last_updated: Option<Box<RawValue>>,
    time_last_update_utc: Option<Box<RawValue>>,
}

fn decode<'a, T: Deserialize<'a>>(raw: &'a RawValue) -> Option<T> {
    serde_json::from_str(raw.get()).ok()
}

/// Decodes a response body into a live snapshot. Only a missing rates table fails;
/// individual bad or missing currencies fall back to their defaults.
pub fn parse_rates(body: &str, now: DateTime<Utc>) -> Result<RateSnapshot, RateError> {
    let response: RateResponse = serde_json::from_str(body)?;

    let as_of = [
        &response.date,
        &response.time_last_updated,
        &response.time_last_update_utc,
    ]
    .into_iter()
    .flatten()
    .filter_map(|raw| decode::<Stamp>(raw))
    .find_map(|stamp| stamp.render())
    .unwrap_or_else(|| now.format("%Y-%m-%d").to_string());

    let table = response
        .rates
        .into_iter()
        .chain(response.conversion_rates)
        .find_map(|raw| decode::<HashMap<String, Box<RawValue>>>(&raw))
        .ok_or(RateError::MissingRates)?;

    let mut rates = HashMap::new();
    for currency in Currency::ALL {
        let default = currency.default_rate();
        let rate = match table.get(currency.code()) {
            Some(value) => match decode::<RateValue>(value).and_then(|v| v.coerce()) {
                Some(rate) => {
                    log::debug!("parsed {} rate: {:.4}", currency, rate);
                    rate
                }
                None => {
                    log::warn!(
                        "unusable {} rate {}, using default {:.4}",
                        currency,
                        value.get(),
                        default
                    );
                    default
                }
            },
            None => {
                log::warn!("no {} rate in response, using default {:.4}", currency, default);
                default
            }
        };
        rates.insert(currency, rate);
    }

    Ok(RateSnapshot::new(rates, as_of, true))
}

fn preview(body: &str) -> String {
    body.chars().take(PREVIEW_CHARS).collect()
}


#[cfg(test)]
mod tests {
    use super::testing::{Reply, ScriptedSource};
    use super::*;
    use chrono::TimeZone;

    const PRIMARY: &str = "https://primary.test/latest";
    const FALLBACK: &str = "https://fallback.test/latest/USD";

    fn endpoints() -> Endpoints {
        Endpoints::new(PRIMARY, FALLBACK, "USD")
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap()
    }

    const FULL_BODY: &str = r#"{
        "base": "USD",
        "date": "2024-03-08",
        "rates": {
            "USD": 1, "EUR": 0.92, "JPY": 147.5, "CNY": 7.19,
            "MYR": 4.71, "TWD": 31.6, "SGD": 1.34, "GBP": 0.79, "CHF": 0.88
        }
    }"#;

    #[test]
    fn test_primary_url_carries_symbols() {
        assert_eq!(
            endpoints().primary,
            "https://primary.test/latest?base=USD&symbols=USD%2CEUR%2CJPY%2CCNY%2CMYR%2CTWD%2CSGD%2CGBP"
        );
        assert_eq!(endpoints().fallback, FALLBACK);
    }

    #[test]
    fn test_partial_rates_fill_defaults() {
        let body = r#"{"rates": {"USD": "1.0", "EUR": 0.85}}"#;
        let snapshot = parse_rates(body, fixed_now()).unwrap();
        assert!(snapshot.is_live);
        assert_eq!(snapshot.rate(Currency::Usd), 1.0);
        assert_eq!(snapshot.rate(Currency::Eur), 0.85);
        assert_eq!(snapshot.rate(Currency::Jpy), Currency::Jpy.default_rate());
        assert_eq!(snapshot.as_of, "2024-03-09");
    }

    #[test]
    fn test_full_rates_are_all_live() {
        let snapshot = parse_rates(FULL_BODY, fixed_now()).unwrap();
        assert!(snapshot.is_live);
        assert_eq!(snapshot.as_of, "2024-03-08");
        let expected = [
            (Currency::Usd, 1.0),
            (Currency::Eur, 0.92),
            (Currency::Jpy, 147.5),
            (Currency::Cny, 7.19),
            (Currency::Myr, 4.71),
            (Currency::Twd, 31.6),
            (Currency::Sgd, 1.34),
            (Currency::Gbp, 0.79),
        ];
        for (currency, rate) in expected {
            assert_eq!(snapshot.rate(currency), rate, "{}", currency);
        }
        assert_eq!(snapshot.rates().len(), 8);
    }

    #[test]
    fn test_conversion_rates_schema_with_unix_timestamp() {
        let body = r#"{
            "time_last_updated": 1700000000,
            "conversion_rates": {"USD": 1, "JPY": "149.8 "}
        }"#;
        let snapshot = parse_rates(body, fixed_now()).unwrap();
        assert_eq!(snapshot.as_of, "2023-11-14 22:13 UTC");
        assert_eq!(snapshot.rate(Currency::Jpy), 149.8);
    }

    #[test]
    fn test_date_field_priority() {
        let body = r#"{
            "time_last_update_utc": "Fri, 08 Mar 2024 00:00:01 +0000",
            "time_last_updated": "2024-03-07",
            "date": "2024-03-06",
            "rates": {}
        }"#;
        assert_eq!(parse_rates(body, fixed_now()).unwrap().as_of, "2024-03-06");

        let body = r#"{
            "time_last_update_utc": "Fri, 08 Mar 2024 00:00:01 +0000",
            "date": {"weird": true},
            "rates": {}
        }"#;
        assert_eq!(
            parse_rates(body, fixed_now()).unwrap().as_of,
            "Fri, 08 Mar 2024 00:00:01 +0000"
        );
    }

    #[test]
    fn test_bad_values_fall_back_per_currency() {
        let body = r#"{"rates": {
            "USD": 1.0, "EUR": "abc", "JPY": null, "CNY": true,
            "MYR": [4.5], "TWD": -3, "SGD": 0, "GBP": "0.8"
        }}"#;
        let snapshot = parse_rates(body, fixed_now()).unwrap();
        assert!(snapshot.is_live);
        for currency in [
            Currency::Eur,
            Currency::Jpy,
            Currency::Cny,
            Currency::Myr,
            Currency::Twd,
            Currency::Sgd,
        ] {
            assert_eq!(snapshot.rate(currency), currency.default_rate(), "{}", currency);
        }
        assert_eq!(snapshot.rate(Currency::Gbp), 0.8);
    }

    #[test]
    fn test_out_of_range_number_falls_back_per_currency() {
        let body = r#"{
            "date": 1e400,
            "time_last_updated": "2024-03-08",
            "rates": {"USD": 1, "EUR": 1e400, "XYZ": 1e400, "JPY": 150}
        }"#;
        let snapshot = parse_rates(body, fixed_now()).unwrap();
        assert!(snapshot.is_live);
        assert_eq!(snapshot.as_of, "2024-03-08");
        assert_eq!(snapshot.rate(Currency::Usd), 1.0);
        assert_eq!(snapshot.rate(Currency::Eur), Currency::Eur.default_rate());
        assert_eq!(snapshot.rate(Currency::Jpy), 150.0);
    }

    #[test]
    fn test_every_value_defaulted_is_still_live() {
        let snapshot = parse_rates(r#"{"rates": {}}"#, fixed_now()).unwrap();
        assert!(snapshot.is_live);
        assert_eq!(snapshot.rates(), RateSnapshot::default().rates());
    }

    #[test]
    fn test_missing_rates_field_is_schema_error() {
        let err = parse_rates(r#"{"date": "2024-03-08"}"#, fixed_now()).unwrap_err();
        assert!(matches!(err, RateError::MissingRates));

        let err = parse_rates(r#"{"rates": "n/a"}"#, fixed_now()).unwrap_err();
        assert!(matches!(err, RateError::MissingRates));
    }

    #[test]
    fn test_non_object_rates_uses_conversion_rates() {
        let body = r#"{"rates": null, "conversion_rates": {"EUR": 0.9}}"#;
        let snapshot = parse_rates(body, fixed_now()).unwrap();
        assert_eq!(snapshot.rate(Currency::Eur), 0.9);
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let err = parse_rates("<html>busy</html>", fixed_now()).unwrap_err();
        assert!(matches!(err, RateError::Parse(_)));
    }

    #[test]
    fn test_primary_success_skips_fallback() {
        let e = endpoints();
        let source = ScriptedSource::new()
            .body(&e.primary, FULL_BODY)
            .body(&e.fallback, r#"{"rates": {}}"#);
        let provider = RateProvider::new(source, e.clone());
        let snapshot = provider.fetch_rates().unwrap();
        assert_eq!(snapshot.rate(Currency::Eur), 0.92);
        assert_eq!(provider.source.calls(), vec![e.primary]);
    }

    #[test]
    fn test_fallback_after_primary_failure() {
        let e = endpoints();
        for failure in [Reply::Down, Reply::Status(503)] {
            let source = ScriptedSource::new()
                .reply(&e.primary, failure)
                .body(&e.fallback, r#"{"conversion_rates": {"GBP": 0.81}}"#);
            let provider = RateProvider::new(source, e.clone());
            let snapshot = provider.fetch_rates().unwrap();
            assert_eq!(snapshot.rate(Currency::Gbp), 0.81);
            assert_eq!(
                provider.source.calls(),
                vec![e.primary.clone(), e.fallback.clone()]
            );
        }
    }

    #[test]
    fn test_both_endpoints_failing() {
        let e = endpoints();
        let source = ScriptedSource::new().reply(&e.fallback, Reply::Status(500));
        let provider = RateProvider::new(source, e.clone());
        let err = provider.fetch_rates().unwrap_err();
        match err {
            RateError::Unreachable { primary, fallback } => {
                assert!(matches!(*primary, RateError::Http(_)));
                assert!(matches!(*fallback, RateError::Status { status: 500, .. }));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_unparsable_primary_does_not_fall_back() {
        let e = endpoints();
        let source = ScriptedSource::new()
            .body(&e.primary, "not json")
            .body(&e.fallback, FULL_BODY);
        let provider = RateProvider::new(source, e.clone());
        assert!(matches!(provider.fetch_rates(), Err(RateError::Parse(_))));
        assert_eq!(provider.source.calls().len(), 1);
    }

    #[test]
    fn test_preview_is_char_safe() {
        let body = "匯".repeat(300);
        assert_eq!(preview(&body).chars().count(), PREVIEW_CHARS);
    }
}
