use std::cmp::Ordering;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::{
    client::{error::ClientError, AutoShortClient},
    constants::{ACCOUNT_ID_HEADER, CEDEAR_SUFFIX, SETTLEMENT_SEGMENT, TICKERS_PATH, TICKER_PATH},
    types::{ApiUrl, ConfigError, InstrumentCode},
};

impl AutoShortClient {
    /// Get the quote of an instrument, order book included.
    ///
    /// Waits for the login to settle first. The upstream answer is unwrapped to a single
    /// snapshot and both ladders are sorted by ascending price.
    pub async fn get_quote(&self, request: &QuoteRequest) -> Result<QuoteSnapshot, ClientError> {
        let session = self.wait_until_authenticated().await?;

        let url = quote_url(self.credentials().api_url(), request);
        progress!(
            self.inner.config.verbose,
            class = ?request.class,
            "Getting information for: {}",
            request.code
        );

        let response = self
            .inner
            .http
            .get(&url)
            .bearer_auth(&session.access_token)
            .header(ACCOUNT_ID_HEADER, &session.id_account)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ClientError::UnexpectedStatus {
                url,
                status: status.as_u16(),
                body,
            });
        }

        let payload: Value = serde_json::from_str(&body)?;
        normalize_quote(payload, request.code.as_str())
    }
}

/// Kind of instrument, which decides the lookup path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum InstrumentClass {
    /// Searched among tickers settled on segment `C`
    #[default]
    Default,
    /// Looked up on the fixed ARS market segment
    #[value(alias = "cedears")]
    Cedear,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteRequest {
    pub code: InstrumentCode,
    pub class: InstrumentClass,
}

impl QuoteRequest {
    pub fn new(code: &str) -> Result<Self, ConfigError> {
        Self::with_class(code, InstrumentClass::Default)
    }

    pub fn cedear(code: &str) -> Result<Self, ConfigError> {
        Self::with_class(code, InstrumentClass::Cedear)
    }

    pub fn with_class(code: &str, class: InstrumentClass) -> Result<Self, ConfigError> {
        Ok(Self {
            code: InstrumentCode::new(code)?,
            class,
        })
    }
}

/// One level of an order book side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BookLevel {
    pub price: f64,
    pub size: f64,
}

/// Quote of an instrument as returned by the markets endpoints.
///
/// Fields not modelled here are kept in `extra`.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteSnapshot {
    pub short_ticker: Option<String>,
    pub long_ticker: Option<String>,
    pub instrument_code: Option<String>,
    pub instrument_name: Option<String>,
    pub instrument_short_name: Option<String>,
    pub instrument_type: Option<String>,
    pub instrument_subtype: Option<String>,
    pub logo_file_name: Option<String>,
    pub id_venue: Option<String>,
    pub id_session: Option<String>,
    pub id_segment: Option<String>,
    pub settlement_days: Option<i64>,
    pub currency: Option<String>,
    pub price_factor: Option<f64>,
    pub contract_size: Option<f64>,
    pub min_lot_size: Option<f64>,
    pub id_security: Option<i64>,
    pub tick_size: Option<f64>,
    pub id_tick_size_rule: Option<String>,
    pub term: Option<String>,
    /// Trading date, `YYYY-MM-DD`
    pub date: Option<String>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub prev_close: Option<f64>,
    pub last: Option<f64>,
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    pub turnover: Option<f64>,
    pub volume: Option<f64>,
    pub variation: Option<f64>,
    pub is_favorite: Option<bool>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub bids: Vec<BookLevel>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub asks: Vec<BookLevel>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl QuoteSnapshot {
    pub fn best_bid(&self) -> Option<&BookLevel> {
        self.bids.last()
    }

    pub fn best_ask(&self) -> Option<&BookLevel> {
        self.asks.first()
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<BookLevel>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<BookLevel>>::deserialize(deserializer)?.unwrap_or_default())
}

fn quote_url(api_url: &ApiUrl, request: &QuoteRequest) -> String {
    match request.class {
        InstrumentClass::Default => api_url.join(&format!(
            "{}/{}?segment={}",
            TICKERS_PATH, request.code, SETTLEMENT_SEGMENT
        )),
        InstrumentClass::Cedear => {
            api_url.join(&format!("{}/{}-{}", TICKER_PATH, request.code, CEDEAR_SUFFIX))
        }
    }
}

/// Unwrap a bare object or the first element of a sequence, then sort both ladders.
pub fn normalize_quote(payload: Value, code: &str) -> Result<QuoteSnapshot, ClientError> {
    let object = match payload {
        Value::Array(items) => items
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::EmptyQuote(code.to_string()))?,
        other => other,
    };

    let mut snapshot: QuoteSnapshot = serde_json::from_value(object)?;
    sort_ladder(&mut snapshot.bids);
    sort_ladder(&mut snapshot.asks);
    Ok(snapshot)
}

/// Ascending by price; equal prices keep their upstream order.
fn sort_ladder(levels: &mut [BookLevel]) {
    levels.sort_by(|a, b| a.price.partial_cmp(&b.price).unwrap_or(Ordering::Equal));
}
