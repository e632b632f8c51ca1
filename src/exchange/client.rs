use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::exchange::errors::ExchangeError;
use crate::exchange::types::{Candle, CandleSelection, ExchangeInfo, Timeframe};

pub const BINANCE_FAPI: &str = "https://fapi.binance.com";

const EXCHANGE_INFO_PATH: &str = "/fapi/v1/exchangeInfo";
const KLINES_PATH: &str = "/fapi/v1/klines";

/// Two bars are enough to pick either the forming or the last closed one.
const KLINE_LIMIT: u32 = 2;

/// Fixed pause between retry attempts for one kline fetch.
const RETRY_PAUSE: Duration = Duration::from_millis(500);

/// Shared pooled HTTP client; every outbound call in the process reuses it.
pub fn build_http_client() -> Result<Client, ExchangeError> {
    let http = Client::builder()
        .timeout(Duration::from_secs(20))
        .pool_idle_timeout(Duration::from_secs(30))
        .tcp_keepalive(Duration::from_secs(30))
        .build()?;

    Ok(http)
}

/// Source of the most recent candle for one symbol/timeframe pair.
///
/// `Ok(None)` means the exchange had no bars; `Err` means the fetch failed
/// even after the client's bounded retries. Callers treat both as "no data
/// this cycle" and must not let either abort sibling checks.
#[async_trait]
pub trait CandleSource: Send + Sync {
    async fn fetch_latest_candle(
        &self,
        symbol: &str,
        timeframe: Timeframe,
    ) -> Result<Option<Candle>, ExchangeError>;
}

#[derive(Clone)]
pub struct BinanceClient {
    http: Client,
    base_url: String,
    retry_count: usize,
    selection: CandleSelection,
}

impl BinanceClient {
    pub fn new(
        http: Client,
        base_url: String,
        retry_count: usize,
        selection: CandleSelection,
    ) -> Self {
        Self {
            http,
            base_url,
            retry_count: retry_count.max(1),
            selection,
        }
    }

    /// One-shot directory call. Errors propagate: a wrong or missing
    /// universe must not silently start a no-op monitor.
    #[instrument(skip(self), level = "debug")]
    pub async fn exchange_info(&self) -> Result<ExchangeInfo, ExchangeError> {
        let url = format!("{}{}", self.base_url, EXCHANGE_INFO_PATH);

        let resp = self.http.get(&url).send().await?.error_for_status()?;
        let info: ExchangeInfo = resp.json().await?;

        debug!(symbols = info.symbols.len(), "exchange directory fetched");

        Ok(info)
    }

    async fn klines(
        &self,
        symbol: &str,
        timeframe: Timeframe,
    ) -> Result<Vec<Vec<Value>>, ExchangeError> {
        let url = format!("{}{}", self.base_url, KLINES_PATH);
        let limit = KLINE_LIMIT.to_string();

        let resp = self
            .http
            .get(&url)
            .query(&[
                ("symbol", symbol),
                ("interval", timeframe.as_str()),
                ("limit", limit.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?;

        Ok(resp.json().await?)
    }
}

#[async_trait]
impl CandleSource for BinanceClient {
    #[instrument(
        skip(self),
        fields(symbol = %symbol, timeframe = %timeframe),
        level = "debug"
    )]
    async fn fetch_latest_candle(
        &self,
        symbol: &str,
        timeframe: Timeframe,
    ) -> Result<Option<Candle>, ExchangeError> {
        let mut attempt = 0;
        let rows = loop {
            attempt += 1;
            match self.klines(symbol, timeframe).await {
                Ok(rows) => break rows,
                Err(e) if attempt < self.retry_count => {
                    warn!(
                        error = ?e,
                        symbol = %symbol,
                        attempt,
                        "kline fetch failed; retrying"
                    );
                    tokio::time::sleep(RETRY_PAUSE).await;
                }
                Err(e) => return Err(e),
            }
        };

        let Some(row) = select_row(&rows, self.selection) else {
            return Ok(None);
        };

        Ok(Some(Candle::from_kline(row)?))
    }
}

/// Picks the bar a fetch should report from the exchange's oldest-first rows.
fn select_row(rows: &[Vec<Value>], selection: CandleSelection) -> Option<&Vec<Value>> {
    match selection {
        CandleSelection::Forming => rows.last(),
        CandleSelection::LastClosed if rows.len() >= 2 => rows.get(rows.len() - 2),
        CandleSelection::LastClosed => rows.last(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows() -> Vec<Vec<Value>> {
        let closed = json!([1, "10", "11", "9", "10.5", "100", 2])
            .as_array()
            .cloned()
            .unwrap();
        let forming = json!([3, "10.5", "12", "10", "11.8", "40", 4])
            .as_array()
            .cloned()
            .unwrap();
        vec![closed, forming]
    }

    #[test]
    fn forming_selection_takes_latest_row() {
        let rows = rows();
        let row = select_row(&rows, CandleSelection::Forming).expect("row");
        assert_eq!(row[0], json!(3), "latest (still-open) bar expected");
    }

    #[test]
    fn closed_selection_takes_previous_row() {
        let rows = rows();
        let row = select_row(&rows, CandleSelection::LastClosed).expect("row");
        assert_eq!(row[0], json!(1));
    }

    #[test]
    fn closed_selection_with_single_row_falls_back() {
        let rows = rows()[..1].to_vec();
        let row = select_row(&rows, CandleSelection::LastClosed).expect("row");
        assert_eq!(row[0], json!(1));
    }

    #[test]
    fn empty_rows_select_nothing() {
        assert!(select_row(&[], CandleSelection::Forming).is_none());
        assert!(select_row(&[], CandleSelection::LastClosed).is_none());
    }
}
