use std::fmt;

use serde::Deserialize;
use serde_json::Value;

use crate::exchange::errors::ExchangeError;

/// Candle granularity, which also governs how often its monitor loop polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timeframe {
    M1,
    M5,
}

impl Timeframe {
    /// Interval parameter as the exchange expects it.
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::M1 => "1m",
            Timeframe::M5 => "5m",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which of the last two bars a fetch should report.
///
/// `Forming` inspects the still-open bar (low detection latency, may alert on
/// a move that partially reverses before close). `LastClosed` waits for the
/// previous, finished bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandleSelection {
    Forming,
    LastClosed,
}

#[derive(Debug, Deserialize)]
pub struct ExchangeInfo {
    pub symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
pub struct SymbolInfo {
    pub symbol: String,
    pub status: String,
}

/// One OHLC price bar for a single symbol and timeframe.
#[derive(Debug, Clone, PartialEq)]
pub struct Candle {
    pub open_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub close_time: i64,
}

impl Candle {
    /// Decodes a kline row from the exchange's fixed-position array form:
    /// `[open_time, open, high, low, close, volume, close_time, ...]`,
    /// with prices encoded as strings.
    pub fn from_kline(row: &[Value]) -> Result<Self, ExchangeError> {
        Ok(Self {
            open_time: field_i64(row, 0)?,
            open: field_f64(row, 1)?,
            high: field_f64(row, 2)?,
            low: field_f64(row, 3)?,
            close: field_f64(row, 4)?,
            volume: field_f64(row, 5)?,
            close_time: field_i64(row, 6)?,
        })
    }
}

fn field_i64(row: &[Value], idx: usize) -> Result<i64, ExchangeError> {
    row.get(idx)
        .and_then(Value::as_i64)
        .ok_or(ExchangeError::MalformedKline { field: idx })
}

fn field_f64(row: &[Value], idx: usize) -> Result<f64, ExchangeError> {
    let v = row.get(idx).ok_or(ExchangeError::MalformedKline { field: idx })?;
    match v {
        Value::String(s) => s
            .parse::<f64>()
            .map_err(|_| ExchangeError::MalformedKline { field: idx }),
        Value::Number(n) => n
            .as_f64()
            .ok_or(ExchangeError::MalformedKline { field: idx }),
        _ => Err(ExchangeError::MalformedKline { field: idx }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn kline_row() -> Vec<Value> {
        // Shape as returned by /fapi/v1/klines (tail columns unused here).
        json!([
            1_700_000_000_000_i64,
            "100.5",
            "104.2",
            "99.1",
            "103.7",
            "1234.56",
            1_700_000_059_999_i64,
            "127890.1",
            420,
            "600.0",
            "62000.0",
            "0"
        ])
        .as_array()
        .cloned()
        .unwrap()
    }

    #[test]
    fn decodes_positional_kline_row() {
        let c = Candle::from_kline(&kline_row()).expect("decode kline");
        assert_eq!(c.open_time, 1_700_000_000_000);
        assert_eq!(c.open, 100.5);
        assert_eq!(c.high, 104.2);
        assert_eq!(c.low, 99.1);
        assert_eq!(c.close, 103.7);
        assert_eq!(c.volume, 1234.56);
        assert_eq!(c.close_time, 1_700_000_059_999);
    }

    #[test]
    fn rejects_truncated_row() {
        let row = kline_row()[..4].to_vec();
        let err = Candle::from_kline(&row).unwrap_err();
        assert!(matches!(err, ExchangeError::MalformedKline { field: 4 }));
    }

    #[test]
    fn rejects_non_numeric_price() {
        let mut row = kline_row();
        row[1] = json!("not-a-price");
        let err = Candle::from_kline(&row).unwrap_err();
        assert!(matches!(err, ExchangeError::MalformedKline { field: 1 }));
    }
}
