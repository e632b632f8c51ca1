//! Instrument Directory
//!
//! Resolves the fixed working set of symbols once at startup: every actively
//! tradable symbol quoted in the configured currency, optionally intersected
//! with an allow-list. The working set never changes for the life of the
//! process.

use std::collections::HashSet;

use tracing::info;

use crate::exchange::client::BinanceClient;
use crate::exchange::errors::ExchangeError;
use crate::exchange::types::ExchangeInfo;

const TRADABLE_STATUS: &str = "TRADING";

/// One-shot universe resolution. A directory error is fatal to startup;
/// an empty result is returned as-is and the caller decides to abort.
pub async fn resolve_universe(
    client: &BinanceClient,
    quote_suffix: &str,
    allow_list: &[String],
) -> Result<Vec<String>, ExchangeError> {
    let info = client.exchange_info().await?;
    let symbols = filter_universe(info, quote_suffix, allow_list);

    info!(
        count = symbols.len(),
        sample = ?&symbols[..symbols.len().min(12)],
        "instrument universe resolved"
    );

    Ok(symbols)
}

/// Keeps symbols that are actively tradable and carry the quote suffix,
/// then intersects with the allow-list (case-insensitive) when one is set.
pub fn filter_universe(
    info: ExchangeInfo,
    quote_suffix: &str,
    allow_list: &[String],
) -> Vec<String> {
    let allowed: Option<HashSet<String>> = if allow_list.is_empty() {
        None
    } else {
        Some(allow_list.iter().map(|s| s.trim().to_uppercase()).collect())
    };

    info.symbols
        .into_iter()
        .filter(|s| s.status == TRADABLE_STATUS && s.symbol.ends_with(quote_suffix))
        .map(|s| s.symbol)
        .filter(|name| {
            allowed
                .as_ref()
                .is_none_or(|set| set.contains(&name.to_uppercase()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::types::SymbolInfo;

    fn info(entries: &[(&str, &str)]) -> ExchangeInfo {
        ExchangeInfo {
            symbols: entries
                .iter()
                .map(|(symbol, status)| SymbolInfo {
                    symbol: symbol.to_string(),
                    status: status.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn keeps_only_trading_usdt_symbols() {
        let info = info(&[
            ("BTCUSDT", "TRADING"),
            ("ETHUSDT", "TRADING"),
            ("XRPUSDT", "SETTLING"),
            ("BTCBUSD", "TRADING"),
        ]);

        let out = filter_universe(info, "USDT", &[]);
        assert_eq!(out, vec!["BTCUSDT", "ETHUSDT"]);
    }

    #[test]
    fn allow_list_intersects_case_insensitively() {
        let info = info(&[
            ("BTCUSDT", "TRADING"),
            ("ETHUSDT", "TRADING"),
            ("SOLUSDT", "TRADING"),
        ]);

        let allow = vec![" btcusdt ".to_string(), "SOLUSDT".to_string()];
        let out = filter_universe(info, "USDT", &allow);
        assert_eq!(out, vec!["BTCUSDT", "SOLUSDT"]);
    }

    #[test]
    fn empty_catalogue_yields_empty_universe() {
        let out = filter_universe(info(&[]), "USDT", &[]);
        assert!(out.is_empty());
    }
}
