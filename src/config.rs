use std::str::FromStr;
use std::time::Duration;

use crate::exchange::types::{CandleSelection, Timeframe};

#[derive(Clone, Debug)]
pub struct TimeframeConfig {
    pub timeframe: Timeframe,

    /// How often this timeframe's monitor loop starts a new cycle.
    pub interval: Duration,

    /// Absolute open-to-close move (in percent) that counts as a spike.
    pub percent_threshold: f64,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Telegram bot credentials. Both empty => the notifier runs dry and
    /// alerts are only logged. The only settings without a usable default.
    pub tg_bot_token: String,
    pub tg_chat_id: String,

    /// One monitor loop per entry; loops run concurrently and are not
    /// phase-aligned.
    pub timeframes: Vec<TimeframeConfig>,

    // =========================
    // Fetch configuration
    // =========================
    /// Global bound on in-flight kline fetches, shared by all loops.
    ///
    /// This models the exchange-wide rate limit, so it deliberately does not
    /// care which timeframe a request serves.
    pub concurrency: usize,

    /// Attempts per kline fetch before the symbol is skipped for the cycle.
    pub fetch_retries: usize,

    /// Whether a fetch reports the still-forming bar (low latency) or the
    /// last closed one.
    pub candle_selection: CandleSelection,

    // =========================
    // Universe configuration
    // =========================
    /// Only symbols quoted in this currency are monitored.
    pub quote_suffix: String,

    /// Optional allow-list; empty means "every eligible symbol".
    pub symbol_whitelist: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            tg_bot_token: std::env::var("TG_BOT_TOKEN").unwrap_or_default(),
            tg_chat_id: std::env::var("TG_CHAT_ID").unwrap_or_default(),

            timeframes: vec![
                TimeframeConfig {
                    timeframe: Timeframe::M1,
                    interval: Duration::from_secs(env_or("CHECK_INTERVAL_1M_SECONDS", 30)),
                    percent_threshold: env_or("PERCENT_THRESHOLD_1M", 3.5),
                },
                TimeframeConfig {
                    timeframe: Timeframe::M5,
                    interval: Duration::from_secs(env_or("CHECK_INTERVAL_5M_SECONDS", 150)),
                    percent_threshold: env_or("PERCENT_THRESHOLD_5M", 5.0),
                },
            ],

            concurrency: env_or("CONCURRENCY", 12_usize).max(1),
            fetch_retries: env_or("FETCH_RETRIES", 3_usize).max(1),
            candle_selection: candle_selection_from_env(),

            quote_suffix: std::env::var("QUOTE_SUFFIX").unwrap_or_else(|_| "USDT".to_string()),
            symbol_whitelist: parse_allow_list(
                &std::env::var("SYMBOL_WHITELIST").unwrap_or_default(),
            ),
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn candle_selection_from_env() -> CandleSelection {
    match std::env::var("CANDLE_SELECTION").as_deref() {
        Ok("closed") => CandleSelection::LastClosed,
        _ => CandleSelection::Forming,
    }
}

/// Comma-separated allow-list; blank entries are dropped.
pub fn parse_allow_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_list_splits_and_trims() {
        let out = parse_allow_list(" btcusdt, ETHUSDT ,,solusdt,");
        assert_eq!(out, vec!["btcusdt", "ETHUSDT", "solusdt"]);
    }

    #[test]
    fn empty_allow_list_is_empty() {
        assert!(parse_allow_list("").is_empty());
        assert!(parse_allow_list(" , ,").is_empty());
    }
}
