use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::alert::AlertSink;
use crate::detector::spike::SpikeAlert;

pub const TELEGRAM_API: &str = "https://api.telegram.org";

/// Characters the Telegram MarkdownV2 parser treats as markup in free text.
const MARKDOWN_V2_RESERVED: &[char] = &[
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
];

/// Backslash-escapes MarkdownV2-reserved characters in free text.
/// Not for use inside code spans, where only backtick and backslash matter.
pub fn escape_markdown_v2(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if MARKDOWN_V2_RESERVED.contains(&ch) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

pub struct TelegramNotifier {
    http: Client,
    api_base: String,
    token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(http: Client, token: String, chat_id: String) -> Self {
        Self {
            http,
            api_base: TELEGRAM_API.to_string(),
            token,
            chat_id,
        }
    }

    /// With no credentials the notifier runs dry: alerts are logged locally
    /// and nothing is sent, so the rest of the system still exercises.
    fn is_configured(&self) -> bool {
        !self.token.is_empty() && !self.chat_id.is_empty()
    }
}

fn format_alert(alert: &SpikeAlert) -> String {
    let at = DateTime::from_timestamp_millis(alert.detected_at_ms as i64)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_default();

    format!(
        "*Spike detected* `{symbol}` {tf}\n\
         Direction: *{direction}*\n\
         Change: `{change:+.2}%`\n\
         Open: `{open}` Close: `{close}`\n\
         High/Low: `{high}` / `{low}`\n\
         Volume: `{volume}`\n\
         At: `{at}`",
        symbol = alert.symbol,
        tf = escape_markdown_v2(&format!("({} candle)", alert.timeframe)),
        direction = alert.direction,
        change = alert.change_percent,
        open = alert.candle.open,
        close = alert.candle.close,
        high = alert.candle.high,
        low = alert.candle.low,
        volume = alert.candle.volume,
        at = at,
    )
}

#[async_trait]
impl AlertSink for TelegramNotifier {
    async fn dispatch(&self, alert: &SpikeAlert) {
        let text = format_alert(alert);

        if !self.is_configured() {
            info!(
                symbol = %alert.symbol,
                timeframe = %alert.timeframe,
                direction = %alert.direction,
                change_percent = alert.change_percent,
                "telegram credentials unset; alert logged only"
            );
            return;
        }

        let url = format!("{}/bot{}/sendMessage", self.api_base, self.token);
        let payload = serde_json::json!({
            "chat_id": self.chat_id,
            "text": text,
            "parse_mode": "MarkdownV2",
        });

        match self.http.post(&url).json(&payload).send().await {
            Ok(resp) if resp.status().is_success() => {
                debug!(symbol = %alert.symbol, "alert delivered");
            }
            Ok(resp) => {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                warn!(
                    %status,
                    body = %body,
                    symbol = %alert.symbol,
                    "telegram rejected alert"
                );
            }
            Err(e) => {
                warn!(error = ?e, symbol = %alert.symbol, "telegram send failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::spike::Direction;
    use crate::exchange::types::{Candle, Timeframe};

    fn alert() -> SpikeAlert {
        SpikeAlert {
            symbol: "BTCUSDT".to_string(),
            timeframe: Timeframe::M1,
            direction: Direction::Up,
            change_percent: 3.72,
            candle: Candle {
                open_time: 1_700_000_000_000,
                open: 100.0,
                high: 104.2,
                low: 99.5,
                close: 103.72,
                volume: 1234.5,
                close_time: 1_700_000_059_999,
            },
            detected_at_ms: 1_700_000_030_000,
        }
    }

    #[test]
    fn escapes_all_reserved_characters() {
        let escaped = escape_markdown_v2("a_b*c[d]e(f)g.h!i-j");
        assert_eq!(escaped, r"a\_b\*c\[d\]e\(f\)g\.h\!i\-j");
    }

    #[test]
    fn leaves_plain_text_untouched() {
        assert_eq!(escape_markdown_v2("BTCUSDT up 4 percent"), "BTCUSDT up 4 percent");
    }

    #[test]
    fn formats_direction_and_magnitude() {
        let text = format_alert(&alert());
        assert!(text.contains("*Spike detected* `BTCUSDT`"));
        assert!(text.contains(r"\(1m candle\)"));
        assert!(text.contains("*UP*"));
        assert!(text.contains("`+3.72%`"));
        assert!(text.contains("`104.2` / `99.5`"));
        assert!(text.contains("2023-11-14"));
    }

    #[tokio::test]
    async fn unconfigured_notifier_is_a_quiet_no_op() {
        let notifier = TelegramNotifier::new(Client::new(), String::new(), String::new());
        // Must neither panic nor attempt network I/O.
        notifier.dispatch(&alert()).await;
    }
}
