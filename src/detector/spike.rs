//! Spike detection over one candle at a time.
//!
//! `evaluate` is the only writer of dedup state, and the anti-spam invariant
//! lives entirely here: at most one alert per (timeframe, symbol, open_time)
//! tuple for the process lifetime.

use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use crate::detector::dedup::DedupState;
use crate::exchange::types::{Candle, Timeframe};
use crate::time::now_ms;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => f.write_str("UP"),
            Direction::Down => f.write_str("DOWN"),
        }
    }
}

/// Everything the dispatcher needs to format a notification.
#[derive(Debug, Clone, PartialEq)]
pub struct SpikeAlert {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub direction: Direction,
    pub change_percent: f64,
    pub candle: Candle,
    pub detected_at_ms: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    NotificationDue(SpikeAlert),
    Suppressed,
}

/// Open-to-close change in percent. A zero open never breaches: there is no
/// meaningful percentage move off a zero base.
pub fn percent_change(open: f64, close: f64) -> f64 {
    if open == 0.0 {
        0.0
    } else {
        (close - open) / open * 100.0
    }
}

/// Owns the dedup state and the per-timeframe thresholds. One instance is
/// shared by every monitor loop.
pub struct SpikeDetector {
    thresholds: HashMap<Timeframe, f64>,
    dedup: DedupState,
}

impl SpikeDetector {
    pub fn new(thresholds: HashMap<Timeframe, f64>) -> Self {
        Self {
            thresholds,
            dedup: DedupState::new(),
        }
    }

    fn threshold(&self, timeframe: Timeframe) -> f64 {
        // Unknown timeframe -> never alert.
        self.thresholds
            .get(&timeframe)
            .copied()
            .unwrap_or(f64::INFINITY)
    }

    /// Decides whether `candle` warrants a notification for this pair.
    ///
    /// An already-alerted open_time suppresses unconditionally, even if the
    /// threshold is still breached. A below-threshold candle leaves dedup
    /// state untouched, so a later, larger move within the same still-open
    /// candle can still fire once.
    pub fn evaluate(&self, timeframe: Timeframe, symbol: &str, candle: &Candle) -> Verdict {
        if self.dedup.already_alerted(timeframe, symbol, candle.open_time) {
            debug!(
                symbol = %symbol,
                timeframe = %timeframe,
                open_time = candle.open_time,
                "candle already alerted; suppressing"
            );
            return Verdict::Suppressed;
        }

        let change = percent_change(candle.open, candle.close);
        if change.abs() < self.threshold(timeframe) {
            return Verdict::Suppressed;
        }

        self.dedup.mark_alerted(timeframe, symbol, candle.open_time);

        let direction = if change > 0.0 {
            Direction::Up
        } else {
            Direction::Down
        };

        Verdict::NotificationDue(SpikeAlert {
            symbol: symbol.to_owned(),
            timeframe,
            direction,
            change_percent: change,
            candle: candle.clone(),
            detected_at_ms: now_ms(),
        })
    }
}
