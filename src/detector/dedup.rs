use std::collections::HashMap;

use parking_lot::Mutex;

use crate::exchange::types::Timeframe;

/// Per-(timeframe, symbol) record of the last candle already alerted on.
///
/// The map only grows for the process lifetime: entries are overwritten on a
/// new alert, never removed, and nothing is persisted. Distinct-key writes
/// happen concurrently across symbols, so the map sits behind a lock; the
/// critical sections are a few instructions and never held across an await.
#[derive(Default)]
pub struct DedupState {
    last_alerted: Mutex<HashMap<(Timeframe, String), i64>>,
}

impl DedupState {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if this exact candle was already alerted for the pair.
    pub fn already_alerted(&self, timeframe: Timeframe, symbol: &str, open_time: i64) -> bool {
        self.last_alerted
            .lock()
            .get(&(timeframe, symbol.to_owned()))
            .is_some_and(|&t| t == open_time)
    }

    /// Records `open_time` as the pair's last alerted candle.
    pub fn mark_alerted(&self, timeframe: Timeframe, symbol: &str, open_time: i64) {
        self.last_alerted
            .lock()
            .insert((timeframe, symbol.to_owned()), open_time);
    }
}
