//! One timeframe's monitor loop.
//!
//! The loop alternates between two states: Cycling (fan-out over every
//! symbol in the working set, bounded by the shared permit pool) and Waiting
//! (sleeping out the remainder of the configured interval). Per-symbol
//! failures are contained at the unit boundary; only the whole process stops
//! the loop.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::alert::AlertSink;
use crate::config::TimeframeConfig;
use crate::detector::spike::{SpikeDetector, Verdict};
use crate::exchange::client::CandleSource;
use crate::exchange::types::Timeframe;
use crate::logger::warn_if_slow;

/// Pause after releasing a permit, so a freed slot is not immediately
/// re-filled in a burst even under the concurrency cap.
const PACING_PAUSE: Duration = Duration::from_millis(50);

/// Floor for the inter-cycle sleep when fan-out overruns the interval.
const MIN_CYCLE_PAUSE: Duration = Duration::from_secs(1);

/// Everything a monitor loop shares with its siblings: the candle source
/// (one pooled HTTP client behind it), the alert sink, the detector owning
/// dedup state, and the global permit pool.
pub struct MonitorContext<S, A> {
    pub source: Arc<S>,
    pub sink: Arc<A>,
    pub detector: Arc<SpikeDetector>,
    pub permits: Arc<Semaphore>,
    pub symbols: Arc<Vec<String>>,
}

impl<S, A> Clone for MonitorContext<S, A> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            sink: Arc::clone(&self.sink),
            detector: Arc::clone(&self.detector),
            permits: Arc::clone(&self.permits),
            symbols: Arc::clone(&self.symbols),
        }
    }
}

/// Runs one timeframe's cycle-sleep loop forever.
pub async fn run_timeframe_monitor<S, A>(ctx: MonitorContext<S, A>, cfg: TimeframeConfig)
where
    S: CandleSource,
    A: AlertSink,
{
    info!(
        timeframe = %cfg.timeframe,
        every_s = cfg.interval.as_secs(),
        threshold_pct = cfg.percent_threshold,
        symbols = ctx.symbols.len(),
        "timeframe monitor started"
    );

    loop {
        let started = Instant::now();

        warn_if_slow("cycle_fan_out", cfg.interval, run_cycle(&ctx, &cfg)).await;

        let pause = remaining_sleep(cfg.interval, started.elapsed());
        debug!(
            timeframe = %cfg.timeframe,
            elapsed_ms = started.elapsed().as_millis() as u64,
            sleep_ms = pause.as_millis() as u64,
            "cycle complete; waiting"
        );
        tokio::time::sleep(pause).await;
    }
}

/// One full fan-out: every symbol gets exactly one bounded unit of work, and
/// the cycle advances only after all of them finish (success or contained
/// failure). Nothing here runs unsupervised.
pub async fn run_cycle<S, A>(ctx: &MonitorContext<S, A>, cfg: &TimeframeConfig)
where
    S: CandleSource,
    A: AlertSink,
{
    let units = ctx
        .symbols
        .iter()
        .map(|symbol| check_symbol(ctx, cfg.timeframe, symbol.clone()));

    join_all(units).await;
}

/// One symbol's fetch → evaluate → dispatch, with explicit inputs rather
/// than captured loop variables. The permit covers the network work; the
/// pacing pause runs after release.
async fn check_symbol<S, A>(ctx: &MonitorContext<S, A>, timeframe: Timeframe, symbol: String)
where
    S: CandleSource,
    A: AlertSink,
{
    {
        let _permit = match ctx.permits.acquire().await {
            Ok(p) => p,
            // Closed only on shutdown; nothing left to do.
            Err(_) => return,
        };
        check_one(ctx, timeframe, &symbol).await;
    }

    tokio::time::sleep(PACING_PAUSE).await;
}

async fn check_one<S, A>(ctx: &MonitorContext<S, A>, timeframe: Timeframe, symbol: &str)
where
    S: CandleSource,
    A: AlertSink,
{
    let candle = match ctx.source.fetch_latest_candle(symbol, timeframe).await {
        Ok(Some(candle)) => candle,
        Ok(None) => {
            debug!(symbol = %symbol, timeframe = %timeframe, "no kline data this cycle");
            return;
        }
        Err(e) => {
            warn!(
                error = ?e,
                symbol = %symbol,
                timeframe = %timeframe,
                "candle fetch failed; skipping symbol this cycle"
            );
            return;
        }
    };

    match ctx.detector.evaluate(timeframe, symbol, &candle) {
        Verdict::NotificationDue(alert) => {
            info!(
                symbol = %symbol,
                timeframe = %timeframe,
                direction = %alert.direction,
                change_percent = alert.change_percent,
                open_time = alert.candle.open_time,
                "spike detected"
            );
            ctx.sink.dispatch(&alert).await;
        }
        Verdict::Suppressed => {}
    }
}

/// Remainder of the interval after a cycle's fan-out, clamped to a minimum
/// pause so an overrunning cycle neither stacks nor spins.
fn remaining_sleep(interval: Duration, elapsed: Duration) -> Duration {
    interval.saturating_sub(elapsed).max(MIN_CYCLE_PAUSE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sleeps_out_the_interval_remainder() {
        let pause = remaining_sleep(Duration::from_secs(30), Duration::from_secs(12));
        assert_eq!(pause, Duration::from_secs(18));
    }

    #[test]
    fn overrun_clamps_to_minimum_pause() {
        let pause = remaining_sleep(Duration::from_secs(30), Duration::from_secs(45));
        assert_eq!(pause, MIN_CYCLE_PAUSE);
    }

    #[test]
    fn exact_interval_still_pauses() {
        let pause = remaining_sleep(Duration::from_secs(30), Duration::from_secs(30));
        assert_eq!(pause, MIN_CYCLE_PAUSE);
    }
}
