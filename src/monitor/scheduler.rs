use tokio::task::JoinHandle;

use crate::alert::AlertSink;
use crate::config::TimeframeConfig;
use crate::exchange::client::CandleSource;
use crate::monitor::cycle::{MonitorContext, run_timeframe_monitor};

/// Spawns one independent monitor loop per configured timeframe.
///
/// All loops share the context (HTTP pool, permit pool, detector, sink) but
/// keep their own cadence; their cycles are free to overlap each other. The
/// loops run until the process stops, so the handles only matter for abort
/// on shutdown.
pub fn spawn_monitors<S, A>(
    ctx: MonitorContext<S, A>,
    timeframes: Vec<TimeframeConfig>,
) -> Vec<JoinHandle<()>>
where
    S: CandleSource + 'static,
    A: AlertSink + 'static,
{
    timeframes
        .into_iter()
        .map(|cfg| {
            let ctx = ctx.clone();
            tokio::spawn(async move {
                run_timeframe_monitor(ctx, cfg).await;
            })
        })
        .collect()
}
