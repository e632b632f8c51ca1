use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::Semaphore;

use spikewatch::{
    alert::TelegramNotifier,
    config::AppConfig,
    detector::spike::SpikeDetector,
    error::AppError,
    exchange::client::{BINANCE_FAPI, BinanceClient, build_http_client},
    exchange::universe::resolve_universe,
    logger::init_tracing,
    monitor::cycle::MonitorContext,
    monitor::scheduler::spawn_monitors,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let is_production = std::env::var("APP_ENV").unwrap_or_default() == "production";
    init_tracing(is_production);

    tracing::info!("Starting spikewatch...");

    let cfg = AppConfig::from_env();

    // One pooled HTTP client for every outbound call in the process.
    let http = build_http_client().context("build http client")?;

    let client = Arc::new(BinanceClient::new(
        http.clone(),
        BINANCE_FAPI.to_string(),
        cfg.fetch_retries,
        cfg.candle_selection,
    ));

    let symbols = resolve_universe(&client, &cfg.quote_suffix, &cfg.symbol_whitelist)
        .await
        .context("resolve instrument universe")?;

    if symbols.is_empty() {
        return Err(AppError::EmptyUniverse.into());
    }

    let thresholds: HashMap<_, _> = cfg
        .timeframes
        .iter()
        .map(|tf| (tf.timeframe, tf.percent_threshold))
        .collect();

    let ctx = MonitorContext {
        source: client,
        sink: Arc::new(TelegramNotifier::new(
            http,
            cfg.tg_bot_token.clone(),
            cfg.tg_chat_id.clone(),
        )),
        detector: Arc::new(SpikeDetector::new(thresholds)),
        permits: Arc::new(Semaphore::new(cfg.concurrency)),
        symbols: Arc::new(symbols),
    };

    let handles = spawn_monitors(ctx, cfg.timeframes.clone());

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    // All state is in-memory and rebuilt on restart; abandoning in-flight
    // fetches here is safe.
    for handle in handles {
        handle.abort();
    }

    Ok(())
}
