use anyhow::Result;
use chrono::Utc;

use crate::bot_runtime::BotRuntime;
use crate::mode_runner::run_monitor_once;

/// Runs the stale-task check immediately and then on every interval tick
/// until Ctrl-C or SIGTERM. A failing cycle is logged and the loop continues.
pub(crate) async fn run_monitor_daemon(runtime: &BotRuntime) -> Result<()> {
    tracing::info!(
        interval_secs = runtime.check_interval.as_secs(),
        threshold_days = runtime.stale_threshold_days,
        "starting stale-task monitor daemon"
    );
    let mut interval = tokio::time::interval(runtime.check_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("stale-task monitor shutdown requested");
                return Ok(());
            }
            _ = interval.tick() => {
                match run_monitor_once(runtime, Utc::now()).await {
                    Ok(output) => println!("{output}"),
                    Err(error) => tracing::warn!(
                        error = %format!("{error:#}"),
                        "stale-task check failed"
                    ),
                }
            }
        }
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
            }
            Err(error) => {
                tracing::warn!(error = %error, "failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
