//! The outer retry wrapper around the relay tick: run a tick, sleep, repeat;
//! on failure, alert, count the failure against the retry budget, wait, and
//! try again, until either a shutdown signal arrives or the retry budget is
//! exhausted.

use crate::alerting::AlertingSink;
use crate::relay::tick::{RelayTick, TickError};
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub struct EngineConfig {
    pub max_retries: u32,
    pub retry_interval: Duration,
    pub relay_interval: Duration,
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("relay tick failed: {0}")]
    Tick(#[from] TickError),
}

/// Runs the outer retry wrapper until `cancellation` fires or `max_retries`
/// is exhausted. `tick` is invoked once per `relay_interval`; its error type
/// doesn't matter to the wrapper beyond being loggable, since every tick
/// error is handled the same way: log it, alert, wait, and retry.
pub async fn run<'a, F>(
    config: &EngineConfig,
    alerting: &dyn AlertingSink,
    cancellation: CancellationToken,
    mut tick: F,
) where
    F: FnMut() -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<(), TickError>> + Send + 'a>>,
{
    let mut retries: u32 = 0;
    info!("relay engine starting");

    loop {
        if cancellation.is_cancelled() {
            info!("cancellation signalled, stopping");
            return;
        }

        tokio::select! {
            _ = cancellation.cancelled() => {
                info!("cancellation signalled during tick, stopping");
                return;
            }
            result = tick() => {
                match result {
                    Ok(()) => {
                        retries = 0;
                    }
                    Err(e) => {
                        error!(retries, error = %e, "tick failed");
                        alerting.notify(&format!("relay tick failed (retry {retries}): {e}")).await;

                        retries += 1;
                        if retries >= config.max_retries {
                            error!(retries, "max retries exhausted, stopping");
                            alerting
                                .notify("relay engine exiting: max retries exhausted")
                                .await;
                            return;
                        }

                        tokio::select! {
                            _ = cancellation.cancelled() => {
                                info!("cancellation signalled during retry wait, stopping");
                                return;
                            }
                            _ = sleep(config.retry_interval) => {}
                        }
                        continue;
                    }
                }
            }
        }

        tokio::select! {
            _ = cancellation.cancelled() => {
                info!("cancellation signalled after tick, stopping");
                return;
            }
            _ = sleep(config.relay_interval) => {}
        }
    }
}

/// Convenience wrapper that owns the tick's dependencies by reference for the
/// lifetime of the engine run, matching [`RelayTick`]'s borrow shape.
pub async fn run_with_tick(
    config: &EngineConfig,
    alerting: &dyn AlertingSink,
    cancellation: CancellationToken,
    relay_tick: &RelayTick<'_>,
) {
    run(config, alerting, cancellation, || Box::pin(relay_tick.run())).await
}
