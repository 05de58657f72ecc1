use crate::collectors::collector::Collector;
use eyre::{
    eyre,
    Result,
    WrapErr,
};
use std::{
    sync::Arc,
    time::Duration,
};
use tokio::{
    task::JoinSet,
    time::{
        interval_at,
        Instant,
        MissedTickBehavior,
    },
};
use tokio_util::sync::CancellationToken;

/// Runs a set of collectors on a fixed period until cancelled.
///
/// Every collector gets its own task. Each runs once straight away, then once
/// per tick. A run is always awaited before the next tick is taken, so runs of
/// the same collector never overlap; ticks missed while a run was too slow are
/// dropped.
pub struct PeriodicScheduler {
    interval: Duration,
    collectors: Vec<Arc<dyn Collector>>,
}

impl PeriodicScheduler {
    pub fn new(interval: Duration, collectors: Vec<Arc<dyn Collector>>) -> Self {
        Self {
            interval,
            collectors,
        }
    }

    /// Returns `Ok` once `cancel` fires, or the first error a collector lets
    /// escape. That error cancels the remaining loops first.
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        let token = cancel.child_token();
        let mut tasks = JoinSet::new();

        for collector in self.collectors {
            tasks.spawn(collect_loop(collector, self.interval, token.clone()));
        }

        let mut first_error = None;
        while let Some(joined) = tasks.join_next().await {
            let result = match joined {
                Ok(result) => result,
                Err(e) if e.is_cancelled() => Ok(()),
                Err(e) => Err(eyre!(e).wrap_err("collector task panicked")),
            };

            if let Err(e) = result {
                if first_error.is_none() {
                    token.cancel();
                    first_error = Some(e);
                } else {
                    debug!(error = ?e, "ignoring error after scheduler shutdown started");
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

async fn collect_loop(collector: Arc<dyn Collector>, period: Duration, token: CancellationToken) -> Result<()> {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        let started = Instant::now();
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            result = collector.collect() => {
                result.wrap_err_with(|| format!("collector {} failed", collector.name()))?;
            }
        }

        if started.elapsed() > period {
            warn!(
                collector = %collector.name(),
                period = %humantime::format_duration(period),
                "collection overran interval, skipping missed ticks"
            );
        }

        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }
    }

    debug!(collector = %collector.name(), "collection loop stopped");
    Ok(())
}
