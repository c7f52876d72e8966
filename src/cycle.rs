use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::{Instant, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::{
    publisher::{FlushReport, MetricPublisher},
    record::{parse_line, DimensionExpander},
    sampler::{split_lines, Sampler},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CycleReport {
    /// Lines turned into queued observations.
    pub records: usize,
    /// Lines skipped for having the wrong number of fields.
    pub rejected_lines: usize,
    pub flush: FlushReport,
}

/// One sample, parse and publish pass.
#[derive(Debug)]
pub struct Cycle<S> {
    sampler: S,
    expander: DimensionExpander,
    publisher: MetricPublisher,
}
impl<S: Sampler> Cycle<S> {
    pub fn new(sampler: S, expander: DimensionExpander, publisher: MetricPublisher) -> Self {
        Self {
            sampler,
            expander,
            publisher,
        }
    }

    pub fn publisher(&self) -> &MetricPublisher {
        &self.publisher
    }

    pub async fn run_once(&self) -> anyhow::Result<CycleReport> {
        info!("initiating metric update");
        let output = self.sampler.sample().await?;

        let mut report = CycleReport::default();
        for line in split_lines(&output) {
            let record = match parse_line(line) {
                Ok(record) => record,
                Err(e) => {
                    warn!(error = %e, line, "skipping malformed stats line");
                    report.rejected_lines += 1;
                    continue;
                }
            };
            for observation in self.expander.expand(&record) {
                self.publisher.publish(observation, false).await?;
            }
            report.records += 1;
        }
        info!(
            records = report.records,
            rejected = report.rejected_lines,
            "parsed and queued metric sets"
        );

        report.flush = self.publisher.flush().await?;
        info!(
            chunks = report.flush.chunks,
            data_points = report.flush.data_points,
            "flushed metrics"
        );
        Ok(report)
    }
}

/// Starts a cycle every `period` until `shutdown` resolves.
///
/// Each cycle runs on its own task, so a slow cycle overlaps with the next one.
pub async fn run_periodic<S>(
    cycle: Arc<Cycle<S>>,
    period: Duration,
    shutdown: impl Future<Output = ()>,
) where
    S: Sampler + 'static,
{
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            () = &mut shutdown => break,
            _ = ticker.tick() => {
                let cycle = Arc::clone(&cycle);
                tokio::spawn(async move {
                    if let Err(e) = cycle.run_once().await {
                        error!(error = ?e, "metric update failed");
                    }
                });
            }
        }
    }
}
