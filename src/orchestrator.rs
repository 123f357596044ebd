use crate::config::ScoutConfig;
use crate::error::Result;
use crate::models::{ResultRecord, ResultTable};
use crate::report::{columns, ReportSink};
use crate::session::UiSession;
use crate::workflow::RegionWorkflow;
use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Outcome of one pass over all configured regions
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub table: ResultTable,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub failures: usize,
}

/// Runs the region workflow for every configured region on one shared session
pub struct Orchestrator<'a> {
    session: &'a dyn UiSession,
    config: &'a ScoutConfig,
}

impl<'a> Orchestrator<'a> {
    pub fn new(session: &'a dyn UiSession, config: &'a ScoutConfig) -> Self {
        Self { session, config }
    }

    /// Process every region in order. A failing region keeps its partial
    /// record and never stops the batch.
    pub async fn run(&self) -> RunSummary {
        let started_at = Utc::now();
        let started = Instant::now();

        if let Err(e) = self
            .session
            .navigate(&self.config.site_url, self.config.timeouts.navigation())
            .await
        {
            error!("Could not open {}: {}", self.config.site_url, e);
        }

        let workflow = RegionWorkflow::new(self.session, self.config);
        let mut table = ResultTable::with_capacity(self.config.regions.len());
        let mut failures = 0;

        for (i, region) in self.config.regions.iter().enumerate() {
            info!(
                "[{}/{}] Processing {}",
                i + 1,
                self.config.regions.len(),
                region
            );
            let mut record = ResultRecord::new(region.clone(), &self.config.sold_windows);

            if let Err(err) = workflow.run(region, &mut record).await {
                warn!(
                    region = %region,
                    step = %err.step,
                    "Region failed, keeping partial record: {}",
                    err.source
                );
                record.failure = Some(format!("{}: {}", err.step, err.source));
                failures += 1;
            }
            table.push(record);
        }

        let elapsed = started.elapsed();
        info!(
            "Processed {} regions ({} failed) in {:.1}s",
            table.len(),
            failures,
            elapsed.as_secs_f64()
        );

        RunSummary {
            table,
            started_at,
            elapsed,
            failures,
        }
    }

    /// Run, then hand the whole table to `sink`. Only a sink failure is an error.
    pub async fn run_and_report(&self, sink: &dyn ReportSink) -> Result<RunSummary> {
        let summary = self.run().await;
        sink.write(&summary.table, &columns(&self.config.sold_windows))?;
        Ok(summary)
    }
}
