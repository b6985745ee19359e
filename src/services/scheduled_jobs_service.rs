//! Cron-driven background jobs. Currently a single job: the hourly
//! escalation sweep.

use anyhow::Result;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::services::escalation_service::EscalationService;

pub struct ScheduledJobsService {
    scheduler: JobScheduler,
    escalation: Arc<EscalationService>,
}

impl ScheduledJobsService {
    pub async fn new(escalation: Arc<EscalationService>) -> Result<Self> {
        let scheduler = JobScheduler::new().await?;
        Ok(Self {
            scheduler,
            escalation,
        })
    }

    pub async fn start(&self) -> Result<()> {
        info!("Starting scheduled jobs...");
        self.add_escalation_sweep_job().await?;
        self.scheduler.start().await?;
        info!("All scheduled jobs started successfully");
        Ok(())
    }

    /// Hourly, at minute zero. The sweep is idempotent, so an overlapping or
    /// repeated run is harmless.
    async fn add_escalation_sweep_job(&self) -> Result<()> {
        let escalation = Arc::clone(&self.escalation);

        let job = Job::new_async("0 0 * * * *", move |_uuid, _l| {
            let escalation = Arc::clone(&escalation);
            Box::pin(async move {
                info!("Running escalation_sweep job...");
                match escalation.run_sweep().await {
                    Ok(report) => {
                        info!("Escalation sweep complete: {} escalated", report.escalated_count)
                    }
                    Err(e) => error!("Escalation sweep failed: {}", e),
                }
            })
        })?;

        self.scheduler.add(job).await?;
        info!("Added escalation_sweep job (hourly)");
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        info!("Shutting down scheduled jobs...");
        self.scheduler.shutdown().await?;
        Ok(())
    }
}
