//! Log poller
//!
//! Periodically lists the running jobs of the project and merges each job's
//! recent log lines into the store. Jobs are processed one at a time; a
//! failure for one job is logged and the cycle moves on to the next.

use anyhow::{Context, Result};
use crawler_core::domain::job::Job;
use std::future::Future;
use std::sync::Arc;
use tokio::time::{self, Duration};
use tracing::{debug, error, info};

use crate::config::Config;
use crate::repository::JobRepository;
use crate::service::{LogStore, MergeReport};

/// Outcome of one polling cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    /// Running jobs listed by the service
    pub jobs: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Lines appended to the store across all jobs
    pub lines_appended: usize,
}

/// Poller that continuously crawls job logs into the store
pub struct LogPoller {
    poll_interval: Duration,
    repository: Arc<dyn JobRepository>,
    store: Arc<dyn LogStore>,
}

impl LogPoller {
    /// Creates a new log poller
    pub fn new(
        config: &Config,
        repository: Arc<dyn JobRepository>,
        store: Arc<dyn LogStore>,
    ) -> Self {
        Self {
            poll_interval: config.poll_interval,
            repository,
            store,
        }
    }

    /// Runs cycles until `shutdown` completes, sleeping the poll interval
    /// after each one
    ///
    /// Shutdown is observed both while a cycle is in flight and while
    /// sleeping between cycles.
    pub async fn run_until<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        info!(
            "Starting log poller (interval: {:?})",
            self.poll_interval
        );

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = self.cycle() => {}
            }

            info!("Sleeping for {} seconds", self.poll_interval.as_secs());

            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = time::sleep(self.poll_interval) => {}
            }
        }

        info!("Log poller stopped");
    }

    /// Runs one cycle, logging instead of returning a listing failure
    pub async fn cycle(&self) -> Option<CycleSummary> {
        match self.poll_once().await {
            Ok(summary) => {
                info!(
                    "Crawling finished: {} job(s), {} succeeded, {} failed, {} new line(s)",
                    summary.jobs, summary.succeeded, summary.failed, summary.lines_appended
                );
                Some(summary)
            }
            Err(e) => {
                error!("Failed to execute poll cycle: {:#}", e);
                None
            }
        }
    }

    /// Performs a single poll cycle
    ///
    /// Fails only when the job listing itself fails; per-job failures are
    /// logged and counted in the summary.
    pub async fn poll_once(&self) -> Result<CycleSummary> {
        let jobs = self
            .repository
            .list_active_jobs()
            .await
            .context("Failed to fetch running jobs")?;

        info!(
            "Found {} running job(s): {:?}",
            jobs.len(),
            jobs.iter().map(|job| job.id.as_str()).collect::<Vec<_>>()
        );

        let mut summary = CycleSummary {
            jobs: jobs.len(),
            ..Default::default()
        };

        for job in &jobs {
            match &job.display_name {
                Some(name) => info!("Processing job: {} ({})", job.id, name),
                None => info!("Processing job: {}", job.id),
            }

            match self.process_job(job).await {
                Ok(report) => {
                    summary.succeeded += 1;
                    summary.lines_appended += report.appended();
                }
                Err(e) => {
                    summary.failed += 1;
                    error!("Failed to process job {}: {:#}", job.id, e);
                }
            }
        }

        Ok(summary)
    }

    /// Fetches a job's lines and merges them under its owner key
    async fn process_job(&self, job: &Job) -> Result<MergeReport> {
        let lines = self.repository.fetch_lines(&job.id).await?;
        let owner_key = job.owner_key();

        debug!(
            "Merging {} line(s) of job {} into {}",
            lines.len(),
            job.id,
            owner_key
        );

        let report = self
            .store
            .merge(&owner_key, &lines)
            .with_context(|| format!("Failed to store logs of job {}", job.id))?;

        debug!(
            "Job {} ({}): {} appended, {} already stored, {} rejected",
            job.id,
            report.owner_key,
            report.appended(),
            report.skipped(),
            report.rejected
        );
        Ok(report)
    }
}
