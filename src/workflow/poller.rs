//! Polling a job until it leaves the RUNNING state

use crate::config::PollingConfig;
use crate::error::{Error, Result};
use crate::types::{JobId, JobStatus};
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;

/// Source of job status snapshots
///
/// Implemented by [`JobServiceClient`](crate::client::JobServiceClient); tests
/// substitute scripted sources.
#[async_trait]
pub trait JobStatusSource: Send + Sync {
    /// Fetch the current status of `job_id`
    async fn job_status(&self, job_id: &JobId) -> Result<JobStatus>;
}

/// Polls a [`JobStatusSource`] at a fixed interval until a terminal status or a deadline
#[derive(Debug)]
pub struct JobPoller<S> {
    source: S,
    interval: Duration,
    default_timeout: Duration,
}

impl<S: JobStatusSource> JobPoller<S> {
    /// Create a poller using the configured interval and default timeout
    pub fn new(source: S, polling: &PollingConfig) -> Self {
        Self {
            source,
            interval: polling.poll_interval,
            default_timeout: polling.job_wait_timeout,
        }
    }

    /// Wait for `job_id` using the configured default timeout
    pub async fn wait(&self, job_id: &JobId) -> Result<JobStatus> {
        self.wait_for_terminal(job_id, self.default_timeout).await
    }

    /// Poll until the job reports a status other than RUNNING
    ///
    /// The deadline is checked before every poll, so no status request is made
    /// once `timeout` has elapsed. Errors from the status source are returned
    /// immediately; there is no retry.
    ///
    /// # Errors
    ///
    /// [`Error::JobTimeout`] if the job is still running when the deadline passes.
    pub async fn wait_for_terminal(&self, job_id: &JobId, timeout: Duration) -> Result<JobStatus> {
        let started = Instant::now();
        let mut polls: u32 = 0;

        while started.elapsed() <= timeout {
            let status = self.source.job_status(job_id).await?;
            polls += 1;

            if !status.is_running() {
                tracing::debug!(
                    job_id = %job_id,
                    status = %status.status,
                    polls,
                    elapsed_secs = started.elapsed().as_secs(),
                    "job reached terminal status"
                );
                return Ok(status);
            }

            tracing::debug!(job_id = %job_id, polls, "job still running");
            tokio::time::sleep(self.interval).await;
        }

        tracing::warn!(
            job_id = %job_id,
            polls,
            timeout_secs = timeout.as_secs(),
            "job wait timed out"
        );
        Err(Error::JobTimeout {
            job_id: job_id.clone(),
            timeout,
        })
    }
}
