//! Turning terminal job statuses into success or a failure carrying the error artifact

use crate::error::{Error, Result};
use crate::types::{JobId, JobStatus, JobVerdict};
use crate::utils::error_artifact_name;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Destination for the error artifacts of failed jobs
///
/// Implemented by [`FileManagementServiceClient`](crate::client::FileManagementServiceClient).
#[async_trait]
pub trait ErrorArtifactSink: Send + Sync {
    /// Download the error artifact of `job_id` as `destination_dir/file_name`
    ///
    /// Returns the path of the written file.
    async fn download_job_errors(
        &self,
        job_id: &JobId,
        destination_dir: &Path,
        file_name: &str,
    ) -> Result<PathBuf>;
}

/// Checks terminal job statuses and retrieves error artifacts of failed jobs
#[derive(Debug, Clone)]
pub struct JobValidator {
    error_dir: PathBuf,
}

impl JobValidator {
    /// Create a validator that stores error artifacts under `error_dir`
    pub fn new(error_dir: impl Into<PathBuf>) -> Self {
        Self {
            error_dir: error_dir.into(),
        }
    }

    /// Directory error artifacts are written to
    pub fn error_dir(&self) -> &Path {
        &self.error_dir
    }

    /// Accept a successful job or fail with the location of its error artifact
    ///
    /// FAILED and COMPLETED_WITH_ERRORS both count as failures. For those the
    /// artifact is downloaded as `job_<type>_<id>_errors.zip` before returning.
    ///
    /// # Errors
    ///
    /// [`Error::JobFailed`] for failed jobs. If the artifact download itself
    /// fails, that error is returned instead.
    pub async fn validate(
        &self,
        job_id: &JobId,
        status: &JobStatus,
        sink: &dyn ErrorArtifactSink,
    ) -> Result<()> {
        match status.verdict() {
            JobVerdict::Succeeded => Ok(()),
            JobVerdict::Failed => {
                let file_name = error_artifact_name(&status.job_type, job_id);
                let written = sink
                    .download_job_errors(job_id, &self.error_dir, &file_name)
                    .await?;
                let error_file = std::path::absolute(&written)?;

                tracing::warn!(
                    job_id = %job_id,
                    job_type = %status.job_type,
                    status = %status.status,
                    error_file = %error_file.display(),
                    "job finished with errors"
                );

                Err(Error::JobFailed {
                    job_type: status.job_type.clone(),
                    job_id: job_id.clone(),
                    status: status.status.to_string(),
                    error_file,
                })
            }
        }
    }
}
