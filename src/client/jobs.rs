//! Job service: status snapshots of server-side jobs

use super::{read_json, send_authorized};
use crate::error::Result;
use crate::session::Session;
use crate::types::{JobId, JobStatus};
use crate::utils::{path_segment, service_url};
use crate::workflow::JobStatusSource;
use async_trait::async_trait;

/// Client for the job service
#[derive(Debug)]
pub struct JobServiceClient<'a> {
    session: &'a Session,
    base_url: String,
}

impl<'a> JobServiceClient<'a> {
    /// Create a client rooted at the studio API base URL
    pub fn new(session: &'a Session, base_url: impl Into<String>) -> Self {
        Self {
            session,
            base_url: base_url.into(),
        }
    }

    /// Fetch the current status of a job
    pub async fn get_job(&self, job_id: &JobId) -> Result<JobStatus> {
        let path = format!("/job/v1/jobs/{}", path_segment(job_id.as_str()));
        let url = service_url(&self.base_url, &path)?;

        let request = self.session.http().get(url);
        let response = send_authorized(self.session, request).await?;
        read_json(response).await
    }
}

#[async_trait]
impl JobStatusSource for JobServiceClient<'_> {
    async fn job_status(&self, job_id: &JobId) -> Result<JobStatus> {
        self.get_job(job_id).await
    }
}
