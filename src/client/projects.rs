//! Project service: starts analysis computations

use super::{JobCreated, read_json, send_authorized};
use crate::error::Result;
use crate::session::Session;
use crate::types::{AnalysisId, JobId};
use crate::utils::{path_segment, service_url};

/// Client for the project (analysis) service
#[derive(Debug)]
pub struct ProjectServiceClient<'a> {
    session: &'a Session,
    base_url: String,
}

impl<'a> ProjectServiceClient<'a> {
    /// Create a client rooted at the studio API base URL
    pub fn new(session: &'a Session, base_url: impl Into<String>) -> Self {
        Self {
            session,
            base_url: base_url.into(),
        }
    }

    /// Start the computation of an analysis
    pub async fn run_analysis(&self, analysis_id: &AnalysisId) -> Result<JobId> {
        let path = format!(
            "/project/v1/analyses/{}/jobs",
            path_segment(analysis_id.as_str())
        );
        let url = service_url(&self.base_url, &path)?;

        let request = self.session.http().post(url);
        let response = send_authorized(self.session, request).await?;
        let created: JobCreated = read_json(response).await?;
        Ok(created.job_id)
    }
}
