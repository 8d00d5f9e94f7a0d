//! Dictionary service: moves uploaded files into the processing location

use super::{JobCreated, read_json, send_authorized};
use crate::error::Result;
use crate::session::Session;
use crate::types::JobId;
use crate::utils::{path_segment, service_url};

/// Client for the dictionary (ingestion) service
#[derive(Debug)]
pub struct DictionaryServiceClient<'a> {
    session: &'a Session,
    base_url: String,
}

impl<'a> DictionaryServiceClient<'a> {
    /// Create a client rooted at the data API base URL
    pub fn new(session: &'a Session, base_url: impl Into<String>) -> Self {
        Self {
            session,
            base_url: base_url.into(),
        }
    }

    /// Schedule a job importing a file-management file into the processing location
    ///
    /// With `overwrite` set, an earlier import of the same file is replaced, which
    /// makes repeating the call safe.
    pub async fn import_file(
        &self,
        file_management_file_id: &str,
        job_name: &str,
        overwrite: bool,
    ) -> Result<JobId> {
        let path = format!(
            "/dictionary/v1/import/{}/jobs",
            path_segment(file_management_file_id)
        );
        let url = service_url(&self.base_url, &path)?;
        let overwrite = if overwrite { "true" } else { "false" };

        let request = self
            .session
            .http()
            .post(url)
            .query(&[("jobname", job_name), ("overwrite", overwrite)]);
        let response = send_authorized(self.session, request).await?;
        let created: JobCreated = read_json(response).await?;
        Ok(created.job_id)
    }
}
