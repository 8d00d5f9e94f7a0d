//! File-management service: input upload and artifact retrieval

use super::{read_json, send_authorized};
use crate::error::Result;
use crate::session::Session;
use crate::types::{AnalysisId, FileDescriptor, JobId};
use crate::utils::{path_segment, service_url, write_artifact};
use crate::workflow::ErrorArtifactSink;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::path::{Path, PathBuf};

/// Client for the file-management service
#[derive(Debug)]
pub struct FileManagementServiceClient<'a> {
    session: &'a Session,
    base_url: String,
}

impl<'a> FileManagementServiceClient<'a> {
    /// Create a client rooted at the data API base URL
    pub fn new(session: &'a Session, base_url: impl Into<String>) -> Self {
        Self {
            session,
            base_url: base_url.into(),
        }
    }

    /// Upload a local file into `destination_path` (e.g. "raw")
    ///
    /// The multipart part is named after `file_name`, which is also the name the
    /// file receives in the service.
    ///
    /// # Returns
    ///
    /// The descriptors of the stored files. The service answers with a list even
    /// for a single upload.
    pub async fn import_file(
        &self,
        source: &Path,
        file_name: &str,
        destination_path: &str,
    ) -> Result<Vec<FileDescriptor>> {
        let url = service_url(&self.base_url, "/fms/v1/files/job/import")?;
        let content = tokio::fs::read(source).await?;
        let size = content.len();

        let part = Part::bytes(content).file_name(file_name.to_string());
        let form = Form::new()
            .text("path", destination_path.to_string())
            .part(file_name.to_string(), part);

        tracing::debug!(
            source = %source.display(),
            file_name,
            destination_path,
            size,
            "uploading file"
        );
        let request = self.session.http().post(url).multipart(form);
        let response = send_authorized(self.session, request).await?;
        read_json(response).await
    }

    /// Fetch the raw error artifact produced by a failed job
    pub async fn retrieve_job_import_error_file_content(&self, job_id: &JobId) -> Result<Vec<u8>> {
        let path = format!("/fms/v1/files/job/import/{}", path_segment(job_id.as_str()));
        self.get_bytes(&path).await
    }

    /// Download a job's error artifact into `destination_dir`
    ///
    /// Returns the absolute path of the written file.
    pub async fn download_job_import_error_file(
        &self,
        job_id: &JobId,
        destination_dir: &Path,
        file_name: &str,
    ) -> Result<PathBuf> {
        let content = self.retrieve_job_import_error_file_content(job_id).await?;
        write_artifact(destination_dir, file_name, &content).await
    }

    /// Fetch the raw result artifact of an analysis
    pub async fn retrieve_analysis_result_file_content(
        &self,
        analysis_id: &AnalysisId,
    ) -> Result<Vec<u8>> {
        let path = format!(
            "/fms/v1/files/job/analyses/{}",
            path_segment(analysis_id.as_str())
        );
        self.get_bytes(&path).await
    }

    /// Download an analysis result artifact into `destination_dir`
    ///
    /// Returns the absolute path of the written file.
    pub async fn download_analysis_result_file(
        &self,
        analysis_id: &AnalysisId,
        destination_dir: &Path,
        file_name: &str,
    ) -> Result<PathBuf> {
        let content = self.retrieve_analysis_result_file_content(analysis_id).await?;
        write_artifact(destination_dir, file_name, &content).await
    }

    async fn get_bytes(&self, path: &str) -> Result<Vec<u8>> {
        let url = service_url(&self.base_url, path)?;
        let request = self.session.http().get(url);
        let response = send_authorized(self.session, request).await?;
        let content = response.bytes().await?;
        Ok(content.to_vec())
    }
}

#[async_trait]
impl ErrorArtifactSink for FileManagementServiceClient<'_> {
    async fn download_job_errors(
        &self,
        job_id: &JobId,
        destination_dir: &Path,
        file_name: &str,
    ) -> Result<PathBuf> {
        self.download_job_import_error_file(job_id, destination_dir, file_name)
            .await
    }
}
