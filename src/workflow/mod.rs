//! End-to-end analysis run
//!
//! [`AnalysisWorkflow`] drives one run against the remote services:
//!
//! 1. upload the input archive into the raw files location
//! 2. schedule the dictionary import of the uploaded file and wait for it
//! 3. start the analysis computation and wait for it
//! 4. download the result artifact
//!
//! Every step runs inside one [`SessionScope`](crate::session::SessionScope), so the
//! bearer token is shared by all calls and cleared on every exit path. A failed job
//! stops the run after its error artifact has been downloaded.

mod poller;
mod validator;

pub use poller::{JobPoller, JobStatusSource};
pub use validator::{ErrorArtifactSink, JobValidator};

use crate::client::{
    DictionaryServiceClient, FileManagementServiceClient, JobServiceClient, ProjectServiceClient,
};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::session::Session;
use crate::types::{AnalysisId, FileDescriptor, JobId, RunOutcome};
use crate::utils::{archive_file_name, result_artifact_name};
use std::path::PathBuf;

/// Location in the file-management service that receives uploads
pub const RAW_FILES_PATH: &str = "raw";

/// Job name of the dictionary import that moves an upload into processing
pub const INGEST_JOB_NAME: &str = "FileUpload";

/// Inputs of one analysis run
#[derive(Clone, Debug)]
pub struct AnalysisRequest {
    /// Analysis to compute
    pub analysis_id: AnalysisId,

    /// Local ZIP archive with the analysis inputs
    pub input_archive: PathBuf,

    /// Directory receiving the result artifact
    pub result_dir: PathBuf,

    /// Directory receiving error artifacts of failed jobs (may equal `result_dir`)
    pub error_dir: PathBuf,
}

/// Summary of a successful run
#[derive(Clone, Debug)]
pub struct RunReport {
    /// Descriptor of the uploaded input archive
    pub uploaded_file: FileDescriptor,

    /// Dictionary import job
    pub ingest_job_id: JobId,

    /// Analysis computation job
    pub analysis_job_id: JobId,

    /// Absolute path of the downloaded result artifact
    pub result_file: PathBuf,
}

/// Orchestrates one analysis run
#[derive(Debug)]
pub struct AnalysisWorkflow<'a> {
    config: &'a Config,
    request: AnalysisRequest,
}

impl<'a> AnalysisWorkflow<'a> {
    /// Create a workflow for `request` using the services named in `config`
    pub fn new(config: &'a Config, request: AnalysisRequest) -> Self {
        Self { config, request }
    }

    /// The run's inputs
    pub fn request(&self) -> &AnalysisRequest {
        &self.request
    }

    /// Run all steps and return the first error encountered
    ///
    /// The session's token is acquired before the first step and cleared when
    /// this returns, whether it succeeds or not.
    pub async fn execute(&self, session: &Session) -> Result<RunReport> {
        let scope = session.scoped().await?;
        let session: &Session = &scope;

        let endpoints = &self.config.endpoints;
        let files = FileManagementServiceClient::new(session, &endpoints.data_api_base_url);
        let dictionary = DictionaryServiceClient::new(session, &endpoints.data_api_base_url);
        let projects =
            ProjectServiceClient::new(session, &endpoints.impairment_studio_api_base_url);
        let poller = JobPoller::new(
            JobServiceClient::new(session, &endpoints.impairment_studio_api_base_url),
            &self.config.polling,
        );
        let validator = JobValidator::new(&self.request.error_dir);

        // Upload
        let input = &self.request.input_archive;
        tracing::info!(input = %input.display(), "importing input file has started");
        let file_name = archive_file_name(input)?;
        let uploaded_file = files
            .import_file(input, &file_name, RAW_FILES_PATH)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::UnexpectedResponse {
                service: "file management",
                reason: "upload returned no file descriptors".to_string(),
            })?;
        tracing::info!(
            input = %input.display(),
            file_id = %uploaded_file.id,
            "importing input file has finished"
        );

        // Ingest
        let ingest_job_id = dictionary
            .import_file(&uploaded_file.id, INGEST_JOB_NAME, true)
            .await?;
        tracing::info!(
            file_name = %uploaded_file.filename,
            job_id = %ingest_job_id,
            "moving input file to the processing location has started"
        );
        let ingest_status = poller.wait(&ingest_job_id).await?;
        validator
            .validate(&ingest_job_id, &ingest_status, &files)
            .await?;
        tracing::info!(
            file_name = %uploaded_file.filename,
            job_id = %ingest_job_id,
            "moving input file to the processing location has finished"
        );

        // Analysis
        let analysis_id = &self.request.analysis_id;
        let analysis_job_id = projects.run_analysis(analysis_id).await?;
        tracing::info!(job_id = %analysis_job_id, "analysis calculation has started");
        let analysis_status = poller.wait(&analysis_job_id).await?;
        validator
            .validate(&analysis_job_id, &analysis_status, &files)
            .await?;
        tracing::info!(job_id = %analysis_job_id, "analysis calculation has finished");

        // Results
        let result_dir = &self.request.result_dir;
        tracing::info!(result_dir = %result_dir.display(), "downloading analysis results has started");
        let result_name = result_artifact_name(
            &analysis_status.job_type,
            analysis_status.qualifier.as_deref(),
        );
        let result_file = files
            .download_analysis_result_file(analysis_id, result_dir, &result_name)
            .await?;
        tracing::info!(
            result_file = %result_file.display(),
            result_dir = %result_dir.display(),
            "downloading analysis results has finished"
        );

        Ok(RunReport {
            uploaded_file,
            ingest_job_id,
            analysis_job_id,
            result_file,
        })
    }

    /// Run all steps and report the outcome without propagating errors
    ///
    /// Any error is logged together with the analysis id and converted into
    /// [`RunOutcome::Terminated`].
    pub async fn run(&self, session: &Session) -> RunOutcome {
        let analysis_id = &self.request.analysis_id;
        tracing::info!(analysis_id = %analysis_id, "analysis run has started");

        match self.execute(session).await {
            Ok(report) => {
                tracing::info!(
                    analysis_id = %analysis_id,
                    analysis_job_id = %report.analysis_job_id,
                    result_file = %report.result_file.display(),
                    "analysis run has finished"
                );
                RunOutcome::Completed {
                    result_file: report.result_file,
                }
            }
            Err(e) => terminated(analysis_id, e),
        }
    }
}

/// Run one analysis with a fresh session built from `config`
///
/// Failure to build the session is reported like any other run error.
pub async fn run_analysis(config: &Config, request: AnalysisRequest) -> RunOutcome {
    let workflow = AnalysisWorkflow::new(config, request);
    match Session::new(config) {
        Ok(session) => workflow.run(&session).await,
        Err(e) => terminated(&workflow.request().analysis_id, e),
    }
}

fn terminated(analysis_id: &AnalysisId, error: Error) -> RunOutcome {
    tracing::error!(
        analysis_id = %analysis_id,
        error = %error,
        error_code = error.code(),
        "analysis run has been terminated by error"
    );
    RunOutcome::Terminated {
        reason: error.to_string(),
        code: error.code(),
    }
}
