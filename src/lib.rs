//! # analytics-runner
//!
//! Client-side orchestrator for remote impairment-analysis runs.
//!
//! A run authenticates against an SSO service, uploads a local input archive,
//! waits for the server-side import and analysis jobs, and downloads the result
//! artifact. When a job fails, its error artifact is downloaded instead and the
//! run stops.
//!
//! ## Quick Start
//!
//! ```no_run
//! use analytics_runner::{AnalysisRequest, Config, run_analysis};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load(&Config::default_path())?;
//!     let request = AnalysisRequest {
//!         analysis_id: "analysis-9".into(),
//!         input_archive: "inputs.zip".into(),
//!         result_dir: "results".into(),
//!         error_dir: "errors".into(),
//!     };
//!
//!     let outcome = run_analysis(&config, request).await;
//!     println!("{outcome:?}");
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Service clients
pub mod client;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// SSO session and token lifecycle
pub mod session;
/// Core types
pub mod types;
/// Utility functions
pub mod utils;
/// Job polling, validation and run orchestration
pub mod workflow;

#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use config::Config;
pub use error::{AuthenticationError, Error, Result};
pub use session::{Session, SessionScope};
pub use types::{AnalysisId, FileDescriptor, JobId, JobState, JobStatus, JobVerdict, RunOutcome};
pub use workflow::{
    AnalysisRequest, AnalysisWorkflow, JobPoller, JobValidator, RunReport, run_analysis,
};

/// Error code reported when a run is interrupted by a termination signal
pub const INTERRUPTED_CODE: &str = "interrupted";

/// Run one analysis, stopping early on SIGTERM or SIGINT
///
/// Interrupting drops the in-flight run, which closes its session, and reports
/// [`RunOutcome::Terminated`] with code [`INTERRUPTED_CODE`].
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
pub async fn run_with_shutdown(config: &Config, request: AnalysisRequest) -> RunOutcome {
    run_until(config, request, wait_for_signal()).await
}

/// Run one analysis until it finishes or `shutdown` resolves
///
/// `shutdown` resolves to the name of whatever stopped the run, which ends up in
/// the reported reason.
pub async fn run_until<F>(config: &Config, request: AnalysisRequest, shutdown: F) -> RunOutcome
where
    F: Future<Output = &'static str>,
{
    let analysis_id = request.analysis_id.clone();
    tokio::select! {
        outcome = run_analysis(config, request) => outcome,
        signal = shutdown => {
            tracing::warn!(
                analysis_id = %analysis_id,
                signal,
                "analysis run has been interrupted"
            );
            RunOutcome::Terminated {
                reason: format!("interrupted by {signal}"),
                code: INTERRUPTED_CODE,
            }
        }
    }
}

#[cfg(unix)]
async fn wait_for_signal() -> &'static str {
    use tokio::signal::unix::{SignalKind, signal};

    // Signal registration may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => "SIGTERM",
                _ = sigint.recv() => "SIGINT",
            }
        }
        (Err(e), Ok(mut sigint)) => {
            tracing::warn!(error = %e, "could not register SIGTERM handler, waiting for SIGINT only");
            sigint.recv().await;
            "SIGINT"
        }
        (Ok(mut sigterm), Err(e)) => {
            tracing::warn!(error = %e, "could not register SIGINT handler, waiting for SIGTERM only");
            sigterm.recv().await;
            "SIGTERM"
        }
        (Err(_), Err(_)) => {
            tracing::error!("could not register any signal handlers, using ctrl_c fallback");
            wait_for_ctrl_c().await
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> &'static str {
    wait_for_ctrl_c().await
}

async fn wait_for_ctrl_c() -> &'static str {
    match tokio::signal::ctrl_c().await {
        Ok(()) => "Ctrl+C",
        Err(e) => {
            tracing::error!(error = %e, "failed to listen for Ctrl+C signal");
            // Never resolve, so the run itself decides the outcome
            std::future::pending().await
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{mount_sso, test_config};
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn shutdown_interrupts_a_run_waiting_on_a_job() {
        let server = MockServer::start().await;
        mount_sso(&server).await;
        Mock::given(method("POST"))
            .and(path("/fms/v1/files/job/import"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "id": "inputs_1.zip",
                "filename": "inputs.zip",
                "path": "raw",
                "status": true
            }])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/dictionary/v1/import/inputs_1.zip/jobs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "jobId": 11 })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/job/v1/jobs/11"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "RUNNING",
                "type": "FileUpload"
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/project/v1/analyses/analysis-9/jobs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "jobId": 12 })))
            .expect(0)
            .mount(&server)
            .await;

        let mut config = test_config(&server.uri());
        config.polling.poll_interval = Duration::from_millis(10);
        let temp_dir = tempfile::TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("inputs.zip"), b"zip-bytes").unwrap();
        let request = AnalysisRequest {
            analysis_id: AnalysisId::from("analysis-9"),
            input_archive: temp_dir.path().join("inputs.zip"),
            result_dir: temp_dir.path().join("results"),
            error_dir: temp_dir.path().join("errors"),
        };

        let shutdown = async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            "SIGTERM"
        };
        let outcome = run_until(&config, request, shutdown).await;

        match outcome {
            RunOutcome::Terminated { reason, code } => {
                assert_eq!(code, INTERRUPTED_CODE);
                assert_eq!(reason, "interrupted by SIGTERM");
            }
            other => panic!("expected interruption, got {other:?}"),
        }
        let requests = server.received_requests().await.unwrap();
        assert!(requests.iter().any(|r| r.url.path() == "/job/v1/jobs/11"));
    }

    #[tokio::test]
    async fn shutdown_that_never_fires_leaves_the_outcome_to_the_run() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sso-api/v1/token"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        let config = test_config(&server.uri());
        let request = AnalysisRequest {
            analysis_id: AnalysisId::from("analysis-9"),
            input_archive: "inputs.zip".into(),
            result_dir: "results".into(),
            error_dir: "errors".into(),
        };

        let outcome = run_until(&config, request, std::future::pending()).await;

        match outcome {
            RunOutcome::Terminated { code, .. } => assert_eq!(code, "authentication_rejected"),
            other => panic!("expected termination, got {other:?}"),
        }
    }
}
