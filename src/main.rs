//! analytics-runner - command-line entry point
//!
//! Runs one analysis end to end:
//!
//! ```text
//! analytics-runner --analysis_id <ID> --input_zip_file <ZIP> \
//!     --result_files_dir <DIR> --error_files_dir <DIR>
//! ```
//!
//! The kebab-case spellings (`--analysis-id`, ...) are accepted as aliases.
//!
//! The configuration file is read from `$ANALYTICS_RUNNER_CONFIG` or
//! `./analytics_runner.toml`. Log verbosity follows `RUST_LOG` (default `info`).

use analytics_runner::{AnalysisId, AnalysisRequest, Config, RunOutcome, run_with_shutdown};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Exit status when the configuration cannot be loaded
const EXIT_STARTUP_FAILURE: u8 = 2;

/// Command-line arguments for analytics-runner
#[derive(Parser, Debug)]
#[command(name = "analytics-runner")]
#[command(about = "Upload inputs, run a remote impairment analysis and download its results")]
#[command(version)]
struct Args {
    /// Id of the analysis to run
    #[arg(long = "analysis_id", alias = "analysis-id")]
    analysis_id: AnalysisId,

    /// ZIP archive with the analysis inputs
    #[arg(long = "input_zip_file", alias = "input-zip-file")]
    input_zip_file: PathBuf,

    /// Directory receiving the result artifact
    #[arg(long = "result_files_dir", alias = "result-files-dir")]
    result_files_dir: PathBuf,

    /// Directory receiving error artifacts of failed jobs (may equal the result directory)
    #[arg(long = "error_files_dir", alias = "error-files-dir")]
    error_files_dir: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let config_path = Config::default_path();
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(
                path = %config_path.display(),
                error = %e,
                error_code = e.code(),
                "failed to load configuration"
            );
            return ExitCode::from(EXIT_STARTUP_FAILURE);
        }
    };

    let request = AnalysisRequest {
        analysis_id: args.analysis_id,
        input_archive: args.input_zip_file,
        result_dir: args.result_files_dir,
        error_dir: args.error_files_dir,
    };

    match run_with_shutdown(&config, request).await {
        RunOutcome::Terminated { .. } if config.exit_with_failure_status => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn underscore_flags_are_parsed() {
        let args = Args::try_parse_from([
            "analytics-runner",
            "--analysis_id",
            "analysis-9",
            "--input_zip_file",
            "inputs.zip",
            "--result_files_dir",
            "results",
            "--error_files_dir",
            "errors",
        ])
        .unwrap();

        assert_eq!(args.analysis_id.as_str(), "analysis-9");
        assert_eq!(args.input_zip_file, PathBuf::from("inputs.zip"));
        assert_eq!(args.result_files_dir, PathBuf::from("results"));
        assert_eq!(args.error_files_dir, PathBuf::from("errors"));
    }

    #[test]
    fn kebab_case_aliases_are_parsed() {
        let args = Args::try_parse_from([
            "analytics-runner",
            "--analysis-id",
            "analysis-9",
            "--input-zip-file",
            "inputs.zip",
            "--result-files-dir",
            "out",
            "--error-files-dir",
            "out",
        ])
        .unwrap();

        assert_eq!(args.result_files_dir, args.error_files_dir);
    }

    #[test]
    fn missing_flag_is_rejected() {
        let result = Args::try_parse_from([
            "analytics-runner",
            "--analysis_id",
            "analysis-9",
            "--input_zip_file",
            "inputs.zip",
            "--result_files_dir",
            "results",
        ]);

        assert!(result.is_err());
    }
}
