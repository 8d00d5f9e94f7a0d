//! Core types for analytics-runner

use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

/// Identifier of a server-side job
///
/// The job services return ids either as JSON strings or as numbers; both are
/// kept in their textual form. The id is only echoed back in URLs,
/// file names and log lines.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Create a new JobId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the textual id
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for JobId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(JobId(RawText::deserialize(deserializer)?.into()))
    }
}

/// JSON scalar the services send either quoted or as a bare number
#[derive(Deserialize)]
#[serde(untagged)]
enum RawText {
    Text(String),
    Number(i64),
}

impl From<RawText> for String {
    fn from(raw: RawText) -> Self {
        match raw {
            RawText::Text(text) => text,
            RawText::Number(number) => number.to_string(),
        }
    }
}

fn optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<RawText>::deserialize(deserializer)?.map(String::from))
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for JobId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of an analysis defined in the project service
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnalysisId(String);

impl AnalysisId {
    /// Create a new AnalysisId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the textual id
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AnalysisId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for AnalysisId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for AnalysisId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

/// Job lifecycle state as reported by the job service
///
/// Only `RUNNING` is non-terminal. States the client does not know about are
/// preserved verbatim in [`JobState::Other`] and treated as terminal successes,
/// matching the closed failed-set rule of [`JobStatus::is_failed`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobState {
    /// Job is still executing
    Running,
    /// Job finished without errors
    Completed,
    /// Job failed
    Failed,
    /// Job finished but reported errors for part of its input
    CompletedWithErrors,
    /// Any other state string
    Other(String),
}

impl JobState {
    /// Wire representation of the state
    pub fn as_str(&self) -> &str {
        match self {
            JobState::Running => "RUNNING",
            JobState::Completed => "COMPLETED",
            JobState::Failed => "FAILED",
            JobState::CompletedWithErrors => "COMPLETED_WITH_ERRORS",
            JobState::Other(state) => state,
        }
    }

    /// True for every state other than `RUNNING`
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobState::Running)
    }
}

impl From<String> for JobState {
    fn from(state: String) -> Self {
        match state.as_str() {
            "RUNNING" => JobState::Running,
            "COMPLETED" => JobState::Completed,
            "FAILED" => JobState::Failed,
            "COMPLETED_WITH_ERRORS" => JobState::CompletedWithErrors,
            _ => JobState::Other(state),
        }
    }
}

impl From<JobState> for String {
    fn from(state: JobState) -> Self {
        state.as_str().to_string()
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of a terminal job status
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobVerdict {
    /// Any terminal state outside the failed set
    Succeeded,
    /// `FAILED` or `COMPLETED_WITH_ERRORS`
    Failed,
}

/// Snapshot of a job returned by the job service
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatus {
    /// Job id, when echoed by the service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<JobId>,

    /// Current state
    pub status: JobState,

    /// Server-side job type (e.g., "FileUpload")
    #[serde(rename = "type")]
    pub job_type: String,

    /// Job qualifier, used to name analysis result artifacts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualifier: Option<String>,
}

impl JobStatus {
    /// True while the job is still executing
    pub fn is_running(&self) -> bool {
        !self.status.is_terminal()
    }

    /// True iff the state is exactly `FAILED` or `COMPLETED_WITH_ERRORS`
    pub fn is_failed(&self) -> bool {
        matches!(
            self.status,
            JobState::Failed | JobState::CompletedWithErrors
        )
    }

    /// Classify this status without side effects
    pub fn verdict(&self) -> JobVerdict {
        if self.is_failed() {
            JobVerdict::Failed
        } else {
            JobVerdict::Succeeded
        }
    }
}

/// Descriptor of a file stored by the file-management service
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    /// File-management id, used to reference the file in follow-up jobs
    pub id: String,

    /// Original file name
    pub filename: String,

    /// Storage location inside the file-management service (e.g., "raw")
    pub path: String,

    /// Size in bytes
    #[serde(default)]
    pub size: u64,

    /// Whether the upload succeeded
    #[serde(rename = "status", default)]
    pub uploaded: bool,

    /// Uploading user, when reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    /// Server-side upload timestamp, also embedded in `id`
    #[serde(
        rename = "serviceTimestamp",
        default,
        deserialize_with = "optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub service_timestamp: Option<String>,
}

/// Final outcome of one analysis run, as reported by the workflow boundary
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// All steps succeeded and the result artifact was written
    Completed {
        /// Path of the downloaded result artifact
        result_file: PathBuf,
    },
    /// The run stopped early
    Terminated {
        /// Human-readable reason, as logged
        reason: String,
        /// Machine-readable error code (see [`Error::code`](crate::error::Error::code))
        code: &'static str,
    },
}

impl RunOutcome {
    /// True when the run completed successfully
    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed { .. })
    }
}
