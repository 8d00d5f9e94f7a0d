//! Utility functions for URL building, artifact naming and file output

use crate::error::{Error, Result};
use crate::types::JobId;
use std::path::{Path, PathBuf};
use url::Url;

/// Join an absolute request path onto a service base URL
///
/// Paths starting with `/` replace whatever path the base URL carries, so
/// `https://host/api/` + `/job/v1/jobs/1` yields `https://host/job/v1/jobs/1`.
///
/// # Examples
///
/// ```
/// use analytics_runner::utils::service_url;
///
/// let url = service_url("https://studio.example.com/ui/", "/job/v1/jobs/7").unwrap();
/// assert_eq!(url.as_str(), "https://studio.example.com/job/v1/jobs/7");
/// ```
pub fn service_url(base: &str, path: &str) -> Result<Url> {
    Ok(Url::parse(base)?.join(path)?)
}

/// Percent-encode a value used as a single URL path segment
pub fn path_segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// File name of the error artifact of a failed job: `job_{type}_{id}_errors.zip`
#[must_use]
pub fn error_artifact_name(job_type: &str, job_id: &JobId) -> String {
    format!("job_{}_{}_errors.zip", job_type, job_id)
}

/// File name of an analysis result artifact: `job_{type}_{qualifier}_results.zip`
///
/// A missing qualifier renders as an empty string.
#[must_use]
pub fn result_artifact_name(job_type: &str, qualifier: Option<&str>) -> String {
    format!("job_{}_{}_results.zip", job_type, qualifier.unwrap_or_default())
}

/// File name component of the input archive, used as the upload part name
pub fn archive_file_name(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("'{}' does not name a file", path.display()),
            ))
        })
}

/// Write an artifact into `dir`, creating the directory if needed
///
/// Returns the absolute path of the written file.
pub async fn write_artifact(dir: &Path, file_name: &str, content: &[u8]) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let destination = dir.join(file_name);
    tokio::fs::write(&destination, content).await?;
    Ok(std::path::absolute(&destination)?)
}
