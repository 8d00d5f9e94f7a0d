//! Thin HTTP wrappers around the collaborating services
//!
//! Every client borrows the [`Session`] for the duration of a run: the session
//! supplies both the bearer token and the proxy-configured HTTP client, so a
//! token renewal between two calls is invisible to the callers.
//!
//! Non-success HTTP statuses are surfaced as [`Error::Network`](crate::error::Error::Network)
//! without further classification.

mod dictionary;
mod file_management;
mod jobs;
mod projects;

pub use dictionary::DictionaryServiceClient;
pub use file_management::FileManagementServiceClient;
pub use jobs::JobServiceClient;
pub use projects::ProjectServiceClient;

use crate::error::Result;
use crate::session::Session;
use crate::types::JobId;
use serde::Deserialize;
use serde::de::DeserializeOwned;

/// Body returned by the endpoints that schedule a job
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobCreated {
    job_id: JobId,
}

/// Attach the session's Authorization header, send, and reject non-success statuses
async fn send_authorized(
    session: &Session,
    request: reqwest::RequestBuilder,
) -> Result<reqwest::Response> {
    let response = request.headers(session.auth_header().await?).send().await?;
    Ok(response.error_for_status()?)
}

/// Decode a JSON body, reporting malformed payloads as serialization errors
async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let body = response.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}
