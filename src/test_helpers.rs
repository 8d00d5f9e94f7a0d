//! Shared test helpers for building configurations and SSO mocks.

use crate::config::{Config, Credentials, ServiceEndpoints};
use std::sync::atomic::{AtomicUsize, Ordering};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Configuration pointing every service (SSO included) at one base URL.
pub(crate) fn test_config(base_uri: &str) -> Config {
    Config::new(
        ServiceEndpoints {
            sso_service_base_url: base_uri.to_string(),
            data_api_base_url: base_uri.to_string(),
            impairment_studio_api_base_url: base_uri.to_string(),
        },
        Credentials {
            user_id: "analyst".to_string(),
            user_password: "s3cret".to_string(),
        },
    )
}

/// Issues `Bearer token-1`, `Bearer token-2`, ... on successive requests.
pub(crate) struct SequentialTokens(AtomicUsize);

impl SequentialTokens {
    pub(crate) fn new() -> Self {
        Self(AtomicUsize::new(0))
    }
}

impl Respond for SequentialTokens {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let n = self.0.fetch_add(1, Ordering::SeqCst) + 1;
        ResponseTemplate::new(200).set_body_string(format!("Bearer token-{n}"))
    }
}

/// Mount the SSO token endpoint on `server`.
pub(crate) async fn mount_sso(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/sso-api/v1/token"))
        .respond_with(SequentialTokens::new())
        .mount(server)
        .await;
}
