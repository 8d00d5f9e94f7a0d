//! Authenticated session against the SSO service
//!
//! A [`Session`] owns the SSO credentials and the proxy-configured HTTP client
//! used for every service call. It lazily requests a bearer token, caches it
//! together with its expiry, and renews it transparently when the next use
//! falls inside the renewal window.
//!
//! The token and its expiry are stored as one value behind a mutex, so readers
//! never observe a half-updated pair. Renewal itself is serialized by a
//! separate async lock: concurrent callers that find the token due wait for the
//! first renewal and then reuse its result instead of requesting their own.

mod clock;

pub use clock::{Clock, SystemClock};

use crate::config::{Config, Credentials};
use crate::error::{AuthenticationError, Error, Result};
use crate::utils::service_url;
use chrono::{DateTime, TimeDelta, Utc};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use std::ops::Deref;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Literal prefix of bearer tokens, both in SSO responses and in Authorization headers
pub const BEARER_PREFIX: &str = "Bearer ";

/// Token endpoint, relative to the SSO base URL
const TOKEN_PATH: &str = "/sso-api/v1/token";

#[derive(Clone)]
struct IssuedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Authenticated session holding a cached bearer token
pub struct Session {
    credentials: Credentials,
    sso_base_url: String,
    token_lifetime: TimeDelta,
    renewal_threshold: TimeDelta,
    http: reqwest::Client,
    clock: Arc<dyn Clock>,
    issued: Mutex<Option<IssuedToken>>,
    renewal: tokio::sync::Mutex<()>,
}

impl Session {
    /// Create a session using the system clock
    ///
    /// No request is made until the first token is needed.
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a session with an explicit time source
    pub fn with_clock(config: &Config, clock: Arc<dyn Clock>) -> Result<Self> {
        Ok(Self {
            credentials: config.credentials.clone(),
            sso_base_url: config.endpoints.sso_service_base_url.clone(),
            token_lifetime: to_time_delta(config.session.token_lifetime, "token_lifetime_secs")?,
            renewal_threshold: to_time_delta(
                config.session.token_renewal_threshold,
                "token_renewal_threshold_secs",
            )?,
            http: build_http_client(config)?,
            clock,
            issued: Mutex::new(None),
            renewal: tokio::sync::Mutex::new(()),
        })
    }

    /// Return a valid bearer token, requesting a new one when none is cached
    /// or the cached one is inside the renewal window
    pub async fn acquire_token(&self) -> Result<String> {
        if let Some(token) = self.valid_token() {
            return Ok(token);
        }

        let _renewal = self.renewal.lock().await;

        // Another caller may have renewed while this one waited for the lock
        if let Some(token) = self.valid_token() {
            return Ok(token);
        }

        let token = self.request_new_token().await?;
        let expires_at = self
            .clock
            .now()
            .checked_add_signed(self.token_lifetime)
            .ok_or_else(|| Error::config("token_lifetime_secs", "token expiry is out of range"))?;
        *self.lock_issued() = Some(IssuedToken {
            token: token.clone(),
            expires_at,
        });

        tracing::debug!(
            user_id = %self.credentials.user_id,
            expires_at = %expires_at,
            "SSO token issued"
        );
        Ok(token)
    }

    /// True when no token is cached or the cached one expires within the renewal threshold
    ///
    /// Does not modify the session.
    pub fn is_renewal_due(&self) -> bool {
        match self.lock_issued().as_ref() {
            Some(issued) => self.is_due(issued),
            None => true,
        }
    }

    /// Authorization header for the current token, acquiring or renewing it first
    pub async fn auth_header(&self) -> Result<HeaderMap> {
        let token = self.acquire_token().await?;
        Ok(Self::create_auth_header(&token)?)
    }

    /// Forget the cached token
    ///
    /// Calling this on a closed session does nothing.
    pub fn close(&self) {
        if self.lock_issued().take().is_some() {
            tracing::debug!(user_id = %self.credentials.user_id, "session closed");
        }
    }

    /// Acquire a token and return a guard that closes the session when dropped
    ///
    /// The guard dereferences to the session, so a whole workflow can run against it
    /// and still have the token cleared on every exit path.
    pub async fn scoped(&self) -> Result<SessionScope<'_>> {
        self.acquire_token().await?;
        Ok(SessionScope { session: self })
    }

    /// The cached token, if any, without renewing it
    pub fn cached_token(&self) -> Option<String> {
        self.lock_issued().as_ref().map(|issued| issued.token.clone())
    }

    /// Expiry of the cached token, if any
    pub fn token_expires_at(&self) -> Option<DateTime<Utc>> {
        self.lock_issued().as_ref().map(|issued| issued.expires_at)
    }

    /// Proxy-configured HTTP client shared by every service call of this session
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Strip the `"Bearer "` prefix from a token returned by the SSO service
    ///
    /// # Errors
    ///
    /// - [`AuthenticationError::MalformedToken`] if the prefix is missing
    /// - [`AuthenticationError::EmptyToken`] if nothing but whitespace follows it
    ///
    /// # Examples
    ///
    /// ```
    /// use analytics_runner::session::Session;
    ///
    /// assert_eq!(Session::strip_bearer_prefix("Bearer AUTH_TOKEN").unwrap(), "AUTH_TOKEN");
    /// assert!(Session::strip_bearer_prefix("Bearer ").is_err());
    /// ```
    pub fn strip_bearer_prefix(text: &str) -> std::result::Result<String, AuthenticationError> {
        let payload = text
            .strip_prefix(BEARER_PREFIX)
            .ok_or(AuthenticationError::MalformedToken {
                prefix: BEARER_PREFIX,
            })?;

        if payload.trim().is_empty() {
            return Err(AuthenticationError::EmptyToken);
        }
        Ok(payload.to_string())
    }

    /// Build the `Authorization: Bearer <token>` header
    pub fn create_auth_header(token: &str) -> std::result::Result<HeaderMap, AuthenticationError> {
        let mut value = HeaderValue::from_str(&format!("{BEARER_PREFIX}{token}"))
            .map_err(|_| AuthenticationError::InvalidHeaderValue)?;
        value.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, value);
        Ok(headers)
    }

    fn valid_token(&self) -> Option<String> {
        self.lock_issued()
            .as_ref()
            .filter(|issued| !self.is_due(issued))
            .map(|issued| issued.token.clone())
    }

    fn is_due(&self, issued: &IssuedToken) -> bool {
        self.clock.now() >= issued.expires_at - self.renewal_threshold
    }

    async fn request_new_token(&self) -> Result<String> {
        let url = service_url(&self.sso_base_url, TOKEN_PATH)?;
        let form = [
            ("grant_type", "password"),
            ("username", self.credentials.user_id.as_str()),
            ("password", self.credentials.user_password.as_str()),
            ("scope", "openid"),
        ];

        let response = self.http.post(url).form(&form).send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(
                user_id = %self.credentials.user_id,
                status = status.as_u16(),
                "SSO token request rejected"
            );
            return Err(AuthenticationError::Rejected {
                status: status.as_u16(),
            }
            .into());
        }

        let body = response.text().await?;
        Ok(Self::strip_bearer_prefix(body.trim_end_matches(['\r', '\n']))?)
    }

    fn lock_issued(&self) -> MutexGuard<'_, Option<IssuedToken>> {
        // The guarded value is replaced wholesale, so a poisoned lock still holds a consistent pair
        self.issued.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.credentials.user_id)
            .field("sso_base_url", &self.sso_base_url)
            .field("token_expires_at", &self.token_expires_at())
            .finish_non_exhaustive()
    }
}

/// Guard returned by [`Session::scoped`]; closes the session on drop
#[derive(Debug)]
pub struct SessionScope<'a> {
    session: &'a Session,
}

impl Deref for SessionScope<'_> {
    type Target = Session;

    fn deref(&self) -> &Session {
        self.session
    }
}

impl Drop for SessionScope<'_> {
    fn drop(&mut self) {
        self.session.close();
    }
}

fn to_time_delta(duration: Duration, key: &str) -> Result<TimeDelta> {
    TimeDelta::from_std(duration).map_err(|_| Error::config(key, "duration is out of range"))
}

fn build_http_client(config: &Config) -> Result<reqwest::Client> {
    // Only the configured proxies apply; environment proxy variables are ignored
    let mut builder = reqwest::Client::builder()
        .timeout(config.session.request_timeout)
        .no_proxy();

    if let Some(proxy) = &config.proxy.http_proxy {
        builder = builder.proxy(reqwest::Proxy::http(proxy)?);
    }
    if let Some(proxy) = &config.proxy.https_proxy {
        builder = builder.proxy(reqwest::Proxy::https(proxy)?);
    }

    Ok(builder.build()?)
}
