//! # Information System HTTP Client
//!
//! Thin session-aware wrapper around `reqwest` for the university
//! information system endpoints.
//!
//! ## Auth Detection
//! The IS does not use HTTP auth statuses consistently: an expired
//! session usually answers `200 OK` with the login page, sometimes a
//! `302` to `login.pl`, and only occasionally a plain `401`/`403`. The
//! client normalizes all three into [`FetchError::Auth`] so the engine
//! has a single signal to suspend on.

use std::time::Duration;

use reqwest::redirect::Policy;
use reqwest::StatusCode;
use tracing::{debug, warn};
use url::Url;

use crate::config::SessionSettings;
use crate::error::{FetchError, FetchResult};

// =============================================================================
// Session Client
// =============================================================================

/// HTTP client bound to one IS session.
#[derive(Debug, Clone)]
pub struct SessionClient {
    http: reqwest::Client,
    base_url: Url,
    cookie: String,
}

impl SessionClient {
    /// Builds a client from session settings.
    pub fn new(session: &SessionSettings, timeout: Duration) -> FetchResult<Self> {
        let base_url = Url::parse(&session.base_url)
            .map_err(|e| FetchError::Network(format!("invalid base url: {e}")))?;

        let http = reqwest::Client::builder()
            .timeout(timeout)
            // Redirects to login.pl are an auth signal; never follow.
            .redirect(Policy::none())
            .build()
            .map_err(FetchError::from)?;

        Ok(SessionClient {
            http,
            base_url,
            cookie: session.cookie.clone(),
        })
    }

    /// The session base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Issues a GET with the session cookie and returns the body.
    pub async fn get(&self, path: &str, query: &[(&str, &str)]) -> FetchResult<String> {
        let url = self.endpoint(path)?;
        debug!(%url, "GET");

        let response = self
            .http
            .get(url)
            .header(reqwest::header::COOKIE, &self.cookie)
            .query(query)
            .send()
            .await?;

        self.read_body(response).await
    }

    /// Issues a form-encoded POST with the session cookie and returns
    /// the body. The schedule endpoint only answers JSON to POSTs.
    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> FetchResult<String> {
        let url = self.endpoint(path)?;
        debug!(%url, "POST");

        let response = self
            .http
            .post(url)
            .header(reqwest::header::COOKIE, &self.cookie)
            .form(form)
            .send()
            .await?;

        self.read_body(response).await
    }

    fn endpoint(&self, path: &str) -> FetchResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| FetchError::Network(format!("invalid endpoint '{path}': {e}")))
    }

    /// Applies the auth-detection rules and extracts the body text.
    async fn read_body(&self, response: reqwest::Response) -> FetchResult<String> {
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            warn!(%status, "Session rejected by status code");
            return Err(FetchError::Auth);
        }

        if status.is_redirection() {
            let location = response
                .headers()
                .get(reqwest::header::LOCATION)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("");
            if location.contains("login") {
                warn!(location, "Redirected to login page");
                return Err(FetchError::Auth);
            }
            return Err(FetchError::Network(format!(
                "unexpected redirect to '{location}'"
            )));
        }

        if !status.is_success() {
            return Err(FetchError::Network(format!("HTTP {status}")));
        }

        let body = response.text().await?;
        if is_login_page(&body) {
            warn!("Response body is the login page");
            return Err(FetchError::Auth);
        }
        Ok(body)
    }
}

// =============================================================================
// Login Page Detection
// =============================================================================

/// Heuristic check for the IS login form served in place of data.
///
/// Only HTML can be a login page; JSON bodies never trip this.
pub(crate) fn is_login_page(body: &str) -> bool {
    let head: String = body.chars().take(2048).collect::<String>().to_lowercase();
    if !head.contains("<html") && !head.contains("<!doctype") {
        return false;
    }
    head.contains("login.pl")
        || head.contains("name=\"credential_0\"")
        || head.contains("prihlaseni do systemu")
        || head.contains("přihlášení do systému")
}

// =============================================================================
// Unit Tests
// =============================================================================
