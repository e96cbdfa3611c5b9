//! HTTP relay against the upstream forum site.
//!
//! All outbound traffic goes through [`UpstreamClient`]: a fixed browser-like
//! header set, a hard timeout, redirects disabled (a 3xx is a terminal,
//! inspectable response for the auth flows), and a flat delay before every
//! request to throttle the call rate against the upstream site.

use std::time::Duration;

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{redirect, StatusCode};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::config::Config;
use crate::constants::{BROWSER_ACCEPT, BROWSER_ACCEPT_LANGUAGE, BROWSER_USER_AGENT};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("upstream request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("upstream returned status {0}")]
    Status(StatusCode),
    #[error("invalid upstream URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Result of a relayed form submission.
///
/// Carries the raw status (redirects are not followed) and any cookies the
/// upstream set, so the caller can capture them into a session.
#[derive(Debug)]
pub struct FormOutcome {
    pub status: StatusCode,
    pub cookies: Vec<(String, String)>,
}

impl FormOutcome {
    /// The upstream site answers successful login/register/logout with
    /// either a plain 200 or a redirect.
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        self.status == StatusCode::OK || self.status == StatusCode::FOUND
    }
}

/// HTTP client for the upstream forum site.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    base: Url,
    request_delay: Duration,
}

impl UpstreamClient {
    /// Build a client from the application configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL does not parse or the underlying
    /// client cannot be constructed.
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static(BROWSER_ACCEPT));
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static(BROWSER_ACCEPT_LANGUAGE),
        );
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert("Upgrade-Insecure-Requests", HeaderValue::from_static("1"));

        let http = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .default_headers(headers)
            .timeout(config.fetch_timeout)
            .redirect(redirect::Policy::none())
            .build()?;

        Ok(Self {
            http,
            base: Url::parse(&config.upstream_base_url)?,
            request_delay: config.request_delay,
        })
    }

    /// GET a page, replaying the session's cookies verbatim.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the upstream answers with a
    /// non-success status; callers treat both as "upstream unavailable".
    pub async fn fetch_page(
        &self,
        path: &str,
        cookie_header: Option<&str>,
    ) -> Result<String, FetchError> {
        self.throttle().await;

        let url = self.base.join(path)?;
        debug!(url = %url, "fetching upstream page");

        let mut request = self.http.get(url);
        if let Some(cookies) = cookie_header.filter(|c| !c.is_empty()) {
            request = request.header(header::COOKIE, cookies);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        Ok(response.text().await?)
    }

    /// POST url-encoded form data and report the raw outcome.
    ///
    /// Any HTTP status is a valid outcome here; only transport failures are
    /// errors. The response's `Set-Cookie` values are parsed into name/value
    /// pairs for session capture.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be sent.
    pub async fn send_form(
        &self,
        path: &str,
        fields: &[(&str, &str)],
        cookie_header: Option<&str>,
    ) -> Result<FormOutcome, FetchError> {
        self.throttle().await;

        let url = self.base.join(path)?;
        debug!(url = %url, "relaying form to upstream");

        let mut request = self.http.post(url).form(fields);
        if let Some(cookies) = cookie_header.filter(|c| !c.is_empty()) {
            request = request.header(header::COOKIE, cookies);
        }

        let response = request.send().await?;
        let status = response.status();
        let cookies = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(parse_set_cookie)
            .collect();

        Ok(FormOutcome { status, cookies })
    }

    /// Flat pre-request delay; a blunt global rate limiter, not an adaptive one.
    async fn throttle(&self) {
        if !self.request_delay.is_zero() {
            tokio::time::sleep(self.request_delay).await;
        }
    }
}

/// Extract the name/value pair from a `Set-Cookie` header, dropping the
/// attributes after the first `;`.
fn parse_set_cookie(value: &str) -> Option<(String, String)> {
    let pair = value.split(';').next()?;
    let (name, value) = pair.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), value.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_set_cookie() {
        assert_eq!(
            parse_set_cookie("sid=abc123; Path=/; HttpOnly"),
            Some(("sid".to_string(), "abc123".to_string()))
        );
        assert_eq!(
            parse_set_cookie("token=x=y"),
            Some(("token".to_string(), "x=y".to_string()))
        );
        assert_eq!(parse_set_cookie("no-equals-sign"), None);
        assert_eq!(parse_set_cookie("=value"), None);
    }

    #[test]
    fn test_form_outcome_acceptance() {
        let accepted = |status| FormOutcome { status, cookies: vec![] }.is_accepted();

        assert!(accepted(StatusCode::OK));
        assert!(accepted(StatusCode::FOUND));
        assert!(!accepted(StatusCode::UNAUTHORIZED));
        assert!(!accepted(StatusCode::MOVED_PERMANENTLY));
    }
}
