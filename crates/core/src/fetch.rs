//! Web page fetching.
//!
//! One GET per page with redirects followed, a fixed identifying User-Agent
//! and a bounded timeout. Nothing is retried here; a failed fetch fails the
//! whole extraction and the caller decides what to do next.

use std::time::Duration;

use reqwest::Client;
use reqwest::redirect::Policy;
use url::Url;

use crate::config::FetchConfig;
use crate::{LecternError, Result};

/// A fetched page and the address it was finally served from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub html: String,
    /// URL after redirects; becomes the article's canonical URL.
    pub final_url: String,
}

/// Checks that `url` is an absolute `http` or `https` URL.
pub fn parse_http_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url.trim()).map_err(|e| LecternError::InvalidUrl(format!("{url}: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(LecternError::InvalidUrl(format!("{url}: unsupported scheme {other}"))),
    }
}

fn client(config: &FetchConfig) -> Result<Client> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(config.timeout))
        .redirect(Policy::limited(config.max_redirects))
        .user_agent(config.user_agent.as_str())
        .build()?)
}

fn map_request_error(err: reqwest::Error, config: &FetchConfig) -> LecternError {
    if err.is_timeout() { LecternError::Timeout { timeout: config.timeout } } else { LecternError::Http(err) }
}

/// Fetches `url`, following redirects.
///
/// # Errors
///
/// [`LecternError::InvalidUrl`] for anything but an absolute http(s) URL,
/// [`LecternError::Timeout`] when the request outlives `config.timeout`,
/// [`LecternError::HttpStatus`] for a non-2xx answer and
/// [`LecternError::Http`] for every other transport failure.
pub async fn fetch_page(url: &str, config: &FetchConfig) -> Result<FetchedPage> {
    let parsed = parse_http_url(url)?;
    tracing::debug!(url = %parsed, timeout = config.timeout, "fetching page");

    let response = client(config)?
        .get(parsed)
        .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
        .header("Accept-Language", "en-US,en;q=0.9")
        .send()
        .await
        .map_err(|e| map_request_error(e, config))?;

    let final_url = response.url().to_string();
    let status = response.status();
    if !status.is_success() {
        return Err(LecternError::HttpStatus { status: status.as_u16(), url: final_url });
    }

    let html = response.text().await.map_err(|e| map_request_error(e, config))?;
    tracing::debug!(url = %final_url, bytes = html.len(), "fetched page");

    Ok(FetchedPage { html, final_url })
}
