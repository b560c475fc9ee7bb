//! Async HTTP client wrapping reqwest.
//!
//! Not a browser, just bounded HTTP: per-call timeout, a hard redirect
//! ceiling with SSRF re-checks on every hop, and a body size cap. Failures
//! are surfaced as-is and never retried.

use super::page_text::{extract_page_text, PageText};
use super::url_guard::validate_url;
use crate::config::HttpConfig;
use crate::error::{PricingError, PricingResult};
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use std::fmt;
use std::time::Duration;

/// A fetched HTML page.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Requested URL.
    pub url: String,
    /// Final URL after redirects.
    pub final_url: String,
    /// HTTP status code.
    pub status: u16,
    /// Raw markup, capped at `max_body_bytes`.
    pub html: String,
    /// Whether the body was cut at the size cap.
    pub truncated: bool,
    /// Visible/hidden text derived from the markup.
    pub text: PageText,
}

impl FetchedPage {
    pub fn visible_text(&self) -> &str {
        &self.text.visible
    }
}

/// Redirect hop rejected by the SSRF guard.
#[derive(Debug)]
struct RedirectRejected(String);

impl fmt::Display for RedirectRejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "redirect rejected: {}", self.0)
    }
}

impl std::error::Error for RedirectRejected {}

/// Shared HTTP client for static page fetches. Cheap to clone.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    /// HTTP/1.1-only fallback client for sites that reject HTTP/2.
    h1_client: reqwest::Client,
    timeout: Duration,
    head_timeout: Duration,
    max_body_bytes: usize,
}

impl HttpClient {
    /// Build the client from configuration.
    pub fn new(config: &HttpConfig, allow_private: bool) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_str(&config.accept).context("invalid Accept header")?,
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_str(&config.accept_language)
                .context("invalid Accept-Language header")?,
        );

        let build = |h1_only: bool| {
            let max_redirects = config.max_redirects;
            let policy = reqwest::redirect::Policy::custom(move |attempt| {
                // previous() includes the original request URL.
                if attempt.previous().len() > max_redirects {
                    return attempt.error("too many redirects");
                }
                if let Err(e) = validate_url(attempt.url().as_str(), allow_private) {
                    return attempt.error(RedirectRejected(e.to_string()));
                }
                attempt.follow()
            });

            let mut builder = reqwest::Client::builder()
                .timeout(Duration::from_millis(config.timeout_ms))
                .redirect(policy)
                .user_agent(config.user_agent.clone())
                .default_headers(headers.clone());
            if h1_only {
                builder = builder.http1_only();
            }
            builder.build().context("failed to build HTTP client")
        };

        Ok(Self {
            client: build(false)?,
            h1_client: build(true)?,
            timeout: Duration::from_millis(config.timeout_ms),
            head_timeout: Duration::from_millis(config.head_timeout_ms),
            max_body_bytes: config.max_body_bytes,
        })
    }

    /// GET a page and derive its text views.
    ///
    /// Falls back to HTTP/1.1 on protocol errors (some CDNs reject HTTP/2).
    pub async fn fetch_page(&self, url: &str) -> PricingResult<FetchedPage> {
        let resp = match self.send_get(&self.client, url).await {
            Ok(r) => r,
            Err(e) if looks_like_protocol_error(&e) => {
                tracing::debug!("retrying {url} over HTTP/1.1: {e}");
                self.send_get(&self.h1_client, url)
                    .await
                    .map_err(map_send_error)?
            }
            Err(e) => return Err(map_send_error(e)),
        };

        let status = resp.status().as_u16();
        let final_url = resp.url().to_string();
        if !resp.status().is_success() {
            return Err(PricingError::status(status));
        }

        let (html, truncated) = self.read_capped(resp).await?;
        if truncated {
            tracing::warn!(
                "response body for {url} truncated at {} bytes",
                self.max_body_bytes
            );
        }

        let text = extract_page_text(&html);
        Ok(FetchedPage {
            url: url.to_string(),
            final_url,
            status,
            html,
            truncated,
            text,
        })
    }

    /// Cheap existence probe: HEAD returning exactly 200.
    pub async fn exists(&self, url: &str) -> bool {
        match self
            .client
            .head(url)
            .timeout(self.head_timeout)
            .send()
            .await
        {
            Ok(resp) => resp.status().as_u16() == 200,
            Err(e) => {
                tracing::debug!("HEAD {url} failed: {e}");
                false
            }
        }
    }

    async fn send_get(
        &self,
        client: &reqwest::Client,
        url: &str,
    ) -> Result<reqwest::Response, reqwest::Error> {
        client.get(url).timeout(self.timeout).send().await
    }

    async fn read_capped(&self, mut resp: reqwest::Response) -> PricingResult<(String, bool)> {
        let mut body: Vec<u8> = Vec::new();
        let mut truncated = false;

        while let Some(chunk) = resp.chunk().await.map_err(map_send_error)? {
            let room = self.max_body_bytes.saturating_sub(body.len());
            if chunk.len() > room {
                body.extend_from_slice(&chunk[..room]);
                truncated = true;
                break;
            }
            body.extend_from_slice(&chunk);
        }

        Ok((String::from_utf8_lossy(&body).into_owned(), truncated))
    }
}

fn looks_like_protocol_error(e: &reqwest::Error) -> bool {
    let msg = format!("{e:?}").to_lowercase();
    !e.is_redirect() && (msg.contains("http2") || msg.contains("protocol"))
}

fn map_send_error(e: reqwest::Error) -> PricingError {
    if e.is_redirect() {
        let mut source = std::error::Error::source(&e);
        while let Some(inner) = source {
            if let Some(rejected) = inner.downcast_ref::<RedirectRejected>() {
                return PricingError::InvalidUrl(rejected.0.clone());
            }
            source = inner.source();
        }
        return PricingError::TooManyRedirects;
    }
    if e.is_timeout() {
        return PricingError::network("request timed out");
    }
    PricingError::network(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_client_creation() {
        let client = HttpClient::new(&HttpConfig::default(), false);
        assert!(client.is_ok());
    }

    #[test]
    fn test_invalid_header_rejected() {
        let config = HttpConfig {
            accept: "bad\nheader".to_string(),
            ..HttpConfig::default()
        };
        assert!(HttpClient::new(&config, false).is_err());
    }
}
