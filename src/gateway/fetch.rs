//! `fetch-url`: GET an http(s) URL on behalf of the renderer.
//!
//! The renderer cannot make cross-origin requests itself, so page content
//! for the assistant's "summarize" flow comes through here. The body is
//! returned raw by default, or as readable plain text when asked.

use tracing::{debug, warn};

use crate::error::{GatewayError, GatewayResult};

/// Maximum raw response body size (5 MB).
const MAX_RESPONSE_SIZE: usize = 5 * 1024 * 1024;

/// HTTP read timeout in seconds.
const READ_TIMEOUT_SECS: u64 = 30;

/// HTTP connect timeout in seconds.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Text wrapping width for html2text conversion.
const TEXT_WIDTH: usize = 100;

const USER_AGENT: &str = concat!("browser-gateway/", env!("CARGO_PKG_VERSION"));

pub struct UrlFetcher {
    client: reqwest::Client,
}

impl UrlFetcher {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(READ_TIMEOUT_SECS))
            .connect_timeout(std::time::Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { client }
    }

    /// Fetches `url`. With `as_text`, HTML bodies are converted to plain text.
    pub async fn fetch(&self, url: &str, as_text: bool) -> GatewayResult<String> {
        let parsed = url::Url::parse(url)
            .map_err(|e| GatewayError::InvalidRequest(format!("invalid URL: {e}")))?;

        match parsed.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(GatewayError::InvalidRequest(format!(
                    "unsupported scheme '{scheme}' (only http/https)"
                )));
            }
        }

        debug!("Fetching URL: {url}");

        let mut response = self.client.get(parsed).send().await.map_err(|e| {
            warn!("URL fetch failed: {e}");
            GatewayError::from(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::UpstreamFailure(format!("HTTP {status}")));
        }

        if let Some(len) = response.content_length() {
            if len as usize > MAX_RESPONSE_SIZE {
                return Err(too_large(len as usize));
            }
        }

        // Extract content type before consuming response
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("text/html")
            .to_string();

        // Chunked responses carry no length, so the cap is enforced while reading
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if body.len() + chunk.len() > MAX_RESPONSE_SIZE {
                return Err(too_large(body.len() + chunk.len()));
            }
            body.extend_from_slice(&chunk);
        }

        if as_text && is_html(&content_type) {
            Ok(html_to_text(&body))
        } else {
            Ok(String::from_utf8_lossy(&body).into_owned())
        }
    }
}

impl Default for UrlFetcher {
    fn default() -> Self {
        Self::new()
    }
}

fn too_large(len: usize) -> GatewayError {
    GatewayError::UpstreamFailure(format!(
        "response too large ({len} bytes, limit is {MAX_RESPONSE_SIZE} bytes)"
    ))
}

/// Returns true if the content type looks like HTML.
fn is_html(content_type: &str) -> bool {
    let ct = content_type.to_lowercase();
    ct.contains("text/html") || ct.contains("application/xhtml")
}

fn html_to_text(body: &[u8]) -> String {
    html2text::from_read(body, TEXT_WIDTH)
        .unwrap_or_else(|_| String::from_utf8_lossy(body).into_owned())
        .trim()
        .to_string()
}
