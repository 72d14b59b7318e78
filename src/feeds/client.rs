//! HTTP client creation and response decoding for feed requests.

use anyhow::{anyhow, Context, Result};
use reqwest::{cookie::Jar, header};
use std::io::Read;
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::types::{FeedPayload, MAX_RETRIES, REQUEST_TIMEOUT, RETRY_DELAY};
use crate::TARGET_WEB_REQUEST;

const USER_AGENT: &str = concat!("herald/", env!("CARGO_PKG_VERSION"));

const ACCEPT_FEEDS: &str =
    "application/rss+xml, application/atom+xml, application/xml, text/xml, */*;q=0.9";

/// Build the shared HTTP client used for all feed requests.
pub fn build_client() -> Result<reqwest::Client> {
    let cookie_store = Jar::default();
    reqwest::Client::builder()
        .cookie_store(true)
        .cookie_provider(Arc::new(cookie_store))
        .gzip(true)
        .redirect(reqwest::redirect::Policy::default())
        .build()
        .context("failed to build HTTP client")
}

/// Download one feed, retrying transient failures.
pub async fn fetch_feed(client: &reqwest::Client, url: &str) -> Result<FeedPayload> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        debug!(target: TARGET_WEB_REQUEST, "Requesting {} (attempt {}/{})", url, attempt, MAX_RETRIES);

        let response = timeout(
            REQUEST_TIMEOUT,
            client
                .get(url)
                .header(header::USER_AGENT, USER_AGENT)
                .header(header::ACCEPT, ACCEPT_FEEDS)
                .header(header::ACCEPT_ENCODING, "gzip, deflate, br")
                .send(),
        )
        .await;

        let failure = match response {
            Ok(Ok(resp)) if resp.status().is_success() => {
                let content_type = header_value(&resp, header::CONTENT_TYPE);
                let content_encoding = header_value(&resp, header::CONTENT_ENCODING);
                let bytes = resp
                    .bytes()
                    .await
                    .with_context(|| format!("failed to read body from {}", url))?;
                return Ok(FeedPayload {
                    bytes: bytes.to_vec(),
                    content_type,
                    content_encoding,
                });
            }
            Ok(Ok(resp)) => format!("HTTP {}", resp.status()),
            Ok(Err(err)) => format!("request failed: {}", err),
            Err(_) => format!("timed out after {}s", REQUEST_TIMEOUT.as_secs()),
        };

        if attempt >= MAX_RETRIES {
            return Err(anyhow!(
                "giving up on {} after {} attempts: {}",
                url,
                attempt,
                failure
            ));
        }
        warn!(
            target: TARGET_WEB_REQUEST,
            "Request to {} failed ({}), retrying in {}s",
            url,
            failure,
            RETRY_DELAY.as_secs()
        );
        tokio::time::sleep(RETRY_DELAY).await;
    }
}

fn header_value(resp: &reqwest::Response, name: header::HeaderName) -> Option<String> {
    resp.headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string())
}

/// Turn a payload into text: undo any compression reqwest left in place,
/// then pick a charset.
pub fn decode_payload(payload: &FeedPayload, url: &str) -> String {
    let bytes = match payload.content_encoding.as_deref() {
        Some("br") => {
            let mut decompressed = Vec::new();
            let mut decompressor = brotli::Decompressor::new(&payload.bytes[..], 4096);
            match decompressor.read_to_end(&mut decompressed) {
                Ok(_) => decompressed,
                Err(err) => {
                    warn!(target: TARGET_WEB_REQUEST, "Brotli decompression failed for {}: {}", url, err);
                    payload.bytes.clone()
                }
            }
        }
        _ => try_decompressions(&payload.bytes, url),
    };
    decode_text(&bytes, payload.content_type.as_deref())
}

/// Try various decompression methods for a byte array.
fn try_decompressions(bytes: &[u8], url: &str) -> Vec<u8> {
    let mut decoder = flate2::read::GzDecoder::new(bytes);
    let mut decoded = Vec::new();
    if decoder.read_to_end(&mut decoded).is_ok() && !decoded.is_empty() {
        debug!(target: TARGET_WEB_REQUEST, "Decompressed {} with gzip", url);
        return decoded;
    }

    let mut decoder = flate2::read::ZlibDecoder::new(bytes);
    let mut decoded = Vec::new();
    if decoder.read_to_end(&mut decoded).is_ok() && !decoded.is_empty() {
        debug!(target: TARGET_WEB_REQUEST, "Decompressed {} with zlib", url);
        return decoded;
    }

    let mut decoder = flate2::read::DeflateDecoder::new(bytes);
    let mut decoded = Vec::new();
    if decoder.read_to_end(&mut decoded).is_ok() && !decoded.is_empty() {
        debug!(target: TARGET_WEB_REQUEST, "Decompressed {} with deflate", url);
        return decoded;
    }

    bytes.to_vec()
}

/// Decode bytes to text: UTF-8 first, then any charset advertised in the
/// content type, then windows-1252.
fn decode_text(bytes: &[u8], content_type: Option<&str>) -> String {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return text.to_string();
    }

    if let Some(charset) = content_type.and_then(charset_label) {
        if let Some(encoding) = encoding_rs::Encoding::for_label(charset.as_bytes()) {
            let (decoded, _, had_errors) = encoding.decode(bytes);
            if !had_errors {
                return decoded.into_owned();
            }
        }
    }

    // Windows-1252 maps every byte, so this always yields text.
    let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    decoded.into_owned()
}

fn charset_label(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .find(|part| part.trim().to_lowercase().starts_with("charset="))
        .and_then(|part| part.split('=').nth(1))
        .map(|label| label.trim().trim_matches('"').to_string())
}
