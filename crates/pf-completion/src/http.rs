// http.rs — Shared HTTP plumbing for the hosted providers.
//
// One attempt per call. Retrying is the caller's decision; this layer only
// classifies what went wrong so the caller can make it.

use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;

use crate::error::CompletionError;

pub(crate) fn build_client(timeout: Duration) -> Client {
    Client::builder()
        .connect_timeout(Duration::from_secs(15))
        .timeout(timeout)
        .pool_idle_timeout(Duration::from_secs(90))
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Send a prepared JSON request and decode the JSON body of a 2xx answer.
pub(crate) async fn send_json(
    request: RequestBuilder,
    body: &Value,
    secret: &str,
) -> Result<Value, CompletionError> {
    let response = request
        .json(body)
        .send()
        .await
        .map_err(|e| transport_error(e, secret))?;

    let status = response.status();
    let retry_after = parse_retry_after(response.headers());
    let text = response
        .text()
        .await
        .map_err(|e| transport_error(e, secret))?;

    if !status.is_success() {
        return Err(status_error(status, censor(&text, secret), retry_after));
    }

    serde_json::from_str(&text).map_err(|e| CompletionError::Server {
        status: status.as_u16(),
        message: format!("invalid JSON in response: {}", e),
    })
}

/// Map a non-success HTTP status onto the completion error taxonomy.
pub(crate) fn status_error(
    status: StatusCode,
    body: String,
    retry_after: Option<Duration>,
) -> CompletionError {
    match status.as_u16() {
        401 | 403 => CompletionError::Auth(format!("HTTP {}: {}", status, body)),
        408 => CompletionError::Timeout(format!("HTTP {}: {}", status, body)),
        429 => CompletionError::RateLimit {
            message: body,
            retry_after,
        },
        code if status.is_client_error() => CompletionError::Rejected {
            status: code,
            message: body,
        },
        code => CompletionError::Server {
            status: code,
            message: body,
        },
    }
}

fn transport_error(e: reqwest::Error, secret: &str) -> CompletionError {
    let message = censor(&e.to_string(), secret);
    if e.is_timeout() {
        CompletionError::Timeout(message)
    } else {
        CompletionError::Network(message)
    }
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Replace an API key with a short suffix hint wherever it appears.
pub(crate) fn censor(text: &str, secret: &str) -> String {
    if secret.is_empty() {
        return text.to_string();
    }
    let hint = if secret.chars().count() > 8 {
        let tail_start = secret
            .char_indices()
            .rev()
            .nth(3)
            .map(|(i, _)| i)
            .unwrap_or(0);
        format!("...{}", &secret[tail_start..])
    } else {
        "...".to_string()
    };
    text.replace(secret, &hint)
}

/// Walk a JSON value along a path of object keys and array indices.
pub(crate) fn text_at<'a>(value: &'a Value, path: &[PathSeg]) -> Option<&'a str> {
    let mut current = value;
    for seg in path {
        current = match seg {
            PathSeg::Key(k) => current.get(*k)?,
            PathSeg::Index(i) => current.get(*i)?,
        };
    }
    current.as_str()
}

pub(crate) enum PathSeg {
    Key(&'static str),
    Index(usize),
}
