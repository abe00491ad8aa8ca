//! HTTP retry helper for transient upstream errors.
//!
//! All queries go through [`send_json`] instead of calling
//! `reqwest::RequestBuilder::send()` directly, so connection failures,
//! timeouts, rate limiting and server errors get a bounded number of
//! retries with exponential backoff. The whole call, retries and backoff
//! included, is bounded by one deadline.
//!
//! # Usage
//!
//! ```ignore
//! let body = retry::send_json(
//!     || client.post(&url).body(xml.clone()),
//!     2,
//!     Duration::from_secs(15),
//! )
//! .await?;
//! ```

use std::time::Duration;

use crate::UpstreamError;

/// Base delay before the first retry. Doubles on every attempt.
const BASE_BACKOFF: Duration = Duration::from_millis(250);

/// Maximum number of characters of the response body kept in errors.
const BODY_PREVIEW_LEN: usize = 300;

/// Sends an HTTP request and parses the response body as JSON.
///
/// The `build_request` closure is called on each attempt to construct a
/// fresh [`reqwest::RequestBuilder`] (builders are consumed by `.send()`).
///
/// Retries up to `max_retries` times on connection errors, timeouts,
/// HTTP 429 and HTTP 5xx. Other non-success statuses and undecodable
/// bodies fail immediately. No call outlives `timeout`, however many
/// attempts are left.
///
/// # Errors
///
/// Returns [`UpstreamError::Http`] for transport failures,
/// [`UpstreamError::Timeout`] when `timeout` runs out,
/// [`UpstreamError::Status`] for non-success statuses, and
/// [`UpstreamError::Malformed`] if the body is not valid JSON.
pub async fn send_json<F>(
    build_request: F,
    max_retries: u32,
    timeout: Duration,
) -> Result<serde_json::Value, UpstreamError>
where
    F: Fn() -> reqwest::RequestBuilder + Send + Sync,
{
    if let Ok(result) =
        tokio::time::timeout(timeout, send_and_parse(&build_request, max_retries)).await
    {
        result
    } else {
        log::warn!("  gave up after {timeout:?}");
        Err(UpstreamError::Timeout { timeout })
    }
}

async fn send_and_parse<F>(
    build_request: &F,
    max_retries: u32,
) -> Result<serde_json::Value, UpstreamError>
where
    F: Fn() -> reqwest::RequestBuilder + Send + Sync,
{
    let response = send_inner(build_request, max_retries).await?;
    let status = response.status();
    let text = response.text().await?;

    serde_json::from_str(&text).map_err(|e| {
        log::warn!(
            "JSON parse failed (status {status}, {} bytes): {e}\n  body preview: {}",
            text.len(),
            preview(&text)
        );
        UpstreamError::Malformed {
            message: format!("response is not valid JSON: {e}"),
        }
    })
}

/// Core retry loop. Returns the first response with a 2xx/3xx status.
async fn send_inner<F>(build_request: &F, max_retries: u32) -> Result<reqwest::Response, UpstreamError>
where
    F: Fn() -> reqwest::RequestBuilder + Send + Sync,
{
    let mut attempt = 0;

    loop {
        if attempt > 0 {
            let delay = BASE_BACKOFF * (1u32 << (attempt - 1).min(8));
            log::warn!("  retry {attempt}/{max_retries} in {delay:?}...");
            tokio::time::sleep(delay).await;
        }

        match build_request().send().await {
            Err(e) => {
                if is_transient(&e) && attempt < max_retries {
                    log::warn!("  transient error: {e}");
                    attempt += 1;
                    continue;
                }
                return Err(UpstreamError::Http(e));
            }
            Ok(response) => {
                let status = response.status();

                if (status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error())
                    && attempt < max_retries
                {
                    log::warn!("  HTTP {status}");
                    attempt += 1;
                    continue;
                }

                if status.is_client_error() || status.is_server_error() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(UpstreamError::Status {
                        status: status.as_u16(),
                        body_preview: preview(&body),
                    });
                }

                return Ok(response);
            }
        }
    }
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_request()
}

fn preview(text: &str) -> String {
    if text.chars().count() > BODY_PREVIEW_LEN {
        let head: String = text.chars().take(BODY_PREVIEW_LEN).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    enum Reply {
        Status(&'static str, &'static str),
        Silent,
    }

    /// Local HTTP endpoint answering every connection with `reply`.
    /// Returns its URL and a connection counter.
    async fn serve(reply: Reply) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let reply = Arc::new(reply);

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                let reply = Arc::clone(&reply);
                tokio::spawn(async move {
                    let mut buf = [0u8; 4096];
                    let _ = socket.read(&mut buf).await;
                    match *reply {
                        Reply::Status(status, body) => {
                            let response = format!(
                                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\n\
                                 Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                                body.len()
                            );
                            let _ = socket.write_all(response.as_bytes()).await;
                            let _ = socket.shutdown().await;
                        }
                        Reply::Silent => {
                            tokio::time::sleep(Duration::from_secs(30)).await;
                        }
                    }
                });
            }
        });

        (format!("http://{addr}/"), hits)
    }

    fn client(timeout: Duration) -> reqwest::Client {
        reqwest::Client::builder()
            .no_proxy()
            .timeout(timeout)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn success_body_is_parsed() {
        let (url, hits) = serve(Reply::Status("200 OK", r#"{"RESPONSE": {}}"#)).await;
        let client = client(Duration::from_secs(5));

        let body = send_json(|| client.post(&url), 2, Duration::from_secs(5))
            .await
            .unwrap();

        assert!(body.get("RESPONSE").is_some());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn server_error_is_retried_then_reported() {
        let (url, hits) = serve(Reply::Status("500 Internal Server Error", "boom")).await;
        let client = client(Duration::from_secs(5));

        let result = send_json(|| client.post(&url), 2, Duration::from_secs(10)).await;

        assert!(matches!(
            result,
            Err(UpstreamError::Status { status: 500, .. })
        ));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn rate_limit_is_retried() {
        let (url, hits) = serve(Reply::Status("429 Too Many Requests", "")).await;
        let client = client(Duration::from_secs(5));

        let result = send_json(|| client.post(&url), 1, Duration::from_secs(10)).await;

        assert!(matches!(
            result,
            Err(UpstreamError::Status { status: 429, .. })
        ));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn client_error_is_not_retried() {
        let (url, hits) = serve(Reply::Status("404 Not Found", "nope")).await;
        let client = client(Duration::from_secs(5));

        let result = send_json(|| client.post(&url), 2, Duration::from_secs(10)).await;

        match result {
            Err(UpstreamError::Status {
                status,
                body_preview,
            }) => {
                assert_eq!(status, 404);
                assert_eq!(body_preview, "nope");
            }
            other => panic!("expected status error, got {other:?}"),
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn non_json_body_is_malformed() {
        let (url, _) = serve(Reply::Status("200 OK", "<html>")).await;
        let client = client(Duration::from_secs(5));

        let result = send_json(|| client.post(&url), 0, Duration::from_secs(5)).await;

        assert!(matches!(result, Err(UpstreamError::Malformed { .. })));
    }

    #[tokio::test]
    async fn silent_peer_fails_within_the_deadline() {
        let (url, hits) = serve(Reply::Silent).await;
        let timeout = Duration::from_secs(1);
        let client = client(timeout);

        let started = Instant::now();
        let result = send_json(|| client.post(&url), 2, timeout).await;
        let elapsed = started.elapsed();

        assert!(result.is_err());
        assert!(elapsed < Duration::from_millis(1500), "took {elapsed:?}");
        assert!(hits.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn preview_truncates_on_char_boundaries() {
        let long = "å".repeat(BODY_PREVIEW_LEN + 10);
        let p = preview(&long);
        assert!(p.ends_with("..."));
        assert_eq!(p.chars().count(), BODY_PREVIEW_LEN + 3);
        assert_eq!(preview("short"), "short");
    }
}
