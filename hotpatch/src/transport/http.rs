//! HTTP transports built on `reqwest`.
//!
//! - [`HttpCheckTransport`] POSTs the check body as JSON and parses the reply
//! - [`HttpDownloadTransport`] streams a patch artifact to disk and reports
//!   progress. The server's hash identifier is passed through as the new
//!   local hash; it is checked against the content only when it is a hex
//!   SHA-256 digest

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, warn};

use super::checksum::{calculate_file_checksum, hashes_match, is_sha256_hex};
use super::progress::ProgressTracker;
use super::{
    BoxFuture, CheckResult, CheckTransport, DownloadEvents, DownloadRequest, DownloadTransport,
    TransportError,
};
use crate::check::CheckForUpdateResponse;

/// File extension for stored patch artifacts.
const PATCH_EXTENSION: &str = "patch";

fn build_client(timeout: Duration) -> Result<Client, TransportError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| TransportError::Network(format!("failed to create HTTP client: {}", e)))
}

fn network_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Network(format!("request timed out: {}", e))
    } else {
        TransportError::Network(e.to_string())
    }
}

fn status_error(status: reqwest::StatusCode) -> TransportError {
    TransportError::Http {
        status: status.as_u16(),
        message: status
            .canonical_reason()
            .unwrap_or("unexpected status")
            .to_string(),
    }
}

// =============================================================================
// Check Transport
// =============================================================================

/// Check-for-update transport posting to a fixed URL.
#[derive(Debug, Clone)]
pub struct HttpCheckTransport {
    client: Client,
    url: Url,
    timeout: Duration,
}

impl HttpCheckTransport {
    /// Create a transport for the given check endpoint.
    pub fn new(url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let url = parse_http_url(url)?;
        Ok(Self {
            client: build_client(timeout)?,
            url,
            timeout,
        })
    }

    /// The check endpoint.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

async fn post_check(client: Client, url: Url, body: String) -> CheckResult {
    let response = client
        .post(url)
        .header(CONTENT_TYPE, "application/json")
        .body(body)
        .send()
        .await
        .map_err(network_error)?;

    let status = response.status();
    if !status.is_success() {
        return Err(status_error(status));
    }

    let text = response.text().await.map_err(network_error)?;
    CheckForUpdateResponse::parse(&text).map_err(|e| TransportError::Decode(e.to_string()))
}

impl CheckTransport for HttpCheckTransport {
    fn check(&self, body: String) -> BoxFuture<'static, CheckResult> {
        Box::pin(post_check(self.client.clone(), self.url.clone(), body))
    }
}

// =============================================================================
// Download Transport
// =============================================================================

/// Patch downloader storing artifacts under a local directory.
///
/// Artifacts land at `<download_dir>/<business id>/<hash>.patch`.
#[derive(Debug, Clone)]
pub struct HttpDownloadTransport {
    client: Client,
    download_dir: PathBuf,
}

impl HttpDownloadTransport {
    /// Create a downloader writing into `download_dir`.
    pub fn new(download_dir: impl Into<PathBuf>, timeout: Duration) -> Result<Self, TransportError> {
        Ok(Self {
            client: build_client(timeout)?,
            download_dir: download_dir.into(),
        })
    }

    /// Root directory for stored artifacts.
    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Where the artifact for a request is stored.
    pub fn destination(&self, request: &DownloadRequest) -> PathBuf {
        let name = if request.expected_hash.trim().is_empty() {
            "latest".to_string()
        } else {
            sanitize_component(&request.expected_hash)
        };
        self.download_dir
            .join(sanitize_component(&request.business_id))
            .join(format!("{}.{}", name, PATCH_EXTENSION))
    }
}

impl DownloadTransport for HttpDownloadTransport {
    fn download(
        &self,
        request: DownloadRequest,
        events: Arc<dyn DownloadEvents>,
    ) -> Result<BoxFuture<'static, ()>, TransportError> {
        let url = parse_http_url(&request.url)?;
        let dest = self.destination(&request);
        let client = self.client.clone();

        Ok(Box::pin(async move {
            let id = request.business_id.clone();
            events.on_start(&id);

            match fetch_patch(&client, url, &dest, &request.expected_hash, &id, events.as_ref())
                .await
            {
                Ok(hash) => {
                    info!(business_id = %id, path = %dest.display(), "Patch downloaded");
                    events.on_success(&id, &hash);
                }
                Err(e) => {
                    warn!(business_id = %id, error = %e, "Patch download failed");
                    events.on_error(&id, e.code(), &e.to_string());
                }
            }
        }))
    }
}

/// Fetch the artifact into `dest` and return the hash to record locally.
///
/// A partially written or rejected file is removed.
async fn fetch_patch(
    client: &Client,
    url: Url,
    dest: &Path,
    expected_hash: &str,
    business_id: &str,
    events: &dyn DownloadEvents,
) -> Result<String, TransportError> {
    let response = client.get(url).send().await.map_err(network_error)?;

    let status = response.status();
    if !status.is_success() {
        return Err(status_error(status));
    }

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).await?;
    }

    let result = match write_body(response, dest, business_id, events).await {
        Ok(()) => accept_patch(dest, expected_hash).await,
        Err(e) => Err(e),
    };
    if result.is_err() {
        fs::remove_file(dest).await.ok();
    }
    result
}

/// Stream the response body into `dest`, reporting progress.
async fn write_body(
    response: reqwest::Response,
    dest: &Path,
    business_id: &str,
    events: &dyn DownloadEvents,
) -> Result<(), TransportError> {
    let mut tracker = ProgressTracker::new(response.content_length().unwrap_or(0));
    let mut writer = BufWriter::new(File::create(dest).await?);

    let mut downloaded: u64 = 0;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(network_error)?;
        writer.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;

        if let Some(percent) = tracker.update(downloaded) {
            events.on_progress(business_id, percent);
        }
    }
    writer.flush().await?;

    if let Some(percent) = tracker.finish() {
        events.on_progress(business_id, percent);
    }
    debug!(business_id, bytes = downloaded, "Patch stream complete");
    Ok(())
}

/// Decide which hash the stored artifact is recorded under.
///
/// The server's identifier wins. SHA-256 shaped identifiers must match the
/// content; without an identifier the content hash is used.
async fn accept_patch(dest: &Path, expected_hash: &str) -> Result<String, TransportError> {
    let expected = expected_hash.trim();
    if !expected.is_empty() && !is_sha256_hex(expected) {
        return Ok(expected.to_string());
    }

    let path = dest.to_path_buf();
    let actual = tokio::task::spawn_blocking(move || calculate_file_checksum(&path))
        .await
        .map_err(|e| TransportError::Io(format!("checksum task failed: {}", e)))??;

    if expected.is_empty() {
        return Ok(actual);
    }
    if !hashes_match(expected, &actual) {
        return Err(TransportError::HashMismatch {
            expected: expected.to_string(),
            actual,
        });
    }
    Ok(expected.to_string())
}

/// Parse a URL, accepting only http and https.
fn parse_http_url(raw: &str) -> Result<Url, TransportError> {
    let url = Url::parse(raw.trim()).map_err(|e| TransportError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(TransportError::InvalidUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme '{}'", scheme),
        }),
    }
}

/// Make a server-provided value safe to use as a single path component.
fn sanitize_component(value: &str) -> String {
    let cleaned: String = value
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    /// SHA-256 of `hello`.
    const HELLO_SHA256: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    #[derive(Default)]
    struct RecordingEvents {
        calls: Mutex<Vec<String>>,
    }

    impl DownloadEvents for RecordingEvents {
        fn on_start(&self, id: &str) {
            self.calls.lock().push(format!("start:{}", id));
        }
        fn on_progress(&self, id: &str, percent: u8) {
            self.calls.lock().push(format!("progress:{}:{}", id, percent));
        }
        fn on_success(&self, id: &str, hash: &str) {
            self.calls.lock().push(format!("success:{}:{}", id, hash));
        }
        fn on_error(&self, id: &str, code: i32, _message: &str) {
            self.calls.lock().push(format!("error:{}:{}", id, code));
        }
    }

    fn downloader(dir: &TempDir) -> HttpDownloadTransport {
        HttpDownloadTransport::new(dir.path(), Duration::from_secs(5)).unwrap()
    }

    /// Serve one raw HTTP response on a local port and return the base URL.
    async fn serve_once(response: Vec<u8>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match socket.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            socket.write_all(&response).await.ok();
            socket.shutdown().await.ok();
        });

        format!("http://{}", addr)
    }

    fn ok_response(body: &[u8], content_length: usize) -> Vec<u8> {
        let mut response = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            content_length
        )
        .into_bytes();
        response.extend_from_slice(body);
        response
    }

    async fn run_download(
        transport: &HttpDownloadTransport,
        request: DownloadRequest,
    ) -> Vec<String> {
        let events = Arc::new(RecordingEvents::default());
        transport.download(request, events.clone()).unwrap().await;
        let calls = events.calls.lock().clone();
        calls
    }

    #[test]
    fn test_parse_http_url() {
        assert!(parse_http_url("https://cdn.example.com/a.patch").is_ok());
        assert!(parse_http_url("http://127.0.0.1:8080/a").is_ok());
        assert!(matches!(
            parse_http_url("ftp://cdn.example.com/a"),
            Err(TransportError::InvalidUrl { .. })
        ));
        assert!(matches!(
            parse_http_url("not a url"),
            Err(TransportError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_check_transport_rejects_bad_url() {
        assert!(HttpCheckTransport::new("::", Duration::from_secs(1)).is_err());

        let transport =
            HttpCheckTransport::new("https://patches.example.com/check", Duration::from_secs(7))
                .unwrap();
        assert_eq!(transport.url().as_str(), "https://patches.example.com/check");
        assert_eq!(transport.timeout(), Duration::from_secs(7));
    }

    #[test]
    fn test_sanitize_component() {
        assert_eq!(sanitize_component("home-page_1"), "home-page_1");
        assert_eq!(sanitize_component("../../etc"), "______etc");
        assert_eq!(sanitize_component(""), "_");
    }

    #[test]
    fn test_destination_layout() {
        let temp = TempDir::new().unwrap();
        let transport = downloader(&temp);

        let dest = transport.destination(&DownloadRequest::new("home", "https://x/y", "abc"));
        assert_eq!(dest, temp.path().join("home").join("abc.patch"));

        let dest = transport.destination(&DownloadRequest::new("home", "https://x/y", ""));
        assert_eq!(dest, temp.path().join("home").join("latest.patch"));
    }

    #[test]
    fn test_invalid_url_fails_at_submission() {
        let temp = TempDir::new().unwrap();
        let transport = downloader(&temp);
        let events = Arc::new(RecordingEvents::default());

        let result = transport.download(
            DownloadRequest::new("c", "file:///etc/passwd", "h"),
            events.clone(),
        );

        assert!(matches!(result, Err(TransportError::InvalidUrl { .. })));
        assert!(events.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_host_reports_error() {
        let temp = TempDir::new().unwrap();
        let transport = downloader(&temp);
        let events = Arc::new(RecordingEvents::default());

        // Port 9 (discard) on localhost is not expected to run an HTTP server.
        let work = transport
            .download(
                DownloadRequest::new("d", "http://127.0.0.1:9/d.patch", "h"),
                events.clone(),
            )
            .unwrap();
        work.await;

        let calls = events.calls.lock().clone();
        assert_eq!(calls.first().map(String::as_str), Some("start:d"));
        assert_eq!(calls.last().map(String::as_str), Some("error:d:-1"));
        assert_eq!(calls.len(), 2);
    }

    #[tokio::test]
    async fn test_opaque_hash_identifier_is_reported() {
        let temp = TempDir::new().unwrap();
        let transport = downloader(&temp);
        let base = serve_once(ok_response(b"hello", 5)).await;

        // MD5-style identifier, not comparable to the content hash
        let request = DownloadRequest::new(
            "d",
            &format!("{}/d.patch", base),
            "5d41402abc4b2a76b9719d911017c592",
        );
        let dest = transport.destination(&request);
        let calls = run_download(&transport, request).await;

        assert_eq!(
            calls.last().map(String::as_str),
            Some("success:d:5d41402abc4b2a76b9719d911017c592")
        );
        assert_eq!(std::fs::read(&dest).unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_sha256_identifier_is_verified() {
        let temp = TempDir::new().unwrap();
        let transport = downloader(&temp);
        let base = serve_once(ok_response(b"hello", 5)).await;

        let request = DownloadRequest::new("d", &format!("{}/d.patch", base), HELLO_SHA256);
        let calls = run_download(&transport, request).await;

        assert_eq!(
            calls.last().cloned(),
            Some(format!("success:d:{}", HELLO_SHA256))
        );
    }

    #[tokio::test]
    async fn test_sha256_mismatch_removes_file() {
        let temp = TempDir::new().unwrap();
        let transport = downloader(&temp);
        let base = serve_once(ok_response(b"tampered", 8)).await;

        let request = DownloadRequest::new("d", &format!("{}/d.patch", base), HELLO_SHA256);
        let dest = transport.destination(&request);
        let calls = run_download(&transport, request).await;

        assert_eq!(calls.last().map(String::as_str), Some("error:d:-3"));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_truncated_body_removes_partial_file() {
        let temp = TempDir::new().unwrap();
        let transport = downloader(&temp);
        // Promises 100 bytes, closes after 5
        let base = serve_once(ok_response(b"hello", 100)).await;

        let request = DownloadRequest::new("d", &format!("{}/d.patch", base), "v2");
        let dest = transport.destination(&request);
        let calls = run_download(&transport, request).await;

        assert_eq!(calls.last().map(String::as_str), Some("error:d:-1"));
        assert!(!dest.exists());
    }
}
