//! HTTP client for the summary API
//!
//! The credential is carried in an explicit [`Session`] passed to every call;
//! nothing is kept in global state.

pub mod render;

use reqwest::{multipart, Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::sleep;

use crate::error::{Error, Result};
use crate::report::ReportView;
use crate::types::{AccessToken, HistoryEntry, LoginRequest, RefreshRequest, TokenPair, UploadResponse};

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000/api";

/// An authenticated client session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub username: String,
    pub access: String,
    pub refresh: String,
}

impl Session {
    /// Default location of the persisted session file
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("equip-summary")
            .join("session.json")
    }

    /// Load a saved session, `None` if the file does not exist
    pub fn load(path: &Path) -> Result<Option<Self>> {
        match std::fs::read(path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_vec_pretty(self)?)?;
        Ok(())
    }

    /// Remove a saved session file if present
    pub fn clear(path: &Path) -> Result<()> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Summary API client with retry on transient failures
pub struct ApiClient {
    client: Client,
    base_url: String,
    max_retries: u32,
}

impl ApiClient {
    /// Create a client for the API rooted at `base_url` (e.g. `http://host:8000/api`)
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(60))
    }

    /// Create a client with a per-request timeout
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(5)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_retries: 2,
        })
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Retry an idempotent request with exponential backoff while the error is transient
    async fn retry_request<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.retry_when(Error::is_retryable, operation).await
    }

    async fn retry_when<P, F, Fut, T>(&self, should_retry: P, operation: F) -> Result<T>
    where
        P: Fn(&Error) -> bool,
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if should_retry(&e) && attempt < self.max_retries => {
                    let delay = Duration::from_millis(250 * 2u64.pow(attempt));
                    tracing::warn!(
                        "Request failed (attempt {}/{}): {}, retrying in {:?}",
                        attempt + 1,
                        self.max_retries + 1,
                        e,
                        delay
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// POST /login/ - Start a session
    pub async fn login(&self, username: &str, password: &str) -> Result<Session> {
        let request = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let response = self.client.post(self.url("login/")).json(&request).send().await?;
        let pair: TokenPair = decode(response).await?;

        Ok(Session {
            username: username.to_string(),
            access: pair.access,
            refresh: pair.refresh,
        })
    }

    /// POST /refresh/ - Replace the session's access token
    pub async fn refresh(&self, session: &mut Session) -> Result<()> {
        let request = RefreshRequest {
            refresh: session.refresh.clone(),
        };
        let response = self.client.post(self.url("refresh/")).json(&request).send().await?;
        let token: AccessToken = decode(response).await?;
        session.access = token.access;
        Ok(())
    }

    /// POST /upload/ - Upload a CSV file from disk
    pub async fn upload_csv(&self, session: &Session, path: &Path) -> Result<UploadResponse> {
        let data = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload.csv")
            .to_string();
        self.upload_bytes(session, &filename, data).await
    }

    /// Run an authenticated call, exchanging the refresh token once if the
    /// access token is rejected
    ///
    /// On success after a refresh, `session.access` holds the new token.
    pub async fn authorized_call<T, F, Fut>(&self, session: &mut Session, call: F) -> Result<T>
    where
        F: Fn(Session) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        match call(session.clone()).await {
            Err(Error::Authentication(reason)) => {
                tracing::info!("Access token rejected ({}), refreshing", reason);
                self.refresh(session).await?;
                call(session.clone()).await
            }
            other => other,
        }
    }

    /// POST /upload/ - Upload CSV bytes under the given file name
    ///
    /// Resent only when the server cannot have stored the first attempt.
    pub async fn upload_bytes(
        &self,
        session: &Session,
        filename: &str,
        data: Vec<u8>,
    ) -> Result<UploadResponse> {
        self.retry_when(Error::is_safe_to_resend, || {
            let part = multipart::Part::bytes(data.clone())
                .file_name(filename.to_string())
                .mime_str("text/csv");
            async move {
                let form = multipart::Form::new().part("file", part?);
                let response = self
                    .authorized(self.client.post(self.url("upload/")), session)
                    .multipart(form)
                    .send()
                    .await?;
                decode(response).await
            }
        })
        .await
    }

    /// GET /history/ - Most recent uploads, newest first
    pub async fn history(&self, session: &Session) -> Result<Vec<HistoryEntry>> {
        self.get_json(session, "history/").await
    }

    /// GET /report/view/ - Report data for local rendering
    pub async fn report_view(&self, session: &Session) -> Result<ReportView> {
        self.get_json(session, "report/view/").await
    }

    /// GET /report/ - Download the PDF report to `path`, returning its size
    pub async fn download_report(&self, session: &Session, path: &Path) -> Result<usize> {
        let bytes = self
            .retry_request(|| async move {
                let response = self
                    .authorized(self.client.get(self.url("report/")), session)
                    .send()
                    .await?;
                let response = check_status(response).await?;
                Ok(response.bytes().await?)
            })
            .await?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(path, &bytes).await?;
        Ok(bytes.len())
    }

    async fn get_json<T: DeserializeOwned>(&self, session: &Session, path: &str) -> Result<T> {
        self.retry_request(|| async move {
            let response = self
                .authorized(self.client.get(self.url(path)), session)
                .send()
                .await?;
            decode(response).await
        })
        .await
    }

    fn authorized(&self, request: RequestBuilder, session: &Session) -> RequestBuilder {
        request.bearer_auth(&session.access)
    }
}

/// Turn a non-success response into an error carrying the server's message
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|envelope| envelope.error.message)
        .unwrap_or(body);

    if status == StatusCode::UNAUTHORIZED {
        return Err(Error::Authentication(message));
    }
    Err(Error::Api {
        status: status.as_u16(),
        message,
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let response = check_status(response).await?;
    Ok(response.json().await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_session_round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg").join("session.json");

        assert!(Session::load(&path).unwrap().is_none());

        let session = Session {
            username: "operator".to_string(),
            access: "a".to_string(),
            refresh: "r".to_string(),
        };
        session.save(&path).unwrap();

        let loaded = Session::load(&path).unwrap().unwrap();
        assert_eq!(loaded.username, "operator");
        assert_eq!(loaded.refresh, "r");

        Session::clear(&path).unwrap();
        assert!(Session::load(&path).unwrap().is_none());
        Session::clear(&path).unwrap();
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = ApiClient::new("http://localhost:8000/api/").unwrap();
        assert_eq!(client.url("history/"), "http://localhost:8000/api/history/");
    }

    /// Accepts connections and never answers, counting attempts
    async fn silent_server() -> (String, Arc<AtomicUsize>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let attempts = Arc::new(AtomicUsize::new(0));

        let counter = attempts.clone();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                held.push(socket);
            }
        });

        (format!("http://{}/api", addr), attempts)
    }

    fn session() -> Session {
        Session {
            username: "operator".to_string(),
            access: "a".to_string(),
            refresh: "r".to_string(),
        }
    }

    #[tokio::test]
    async fn test_upload_is_not_resent_after_timeout() {
        let (base_url, attempts) = silent_server().await;
        let client = ApiClient::with_timeout(base_url, Duration::from_millis(200)).unwrap();

        let err = client
            .upload_bytes(&session(), "a.csv", b"Type\npump\n".to_vec())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Http(ref e) if e.is_timeout()));
        assert!(!err.is_safe_to_resend());
        assert!(err.is_retryable());
        sleep(Duration::from_millis(300)).await;
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_reads_are_retried_after_timeout() {
        let (base_url, attempts) = silent_server().await;
        let client = ApiClient::with_timeout(base_url, Duration::from_millis(100))
            .unwrap()
            .with_max_retries(1);

        assert!(client.history(&session()).await.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_refused_connection_is_safe_to_resend() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = ApiClient::new(format!("http://{}/api", addr))
            .unwrap()
            .with_max_retries(0);
        let err = client
            .upload_bytes(&session(), "a.csv", b"Type\npump\n".to_vec())
            .await
            .unwrap_err();
        assert!(err.is_safe_to_resend());
    }
}
