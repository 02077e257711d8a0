//! Client for the resume REST API.
//!
//! Only the read path is consumed here: `GET {base}/resume/{id}` returning
//! `{ "data": { personalInfo, summary, experience, ... } }`.

use crate::error::IngestError;
use crate::model::ResumeData;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ResumeClient {
    http: reqwest::Client,
    base_url: String,
}

impl ResumeClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    pub fn resume_url(&self, id: &str) -> String {
        format!("{}/resume/{}", self.base_url, id)
    }

    /// Fetches one resume. Missing or malformed fields in the payload become
    /// defaults; only transport errors, non-2xx statuses and non-JSON bodies
    /// are reported.
    pub async fn fetch_resume(&self, id: &str) -> Result<ResumeData, IngestError> {
        let url = self.resume_url(id);
        debug!(url = %url, "Fetching resume");

        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(IngestError::Status {
                status: status.as_u16(),
                url,
            });
        }
        let body = response.text().await?;
        ResumeData::from_json(&body)
    }
}

/// Loads a resume saved as JSON, either a bare object or an API response.
pub async fn load_resume_file(path: impl AsRef<Path>) -> anyhow::Result<ResumeData> {
    use anyhow::Context;

    let path = path.as_ref();
    let body = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    ResumeData::from_json(&body).with_context(|| format!("Failed to parse {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_resume_url_trims_trailing_slash() {
        let client = ResumeClient::new("http://localhost:5000/api/");
        assert_eq!(client.resume_url("42"), "http://localhost:5000/api/resume/42");
    }

    /// Serves one canned HTTP response and returns the base URL.
    async fn serve_once(status: &'static str, body: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await.unwrap();
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });
        format!("http://{addr}/api")
    }

    fn local_client(base: String) -> ResumeClient {
        let http = reqwest::Client::builder().no_proxy().build().unwrap();
        ResumeClient::with_client(http, base)
    }

    #[tokio::test]
    async fn test_fetch_resume_unwraps_envelope() {
        let base = serve_once(
            "200 OK",
            r#"{"data": {"personalInfo": {"fullName": "Jane Q. Public"}, "summary": null, "skills": [{"name": "Rust"}]}}"#,
        )
        .await;

        let resume = local_client(base).fetch_resume("42").await.unwrap();

        assert_eq!(resume.full_name(), "Jane Q. Public");
        assert_eq!(resume.summary, "");
        assert_eq!(resume.skills.len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_resume_reports_error_status() {
        let base = serve_once("404 Not Found", r#"{"error": "not found"}"#).await;
        let client = local_client(base);

        let err = client.fetch_resume("missing").await.unwrap_err();

        match err {
            IngestError::Status { status, url } => {
                assert_eq!(status, 404);
                assert_eq!(url, client.resume_url("missing"));
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_load_resume_file_accepts_envelope() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"data": {{"personalInfo": {{"fullName": "Alex"}}}}}}"#).unwrap();

        let resume = load_resume_file(file.path()).await.unwrap();

        assert_eq!(resume.full_name(), "Alex");
        assert!(resume.sections().is_empty());
    }

    #[tokio::test]
    async fn test_load_resume_file_rejects_non_json() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        assert!(load_resume_file(file.path()).await.is_err());
    }
}
