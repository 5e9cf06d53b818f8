use super::FileHost;
use super::error::{ErrorKind, Result};
use async_trait::async_trait;
use exn::ResultExt;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://s-ul.eu/api/v1/upload";

#[derive(Debug, Default, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Client for the s-ul.eu upload API.
///
/// Posts `multipart/form-data` with the file under `file` plus the
/// `wizard=true` and `key=<api key>` fields. The JSON response carries `url`
/// on success and `error` on failure.
#[derive(Clone)]
pub struct SulClient {
    client: Client,
    endpoint: String,
}

impl SulClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .or_raise(|| ErrorKind::Client)?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn classify(e: &reqwest::Error) -> ErrorKind {
        if e.is_timeout() {
            ErrorKind::Timeout
        } else if e.is_connect() {
            ErrorKind::Connection
        } else {
            ErrorKind::Request
        }
    }

    /// Turn the host's answer into a URL or an upload error.
    fn parse_response(status: u16, body: &str) -> Result<String> {
        let parsed = serde_json::from_str::<UploadResponse>(body);
        if !(200..300).contains(&status) {
            let reason = parsed.ok().and_then(|r| r.error).unwrap_or_else(|| body.trim().to_string());
            exn::bail!(ErrorKind::Status { status, reason });
        }
        let response = parsed.or_raise(|| ErrorKind::InvalidResponse)?;
        match response.url {
            Some(url) if !url.trim().is_empty() => Ok(url),
            _ => exn::bail!(ErrorKind::MissingUrl(response.error.unwrap_or_else(|| "no error given".to_string()))),
        }
    }
}

#[async_trait]
impl FileHost for SulClient {
    async fn upload(&self, filename: &str, data: Vec<u8>, credential: &str) -> Result<String> {
        if credential.trim().is_empty() {
            exn::bail!(ErrorKind::MissingCredential);
        }
        let size = data.len();
        let form = Form::new()
            .text("wizard", "true")
            .text("key", credential.to_string())
            .part("file", Part::bytes(data).file_name(filename.to_string()));

        tracing::debug!(file = %filename, size, endpoint = %self.endpoint, "uploading file");
        let response = match self.client.post(&self.endpoint).multipart(form).send().await {
            Ok(response) => response,
            Err(e) => {
                let kind = Self::classify(&e);
                match kind {
                    ErrorKind::Timeout => tracing::warn!(file = %filename, "upload timed out"),
                    ErrorKind::Connection => tracing::warn!(file = %filename, error = %e, "could not connect to upload host"),
                    _ => tracing::warn!(file = %filename, error = %e, "upload request failed"),
                }
                return Err(e).or_raise(|| kind);
            },
        };
        let status = response.status().as_u16();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                let kind = Self::classify(&e);
                return Err(e).or_raise(|| kind);
            },
        };
        match Self::parse_response(status, &body) {
            Ok(url) => Ok(url),
            Err(err) => {
                tracing::warn!(file = %filename, status, error = %err, "upload host rejected file");
                Err(err)
            },
        }
    }
}
