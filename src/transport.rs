use std::time::Duration;

use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use tracing::debug;

use crate::domain::Credentials;
use crate::error::XnatError;

pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Status, content type and body of one GET, fully read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl RawResponse {
    pub fn content_type_contains(&self, marker: &str) -> bool {
        self.content_type
            .as_deref()
            .map(|value| value.contains(marker))
            .unwrap_or(false)
    }
}

pub trait Transport: Send + Sync {
    fn get(
        &self,
        operation: &'static str,
        url: &Url,
        credentials: &Credentials,
    ) -> Result<RawResponse, XnatError>;
}

#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, XnatError> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, XnatError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("xnat-access/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| XnatError::InvalidHeader(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| XnatError::Http {
                operation: "build_client",
                url: String::new(),
                message: err.to_string(),
            })?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn get(
        &self,
        operation: &'static str,
        url: &Url,
        credentials: &Credentials,
    ) -> Result<RawResponse, XnatError> {
        debug!(operation, %url, "GET");
        let response = self
            .client
            .get(url.clone())
            .basic_auth(&credentials.user, Some(&credentials.password))
            .send()
            .map_err(|err| XnatError::Http {
                operation,
                url: url.to_string(),
                message: err.to_string(),
            })?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.text().map_err(|err| XnatError::Http {
            operation,
            url: url.to_string(),
            message: err.to_string(),
        })?;
        debug!(operation, status, content_type = content_type.as_deref(), "response");

        Ok(RawResponse {
            status,
            content_type,
            body,
        })
    }
}
