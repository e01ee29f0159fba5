use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::XnatError;

static SCHEME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z][A-Za-z0-9+.\-]*)://").expect("scheme pattern"));

/// One level of the repository hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Project,
    Subject,
    Session,
    Scan,
    Resource,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Project => write!(f, "project"),
            Level::Subject => write!(f, "subject"),
            Level::Session => write!(f, "session"),
            Level::Scan => write!(f, "scan"),
            Level::Resource => write!(f, "resource"),
        }
    }
}

/// Server root, always ending in exactly one `/` and carrying an http(s) scheme.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct ServerUrl(String);

impl ServerUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Appends percent-encoded path segments to the server root.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, XnatError> {
        let mut url =
            Url::parse(&self.0).map_err(|err| XnatError::InvalidServer(err.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| XnatError::InvalidServer(self.0.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

impl fmt::Display for ServerUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for ServerUrl {
    type Error = XnatError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl FromStr for ServerUrl {
    type Err = XnatError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        normalize_server_name(value).map(Self)
    }
}

pub fn normalize_server_name(value: &str) -> Result<String, XnatError> {
    let trimmed = value.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(XnatError::InvalidServer(value.to_string()));
    }

    let with_scheme = match SCHEME.captures(trimmed) {
        Some(caps) => {
            let scheme = caps[1].to_ascii_lowercase();
            if scheme != "http" && scheme != "https" {
                return Err(XnatError::InvalidServer(format!(
                    "unsupported scheme {scheme}: {value}"
                )));
            }
            trimmed.to_string()
        }
        None => format!("https://{trimmed}"),
    };

    let normalized = format!("{with_scheme}/");
    let parsed = Url::parse(&normalized)
        .map_err(|err| XnatError::InvalidServer(format!("{value}: {err}")))?;
    if parsed.host_str().is_none_or(|host| host.is_empty()) {
        return Err(XnatError::InvalidServer(value.to_string()));
    }
    Ok(normalized)
}

/// Basic-auth pair sent with every request.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"********")
            .finish()
    }
}
