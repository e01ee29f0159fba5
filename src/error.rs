use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use crate::domain::Level;

#[derive(Debug, Error, Diagnostic)]
pub enum XnatError {
    #[error("invalid server address: {0}")]
    InvalidServer(String),

    #[error("invalid header value: {0}")]
    InvalidHeader(String),

    #[error("{operation}: request to {url} failed: {message}")]
    Http {
        operation: &'static str,
        url: String,
        message: String,
    },

    #[error("{operation}: {url} returned status {status}: {message}")]
    Status {
        operation: &'static str,
        url: String,
        status: u16,
        message: String,
    },

    #[error("{operation}: unexpected content-type {actual:?} from {url} (expected {expected})")]
    #[diagnostic(help("the server answered, but not with the document type this call parses"))]
    ContentType {
        operation: &'static str,
        url: String,
        expected: &'static str,
        actual: String,
    },

    #[error("{operation}: failed to decode response from {url}: {message}")]
    Decode {
        operation: &'static str,
        url: String,
        message: String,
    },

    #[error("{operation}: failed to parse catalog from {url}: {message}")]
    Catalog {
        operation: &'static str,
        url: String,
        message: String,
    },

    #[error("{operation}: {url} reported {reported} records but returned {actual}")]
    RecordCount {
        operation: &'static str,
        url: String,
        reported: usize,
        actual: usize,
    },

    #[error("{level} {value:?} is not in the valid {level} list for {scope}")]
    NotInList {
        level: Level,
        value: String,
        scope: String,
    },

    #[error("{operation}: {key:?} not found")]
    LookupMiss { operation: &'static str, key: String },

    #[error("cannot use {0} because it is unset")]
    #[diagnostic(help("select each level top-down: project, subject, session, then scan or resource"))]
    Unset(Level),

    #[error("failed to write output: {0}")]
    Output(String),

    #[error("missing connection profile xnat.json")]
    #[diagnostic(help("pass --config, create ./xnat.json, or set XNAT_SERVER, XNAT_USER and XNAT_PASSWORD"))]
    MissingConfig,

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("connection setting {0} is not configured")]
    MissingSetting(&'static str),
}

impl XnatError {
    /// Errors that mean "the thing you asked for is not there".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            XnatError::NotInList { .. } | XnatError::LookupMiss { .. } | XnatError::Unset(_)
        )
    }

    /// Errors raised while talking to the server or reading what it sent back.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            XnatError::Http { .. }
                | XnatError::Status { .. }
                | XnatError::ContentType { .. }
                | XnatError::Decode { .. }
                | XnatError::Catalog { .. }
                | XnatError::RecordCount { .. }
        )
    }
}
