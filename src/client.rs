use std::io::Write;

use reqwest::Url;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::auth::TokenPair;
use crate::catalog;
use crate::config::ResolvedConfig;
use crate::domain::{Credentials, Level, ServerUrl};
use crate::error::XnatError;
use crate::result_set::{Origin, ResultSet, value_text};
use crate::selection::Selection;
use crate::transport::{HttpTransport, RawResponse, Transport};

const JSON_CONTENT_TYPE: &str = "application/json";
const XML_CONTENT_TYPE: &str = "text/xml";
const STATUS_BODY_LIMIT: usize = 512;

#[derive(Debug, Deserialize)]
struct ScanDetail {
    #[serde(default)]
    items: Vec<ScanItem>,
}

#[derive(Debug, Deserialize)]
struct ScanItem {
    #[serde(default)]
    data_fields: Map<String, Value>,
    #[serde(default)]
    meta: Map<String, Value>,
}

#[derive(Debug, Clone, Copy)]
enum ScanSection {
    DataFields,
    Meta,
}

impl ScanSection {
    fn label(self) -> &'static str {
        match self {
            ScanSection::DataFields => "data_fields",
            ScanSection::Meta => "meta",
        }
    }
}

/// Session against one XNAT server, scoped by a validated [`Selection`].
///
/// Every setter asks the server for the valid values at the current scope and
/// refuses anything not on that list. Nothing is cached between calls.
pub struct XnatClient<T: Transport = HttpTransport> {
    server: ServerUrl,
    credentials: Credentials,
    transport: T,
    selection: Selection,
}

impl XnatClient<HttpTransport> {
    pub fn new(server: &str, user: &str, password: &str) -> Result<Self, XnatError> {
        Ok(Self::with_transport(
            server.parse()?,
            Credentials::new(user, password),
            HttpTransport::new()?,
        ))
    }

    pub fn from_config(config: &ResolvedConfig) -> Result<Self, XnatError> {
        Ok(Self::with_transport(
            config.server.clone(),
            config.credentials.clone(),
            HttpTransport::with_timeout(config.timeout)?,
        ))
    }
}

impl<T: Transport> XnatClient<T> {
    pub fn with_transport(server: ServerUrl, credentials: Credentials, transport: T) -> Self {
        Self {
            server,
            credentials,
            transport,
            selection: Selection::Unselected,
        }
    }

    pub fn server(&self) -> &ServerUrl {
        &self.server
    }

    pub fn user(&self) -> &str {
        &self.credentials.user
    }

    pub fn password(&self) -> &str {
        &self.credentials.password
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn clear_selection(&mut self) {
        self.selection = Selection::Unselected;
    }

    /// Asks the server for an alias/secret pair. The client keeps using its
    /// own credentials; build a new client from the token to switch.
    pub fn issue_token(&self) -> Result<TokenPair, XnatError> {
        let url = self.server.endpoint(&["data", "services", "tokens", "issue"])?;
        self.fetch_json("issue_token", &url)
    }

    pub fn jsession_id(&self) -> Result<String, XnatError> {
        let url = self.server.endpoint(&["data", "JSESSION"])?;
        Ok(self.get_ok("jsession_id", &url)?.body)
    }

    // Project

    pub fn project_ids(&self) -> Result<Vec<String>, XnatError> {
        const OPERATION: &str = "project_ids";
        let url = self.server.endpoint(&["data", "projects"])?;
        let set = self.fetch_result_set(OPERATION, &url)?;
        let origin = Origin {
            operation: OPERATION,
            url: url.as_str(),
        };
        match set.column("id", origin) {
            Err(XnatError::LookupMiss { .. }) => {
                warn!(%url, "project records carry no `id` field, reading `ID`");
                set.column("ID", origin)
            }
            other => other,
        }
    }

    pub fn project(&self) -> Result<&str, XnatError> {
        self.selection.project()
    }

    pub fn set_project(&mut self, project: &str) -> Result<(), XnatError> {
        let next = self.selection.with_project(project);
        let valid = self.project_ids()?;
        let scope = format!("server {}", self.server);
        self.commit(Level::Project, project, &valid, scope, next)
    }

    // Subject

    pub fn subject_labels(&self) -> Result<Vec<String>, XnatError> {
        let project = self.selection.project()?;
        let url = self
            .server
            .endpoint(&["data", "projects", project, "subjects"])?;
        self.fetch_column("subject_labels", &url, "label")
    }

    pub fn subject(&self) -> Result<&str, XnatError> {
        self.selection.subject()
    }

    pub fn set_subject(&mut self, subject: &str) -> Result<(), XnatError> {
        let next = self.selection.with_subject(subject)?;
        let valid = self.subject_labels()?;
        let scope = format!("project {}", self.selection.project()?);
        self.commit(Level::Subject, subject, &valid, scope, next)
    }

    // Session

    pub fn session_labels(&self) -> Result<Vec<String>, XnatError> {
        let url = self.experiments_url()?;
        self.fetch_column("session_labels", &url, "label")
    }

    /// `xsiType` of the subject's experiment labelled `session_label`.
    pub fn session_type(&self, session_label: &str) -> Result<String, XnatError> {
        const OPERATION: &str = "session_type";
        let url = self.experiments_url()?;
        let rows = self.fetch_rows(OPERATION, &url, &["label", "xsiType"])?;
        paired_value(rows, session_label).ok_or_else(|| XnatError::LookupMiss {
            operation: OPERATION,
            key: session_label.to_string(),
        })
    }

    pub fn session(&self) -> Result<&str, XnatError> {
        self.selection.session()
    }

    pub fn set_session(&mut self, session: &str) -> Result<(), XnatError> {
        let next = self.selection.with_session(session)?;
        let valid = self.session_labels()?;
        let scope = format!("subject {}", self.selection.subject()?);
        self.commit(Level::Session, session, &valid, scope, next)
    }

    /// Server-internal accession id of the selected session, looked up fresh
    /// so a session removed upstream since selection is reported.
    pub fn xnat_session_id(&self) -> Result<String, XnatError> {
        const OPERATION: &str = "xnat_session_id";
        let session = self.selection.session()?;
        let url = self.experiments_url()?;
        let rows = self.fetch_rows(OPERATION, &url, &["label", "ID"])?;
        paired_value(rows, session).ok_or_else(|| XnatError::LookupMiss {
            operation: OPERATION,
            key: session.to_string(),
        })
    }

    // Scan

    pub fn scan_ids(&self) -> Result<Vec<String>, XnatError> {
        let url = self.session_url(&["scans"])?;
        self.fetch_column("scan_ids", &url, "ID")
    }

    pub fn scan(&self) -> Result<&str, XnatError> {
        self.selection.scan()
    }

    pub fn set_scan(&mut self, scan: &str) -> Result<(), XnatError> {
        let next = self.selection.with_scan(scan)?;
        let valid = self.scan_ids()?;
        let scope = format!("session {}", self.selection.session()?);
        self.commit(Level::Scan, scan, &valid, scope, next)
    }

    // Resource

    pub fn resource_labels(&self) -> Result<Vec<String>, XnatError> {
        let url = self.session_url(&["resources"])?;
        self.fetch_column("resource_labels", &url, "label")
    }

    /// Whether the selected session has a resource labelled `label`. Neither
    /// needs nor touches the resource selection.
    pub fn does_resource_exist(&self, label: &str) -> Result<bool, XnatError> {
        Ok(self.resource_labels()?.iter().any(|value| value == label))
    }

    pub fn resource(&self) -> Result<&str, XnatError> {
        self.selection.resource()
    }

    pub fn set_resource(&mut self, resource: &str) -> Result<(), XnatError> {
        let next = self.selection.with_resource(resource)?;
        let valid = self.resource_labels()?;
        let scope = format!("session {}", self.selection.session()?);
        self.commit(Level::Resource, resource, &valid, scope, next)
    }

    // Files

    pub fn resource_file_names(&self) -> Result<Vec<String>, XnatError> {
        const OPERATION: &str = "resource_file_names";
        let resource = self.selection.resource()?;
        let url = self.session_url(&["resources", resource])?;
        let response = self.get_ok(OPERATION, &url)?;
        expect_content_type(&response, OPERATION, &url, XML_CONTENT_TYPE)?;
        catalog::entry_attribute(
            &response.body,
            "name",
            Origin {
                operation: OPERATION,
                url: url.as_str(),
            },
        )
    }

    /// `file_name` may name a file in a subfolder of the resource, `sub/a.txt`.
    pub fn file_content(&self, file_name: &str) -> Result<String, XnatError> {
        let resource = self.selection.resource()?;
        let mut segments = vec!["resources", resource, "files"];
        segments.extend(file_name.split('/').filter(|part| !part.is_empty()));
        let url = self.session_url(&segments)?;
        Ok(self.get_ok("file_content", &url)?.body)
    }

    // Scan detail

    pub fn scan_data_field(&self, scan_number: &str, field_name: &str) -> Result<Value, XnatError> {
        self.scan_value("scan_data_field", ScanSection::DataFields, scan_number, field_name)
    }

    pub fn scan_meta_value(&self, scan_number: &str, field_name: &str) -> Result<Value, XnatError> {
        self.scan_value("scan_meta_value", ScanSection::Meta, scan_number, field_name)
    }

    /// Writes every `data_fields` entry of the scan to `out`, one per line.
    pub fn show_scan_data_fields(&self, scan_number: &str, out: &mut dyn Write) -> Result<(), XnatError> {
        self.show_scan_section("show_scan_data_fields", ScanSection::DataFields, scan_number, out)
    }

    /// Writes every `meta` entry of the scan to `out`, one per line.
    pub fn show_scan_meta(&self, scan_number: &str, out: &mut dyn Write) -> Result<(), XnatError> {
        self.show_scan_section("show_scan_meta", ScanSection::Meta, scan_number, out)
    }

    fn scan_value(
        &self,
        operation: &'static str,
        section: ScanSection,
        scan_number: &str,
        field_name: &str,
    ) -> Result<Value, XnatError> {
        let mut fields = self.scan_section(operation, section, scan_number)?;
        fields
            .remove(field_name)
            .ok_or_else(|| XnatError::LookupMiss {
                operation,
                key: field_name.to_string(),
            })
    }

    fn show_scan_section(
        &self,
        operation: &'static str,
        section: ScanSection,
        scan_number: &str,
        out: &mut dyn Write,
    ) -> Result<(), XnatError> {
        let fields = self.scan_section(operation, section, scan_number)?;
        let write_err = |err: std::io::Error| XnatError::Output(err.to_string());
        writeln!(out, "{} for scan number: {scan_number}", section.label()).map_err(write_err)?;
        for (key, value) in &fields {
            writeln!(out, "key: {key}\tval: {}", value_text(value)).map_err(write_err)?;
        }
        Ok(())
    }

    fn scan_section(
        &self,
        operation: &'static str,
        section: ScanSection,
        scan_number: &str,
    ) -> Result<Map<String, Value>, XnatError> {
        let mut url = self.session_url(&["scans", scan_number])?;
        url.query_pairs_mut().append_pair("format", "json");
        let detail: ScanDetail = self.fetch_json(operation, &url)?;
        let item = detail
            .items
            .into_iter()
            .next()
            .ok_or_else(|| XnatError::LookupMiss {
                operation,
                key: "items[0]".to_string(),
            })?;
        Ok(match section {
            ScanSection::DataFields => item.data_fields,
            ScanSection::Meta => item.meta,
        })
    }

    // Plumbing

    fn commit(
        &mut self,
        level: Level,
        value: &str,
        valid: &[String],
        scope: String,
        next: Selection,
    ) -> Result<(), XnatError> {
        if !valid.iter().any(|candidate| candidate == value) {
            return Err(XnatError::NotInList {
                level,
                value: value.to_string(),
                scope,
            });
        }
        info!(%level, value, "selected");
        self.selection = next;
        Ok(())
    }

    fn experiments_url(&self) -> Result<Url, XnatError> {
        let project = self.selection.project()?;
        let subject = self.selection.subject()?;
        self.server.endpoint(&[
            "data",
            "projects",
            project,
            "subjects",
            subject,
            "experiments",
        ])
    }

    fn session_url(&self, tail: &[&str]) -> Result<Url, XnatError> {
        let path = self.selection.session_path()?;
        let mut segments = vec![
            "data",
            "projects",
            path.project.as_str(),
            "subjects",
            path.subject.as_str(),
            "experiments",
            path.session.as_str(),
        ];
        segments.extend_from_slice(tail);
        self.server.endpoint(&segments)
    }

    fn get_ok(&self, operation: &'static str, url: &Url) -> Result<RawResponse, XnatError> {
        let response = self.transport.get(operation, url, &self.credentials)?;
        if response.status != 200 {
            return Err(XnatError::Status {
                operation,
                url: url.to_string(),
                status: response.status,
                message: status_message(&response),
            });
        }
        Ok(response)
    }

    fn fetch_json<D: DeserializeOwned>(
        &self,
        operation: &'static str,
        url: &Url,
    ) -> Result<D, XnatError> {
        let response = self.get_ok(operation, url)?;
        serde_json::from_str(&response.body).map_err(|err| XnatError::Decode {
            operation,
            url: url.to_string(),
            message: err.to_string(),
        })
    }

    fn fetch_result_set(&self, operation: &'static str, url: &Url) -> Result<ResultSet, XnatError> {
        let response = self.get_ok(operation, url)?;
        expect_content_type(&response, operation, url, JSON_CONTENT_TYPE)?;
        ResultSet::parse(
            &response.body,
            Origin {
                operation,
                url: url.as_str(),
            },
        )
    }

    fn fetch_column(
        &self,
        operation: &'static str,
        url: &Url,
        key: &str,
    ) -> Result<Vec<String>, XnatError> {
        let set = self.fetch_result_set(operation, url)?;
        set.column(
            key,
            Origin {
                operation,
                url: url.as_str(),
            },
        )
    }

    fn fetch_rows(
        &self,
        operation: &'static str,
        url: &Url,
        keys: &[&str],
    ) -> Result<Vec<Vec<String>>, XnatError> {
        let set = self.fetch_result_set(operation, url)?;
        set.rows(
            keys,
            Origin {
                operation,
                url: url.as_str(),
            },
        )
    }
}

fn expect_content_type(
    response: &RawResponse,
    operation: &'static str,
    url: &Url,
    expected: &'static str,
) -> Result<(), XnatError> {
    if response.content_type_contains(expected) {
        return Ok(());
    }
    Err(XnatError::ContentType {
        operation,
        url: url.to_string(),
        expected,
        actual: response.content_type.clone().unwrap_or_default(),
    })
}

/// Second column of the first row whose first column is `label`.
fn paired_value(rows: Vec<Vec<String>>, label: &str) -> Option<String> {
    rows.into_iter()
        .find(|row| row.first().is_some_and(|first| first == label))
        .and_then(|row| row.into_iter().nth(1))
}

fn status_message(response: &RawResponse) -> String {
    let body = response.body.trim();
    if body.is_empty() {
        return "empty response body".to_string();
    }
    match body.char_indices().nth(STATUS_BODY_LIMIT) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paired_value_finds_first_match() {
        let rows = vec![
            vec!["ses1".to_string(), "xsi:A".to_string()],
            vec!["ses2".to_string(), "xsi:B".to_string()],
        ];
        assert_eq!(paired_value(rows.clone(), "ses2").as_deref(), Some("xsi:B"));
        assert_eq!(paired_value(rows, "ses3"), None);
    }

    #[test]
    fn status_message_truncates_long_bodies() {
        let response = RawResponse {
            status: 500,
            content_type: Some("text/html".to_string()),
            body: "x".repeat(STATUS_BODY_LIMIT + 10),
        };
        let message = status_message(&response);
        assert_eq!(message.len(), STATUS_BODY_LIMIT + 3);
        assert!(message.ends_with("..."));
    }

    #[test]
    fn status_message_for_empty_body() {
        let response = RawResponse {
            status: 404,
            content_type: None,
            body: "  ".to_string(),
        };
        assert_eq!(status_message(&response), "empty response body");
    }
}
