use std::collections::HashMap;
use std::sync::Mutex;

use assert_matches::assert_matches;
use reqwest::Url;

use xnat_access::XnatClient;
use xnat_access::domain::{Credentials, Level};
use xnat_access::error::XnatError;
use xnat_access::selection::Selection;
use xnat_access::transport::{RawResponse, Transport};

/// Serves canned bodies keyed by URL path and records every request.
#[derive(Default)]
struct MockTransport {
    routes: HashMap<String, RawResponse>,
    requests: Mutex<Vec<(&'static str, String)>>,
}

impl MockTransport {
    fn json(mut self, path: &str, body: &str) -> Self {
        self.routes.insert(
            path.to_string(),
            RawResponse {
                status: 200,
                content_type: Some("application/json;charset=UTF-8".to_string()),
                body: body.to_string(),
            },
        );
        self
    }

    fn requests(&self) -> Vec<(&'static str, String)> {
        self.requests.lock().unwrap().clone()
    }
}

impl Transport for MockTransport {
    fn get(
        &self,
        operation: &'static str,
        url: &Url,
        _credentials: &Credentials,
    ) -> Result<RawResponse, XnatError> {
        self.requests
            .lock()
            .unwrap()
            .push((operation, url.path().to_string()));
        Ok(self.routes.get(url.path()).cloned().unwrap_or(RawResponse {
            status: 404,
            content_type: Some("text/plain".to_string()),
            body: String::new(),
        }))
    }
}

fn labels(key: &str, values: &[&str]) -> String {
    let records: Vec<String> = values
        .iter()
        .map(|value| format!(r#"{{"{key}": "{value}"}}"#))
        .collect();
    format!(
        r#"{{"ResultSet": {{"totalRecords": "{}", "Result": [{}]}}}}"#,
        values.len(),
        records.join(",")
    )
}

fn archive() -> MockTransport {
    MockTransport::default()
        .json("/data/projects", &labels("id", &["P1", "P2"]))
        .json("/data/projects/P1/subjects", &labels("label", &["S1", "S2"]))
        .json("/data/projects/P2/subjects", &labels("label", &["T1"]))
        .json(
            "/data/projects/P1/subjects/S1/experiments",
            &labels("label", &["ses1", "ses2"]),
        )
        .json(
            "/data/projects/P1/subjects/S2/experiments",
            &labels("label", &["ses3"]),
        )
        .json(
            "/data/projects/P1/subjects/S1/experiments/ses1/scans",
            &labels("ID", &["1", "2"]),
        )
        .json(
            "/data/projects/P1/subjects/S1/experiments/ses1/resources",
            &labels("label", &["DICOM"]),
        )
        .json(
            "/data/projects/P1/subjects/S1/experiments/ses2/scans",
            &labels("ID", &["5"]),
        )
}

fn client() -> XnatClient<MockTransport> {
    XnatClient::with_transport(
        "xnat.example.org".parse().unwrap(),
        Credentials::new("admin", "secret"),
        archive(),
    )
}

fn client_at_scan() -> XnatClient<MockTransport> {
    let mut client = client();
    client.set_project("P1").unwrap();
    client.set_subject("S1").unwrap();
    client.set_session("ses1").unwrap();
    client.set_scan("1").unwrap();
    client.set_resource("DICOM").unwrap();
    client
}

#[test]
fn child_before_parent_fails_without_request() {
    let mut client = client();
    assert_matches!(
        client.set_subject("S1"),
        Err(XnatError::Unset(Level::Project))
    );
    assert_matches!(client.session_labels(), Err(XnatError::Unset(Level::Project)));

    client.set_project("P1").unwrap();
    assert_matches!(
        client.set_session("ses1"),
        Err(XnatError::Unset(Level::Subject))
    );
    assert_matches!(client.scan_ids(), Err(XnatError::Unset(Level::Subject)));

    let operations: Vec<&str> = client
        .transport()
        .requests()
        .iter()
        .map(|(operation, _)| *operation)
        .collect();
    assert_eq!(operations, ["project_ids"]);
}

#[test]
fn setters_validate_against_parent_scope() {
    let mut client = client();
    client.set_project("P2").unwrap();
    assert_matches!(
        client.set_subject("S1"),
        Err(XnatError::NotInList { level: Level::Subject, .. })
    );
    client.set_subject("T1").unwrap();
    assert_eq!(client.subject().unwrap(), "T1");
}

#[test]
fn changing_project_clears_descendants() {
    let mut client = client_at_scan();
    client.set_project("P2").unwrap();
    assert_eq!(client.project().unwrap(), "P2");
    assert_matches!(client.subject(), Err(XnatError::Unset(Level::Subject)));
    assert_matches!(client.session(), Err(XnatError::Unset(Level::Session)));
    assert_matches!(client.scan(), Err(XnatError::Unset(Level::Scan)));
    assert_matches!(client.resource(), Err(XnatError::Unset(Level::Resource)));
}

#[test]
fn reselecting_same_value_keeps_descendants() {
    let mut client = client_at_scan();
    client.set_project("P1").unwrap();
    client.set_subject("S1").unwrap();
    assert_eq!(client.session().unwrap(), "ses1");
    assert_eq!(client.scan().unwrap(), "1");
    assert_eq!(client.resource().unwrap(), "DICOM");
}

#[test]
fn changing_session_clears_scan_and_resource() {
    let mut client = client_at_scan();
    client.set_session("ses2").unwrap();
    assert_matches!(client.scan(), Err(XnatError::Unset(Level::Scan)));
    assert_matches!(client.resource(), Err(XnatError::Unset(Level::Resource)));
    assert_eq!(client.scan_ids().unwrap(), vec!["5"]);
}

#[test]
fn scan_and_resource_are_independent() {
    let mut client = client();
    client.set_project("P1").unwrap();
    client.set_subject("S1").unwrap();
    client.set_session("ses1").unwrap();
    client.set_resource("DICOM").unwrap();
    assert_matches!(client.scan(), Err(XnatError::Unset(Level::Scan)));
    client.set_scan("2").unwrap();
    assert_eq!(client.resource().unwrap(), "DICOM");
}

#[test]
fn failed_setter_leaves_selection_untouched() {
    let mut client = client_at_scan();
    let before = client.selection().clone();
    assert!(client.set_subject("S9").is_err());
    assert!(client.set_scan("9").is_err());
    assert_eq!(client.selection(), &before);
}

#[test]
fn setters_never_reuse_earlier_listings() {
    let mut client = client();
    client.set_project("P1").unwrap();
    client.set_project("P1").unwrap();
    client.set_subject("S1").unwrap();
    client.set_subject("S2").unwrap();

    let paths: Vec<String> = client
        .transport()
        .requests()
        .into_iter()
        .map(|(_, path)| path)
        .collect();
    assert_eq!(
        paths,
        [
            "/data/projects",
            "/data/projects",
            "/data/projects/P1/subjects",
            "/data/projects/P1/subjects",
        ]
    );
}

#[test]
fn clear_selection_resets_everything() {
    let mut client = client_at_scan();
    client.clear_selection();
    assert_eq!(client.selection(), &Selection::Unselected);
    assert_matches!(client.project(), Err(XnatError::Unset(Level::Project)));
}
