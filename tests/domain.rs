use std::str::FromStr;

use assert_matches::assert_matches;

use xnat_access::domain::{Level, ServerUrl, normalize_server_name};
use xnat_access::error::XnatError;

#[test]
fn normalization_is_idempotent() {
    for raw in [
        "xnat.example.org",
        "https://xnat.example.org",
        "http://localhost:8080/xnat/",
        "  central.xnat.org//  ",
    ] {
        let once = normalize_server_name(raw).unwrap();
        let twice = normalize_server_name(&once).unwrap();
        assert_eq!(once, twice, "{raw}");
        assert!(once.ends_with('/'));
        assert!(once.starts_with("http://") || once.starts_with("https://"));
    }
}

#[test]
fn normalization_keeps_explicit_scheme_and_path() {
    assert_eq!(
        normalize_server_name("http://localhost:8080/xnat").unwrap(),
        "http://localhost:8080/xnat/"
    );
    assert_eq!(
        normalize_server_name("HTTPS://xnat.example.org").unwrap(),
        "HTTPS://xnat.example.org/"
    );
}

#[test]
fn unsupported_or_empty_servers_rejected() {
    for raw in ["", "   ", "/", "ftp://xnat.example.org", "gopher://x"] {
        assert_matches!(
            ServerUrl::from_str(raw),
            Err(XnatError::InvalidServer(_)),
            "{raw:?}"
        );
    }
}

#[test]
fn endpoint_keeps_server_base_path() {
    let server: ServerUrl = "http://localhost:8080/xnat".parse().unwrap();
    let url = server.endpoint(&["data", "projects", "P1"]).unwrap();
    assert_eq!(url.as_str(), "http://localhost:8080/xnat/data/projects/P1");
}

#[test]
fn levels_display_lowercase() {
    let names: Vec<String> = [
        Level::Project,
        Level::Subject,
        Level::Session,
        Level::Scan,
        Level::Resource,
    ]
    .iter()
    .map(ToString::to_string)
    .collect();
    assert_eq!(names, ["project", "subject", "session", "scan", "resource"]);
}
