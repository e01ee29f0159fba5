//! The validated path through the hierarchy.
//!
//! Transitions only move one level at a time: a subject can be chosen once a
//! project is, a session once a subject is, and a scan or resource once a
//! session is. Choosing a different value at some level drops everything below
//! it; choosing the same value again keeps it. Scan and resource sit side by
//! side under the session.

use serde::Serialize;

use crate::domain::Level;
use crate::error::XnatError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum Selection {
    #[default]
    Unselected,
    Project {
        project: String,
    },
    Subject {
        project: String,
        subject: String,
    },
    Session(SessionPath),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionPath {
    pub project: String,
    pub subject: String,
    pub session: String,
    pub scan: Option<String>,
    pub resource: Option<String>,
}

impl Selection {
    pub fn project(&self) -> Result<&str, XnatError> {
        match self {
            Selection::Unselected => Err(XnatError::Unset(Level::Project)),
            Selection::Project { project }
            | Selection::Subject { project, .. }
            | Selection::Session(SessionPath { project, .. }) => Ok(project),
        }
    }

    pub fn subject(&self) -> Result<&str, XnatError> {
        match self {
            Selection::Subject { subject, .. }
            | Selection::Session(SessionPath { subject, .. }) => Ok(subject),
            _ => Err(XnatError::Unset(Level::Subject)),
        }
    }

    pub fn session(&self) -> Result<&str, XnatError> {
        match self {
            Selection::Session(path) => Ok(&path.session),
            _ => Err(XnatError::Unset(Level::Session)),
        }
    }

    pub fn scan(&self) -> Result<&str, XnatError> {
        match self {
            Selection::Session(SessionPath {
                scan: Some(scan), ..
            }) => Ok(scan),
            _ => Err(XnatError::Unset(Level::Scan)),
        }
    }

    pub fn resource(&self) -> Result<&str, XnatError> {
        match self {
            Selection::Session(SessionPath {
                resource: Some(resource),
                ..
            }) => Ok(resource),
            _ => Err(XnatError::Unset(Level::Resource)),
        }
    }

    /// Fails with the highest level still unset.
    pub fn session_path(&self) -> Result<&SessionPath, XnatError> {
        match self {
            Selection::Session(path) => Ok(path),
            Selection::Unselected => Err(XnatError::Unset(Level::Project)),
            Selection::Project { .. } => Err(XnatError::Unset(Level::Subject)),
            Selection::Subject { .. } => Err(XnatError::Unset(Level::Session)),
        }
    }

    /// Deepest level currently selected.
    pub fn depth(&self) -> Option<Level> {
        match self {
            Selection::Unselected => None,
            Selection::Project { .. } => Some(Level::Project),
            Selection::Subject { .. } => Some(Level::Subject),
            Selection::Session(path) => match (&path.scan, &path.resource) {
                (_, Some(_)) => Some(Level::Resource),
                (Some(_), None) => Some(Level::Scan),
                (None, None) => Some(Level::Session),
            },
        }
    }

    pub fn with_project(&self, project: &str) -> Selection {
        if self.project().is_ok_and(|current| current == project) {
            return self.clone();
        }
        Selection::Project {
            project: project.to_string(),
        }
    }

    pub fn with_subject(&self, subject: &str) -> Result<Selection, XnatError> {
        let project = self.project()?;
        if self.subject().is_ok_and(|current| current == subject) {
            return Ok(self.clone());
        }
        Ok(Selection::Subject {
            project: project.to_string(),
            subject: subject.to_string(),
        })
    }

    pub fn with_session(&self, session: &str) -> Result<Selection, XnatError> {
        let project = self.project()?;
        let subject = self.subject()?;
        if self.session().is_ok_and(|current| current == session) {
            return Ok(self.clone());
        }
        Ok(Selection::Session(SessionPath {
            project: project.to_string(),
            subject: subject.to_string(),
            session: session.to_string(),
            scan: None,
            resource: None,
        }))
    }

    pub fn with_scan(&self, scan: &str) -> Result<Selection, XnatError> {
        let path = self.session_path()?;
        Ok(Selection::Session(SessionPath {
            scan: Some(scan.to_string()),
            ..path.clone()
        }))
    }

    pub fn with_resource(&self, resource: &str) -> Result<Selection, XnatError> {
        let path = self.session_path()?;
        Ok(Selection::Session(SessionPath {
            resource: Some(resource.to_string()),
            ..path.clone()
        }))
    }
}
