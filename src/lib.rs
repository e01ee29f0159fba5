//! Blocking client for an XNAT imaging repository.
//!
//! [`XnatClient`] walks the hierarchy project → subject → session →
//! scan / resource → file. Each step is checked against the list of valid
//! values the server reports at that scope before it is accepted.

pub mod auth;
pub mod catalog;
pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod output;
pub mod result_set;
pub mod selection;
pub mod transport;

pub use client::XnatClient;
pub use error::XnatError;
