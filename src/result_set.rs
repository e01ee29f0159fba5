//! Decoding of the `ResultSet` envelope returned by XNAT list endpoints.
//!
//! ```json
//! {"ResultSet": {"totalRecords": "2", "Result": [{"id": "A"}, {"id": "B"}]}}
//! ```
//!
//! `totalRecords` arrives as a string on most servers and as a number on some.
//! Records are walked by that count; a count that disagrees with the length of
//! `Result` is reported as [`XnatError::RecordCount`].

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::error::XnatError;

pub type Record = Map<String, Value>;

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "ResultSet")]
    result_set: ResultSet,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResultSet {
    #[serde(rename = "totalRecords", deserialize_with = "count_from_text_or_number")]
    pub total_records: usize,
    #[serde(rename = "Result", default)]
    pub result: Vec<Record>,
}

/// Where a decode is happening, carried into every error.
#[derive(Debug, Clone, Copy)]
pub struct Origin<'a> {
    pub operation: &'static str,
    pub url: &'a str,
}

impl ResultSet {
    pub fn parse(body: &str, origin: Origin<'_>) -> Result<Self, XnatError> {
        let envelope: Envelope = serde_json::from_str(body).map_err(|err| XnatError::Decode {
            operation: origin.operation,
            url: origin.url.to_string(),
            message: err.to_string(),
        })?;
        Ok(envelope.result_set)
    }

    /// The first `totalRecords` records, after checking the count is honest.
    pub fn records(&self, origin: Origin<'_>) -> Result<&[Record], XnatError> {
        if self.total_records != self.result.len() {
            return Err(XnatError::RecordCount {
                operation: origin.operation,
                url: origin.url.to_string(),
                reported: self.total_records,
                actual: self.result.len(),
            });
        }
        Ok(&self.result[..self.total_records])
    }

    /// Scalar list mode: one field from every record.
    pub fn column(&self, key: &str, origin: Origin<'_>) -> Result<Vec<String>, XnatError> {
        self.records(origin)?
            .iter()
            .map(|record| field_text(record, key, origin))
            .collect()
    }

    /// Row list mode: several fields from every record, in `keys` order.
    pub fn rows(&self, keys: &[&str], origin: Origin<'_>) -> Result<Vec<Vec<String>>, XnatError> {
        self.records(origin)?
            .iter()
            .map(|record| {
                keys.iter()
                    .map(|key| field_text(record, key, origin))
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect()
    }
}

fn field_text(record: &Record, key: &str, origin: Origin<'_>) -> Result<String, XnatError> {
    record
        .get(key)
        .map(value_text)
        .ok_or_else(|| XnatError::LookupMiss {
            operation: origin.operation,
            key: key.to_string(),
        })
}

/// Text form of a JSON value: strings verbatim, null empty, anything else as JSON.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn count_from_text_or_number<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Count {
        Number(usize),
        Text(String),
    }

    match Count::deserialize(deserializer)? {
        Count::Number(count) => Ok(count),
        Count::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}
