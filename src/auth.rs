use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

use crate::domain::Credentials;

/// Short-lived alias credentials issued by `data/services/tokens/issue`.
#[derive(Clone, Deserialize)]
pub struct TokenPair {
    pub alias: String,
    pub secret: String,
    #[serde(
        rename = "estimatedExpirationTime",
        default,
        deserialize_with = "expiry_from_millis"
    )]
    pub expires_at: Option<DateTime<Utc>>,
}

impl TokenPair {
    pub fn into_credentials(self) -> Credentials {
        Credentials::new(self.alias, self.secret)
    }
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("alias", &self.alias)
            .field("secret", &"********")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

fn expiry_from_millis<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Millis {
        Number(i64),
        Text(String),
    }

    let millis = match Option::<Millis>::deserialize(deserializer)? {
        None => return Ok(None),
        Some(Millis::Number(value)) => value,
        Some(Millis::Text(text)) => text.trim().parse().map_err(serde::de::Error::custom)?,
    };
    Ok(DateTime::from_timestamp_millis(millis))
}
