//! CONNECT payload.

use std::fmt;

use serde::{Deserialize, Deserializer};

/// Decoded `CONNECT {json}` handshake.
///
/// Missing fields, and fields sent as `null`, read as empty/false.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConnectRequest {
    #[serde(deserialize_with = "nullable")]
    pub verbose: bool,
    #[serde(deserialize_with = "nullable")]
    pub pedantic: bool,
    #[serde(deserialize_with = "nullable")]
    pub auth_token: String,
    #[serde(deserialize_with = "nullable")]
    pub user: String,
    #[serde(deserialize_with = "nullable")]
    pub pass: String,
    #[serde(deserialize_with = "nullable")]
    pub name: String,
    #[serde(deserialize_with = "nullable")]
    pub lang: String,
    #[serde(deserialize_with = "nullable")]
    pub version: String,
}

impl ConnectRequest {
    /// Decode the JSON argument of a CONNECT line.
    pub fn decode(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl fmt::Debug for ConnectRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectRequest")
            .field("verbose", &self.verbose)
            .field("pedantic", &self.pedantic)
            .field("has_auth_token", &!self.auth_token.is_empty())
            .field("user", &self.user)
            .field("has_pass", &!self.pass.is_empty())
            .field("name", &self.name)
            .field("lang", &self.lang)
            .field("version", &self.version)
            .finish()
    }
}
