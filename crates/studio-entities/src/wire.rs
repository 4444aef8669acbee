//! Serde helpers for server payloads

use serde::{Deserialize, Deserializer};

/// Read a nullable text column, mapping `null` to `""`
pub(crate) fn empty_if_null<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
