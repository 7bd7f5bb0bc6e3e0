//! Small utility helpers shared across modules.
//!
//! [`amount_as_string`] handles serde (de)serialization of `u128` amounts as
//! JSON strings, matching the catalog's wire format.

/// Serializes/deserializes a `u128` as a JSON string, since JSON numbers lose
/// precision above 2^53 and the catalog sends amounts this way.
pub mod amount_as_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &u128, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<u128, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse::<u128>().map_err(serde::de::Error::custom)
    }
}
