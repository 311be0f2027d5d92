//! Domain models shared by the core and the HTTP layer.

pub mod auth;
pub mod docs;

/// Serialize 64-bit IDs as JSON strings.
///
/// Snowflake IDs exceed the 53-bit integer range of JavaScript clients, so
/// they travel as strings. Deserialization accepts either form.
pub mod id_string {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    pub fn serialize<S: Serializer>(id: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(id)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        match RawId::deserialize(deserializer)? {
            RawId::Text(s) => s.parse().map_err(D::Error::custom),
            RawId::Number(n) => Ok(n),
        }
    }

    pub(super) fn parse_raw<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<i64>, D::Error> {
        match Option::<RawId>::deserialize(deserializer)? {
            None => Ok(None),
            Some(RawId::Text(s)) => s.parse().map(Some).map_err(D::Error::custom),
            Some(RawId::Number(n)) => Ok(Some(n)),
        }
    }
}

/// Optional variant of [`id_string`].
pub mod option_id_string {
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(id: &Option<i64>, serializer: S) -> Result<S::Ok, S::Error> {
        match id {
            Some(id) => serializer.collect_str(id),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<i64>, D::Error> {
        super::id_string::parse_raw(deserializer)
    }
}
